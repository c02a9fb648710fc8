use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,
    #[error("node {node} is out of range (graph has {count} nodes)")]
    NodeOutOfRange { node: usize, count: usize },
    #[error("node {child} already has parent {existing}, cannot attach it to {parent}")]
    DuplicateParent {
        child: usize,
        parent: usize,
        existing: usize,
    },
    #[error("link from node {0} to itself")]
    SelfLink(usize),
    #[error("graph needs exactly one root, found {0}")]
    RootCount(usize),
    #[error("{0} nodes are not reachable from the root through tree links")]
    Disconnected(usize),
    #[error("graph has {0} nodes, more than 32-bit element ids can address")]
    TooLarge(usize),
    #[error("failed to read graph file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid graph JSON")]
    Json(#[from] serde_json::Error),
}

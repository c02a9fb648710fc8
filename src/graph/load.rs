use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::GraphError;

use super::build::{DEFAULT_NODE_COLOR, GraphBuilder};
use super::storage::Graph;

#[derive(Debug, Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    #[serde(default)]
    tree_links: Vec<(usize, usize)>,
    #[serde(default)]
    nontree_links: Vec<(usize, usize)>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    color: Option<u32>,
}

pub fn load_graph(path: &Path) -> Result<Graph, GraphError> {
    let raw = fs::read_to_string(path).map_err(|source| GraphError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_graph(&raw)
}

pub fn parse_graph(raw: &str) -> Result<Graph, GraphError> {
    let parsed: RawGraph = serde_json::from_str(raw)?;

    let mut builder = GraphBuilder::with_capacity(parsed.nodes.len());
    for (index, node) in parsed.nodes.into_iter().enumerate() {
        let label = node.label.unwrap_or_else(|| index.to_string());
        builder.add_labeled_node(label, node.color.unwrap_or(DEFAULT_NODE_COLOR));
    }
    for (parent, child) in parsed.tree_links {
        builder.add_child(parent, child);
    }
    for (source, target) in parsed.nontree_links {
        builder.add_nontree_link(source, target);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_colors_and_links() {
        let raw = r#"{
            "nodes": [
                { "label": "root", "color": 16711680 },
                { "label": "left" },
                {}
            ],
            "tree_links": [[0, 1], [0, 2]],
            "nontree_links": [[1, 2]]
        }"#;
        let graph = parse_graph(raw).expect("valid graph");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node_label(0), "root");
        assert_eq!(graph.node_label(2), "2");
        assert_eq!(graph.node_color(0), 0xff0000);
        assert_eq!(graph.node_color(1), DEFAULT_NODE_COLOR);
        assert_eq!(graph.nontree_link_count(), 1);
    }

    #[test]
    fn reports_bad_json_and_bad_links() {
        assert!(matches!(parse_graph("{"), Err(GraphError::Json(_))));
        assert!(matches!(
            parse_graph(r#"{ "nodes": [{}], "tree_links": [[0, 3]] }"#),
            Err(GraphError::NodeOutOfRange { node: 3, .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = load_graph(Path::new("/nonexistent/hyperview/graph.json"));
        assert!(matches!(result, Err(GraphError::Read { .. })));
    }
}

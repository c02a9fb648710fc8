mod build;
mod generate;
mod load;
mod storage;

pub use build::GraphBuilder;
pub use generate::{complete_graph, complete_tree, ternary_tree_set};
pub use load::load_graph;
pub use storage::Graph;

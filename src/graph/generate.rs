use crate::error::GraphError;

use super::build::GraphBuilder;
use super::storage::Graph;

const TERNARY_SET_SIZES: [[usize; 3]; 11] = [
    [10, 10, 10],
    [100, 100, 100],
    [100, 100, 50],
    [100, 100, 5],
    [100, 50, 50],
    [100, 50, 5],
    [500, 500, 500],
    [500, 500, 50],
    [500, 500, 5],
    [500, 50, 50],
    [500, 50, 5],
];

pub fn complete_tree_node_count(arity: usize, levels: usize) -> usize {
    let mut count = 0usize;
    let mut width = 1usize;
    for _ in 0..levels {
        count += width;
        width *= arity;
    }
    count
}

// Nodes are numbered breadth first; the children of node k are
// k * arity + 1 ..= k * arity + arity.
pub fn complete_tree(arity: usize, levels: usize) -> Result<Graph, GraphError> {
    complete_tree_builder(arity, levels).build()
}

// Adds a non-tree link from every node to the first child of its next
// sibling.
pub fn complete_graph(arity: usize, levels: usize) -> Result<Graph, GraphError> {
    let mut builder = complete_tree_builder(arity, levels);
    let count = builder.node_count();

    for node in 1..count {
        let sibling = node + 1;
        if sibling >= count || (sibling - 1) / arity != (node - 1) / arity {
            continue;
        }
        let cousin = sibling * arity + 1;
        if cousin < count {
            builder.add_nontree_link(node, cousin);
        }
    }

    builder.build()
}

// A root over subtrees of very uneven fan-out, for exercising the frontier
// on lopsided graphs.
pub fn ternary_tree_set() -> Result<Graph, GraphError> {
    let mut builder = GraphBuilder::new();
    let root = builder.add_node();
    for sizes in TERNARY_SET_SIZES {
        let subtree = increasing_subtree(&mut builder, &sizes);
        builder.add_child(root, subtree);
    }
    builder.build()
}

fn increasing_subtree(builder: &mut GraphBuilder, sizes: &[usize]) -> usize {
    let root = builder.add_node();
    for &size in sizes {
        let branch = builder.add_node();
        builder.add_child(root, branch);
        for _ in 0..size {
            let leaf = builder.add_node();
            builder.add_child(branch, leaf);
        }
    }
    root
}

fn complete_tree_builder(arity: usize, levels: usize) -> GraphBuilder {
    let count = complete_tree_node_count(arity, levels);
    let mut builder = GraphBuilder::with_capacity(count);
    for _ in 0..count {
        builder.add_node();
    }
    for child in 1..count {
        builder.add_child((child - 1) / arity, child);
    }
    builder
}

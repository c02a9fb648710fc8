use crate::error::GraphError;
use crate::geometry::ORIGIN;

use super::storage::{Graph, LinkTable, NodeTable};

pub const DEFAULT_NODE_COLOR: u32 = 0xd9_e4_f0;
pub const DEFAULT_TREE_LINK_COLOR: u32 = 0x6f_8a_a8;
pub const DEFAULT_NONTREE_LINK_COLOR: u32 = 0xd0_7a_4e;

#[derive(Default)]
pub struct GraphBuilder {
    labels: Vec<String>,
    colors: Vec<u32>,
    tree_links: Vec<(u32, u32)>,
    nontree_links: Vec<(u32, u32)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            labels: Vec::with_capacity(nodes),
            colors: Vec::with_capacity(nodes),
            tree_links: Vec::with_capacity(nodes.saturating_sub(1)),
            nontree_links: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn add_node(&mut self) -> usize {
        let node = self.labels.len();
        self.add_labeled_node(node.to_string(), DEFAULT_NODE_COLOR)
    }

    pub fn add_labeled_node(&mut self, label: String, color: u32) -> usize {
        self.labels.push(label);
        self.colors.push(color);
        self.labels.len() - 1
    }

    pub fn add_child(&mut self, parent: usize, child: usize) {
        self.tree_links.push((parent as u32, child as u32));
    }

    pub fn add_nontree_link(&mut self, source: usize, target: usize) {
        self.nontree_links.push((source as u32, target as u32));
    }

    pub fn build(mut self) -> Result<Graph, GraphError> {
        let count = self.labels.len();
        if count == 0 {
            return Err(GraphError::Empty);
        }
        if count >= u32::MAX as usize {
            return Err(GraphError::TooLarge(count));
        }

        for &(source, target) in self.tree_links.iter().chain(&self.nontree_links) {
            for node in [source, target] {
                if node as usize >= count {
                    return Err(GraphError::NodeOutOfRange {
                        node: node as usize,
                        count,
                    });
                }
            }
            if source == target {
                return Err(GraphError::SelfLink(source as usize));
            }
        }

        let mut parent = vec![None::<u32>; count];
        for &(source, target) in &self.tree_links {
            if let Some(existing) = parent[target as usize] {
                return Err(GraphError::DuplicateParent {
                    child: target as usize,
                    parent: source as usize,
                    existing: existing as usize,
                });
            }
            parent[target as usize] = Some(source);
        }

        let roots = parent.iter().filter(|entry| entry.is_none()).count();
        if roots != 1 {
            return Err(GraphError::RootCount(roots));
        }
        let root = parent
            .iter()
            .position(Option::is_none)
            .ok_or(GraphError::RootCount(0))?;

        let reached = reachable_from(root, count, &self.tree_links);
        if reached != count {
            return Err(GraphError::Disconnected(count - reached));
        }

        self.tree_links.sort_unstable();
        self.tree_links.dedup();
        self.nontree_links.sort_unstable();
        self.nontree_links.dedup();

        let link_count = self.tree_links.len() + self.nontree_links.len();
        let mut links = LinkTable {
            source: Vec::with_capacity(link_count),
            destination: Vec::with_capacity(link_count),
            color: Vec::with_capacity(link_count),
        };
        let mut nodes = NodeTable {
            layout: vec![ORIGIN; count],
            parent_link: vec![None; count],
            tree_start: vec![0; count],
            nontree_start: vec![0; count],
            links_end: vec![0; count],
            color: self.colors,
            label: self.labels,
        };

        let mut tree_cursor = 0usize;
        let mut nontree_cursor = 0usize;
        for node in 0..count as u32 {
            nodes.tree_start[node as usize] = links.source.len() as u32;
            while let Some(&(source, child)) = self.tree_links.get(tree_cursor)
                && source == node
            {
                nodes.parent_link[child as usize] = Some(links.source.len() as u32);
                links.source.push(source);
                links.destination.push(child);
                links.color.push(DEFAULT_TREE_LINK_COLOR);
                tree_cursor += 1;
            }

            nodes.nontree_start[node as usize] = links.source.len() as u32;
            while let Some(&(source, target)) = self.nontree_links.get(nontree_cursor)
                && source == node
            {
                links.source.push(source);
                links.destination.push(target);
                links.color.push(DEFAULT_NONTREE_LINK_COLOR);
                nontree_cursor += 1;
            }
            nodes.links_end[node as usize] = links.source.len() as u32;
        }

        let tree_link_count = self.tree_links.len();
        Ok(Graph::from_tables(root, nodes, links, tree_link_count))
    }
}

fn reachable_from(root: usize, count: usize, tree_links: &[(u32, u32)]) -> usize {
    let mut children = vec![Vec::new(); count];
    for &(parent, child) in tree_links {
        children[parent as usize].push(child as usize);
    }

    let mut reached = 0usize;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        reached += 1;
        stack.extend(children[node].iter().copied());
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_graph() -> Graph {
        let mut builder = GraphBuilder::new();
        for _ in 0..5 {
            builder.add_node();
        }
        builder.add_child(0, 2);
        builder.add_child(0, 1);
        builder.add_child(1, 3);
        builder.add_child(1, 4);
        builder.add_nontree_link(3, 4);
        builder.add_nontree_link(0, 4);
        builder.build().expect("valid graph")
    }

    #[test]
    fn links_are_contiguous_per_node_with_tree_links_first() {
        let graph = small_graph();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.tree_link_count(), 4);
        assert_eq!(graph.nontree_link_count(), 2);
        assert_eq!(graph.root_node(), 0);

        let root_children = graph.children(0).collect::<Vec<_>>();
        assert_eq!(root_children, vec![1, 2]);
        assert_eq!(graph.node_nontree_index(0), graph.node_child_index(0) + 2);
        assert_eq!(graph.node_links_end_index(0), graph.node_nontree_index(0) + 1);

        let nontree = graph.node_nontree_index(3);
        assert_eq!(graph.link_destination(nontree), 4);
        assert!(!graph.is_tree_link(nontree));
        assert_eq!(graph.node_links_end_index(3), graph.node_child_index(4));
    }

    #[test]
    fn parents_follow_tree_links() {
        let graph = small_graph();
        assert_eq!(graph.node_parent(0), None);
        assert_eq!(graph.node_parent(3), Some(1));
        assert_eq!(graph.node_parent(2), Some(0));
        let link = graph.node_parent_link(4).expect("4 has a parent");
        assert!(graph.is_tree_link(link));
    }

    #[test]
    fn rejects_malformed_graphs() {
        assert!(matches!(GraphBuilder::new().build(), Err(GraphError::Empty)));

        let mut builder = GraphBuilder::new();
        builder.add_node();
        builder.add_node();
        builder.add_node();
        builder.add_child(0, 2);
        builder.add_child(1, 2);
        assert!(matches!(
            builder.build(),
            Err(GraphError::DuplicateParent { child: 2, .. })
        ));

        let mut builder = GraphBuilder::new();
        builder.add_node();
        builder.add_child(0, 7);
        assert!(matches!(
            builder.build(),
            Err(GraphError::NodeOutOfRange { node: 7, .. })
        ));

        let mut builder = GraphBuilder::new();
        builder.add_node();
        builder.add_node();
        assert!(matches!(builder.build(), Err(GraphError::RootCount(2))));

        let mut builder = GraphBuilder::new();
        for _ in 0..3 {
            builder.add_node();
        }
        builder.add_child(1, 2);
        builder.add_child(2, 1);
        assert!(matches!(builder.build(), Err(GraphError::Disconnected(2))));
    }
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::{DVec3, DVec4};

// Written by the transformer thread while the renderer and picker read. The
// element queue's lock orders each write before the element announcing it.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

struct TransformedPoint {
    x: AtomicF64,
    y: AtomicF64,
    z: AtomicF64,
    radius: AtomicF64,
}

impl TransformedPoint {
    fn from_layout(p: DVec4) -> Self {
        Self {
            x: AtomicF64::new(p.x / p.w),
            y: AtomicF64::new(p.y / p.w),
            z: AtomicF64::new(p.z / p.w),
            radius: AtomicF64::new(0.0),
        }
    }

    fn store(&self, p: DVec4) {
        self.x.store(p.x / p.w);
        self.y.store(p.y / p.w);
        self.z.store(p.z / p.w);
    }
}

pub(super) struct NodeTable {
    pub(super) layout: Vec<DVec4>,
    pub(super) parent_link: Vec<Option<u32>>,
    pub(super) tree_start: Vec<u32>,
    pub(super) nontree_start: Vec<u32>,
    pub(super) links_end: Vec<u32>,
    pub(super) color: Vec<u32>,
    pub(super) label: Vec<String>,
}

pub(super) struct LinkTable {
    pub(super) source: Vec<u32>,
    pub(super) destination: Vec<u32>,
    pub(super) color: Vec<u32>,
}

pub struct Graph {
    root: usize,
    nodes: NodeTable,
    links: LinkTable,
    tree_link_count: usize,
    nontree_link_count: usize,
    transformed: Vec<TransformedPoint>,
    node_visible: Vec<AtomicBool>,
    link_visible: Vec<AtomicBool>,
}

impl Graph {
    pub(super) fn from_tables(
        root: usize,
        nodes: NodeTable,
        links: LinkTable,
        tree_link_count: usize,
    ) -> Self {
        let node_count = nodes.layout.len();
        let link_count = links.source.len();
        let transformed = nodes
            .layout
            .iter()
            .copied()
            .map(TransformedPoint::from_layout)
            .collect();

        Self {
            root,
            nodes,
            links,
            tree_link_count,
            nontree_link_count: link_count - tree_link_count,
            transformed,
            node_visible: (0..node_count).map(|_| AtomicBool::new(true)).collect(),
            link_visible: (0..link_count).map(|_| AtomicBool::new(true)).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.layout.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.source.len()
    }

    pub fn tree_link_count(&self) -> usize {
        self.tree_link_count
    }

    pub fn nontree_link_count(&self) -> usize {
        self.nontree_link_count
    }

    pub fn root_node(&self) -> usize {
        self.root
    }

    pub fn node_parent(&self, node: usize) -> Option<usize> {
        self.node_parent_link(node).map(|link| self.link_source(link))
    }

    pub fn node_parent_link(&self, node: usize) -> Option<usize> {
        self.nodes.parent_link[node].map(|link| link as usize)
    }

    pub fn node_child_index(&self, node: usize) -> usize {
        self.nodes.tree_start[node] as usize
    }

    pub fn node_nontree_index(&self, node: usize) -> usize {
        self.nodes.nontree_start[node] as usize
    }

    pub fn node_links_end_index(&self, node: usize) -> usize {
        self.nodes.links_end[node] as usize
    }

    pub fn children(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        (self.node_child_index(node)..self.node_nontree_index(node))
            .map(|link| self.link_destination(link))
    }

    pub fn child_count(&self, node: usize) -> usize {
        self.node_nontree_index(node) - self.node_child_index(node)
    }

    pub fn link_source(&self, link: usize) -> usize {
        self.links.source[link] as usize
    }

    pub fn link_destination(&self, link: usize) -> usize {
        self.links.destination[link] as usize
    }

    pub fn is_tree_link(&self, link: usize) -> bool {
        let source = self.link_source(link);
        link < self.node_nontree_index(source)
    }

    pub fn node_color(&self, node: usize) -> u32 {
        self.nodes.color[node]
    }

    pub fn link_color(&self, link: usize) -> u32 {
        self.links.color[link]
    }

    pub fn node_label(&self, node: usize) -> &str {
        &self.nodes.label[node]
    }

    pub fn labels(&self) -> impl Iterator<Item = (usize, &str)> {
        self.nodes
            .label
            .iter()
            .enumerate()
            .map(|(node, label)| (node, label.as_str()))
    }

    pub fn node_layout_coordinates(&self, node: usize) -> DVec4 {
        self.nodes.layout[node]
    }

    pub fn set_layout_coordinates(&mut self, layout: Vec<DVec4>) {
        assert_eq!(
            layout.len(),
            self.node_count(),
            "layout must cover every node"
        );
        for (point, p) in self.transformed.iter().zip(&layout) {
            point.store(*p);
        }
        self.nodes.layout = layout;
    }

    pub fn node_coordinates(&self, node: usize) -> DVec3 {
        let point = &self.transformed[node];
        DVec3::new(point.x.load(), point.y.load(), point.z.load())
    }

    pub fn node_coordinates4(&self, node: usize) -> DVec4 {
        self.node_coordinates(node).extend(1.0)
    }

    pub fn set_node_coordinates(&self, node: usize, p: DVec4) {
        self.transformed[node].store(p);
    }

    pub fn node_radius(&self, node: usize) -> f64 {
        self.transformed[node].radius.load()
    }

    pub fn set_node_radius(&self, node: usize, radius: f64) {
        self.transformed[node].radius.store(radius);
    }

    pub fn check_node_visible(&self, node: usize) -> bool {
        self.node_visible[node].load(Ordering::Relaxed)
    }

    pub fn set_node_visible(&self, node: usize, visible: bool) {
        self.node_visible[node].store(visible, Ordering::Relaxed);
    }

    pub fn check_link_visible(&self, link: usize) -> bool {
        self.link_visible[link].load(Ordering::Relaxed)
    }

    pub fn set_link_visible(&self, link: usize, visible: bool) {
        self.link_visible[link].store(visible, Ordering::Relaxed);
    }
}

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use glam::{DMat4, DVec4};
use tracing::{debug, info, trace, warn};

use crate::geometry::visual_radius;
use crate::graph::Graph;

use super::element::GraphElement;
use super::frontier::PriorityFrontier;
use super::queue::ElementQueue;
use super::rendezvous::Rendezvous;

const ELEMENTS_PER_SLICE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TraversalState {
    Idle,
    Node,
    ChildLink,
    NontreeLink,
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraversalPosition {
    pub starting_node: usize,
    pub transform: DMat4,
}

struct Traversal {
    graph: Arc<Graph>,
    queue: Arc<ElementQueue>,
    nontree_links: bool,
    state: TraversalState,
    frontier: PriorityFrontier,
    epoch: u32,
    visited: Vec<u32>,
    transform: DMat4,
    starting_node: usize,
    starting_radius: f64,
    saved: Vec<TraversalPosition>,
    current_index: usize,
    nontree_index: usize,
    links_end: usize,
    batch: Vec<u64>,
}

impl Traversal {
    fn new(graph: Arc<Graph>, queue: Arc<ElementQueue>, nontree_links: bool) -> Self {
        let count = graph.node_count();
        let root = graph.root_node();
        Self {
            graph,
            queue,
            nontree_links,
            state: TraversalState::Idle,
            frontier: PriorityFrontier::new(count),
            epoch: 0,
            visited: vec![0; count],
            transform: DMat4::IDENTITY,
            starting_node: root,
            starting_radius: 0.0,
            saved: Vec::new(),
            current_index: 0,
            nontree_index: 0,
            links_end: 0,
            batch: Vec::with_capacity(ELEMENTS_PER_SLICE),
        }
    }

    fn begin_epoch(&mut self) {
        if self.epoch == u32::MAX {
            self.visited.fill(0);
            self.epoch = 0;
        }
        self.epoch += 1;
        self.queue.clear();
        self.frontier.clear();
        self.batch.clear();

        let start = self.starting_node;
        self.mark_visited(start);
        self.starting_radius = self.transform_and_enqueue(start);
        self.state = TraversalState::Node;
        debug!(
            epoch = self.epoch,
            starting_node = start,
            radius = self.starting_radius,
            "traversal epoch started"
        );
    }

    fn transform(&mut self, matrix: DMat4) {
        self.transform = matrix * self.transform;
        self.begin_epoch();
    }

    fn reinstate(&mut self, position: TraversalPosition) {
        self.starting_node = position.starting_node;
        self.transform = position.transform;
        self.begin_epoch();
    }

    fn position(&self) -> TraversalPosition {
        TraversalPosition {
            starting_node: self.starting_node,
            transform: self.transform,
        }
    }

    // Returns true if the node had already been visited this epoch.
    fn mark_visited(&mut self, node: usize) -> bool {
        let seen = self.visited[node] == self.epoch;
        self.visited[node] = self.epoch;
        seen
    }

    fn transform_node(&self, node: usize) -> DVec4 {
        self.transform * self.graph.node_layout_coordinates(node)
    }

    fn transform_and_enqueue(&mut self, node: usize) -> f64 {
        let p = self.transform_node(node);
        let radius = visual_radius(p);
        self.graph.set_node_radius(node, radius);
        self.graph.set_node_coordinates(node, p);
        self.frontier.enqueue(node, radius);
        radius
    }

    fn enqueue_if_unvisited(&mut self, node: usize) {
        if !self.mark_visited(node) {
            self.transform_and_enqueue(node);
        }
    }

    fn emit(&mut self, element: GraphElement) {
        self.batch.push(element.pack());
    }

    fn run_slice(&mut self) {
        while self.state != TraversalState::Idle && self.batch.len() < ELEMENTS_PER_SLICE {
            match self.state {
                TraversalState::Node => self.visit_node(),
                TraversalState::ChildLink => self.visit_child_link(),
                TraversalState::NontreeLink => self.visit_nontree_link(),
                state => panic!("traversal slice entered in {state:?} state"),
            }
        }
    }

    fn visit_node(&mut self) {
        if self.frontier.is_empty() {
            self.state = TraversalState::Idle;
            return;
        }

        let node = self.frontier.dequeue();
        self.emit(GraphElement::Node(node));

        let radius = self.graph.node_radius(node);
        if radius > self.starting_radius {
            self.starting_node = node;
            self.starting_radius = radius;
        }

        if let Some(parent) = self.graph.node_parent(node) {
            self.enqueue_if_unvisited(parent);
        }

        let child_index = self.graph.node_child_index(node);
        self.nontree_index = self.graph.node_nontree_index(node);
        self.links_end = self.graph.node_links_end_index(node);
        self.current_index = child_index;
        if child_index < self.nontree_index {
            self.state = TraversalState::ChildLink;
        } else {
            self.enter_nontree_links();
        }
    }

    fn visit_child_link(&mut self) {
        let link = self.current_index;
        self.emit(GraphElement::TreeLink(link));
        self.enqueue_if_unvisited(self.graph.link_destination(link));

        self.current_index += 1;
        if self.current_index == self.nontree_index {
            self.enter_nontree_links();
        }
    }

    fn visit_nontree_link(&mut self) {
        let link = self.current_index;
        self.emit(GraphElement::NontreeLink(link));
        self.enqueue_if_unvisited(self.graph.link_destination(link));

        self.current_index += 1;
        if self.current_index == self.links_end {
            self.state = TraversalState::Node;
        }
    }

    fn enter_nontree_links(&mut self) {
        self.state = if self.nontree_links && self.nontree_index < self.links_end {
            self.current_index = self.nontree_index;
            TraversalState::NontreeLink
        } else {
            TraversalState::Node
        };
    }
}

// Streams the graph's elements into the queue in order of visual radius under
// the cumulative transform, one epoch per transform command.
pub struct Transformer {
    graph: Arc<Graph>,
    traversal: Rendezvous<Traversal>,
}

impl Transformer {
    pub fn new(graph: Arc<Graph>, queue: Arc<ElementQueue>, nontree_links: bool) -> Self {
        let traversal = Traversal::new(Arc::clone(&graph), queue, nontree_links);
        Self {
            graph,
            traversal: Rendezvous::new(traversal),
        }
    }

    pub fn spawn(self: &Arc<Self>) -> io::Result<JoinHandle<()>> {
        let transformer = Arc::clone(self);
        thread::Builder::new()
            .name("hyperview-transformer".to_string())
            .spawn(move || transformer.run())
    }

    pub fn transform(&self, matrix: DMat4) {
        self.traversal.request(|traversal| traversal.transform(matrix));
    }

    pub fn transform_node(&self, node: usize) -> DVec4 {
        self.traversal.with(|traversal| traversal.transform_node(node))
    }

    pub fn push_position(&self) {
        self.traversal.with(|traversal| {
            let position = traversal.position();
            traversal.saved.push(position);
        });
    }

    pub fn pop_position(&self) {
        self.traversal.request(|traversal| match traversal.saved.pop() {
            Some(position) => traversal.reinstate(position),
            None => warn!("pop_position with no saved position"),
        });
    }

    pub fn discard_position(&self) {
        self.traversal.with(|traversal| {
            if traversal.saved.pop().is_none() {
                warn!("discard_position with no saved position");
            }
        });
    }

    pub fn position(&self) -> TraversalPosition {
        self.traversal.with(|traversal| traversal.position())
    }

    pub fn set_position(&self, position: TraversalPosition) {
        if position.starting_node >= self.graph.node_count() {
            warn!(node = position.starting_node, "ignoring position outside the graph");
            return;
        }
        self.traversal.request(|traversal| traversal.reinstate(position));
    }

    #[cfg(test)]
    pub fn epoch(&self) -> u32 {
        self.traversal.with(|traversal| traversal.epoch)
    }

    pub fn shutdown(&self) {
        self.traversal
            .request(|traversal| traversal.state = TraversalState::Shutdown);
    }

    fn run(&self) {
        info!(nodes = self.graph.node_count(), "transformer started");
        let mut traversal = self.traversal.worker();
        traversal.begin_epoch();

        loop {
            if traversal.state == TraversalState::Idle || traversal.has_pending() {
                traversal.serve_pending();
                while traversal.state == TraversalState::Idle {
                    traversal.wait_for_request();
                    traversal.serve_pending();
                }
            }
            if traversal.state == TraversalState::Shutdown {
                break;
            }

            traversal.run_slice();
            let emitted = traversal.batch.len();
            if emitted > 0 {
                traversal.queue.add(&traversal.batch);
                traversal.batch.clear();
            }
            trace!(epoch = traversal.epoch, emitted, "traversal slice");
            traversal.yield_to_callers();

            if traversal.state == TraversalState::Idle {
                traversal.queue.end();
                debug!(
                    epoch = traversal.epoch,
                    elements = traversal.queue.len(),
                    next_start = traversal.starting_node,
                    "traversal epoch complete"
                );
            }
        }

        traversal.close();
        info!("transformer exiting");
    }
}

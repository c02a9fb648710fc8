use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::graph::Graph;

use super::canvas::{Canvas, LinkKind, NodeSize, Primitive};
use super::element::GraphElement;
use super::queue::ElementQueue;

const ELEMENTS_PER_BATCH: usize = 25;

// Draws queued elements onto a canvas, a bounded amount per call.
pub trait IncrementalRenderer: Send {
    fn reset(&mut self);
    fn set_max_duration(&mut self, max: Duration);
    // Redraws everything displayed so far, then continues within budget.
    fn render(&mut self, canvas: &mut dyn Canvas);
    // Draws only the next increment and flushes it.
    fn refine(&mut self, canvas: &mut dyn Canvas);
    fn is_finished(&self) -> bool;
}

pub struct LineRenderer {
    graph: Arc<Graph>,
    queue: Arc<ElementQueue>,
    displayed: usize,
    max_duration: Duration,
}

impl LineRenderer {
    pub fn new(graph: Arc<Graph>, queue: Arc<ElementQueue>) -> Self {
        Self {
            graph,
            queue,
            displayed: 0,
            max_duration: Duration::MAX,
        }
    }

    #[cfg(test)]
    pub fn displayed(&self) -> usize {
        self.displayed
    }

    // Returns false once the queue reports the epoch ended before `count`
    // more elements arrived.
    fn draw_elements(&mut self, start: usize, count: usize, canvas: &mut dyn Canvas) -> bool {
        self.displayed = start;
        for _ in 0..count {
            let Some(element) = self.queue.get(self.displayed) else {
                return false;
            };
            self.displayed += 1;
            self.draw_element(element, canvas);
        }
        true
    }

    fn draw_element(&self, element: GraphElement, canvas: &mut dyn Canvas) {
        let graph = &*self.graph;
        match element {
            GraphElement::Node(node) => {
                if !graph.check_node_visible(node) {
                    return;
                }
                canvas.draw(Primitive::Node {
                    node,
                    at: graph.node_coordinates(node),
                    size: NodeSize::from_radius(graph.node_radius(node)),
                    color: graph.node_color(node),
                });
            }
            GraphElement::TreeLink(link) => self.draw_link(link, LinkKind::Tree, canvas),
            GraphElement::NontreeLink(link) => self.draw_link(link, LinkKind::Nontree, canvas),
        }
    }

    fn draw_link(&self, link: usize, kind: LinkKind, canvas: &mut dyn Canvas) {
        let graph = &*self.graph;
        if !graph.check_link_visible(link) {
            return;
        }
        canvas.draw(Primitive::Link {
            from: graph.node_coordinates(graph.link_source(link)),
            to: graph.node_coordinates(graph.link_destination(link)),
            kind,
            color: graph.link_color(link),
        });
    }

    fn within_budget(&self, start: Instant) -> bool {
        start.elapsed() < self.max_duration
    }
}

impl IncrementalRenderer for LineRenderer {
    fn reset(&mut self) {
        self.displayed = 0;
    }

    fn set_max_duration(&mut self, max: Duration) {
        self.max_duration = max;
    }

    fn render(&mut self, canvas: &mut dyn Canvas) {
        let start = Instant::now();
        let redraw = self.displayed;
        let mut more = self.draw_elements(0, redraw, canvas);
        while more && self.within_budget(start) {
            more = self.draw_elements(self.displayed, ELEMENTS_PER_BATCH, canvas);
        }
        trace!(displayed = self.displayed, redraw, "render pass");
    }

    fn refine(&mut self, canvas: &mut dyn Canvas) {
        let start = Instant::now();
        let first = self.displayed;
        let mut more = true;
        while more && self.within_budget(start) {
            more = self.draw_elements(self.displayed, ELEMENTS_PER_BATCH, canvas);
        }
        canvas.flush();
        trace!(from = first, to = self.displayed, "refine pass");
    }

    fn is_finished(&self) -> bool {
        let (len, complete) = self.queue.snapshot();
        complete && self.displayed == len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::complete_tree;

    #[derive(Default)]
    struct Recording {
        drawn: Vec<Primitive>,
        flushes: usize,
    }

    impl Canvas for Recording {
        fn clear(&mut self) {
            self.drawn.clear();
        }

        fn set_model_transform(&mut self, _model: glam::DMat4) {}

        fn draw(&mut self, primitive: Primitive) {
            self.drawn.push(primitive);
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }

        fn swap(&mut self) {}
    }

    fn filled_queue(graph: &Graph, elements: &[GraphElement]) -> Arc<ElementQueue> {
        let queue = Arc::new(ElementQueue::new(graph.node_count() + graph.link_count()));
        let packed = elements.iter().map(|e| e.pack()).collect::<Vec<_>>();
        queue.add(&packed);
        queue
    }

    #[test]
    fn refine_draws_the_increment_and_finishes_with_the_epoch() {
        let graph = Arc::new(complete_tree(2, 3).expect("valid tree"));
        let queue = filled_queue(
            &graph,
            &[
                GraphElement::Node(0),
                GraphElement::TreeLink(0),
                GraphElement::TreeLink(1),
            ],
        );
        let mut renderer = LineRenderer::new(Arc::clone(&graph), Arc::clone(&queue));
        let mut canvas = Recording::default();

        queue.end();
        renderer.refine(&mut canvas);
        assert_eq!(renderer.displayed(), 3);
        assert_eq!(canvas.drawn.len(), 3);
        assert_eq!(canvas.flushes, 1);
        assert!(renderer.is_finished());
        assert!(matches!(
            canvas.drawn[1],
            Primitive::Link {
                kind: LinkKind::Tree,
                ..
            }
        ));
    }

    #[test]
    fn render_redraws_what_was_already_displayed() {
        let graph = Arc::new(complete_tree(2, 3).expect("valid tree"));
        let queue = filled_queue(&graph, &[GraphElement::Node(0), GraphElement::Node(1)]);
        queue.end();
        let mut renderer = LineRenderer::new(Arc::clone(&graph), queue);
        let mut canvas = Recording::default();

        renderer.refine(&mut canvas);
        canvas.clear();
        renderer.render(&mut canvas);
        assert_eq!(canvas.drawn.len(), 2);

        renderer.reset();
        assert!(!renderer.is_finished());
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let graph = Arc::new(complete_tree(2, 2).expect("valid tree"));
        graph.set_node_visible(1, false);
        let queue = filled_queue(
            &graph,
            &[GraphElement::Node(0), GraphElement::Node(1), GraphElement::Node(2)],
        );
        queue.end();
        let mut renderer = LineRenderer::new(graph, queue);
        let mut canvas = Recording::default();
        renderer.refine(&mut canvas);
        assert_eq!(canvas.drawn.len(), 2);
        assert!(renderer.is_finished());
    }

    #[test]
    fn an_unbounded_refine_waits_for_the_producer() {
        let graph = Arc::new(complete_tree(2, 2).expect("valid tree"));
        let queue = Arc::new(ElementQueue::new(5));
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for node in 0..3 {
                    std::thread::sleep(Duration::from_millis(5));
                    queue.add(&[GraphElement::Node(node).pack()]);
                }
                queue.end();
            })
        };
        let mut renderer = LineRenderer::new(graph, Arc::clone(&queue));
        let mut canvas = Recording::default();
        renderer.refine(&mut canvas);
        producer.join().expect("producer thread");
        assert_eq!(renderer.displayed(), 3);
        assert!(renderer.is_finished());
    }
}

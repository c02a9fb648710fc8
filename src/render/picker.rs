use std::sync::Arc;

use glam::{DMat4, DVec2, DVec3};
use tracing::debug;

use crate::graph::Graph;

use super::canvas::{Canvas, Primitive};
use super::element::GraphElement;
use super::queue::ElementQueue;
use super::view::{EYE_DISTANCE, ViewParameters, perspective};

// Picks among the nodes streamed so far. Eye-space points are cached
// incrementally as the queue grows and dropped whenever the camera moves.
pub struct AdaptivePicker {
    graph: Arc<Graph>,
    queue: Arc<ElementQueue>,
    examined: usize,
    nodes: Vec<usize>,
    points: Vec<DVec3>,
    scratch: Vec<GraphElement>,
}

impl AdaptivePicker {
    pub fn new(graph: Arc<Graph>, queue: Arc<ElementQueue>) -> Self {
        let capacity = graph.node_count();
        Self {
            graph,
            queue,
            examined: 0,
            nodes: Vec::with_capacity(capacity),
            points: Vec::with_capacity(capacity),
            scratch: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.examined = 0;
        self.nodes.clear();
        self.points.clear();
    }

    fn compute_points_in_eye(&mut self, view: &ViewParameters) {
        let len = self.queue.len();
        if len < self.examined {
            self.reset();
        }
        if self.examined == len {
            return;
        }

        self.scratch.clear();
        self.queue.read_available(self.examined, len, &mut self.scratch);
        for element in &self.scratch {
            if let GraphElement::Node(node) = *element {
                self.nodes.push(node);
                self.points.push(view.to_eye(self.graph.node_coordinates(node)));
            }
        }
        self.examined += self.scratch.len();
    }

    // Any node within the pick radius is a candidate and the one closest on
    // screen wins, except that nodes inside the equivalence radius beat
    // every other candidate and are ranked by distance to the eye.
    pub fn pick_node(&mut self, view: &ViewParameters, pixel: DVec2) -> Option<(usize, DVec2)> {
        self.compute_points_in_eye(view);

        let target = view.viewport().from_screen(pixel);
        let pick_sq = view.pick_radius().powi(2);
        let equivalence_sq = view.pick_equivalence_radius().powi(2);

        let mut closest = None;
        let mut closest_pick_sq = f64::MAX;
        let mut closest_eye_sq = f64::MAX;
        for (index, p) in self.points.iter().enumerate() {
            let center_sq = (target - perspective(*p)).length_squared();
            if center_sq >= pick_sq {
                continue;
            }
            if center_sq < equivalence_sq {
                let z0 = EYE_DISTANCE - p.z;
                let eye_sq = p.x * p.x + p.y * p.y + z0 * z0;
                if eye_sq < closest_eye_sq {
                    closest = Some(index);
                    closest_eye_sq = eye_sq;
                    closest_pick_sq = 0.0;
                }
            } else if center_sq < closest_pick_sq {
                closest = Some(index);
                closest_pick_sq = center_sq;
            }
        }

        closest.map(|index| {
            let center = view.viewport().to_screen(perspective(self.points[index]));
            (self.nodes[index], center)
        })
    }

    pub fn highlight_at(
        &mut self,
        view: &ViewParameters,
        canvas: &mut dyn Canvas,
        pixel: DVec2,
    ) -> Option<usize> {
        let picked = self.pick_node(view, pixel).map(|(node, _)| node);
        match picked {
            Some(node) => self.highlight_node(view.object_transform(), canvas, node),
            None => debug!(x = pixel.x, y = pixel.y, "no node under the cursor"),
        }
        picked
    }

    pub fn highlight_node(&self, model: DMat4, canvas: &mut dyn Canvas, node: usize) {
        canvas.set_model_transform(model);
        canvas.draw(Primitive::Highlight {
            node,
            at: self.graph.node_coordinates(node),
        });
        canvas.flush();
    }
}

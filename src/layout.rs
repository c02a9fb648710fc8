use std::f64::consts::{PI, TAU};

use glam::{DMat4, DVec3, DVec4};

use crate::geometry::{ORIGIN, rotation_from_x, translation_along_x};
use crate::graph::Graph;
use crate::util::stable_jitter;

const GOLDEN_ANGLE: f64 = PI * 0.763_932_022_500_210_3;
const BASE_DISTANCE: f64 = 0.55;
const SUBTREE_DISTANCE_SCALE: f64 = 0.32;
const AZIMUTH_JITTER: f64 = 0.25;
// The root spreads children over the whole sphere; everyone else uses the
// hemisphere facing away from its parent.
const ROOT_CAP: f64 = PI;
const CHILD_CAP: f64 = PI * 0.5;

pub fn cone_layout(graph: &Graph) -> Vec<DVec4> {
    let count = graph.node_count();
    let root = graph.root_node();
    let order = preorder(graph);
    let sizes = subtree_sizes(graph, &order);

    let mut frames = vec![DMat4::IDENTITY; count];
    let mut layout = vec![ORIGIN; count];
    let mut children = Vec::new();

    for &node in &order {
        children.clear();
        children.extend(graph.children(node));
        children.sort_by(|a, b| sizes[*b].cmp(&sizes[*a]).then(a.cmp(b)));

        let cap = if node == root { ROOT_CAP } else { CHILD_CAP };
        let frame = frames[node];
        for (index, &child) in children.iter().enumerate() {
            let direction = spiral_direction(index, children.len(), cap, child);
            let distance = BASE_DISTANCE + SUBTREE_DISTANCE_SCALE * (sizes[child] as f64).ln_1p();
            let child_frame = frame * rotation_from_x(direction) * translation_along_x(distance);
            frames[child] = child_frame;
            layout[child] = normalize(child_frame * ORIGIN);
        }
    }

    layout
}

fn preorder(graph: &Graph) -> Vec<usize> {
    let mut order = Vec::with_capacity(graph.node_count());
    let mut stack = vec![graph.root_node()];
    while let Some(node) = stack.pop() {
        order.push(node);
        stack.extend(graph.children(node));
    }
    order
}

fn subtree_sizes(graph: &Graph, order: &[usize]) -> Vec<usize> {
    let mut sizes = vec![1usize; graph.node_count()];
    for &node in order.iter().rev() {
        if let Some(parent) = graph.node_parent(node) {
            sizes[parent] += sizes[node];
        }
    }
    sizes
}

fn spiral_direction(index: usize, count: usize, cap: f64, node: usize) -> DVec3 {
    if count == 1 {
        return DVec3::X;
    }

    let t = (index as f64 + 0.5) / count as f64;
    let polar = (1.0 - t * (1.0 - cap.cos())).clamp(-1.0, 1.0).acos();
    let (jitter, _) = stable_jitter(node);
    let azimuth = (index as f64 * GOLDEN_ANGLE + jitter * AZIMUTH_JITTER) % TAU;

    DVec3::new(
        polar.cos(),
        polar.sin() * azimuth.cos(),
        polar.sin() * azimuth.sin(),
    )
}

fn normalize(p: DVec4) -> DVec4 {
    if p.w < 0.0 { -p } else { p }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{is_inside_ball, project};
    use crate::graph::{complete_tree, ternary_tree_set};

    #[test]
    fn every_node_lands_inside_the_ball() {
        for graph in [complete_tree(3, 6), ternary_tree_set()] {
            let graph = graph.expect("valid graph");
            let layout = cone_layout(&graph);
            assert_eq!(layout.len(), graph.node_count());
            for p in layout {
                assert!(p.w > 0.0);
                assert!(is_inside_ball(p), "{p:?} escaped the ball");
            }
        }
    }

    #[test]
    fn root_sits_at_the_origin_and_children_are_spread() {
        let graph = complete_tree(4, 2).expect("valid tree");
        let layout = cone_layout(&graph);
        assert_eq!(layout[graph.root_node()], ORIGIN);

        let points = graph
            .children(graph.root_node())
            .map(|child| project(layout[child]))
            .collect::<Vec<_>>();
        for (i, a) in points.iter().enumerate() {
            assert!(a.length() > 0.1);
            for b in &points[i + 1..] {
                assert!(a.distance(*b) > 1.0e-3);
            }
        }
    }
}

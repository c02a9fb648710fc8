use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::{DMat4, DVec2, DVec4};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::geometry::{ORIGIN, translation, vector_length};
use crate::graph::Graph;

use super::canvas::Canvas;
use super::picker::AdaptivePicker;
use super::position::DisplayPosition;
use super::queue::ElementQueue;
use super::renderer::IncrementalRenderer;
use super::rendezvous::{Rendezvous, WorkerTurn};
use super::rotation::RotationRequest;
use super::transformer::{TraversalPosition, Transformer};
use super::view::{ViewParameters, Viewport};

const TRANSLATION_STEP_DISTANCE: f64 = 0.05;
const TRANSLATION_MIN_DELTA: f64 = 0.01;
const TRANSLATION_THRESHOLD: f64 = 1.0 - TRANSLATION_STEP_DISTANCE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Shutdown,
    Idle,
    Rotate,
    Translate,
    Refresh,
    CompleteInit,
    Complete,
}

impl RenderState {
    fn accepts_commands(self) -> bool {
        matches!(self, Self::Idle | Self::Complete)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderBudgets {
    pub rotation: Duration,
    pub translation: Duration,
    pub completion: Duration,
}

struct LoopState {
    state: RenderState,
    rotation: Option<Arc<dyn RotationRequest>>,
    translation_node: usize,
    restore_requested: bool,
    display_position: Option<DisplayPosition>,
    budgets: RenderBudgets,
    view: ViewParameters,
    picker: AdaptivePicker,
    exited: bool,
}

type Turn<'a> = WorkerTurn<'a, LoopState>;

// Drives the display from its own thread. Commands from any thread are
// applied one at a time at the loop's rendezvous points and return once
// applied.
pub struct RenderLoop {
    graph: Arc<Graph>,
    transformer: Arc<Transformer>,
    canvas: Mutex<Box<dyn Canvas>>,
    shared: Rendezvous<LoopState>,
}

impl RenderLoop {
    pub fn new(
        graph: Arc<Graph>,
        transformer: Arc<Transformer>,
        queue: Arc<ElementQueue>,
        canvas: Box<dyn Canvas>,
        budgets: RenderBudgets,
    ) -> Self {
        let picker = AdaptivePicker::new(Arc::clone(&graph), queue);
        Self {
            graph,
            transformer,
            canvas: Mutex::new(canvas),
            shared: Rendezvous::new(LoopState {
                state: RenderState::Idle,
                rotation: None,
                translation_node: 0,
                restore_requested: false,
                display_position: None,
                budgets,
                view: ViewParameters::new(Viewport::default()),
                picker,
                exited: false,
            }),
        }
    }

    pub fn spawn(
        self: &Arc<Self>,
        renderer: Box<dyn IncrementalRenderer>,
    ) -> io::Result<JoinHandle<()>> {
        let render_loop = Arc::clone(self);
        thread::Builder::new()
            .name("hyperview-render-loop".to_string())
            .spawn(move || render_loop.run(renderer))
    }

    pub fn state(&self) -> RenderState {
        self.shared.with(|shared| shared.state)
    }

    pub fn synchronize_with_rendering(&self) {
        self.shared.request(|_| ());
    }

    pub fn refresh_display(&self) {
        self.shared.request(|shared| {
            if shared.state.accepts_commands() {
                shared.state = RenderState::Refresh;
            }
        });
    }

    pub fn resize_display(&self, width: f64, height: f64) {
        self.shared.request(|shared| {
            shared.view.set_viewport(Viewport::new(width, height));
            shared.picker.reset();
        });
    }

    pub fn rotate_display(&self, request: Arc<dyn RotationRequest>) {
        self.shared.request(|shared| {
            if shared.state == RenderState::Shutdown {
                return;
            }
            shared.picker.reset();
            shared.rotation = Some(request);
            shared.state = RenderState::Rotate;
        });
    }

    pub fn translate(&self, node: usize) {
        if node >= self.graph.node_count() {
            warn!(node, "ignoring translation to a node outside the graph");
            return;
        }
        self.shared.request(|shared| {
            if shared.state == RenderState::Shutdown {
                return;
            }
            shared.picker.reset();
            shared.translation_node = node;
            shared.state = RenderState::Translate;
        });
    }

    // Returns the picked node and its centre in viewport pixels.
    pub fn pick_node(&self, x: f64, y: f64) -> Option<(usize, DVec2)> {
        self.shared.request(|shared| {
            if !shared.state.accepts_commands() {
                return None;
            }
            shared.picker.pick_node(&shared.view, DVec2::new(x, y))
        })
    }

    pub fn highlight_node_at(&self, x: f64, y: f64) -> Option<usize> {
        self.shared.request(|shared| {
            if !shared.state.accepts_commands() {
                return None;
            }
            let mut canvas = self.canvas.lock();
            shared
                .picker
                .highlight_at(&shared.view, &mut **canvas, DVec2::new(x, y))
        })
    }

    pub fn highlight_node(&self, node: usize) {
        if node >= self.graph.node_count() {
            return;
        }
        self.shared.request(|shared| {
            if shared.state.accepts_commands() {
                let mut canvas = self.canvas.lock();
                shared
                    .picker
                    .highlight_node(shared.view.object_transform(), &mut **canvas, node);
            }
        });
    }

    pub fn save_display_position(&self) {
        self.shared.request(|shared| {
            shared.view.save_object_transform();
            self.transformer.push_position();
        });
    }

    pub fn discard_display_position(&self) {
        self.shared.request(|shared| {
            if !shared.restore_requested && shared.view.discard_object_transform() {
                self.transformer.discard_position();
            }
        });
    }

    pub fn restore_display_position(&self) {
        self.shared.request(|shared| shared.restore_requested = true);
    }

    pub fn saved_display_positions(&self) -> usize {
        self.shared.with(|shared| shared.view.saved_depth())
    }

    pub fn display_position(&self) -> DisplayPosition {
        self.shared.request(|shared| {
            let position = self.transformer.position();
            DisplayPosition::new(
                position.starting_node,
                shared.view.object_transform(),
                position.transform,
            )
        })
    }

    pub fn set_display_position(&self, position: DisplayPosition) {
        self.shared.request(|shared| {
            shared.display_position = Some(position);
            shared.restore_requested = true;
        });
    }

    pub fn set_max_rotation_duration(&self, max: Duration) {
        self.shared.request(|shared| shared.budgets.rotation = max);
    }

    pub fn set_max_translation_duration(&self, max: Duration) {
        self.shared.request(|shared| shared.budgets.translation = max);
    }

    pub fn set_max_completion_duration(&self, max: Duration) {
        self.shared.request(|shared| shared.budgets.completion = max);
    }

    #[cfg(test)]
    pub fn budgets(&self) -> RenderBudgets {
        self.shared.with(|shared| shared.budgets)
    }

    pub fn shutdown(&self) {
        self.shared
            .request(|shared| shared.state = RenderState::Shutdown);
    }

    pub fn wait_for_shutdown(&self) {
        while !self.shared.request(|shared| shared.exited) {}
    }

    fn run(&self, mut renderer: Box<dyn IncrementalRenderer>) {
        info!("render loop started");
        let renderer = renderer.as_mut();
        let mut turn = self.shared.worker();

        loop {
            let state = turn.state;
            debug!(?state, "render loop state");
            match state {
                RenderState::Shutdown => {
                    self.be_shutdown(&mut turn);
                    break;
                }
                RenderState::Idle => self.be_idle(&mut turn, renderer),
                RenderState::Rotate => self.be_rotate(&mut turn, renderer),
                RenderState::Translate => self.be_translate(&mut turn, renderer),
                RenderState::Refresh => self.be_refresh(&mut turn, renderer),
                RenderState::CompleteInit => self.be_complete_init(&mut turn),
                RenderState::Complete => self.be_complete(&mut turn, renderer),
            }
        }

        info!("render loop exiting");
    }

    fn be_shutdown(&self, turn: &mut Turn<'_>) {
        turn.rotation = None;
        turn.unlocked(|| self.transformer.shutdown());
        turn.exited = true;
        turn.close();
    }

    fn be_idle(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        while turn.state == RenderState::Idle {
            if turn.restore_requested {
                self.restore(turn, renderer);
            } else {
                turn.wait_for_request();
                turn.serve_pending();
            }
        }
    }

    fn restore(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        turn.restore_requested = false;
        turn.picker.reset();
        renderer.reset();

        match turn.display_position.take() {
            Some(position) => {
                turn.view.set_object_transform(position.rotation);
                self.transformer.set_position(TraversalPosition {
                    starting_node: position.center_node,
                    transform: position.translation,
                });
            }
            None => {
                if !turn.view.restore_object_transform() {
                    warn!("restore requested with no saved display position");
                    turn.state = RenderState::Refresh;
                    return;
                }
                self.transformer.pop_position();
            }
        }

        let model = turn.view.object_transform();
        turn.unlocked(|| self.clear_display(model));
        turn.state = RenderState::CompleteInit;
    }

    fn be_rotate(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        renderer.reset();
        renderer.set_max_duration(turn.budgets.rotation);

        if let Some(request) = turn.rotation.take() {
            let mut steps = 0usize;
            while let Some(rotation) = turn.unlocked(|| request.get_rotation()) {
                let model = turn.view.extend_object_transform(rotation);
                turn.unlocked(|| self.redraw(renderer, model));
                steps += 1;
            }
            debug!(steps, "rotation finished");
        }
        turn.state = RenderState::CompleteInit;
    }

    fn be_translate(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        renderer.reset();
        renderer.set_max_duration(turn.budgets.translation);

        let node = turn.translation_node;
        let model = turn.view.object_transform();
        turn.unlocked(|| self.translate_to_center(node, renderer, model));
        turn.state = RenderState::CompleteInit;
    }

    fn be_refresh(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        renderer.reset();
        let model = turn.view.object_transform();
        turn.unlocked(|| self.clear_display(model));
        turn.state = RenderState::Complete;
    }

    fn be_complete_init(&self, turn: &mut Turn<'_>) {
        let model = turn.view.object_transform();
        self.canvas.lock().set_model_transform(model);
        turn.state = RenderState::Complete;
    }

    fn be_complete(&self, turn: &mut Turn<'_>, renderer: &mut dyn IncrementalRenderer) {
        loop {
            turn.serve_pending();
            if turn.state == RenderState::Complete && renderer.is_finished() {
                debug!("display complete");
                turn.state = RenderState::Idle;
            }
            if turn.state != RenderState::Complete {
                break;
            }

            renderer.set_max_duration(turn.budgets.completion);
            turn.unlocked(|| {
                let mut canvas = self.canvas.lock();
                renderer.refine(&mut **canvas);
            });
        }
    }

    // Steps the node toward the origin, drawing after every step, then
    // replaces the accumulated steps with a single exact translation.
    fn translate_to_center(
        &self,
        node: usize,
        renderer: &mut dyn IncrementalRenderer,
        model: DMat4,
    ) {
        let mut source = self.graph.node_coordinates4(node);
        let initial = source;
        self.transformer.push_position();

        let mut steps = 0usize;
        loop {
            let step = translation_step(source);
            source = self.translate_step(node, source, step.unwrap_or(ORIGIN), renderer, model);
            steps += 1;
            if step.is_none() {
                break;
            }
        }

        self.transformer.pop_position();
        self.translate_step(node, initial, ORIGIN, renderer, model);
        debug!(node, steps, "translation finished");
    }

    fn translate_step(
        &self,
        node: usize,
        source: DVec4,
        destination: DVec4,
        renderer: &mut dyn IncrementalRenderer,
        model: DMat4,
    ) -> DVec4 {
        self.transformer.transform(translation(source, destination));
        let moved = self.transformer.transform_node(node);
        self.redraw(renderer, model);
        moved
    }

    fn redraw(&self, renderer: &mut dyn IncrementalRenderer, model: DMat4) {
        let mut canvas = self.canvas.lock();
        canvas.clear();
        canvas.set_model_transform(model);
        renderer.render(&mut **canvas);
        canvas.swap();
    }

    fn clear_display(&self, model: DMat4) {
        let mut canvas = self.canvas.lock();
        canvas.clear();
        canvas.set_model_transform(model);
        canvas.swap();
    }
}

// Next intermediate destination for a point on its way to the origin, or
// `None` once it is close enough to jump there.
fn translation_step(source: DVec4) -> Option<DVec4> {
    let length = vector_length(source);
    let delta = if length > TRANSLATION_THRESHOLD {
        TRANSLATION_MIN_DELTA.max(1.0 - length)
    } else if length > TRANSLATION_STEP_DISTANCE {
        TRANSLATION_STEP_DISTANCE
    } else {
        return None;
    };

    let mut destination = source;
    destination.w *= length / (length - delta);
    Some(destination)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Instant;

    use super::*;
    use crate::config::RenderConfig;
    use crate::geometry::rotation_y;
    use crate::graph::{GraphBuilder, complete_tree};
    use crate::layout::cone_layout;
    use crate::render::canvas::{DisplayList, Primitive, SharedFrame};
    use crate::render::rotation::InteractiveRotationRequest;
    use crate::render::RenderSession;

    const PATIENCE: Duration = Duration::from_secs(20);

    // Publishes into a display list, sleeping on every draw and flush.
    struct SlowCanvas {
        inner: DisplayList,
        delay: Duration,
    }

    impl Canvas for SlowCanvas {
        fn clear(&mut self) {
            self.inner.clear();
        }

        fn set_model_transform(&mut self, model: DMat4) {
            self.inner.set_model_transform(model);
        }

        fn draw(&mut self, primitive: Primitive) {
            thread::sleep(self.delay);
            self.inner.draw(primitive);
        }

        fn flush(&mut self) {
            thread::sleep(self.delay);
            self.inner.flush();
        }

        fn swap(&mut self) {
            self.inner.swap();
        }
    }

    fn star(positions: &[f64]) -> Arc<Graph> {
        let mut builder = GraphBuilder::new();
        let root = builder.add_node();
        for _ in positions {
            let child = builder.add_node();
            builder.add_child(root, child);
        }
        let mut graph = builder.build().expect("valid star");
        let mut layout = vec![ORIGIN];
        layout.extend(positions.iter().map(|&x| DVec4::new(x, 0.0, 0.0, 1.0)));
        graph.set_layout_coordinates(layout);
        Arc::new(graph)
    }

    fn laid_out_tree(arity: usize, levels: usize) -> Arc<Graph> {
        let mut graph = complete_tree(arity, levels).expect("valid tree");
        let layout = cone_layout(&graph);
        graph.set_layout_coordinates(layout);
        Arc::new(graph)
    }

    fn start(graph: Arc<Graph>, delay: Duration, config: RenderConfig) -> (RenderSession, SharedFrame) {
        let canvas = SlowCanvas {
            inner: DisplayList::new(),
            delay,
        };
        let frame = canvas.inner.frame();
        let session = RenderSession::start(graph, Box::new(canvas), &config).expect("start session");
        session.render_loop().resize_display(800.0, 600.0);
        (session, frame)
    }

    fn wait_for_state(render_loop: &RenderLoop, state: RenderState) {
        let started = Instant::now();
        while render_loop.state() != state {
            assert!(
                started.elapsed() < PATIENCE,
                "render loop never reached {state:?}"
            );
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn refreshed(render_loop: &RenderLoop) {
        render_loop.refresh_display();
        wait_for_state(render_loop, RenderState::Idle);
    }

    fn node_count(frame: &SharedFrame) -> usize {
        frame
            .lock()
            .primitives
            .iter()
            .filter(|primitive| matches!(primitive, Primitive::Node { .. }))
            .count()
    }

    #[test]
    fn refresh_draws_the_whole_graph_then_idles() {
        let (session, frame) = start(laid_out_tree(2, 6), Duration::ZERO, RenderConfig::default());
        refreshed(session.render_loop());

        let front = frame.lock();
        let links = front
            .primitives
            .iter()
            .filter(|primitive| matches!(primitive, Primitive::Link { .. }))
            .count();
        assert_eq!(links, 62);
        drop(front);
        assert_eq!(node_count(&frame), 63);
    }

    #[test]
    fn picks_and_highlights_the_centre_node() {
        let (session, frame) = start(star(&[0.3, 0.6, -0.5]), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        let (node, center) = render_loop.pick_node(402.0, 299.0).expect("root under cursor");
        assert_eq!(node, 0);
        assert!((center - DVec2::new(400.0, 300.0)).length() < 1.0e-9);
        assert_eq!(render_loop.pick_node(10.0, 10.0), None);

        assert_eq!(render_loop.highlight_node_at(400.0, 300.0), Some(0));
        let highlighted = frame
            .lock()
            .primitives
            .iter()
            .any(|primitive| matches!(primitive, Primitive::Highlight { node: 0, .. }));
        assert!(highlighted);
    }

    #[test]
    fn translation_brings_the_node_to_the_centre() {
        let graph = star(&[0.3, 0.6, -0.5]);
        let (session, _frame) = start(Arc::clone(&graph), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        render_loop.translate(2);
        wait_for_state(render_loop, RenderState::Idle);

        assert!(graph.node_coordinates(2).length() < 1.0e-6);
        assert_eq!(render_loop.display_position().center_node, 2);
    }

    #[test]
    fn restore_returns_to_the_saved_position() {
        let graph = star(&[0.3, 0.6, -0.5]);
        let (session, _frame) = start(Arc::clone(&graph), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        render_loop.save_display_position();
        assert_eq!(render_loop.saved_display_positions(), 1);
        render_loop.translate(3);
        wait_for_state(render_loop, RenderState::Idle);
        assert!(graph.node_coordinates(0).length() > 0.1);

        render_loop.restore_display_position();
        render_loop.synchronize_with_rendering();
        wait_for_state(render_loop, RenderState::Idle);

        let position = render_loop.display_position();
        assert_eq!(position.center_node, 0);
        assert!(position.translation.abs_diff_eq(DMat4::IDENTITY, 1.0e-9));
        assert!(graph.node_coordinates(0).length() < 1.0e-9);
        assert_eq!(render_loop.saved_display_positions(), 0);
    }

    #[test]
    fn restore_without_a_saved_position_only_refreshes() {
        let (session, frame) = start(star(&[0.3, 0.6, -0.5]), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        render_loop.restore_display_position();
        render_loop.synchronize_with_rendering();
        wait_for_state(render_loop, RenderState::Idle);

        assert_eq!(node_count(&frame), 4);
        assert!(render_loop.display_position().rotation.abs_diff_eq(DMat4::IDENTITY, 1.0e-12));
    }

    #[test]
    fn drag_rotation_accumulates_into_the_object_transform() {
        let (session, _frame) = start(star(&[0.3, 0.6, -0.5]), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        let request = Arc::new(InteractiveRotationRequest::new());
        render_loop.rotate_display(request.clone());
        for _ in 0..3 {
            request.rotate(0.1, 0.0);
        }
        request.end();
        wait_for_state(render_loop, RenderState::Idle);

        let rotation = render_loop.display_position().rotation;
        assert!(rotation.abs_diff_eq(rotation_y(0.3), 1.0e-9));
    }

    #[test]
    fn budget_setters_apply_at_the_next_rendezvous() {
        let (session, _frame) = start(star(&[0.3, 0.6, -0.5]), Duration::ZERO, RenderConfig::default());
        let render_loop = session.render_loop();
        refreshed(render_loop);

        render_loop.set_max_rotation_duration(Duration::from_millis(7));
        render_loop.set_max_translation_duration(Duration::MAX);
        render_loop.set_max_completion_duration(Duration::from_millis(3));

        let budgets = render_loop.budgets();
        assert_eq!(budgets.rotation, Duration::from_millis(7));
        assert_eq!(budgets.translation, Duration::MAX);
        assert_eq!(budgets.completion, Duration::from_millis(3));
    }

    #[test]
    fn commands_are_served_while_the_display_is_still_completing() {
        let config = RenderConfig {
            max_completion_ms: 1,
            ..RenderConfig::default()
        };
        let graph = laid_out_tree(2, 12);
        let total = graph.node_count();
        let (session, frame) = start(graph, Duration::from_millis(1), config);
        let render_loop = session.render_loop();
        render_loop.refresh_display();
        wait_for_state(render_loop, RenderState::Complete);

        render_loop.display_position();
        render_loop.highlight_node_at(400.0, 300.0);
        render_loop.synchronize_with_rendering();

        assert_eq!(render_loop.state(), RenderState::Complete);
        assert!(node_count(&frame) < total);
    }

    #[test]
    fn shutdown_while_completing_releases_every_caller() {
        let config = RenderConfig {
            max_completion_ms: 1,
            ..RenderConfig::default()
        };
        let (mut session, _frame) = start(laid_out_tree(2, 12), Duration::from_millis(2), config);
        let render_loop = Arc::clone(session.render_loop());
        render_loop.refresh_display();
        wait_for_state(&render_loop, RenderState::Complete);

        let (done_tx, done_rx) = mpsc::channel();
        let callers = (0..4)
            .map(|_| {
                let render_loop = Arc::clone(&render_loop);
                let done = done_tx.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        render_loop.highlight_node_at(400.0, 300.0);
                        render_loop.synchronize_with_rendering();
                        render_loop.display_position();
                    }
                    done.send(()).expect("test receiver");
                })
            })
            .collect::<Vec<_>>();

        render_loop.shutdown();
        let waiter = {
            let render_loop = Arc::clone(&render_loop);
            let done = done_tx.clone();
            thread::spawn(move || {
                render_loop.wait_for_shutdown();
                done.send(()).expect("test receiver");
            })
        };

        for _ in 0..callers.len() + 1 {
            done_rx
                .recv_timeout(PATIENCE)
                .expect("caller stuck after shutdown");
        }
        for caller in callers {
            caller.join().expect("caller thread");
        }
        waiter.join().expect("waiter thread");

        assert_eq!(render_loop.state(), RenderState::Shutdown);
        session.shutdown();
    }
}

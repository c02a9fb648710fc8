use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::RenderConfig;
use crate::graph::Graph;

mod canvas;
mod element;
mod frontier;
mod picker;
mod position;
mod queue;
mod renderer;
mod rendezvous;
mod rotation;
mod scheduler;
mod transformer;
mod view;

pub use canvas::{Canvas, DisplayList, LinkKind, NodeSize, Primitive, SharedFrame};
pub use position::DisplayPosition;
pub use rotation::{
    InteractiveRotationRequest, RepeatingRotationRequest, RotationRequest,
    WobblingRotationRequest,
};
pub use scheduler::{RenderBudgets, RenderLoop, RenderState};
pub use view::{Viewport, project_point};

use queue::ElementQueue;
use renderer::LineRenderer;
use transformer::Transformer;

// The transformer and render loop threads for one graph, wired to a canvas.
pub struct RenderSession {
    render_loop: Arc<RenderLoop>,
    workers: Vec<JoinHandle<()>>,
}

impl RenderSession {
    pub fn start(graph: Arc<Graph>, canvas: Box<dyn Canvas>, config: &RenderConfig) -> Result<Self> {
        let queue = Arc::new(ElementQueue::new(graph.node_count() + graph.link_count()));
        let transformer = Arc::new(Transformer::new(
            Arc::clone(&graph),
            Arc::clone(&queue),
            config.nontree_links,
        ));
        let renderer = Box::new(LineRenderer::new(Arc::clone(&graph), Arc::clone(&queue)));
        let render_loop = Arc::new(RenderLoop::new(
            Arc::clone(&graph),
            Arc::clone(&transformer),
            queue,
            canvas,
            config.budgets(),
        ));

        let transformer_worker = transformer
            .spawn()
            .context("failed to spawn the transformer thread")?;
        let render_worker = match render_loop.spawn(renderer) {
            Ok(worker) => worker,
            Err(err) => {
                transformer.shutdown();
                if transformer_worker.join().is_err() {
                    warn!("transformer thread panicked");
                }
                return Err(err).context("failed to spawn the render loop thread");
            }
        };

        info!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            nontree_links = config.nontree_links,
            "render session started"
        );
        Ok(Self {
            render_loop,
            workers: vec![transformer_worker, render_worker],
        })
    }

    pub fn render_loop(&self) -> &Arc<RenderLoop> {
        &self.render_loop
    }

    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.render_loop.shutdown();
        self.render_loop.wait_for_shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("render worker panicked");
            }
        }
        info!("render session stopped");
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

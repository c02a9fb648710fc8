use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Instant;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context, Pos2, Vec2};
use tracing::info;

use crate::config::{GeneratedGraph, GraphSource, RenderConfig};
use crate::graph::{Graph, complete_graph, complete_tree, load_graph, ternary_tree_set};
use crate::layout::cone_layout;
use crate::render::{
    DisplayPosition, InteractiveRotationRequest, RenderSession, RotationRequest, SharedFrame,
};

mod commands;
mod graph;
mod render_utils;
mod ui;

use commands::CommandThread;

pub struct HyperviewApp {
    source: GraphSource,
    config: RenderConfig,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Graph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

// Field order matters: the command thread is joined before the session
// shuts the render loop down.
struct ViewModel {
    commands: CommandThread,
    session: RenderSession,
    graph: Arc<Graph>,
    frame: SharedFrame,
    source: String,
    config: RenderConfig,
    drag: Option<Arc<InteractiveRotationRequest>>,
    spin: Option<Spin>,
    saved_positions: usize,
    bookmark: Option<DisplayPosition>,
    search: String,
    search_cache: Option<SearchCache>,
    hovered: Option<usize>,
    centered: Option<usize>,
    last_hover: Option<Pos2>,
    canvas_size: Vec2,
    drag_sensitivity: f32,
    show_nontree_links: bool,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_node_count: usize,
    visible_link_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpinKind {
    Repeat,
    Wobble,
}

struct Spin {
    kind: SpinKind,
    request: Arc<dyn RotationRequest>,
}

struct SearchCache {
    query: String,
    matches: Vec<usize>,
}

impl HyperviewApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: GraphSource, config: RenderConfig) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            config,
            state,
        }
    }

    fn spawn_load(source: GraphSource) -> Receiver<Result<Graph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = prepare_graph(&source).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: GraphSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn ready(&self, ctx: &Context, graph: Graph) -> AppState {
        match ViewModel::new(ctx, graph, self.source.describe(), self.config.clone()) {
            Ok(model) => AppState::Ready(Box::new(model)),
            Err(error) => AppState::Error(format!("{error:#}")),
        }
    }
}

fn prepare_graph(source: &GraphSource) -> Result<Graph> {
    let started = Instant::now();
    let mut graph = match source {
        GraphSource::File(path) => load_graph(path)
            .with_context(|| format!("failed to load graph from {}", path.display()))?,
        GraphSource::Generated {
            kind,
            arity,
            height,
        } => {
            let generated = match kind {
                GeneratedGraph::Tree => complete_tree(*arity, *height),
                GeneratedGraph::Graph => complete_graph(*arity, *height),
                GeneratedGraph::TernarySet => ternary_tree_set(),
            };
            generated.with_context(|| format!("failed to generate {}", source.describe()))?
        }
    };

    let layout = cone_layout(&graph);
    graph.set_layout_coordinates(layout);
    info!(
        nodes = graph.node_count(),
        links = graph.link_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph ready"
    );
    Ok(graph)
}

impl eframe::App for HyperviewApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(graph)) => transition = Some(Ok(graph)),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(mpsc::TryRecvError::Empty) => ctx.request_repaint(),
                    Err(mpsc::TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Laying out {}...", self.source.describe()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to prepare the graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if retry {
            self.state = Self::start_load(self.source.clone());
        }

        if let Some(loaded) = transition {
            self.state = match loaded {
                Ok(graph) => self.ready(ctx, graph),
                Err(error) => AppState::Error(error),
            };
        }
    }
}

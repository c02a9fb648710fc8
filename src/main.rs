mod app;
mod config;
mod error;
mod geometry;
mod graph;
mod layout;
mod render;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{GeneratedGraph, GraphSource, RenderConfig};

const DEFAULT_LOG_FILTER: &str = "hyperview=info";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON graph with `nodes`, `tree_links` and `nontree_links`.
    #[arg(long)]
    graph: Option<PathBuf>,
    /// Generated graph to show when no file is given.
    #[arg(long, value_enum, default_value_t = GeneratedGraph::Tree)]
    generate: GeneratedGraph,
    #[arg(long, default_value_t = 3)]
    arity: usize,
    #[arg(long, default_value_t = 7)]
    height: usize,
    /// Also traverse and draw non-tree links.
    #[arg(long)]
    nontree_links: bool,
    /// Per-frame time budgets in milliseconds; 0 is unbounded.
    #[arg(long, default_value_t = 50)]
    max_rotation_ms: u64,
    #[arg(long, default_value_t = 50)]
    max_translation_ms: u64,
    #[arg(long, default_value_t = 50)]
    max_completion_ms: u64,
    /// Overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn source(&self) -> GraphSource {
        match &self.graph {
            Some(path) => GraphSource::File(path.clone()),
            None => GraphSource::Generated {
                kind: self.generate,
                arity: self.arity,
                height: self.height,
            },
        }
    }

    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            nontree_links: self.nontree_links,
            max_rotation_ms: self.max_rotation_ms,
            max_translation_ms: self.max_translation_ms,
            max_completion_ms: self.max_completion_ms,
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let source = args.source();
    let config = args.render_config();
    tracing::info!(source = %source.describe(), ?config, "starting hyperview");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "hyperview",
        options,
        Box::new(move |cc| Ok(Box::new(app::HyperviewApp::new(cc, source, config)))),
    )
}

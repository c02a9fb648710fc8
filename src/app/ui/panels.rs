use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::config::RenderConfig;
use crate::graph::Graph;
use crate::render::{DisplayList, RenderSession};
use crate::util::format_count;

use super::super::commands::{Command, CommandThread, Outcome};
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn new(
        ctx: &Context,
        graph: Graph,
        source: String,
        config: RenderConfig,
    ) -> Result<Self> {
        let graph = Arc::new(graph);
        let repaint = ctx.clone();
        let canvas = DisplayList::new().with_repaint(move || repaint.request_repaint());
        let frame = canvas.frame();

        let session = RenderSession::start(Arc::clone(&graph), Box::new(canvas), &config)?;
        let commands = CommandThread::spawn(Arc::clone(session.render_loop()), ctx.clone())
            .context("failed to spawn the command thread")?;
        commands.send(Command::Refresh);

        Ok(Self {
            commands,
            session,
            graph,
            frame,
            source,
            config,
            drag: None,
            spin: None,
            saved_positions: 0,
            bookmark: None,
            search: String::new(),
            search_cache: None,
            hovered: None,
            centered: None,
            last_hover: None,
            canvas_size: Vec2::ZERO,
            drag_sensitivity: 1.0,
            show_nontree_links: true,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_node_count: 0,
            visible_link_count: 0,
        })
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.update_fps_counter(ctx);
        self.apply_outcomes();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("hyperview");
                    ui.separator();
                    ui.label(self.source.as_str());
                    ui.label(format!("nodes: {}", format_count(self.graph.node_count())));
                    ui.label(format!("links: {}", format_count(self.graph.link_count())));
                    if let Some(node) = self.centered {
                        ui.label(format!("centre: {}", self.graph.node_label(node)));
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("{:?}", self.session.render_loop().state()));
                        if let Some(drawn) = self.visible_graph_text() {
                            ui.label(drawn);
                        }
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn apply_outcomes(&mut self) {
        let outcomes = self.commands.outcomes().collect::<Vec<_>>();
        for outcome in outcomes {
            match outcome {
                Outcome::Hovered(node) => self.hovered = node,
                Outcome::Centered(node) => self.centered = Some(node),
                Outcome::Bookmarked(position) => self.bookmark = Some(position),
            }
        }
    }
}

impl Drop for ViewModel {
    // A rotation still being pulled would keep the render loop from ever
    // reaching its shutdown rendezvous.
    fn drop(&mut self) {
        if let Some(request) = self.drag.take() {
            self.commands.send(Command::EndRotation(request));
        }
        if let Some(spin) = self.spin.take() {
            self.commands.send(Command::EndRotation(spin.request));
        }
    }
}

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use eframe::egui::{Context, Pos2, Vec2};
use tracing::{debug, warn};

use crate::render::{DisplayPosition, RenderBudgets, RenderLoop, RotationRequest};

// Render loop commands block until the loop reaches a rendezvous point, so
// the UI thread hands them to a thread of their own.
pub(super) enum Command {
    Resize(Vec2),
    Hover(Pos2),
    Click(Pos2),
    Translate(usize),
    Highlight(usize),
    Rotate(Arc<dyn RotationRequest>),
    EndRotation(Arc<dyn RotationRequest>),
    Refresh,
    SavePosition,
    RestorePosition,
    DiscardPosition,
    Bookmark,
    GoTo(DisplayPosition),
    SetBudgets(RenderBudgets),
}

pub(super) enum Outcome {
    Hovered(Option<usize>),
    Centered(usize),
    Bookmarked(DisplayPosition),
}

pub(super) struct CommandThread {
    commands: Option<Sender<Command>>,
    outcomes: Receiver<Outcome>,
    worker: Option<JoinHandle<()>>,
}

impl CommandThread {
    pub(super) fn spawn(render_loop: Arc<RenderLoop>, ctx: Context) -> io::Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("hyperview-commands".to_string())
            .spawn(move || run(&render_loop, &command_rx, &outcome_tx, &ctx))?;

        Ok(Self {
            commands: Some(command_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
        })
    }

    pub(super) fn send(&self, command: Command) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(command).is_err() {
            warn!("command thread is gone, dropping command");
        }
    }

    pub(super) fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.outcomes.try_iter()
    }
}

impl Drop for CommandThread {
    fn drop(&mut self) {
        self.commands = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("command thread panicked");
        }
    }
}

fn run(
    render_loop: &RenderLoop,
    commands: &Receiver<Command>,
    outcomes: &Sender<Outcome>,
    ctx: &Context,
) {
    while let Ok(first) = commands.recv() {
        let mut batch = vec![first];
        batch.extend(commands.try_iter());

        // Only the latest pointer position is worth highlighting.
        let last_hover = batch
            .iter()
            .rposition(|command| matches!(command, Command::Hover(_)));
        for (index, command) in batch.into_iter().enumerate() {
            if matches!(command, Command::Hover(_)) && Some(index) != last_hover {
                continue;
            }
            if let Some(outcome) = execute(render_loop, command) {
                if outcomes.send(outcome).is_err() {
                    return;
                }
                ctx.request_repaint();
            }
        }
    }
    debug!("command thread exiting");
}

fn execute(render_loop: &RenderLoop, command: Command) -> Option<Outcome> {
    match command {
        Command::Resize(size) => render_loop.resize_display(f64::from(size.x), f64::from(size.y)),
        Command::Hover(at) => {
            let node = render_loop.highlight_node_at(f64::from(at.x), f64::from(at.y));
            return Some(Outcome::Hovered(node));
        }
        Command::Click(at) => {
            let (node, _) = render_loop.pick_node(f64::from(at.x), f64::from(at.y))?;
            render_loop.translate(node);
            return Some(Outcome::Centered(node));
        }
        Command::Translate(node) => {
            render_loop.translate(node);
            return Some(Outcome::Centered(node));
        }
        Command::Highlight(node) => {
            render_loop.highlight_node(node);
            return Some(Outcome::Hovered(Some(node)));
        }
        Command::Rotate(request) => render_loop.rotate_display(request),
        Command::EndRotation(request) => request.end(),
        Command::Refresh => render_loop.refresh_display(),
        Command::SavePosition => render_loop.save_display_position(),
        Command::RestorePosition => render_loop.restore_display_position(),
        Command::DiscardPosition => render_loop.discard_display_position(),
        Command::Bookmark => return Some(Outcome::Bookmarked(render_loop.display_position())),
        Command::GoTo(position) => {
            render_loop.set_display_position(position);
            return Some(Outcome::Centered(position.center_node));
        }
        Command::SetBudgets(budgets) => {
            render_loop.set_max_rotation_duration(budgets.rotation);
            render_loop.set_max_translation_duration(budgets.translation);
            render_loop.set_max_completion_duration(budgets.completion);
        }
    }
    None
}

use std::sync::Arc;

use eframe::egui::{self, Rect, Response};

use crate::render::{
    InteractiveRotationRequest, RepeatingRotationRequest, RotationRequest,
    WobblingRotationRequest,
};

use super::super::commands::Command;
use super::super::{Spin, SpinKind, ViewModel};

const DRAG_RADIANS_PER_PIXEL: f64 = 0.006;
const SPIN_STEP_RADIANS: f64 = 0.015;

impl ViewModel {
    pub(in crate::app) fn handle_canvas_resize(&mut self, rect: Rect) {
        let size = rect.size();
        if (size - self.canvas_size).length() > 0.5 {
            self.canvas_size = size;
            self.commands.send(Command::Resize(size));
        }
    }

    pub(in crate::app) fn handle_drag_rotation(&mut self, response: &Response) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            self.stop_spin();
            let request = Arc::new(InteractiveRotationRequest::new());
            self.commands.send(Command::Rotate(request.clone()));
            self.drag = Some(request);
        }

        if let Some(request) = &self.drag {
            let delta = response.drag_delta();
            if delta.x != 0.0 || delta.y != 0.0 {
                let scale = DRAG_RADIANS_PER_PIXEL * f64::from(self.drag_sensitivity);
                request.rotate(f64::from(delta.x) * scale, f64::from(delta.y) * scale);
            }
        }

        if response.drag_stopped()
            && let Some(request) = self.drag.take()
        {
            self.commands.send(Command::EndRotation(request));
        }
    }

    pub(in crate::app) fn handle_pick(&mut self, rect: Rect, response: &Response) {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return;
        }
        if let Some(pointer) = response.interact_pointer_pos() {
            self.stop_spin();
            self.commands.send(Command::Click((pointer - rect.min).to_pos2()));
        }
    }

    pub(in crate::app) fn handle_hover(&mut self, rect: Rect, response: &Response) {
        if self.drag.is_some() || self.spin.is_some() {
            return;
        }
        let Some(pointer) = response.hover_pos() else {
            if self.last_hover.take().is_some() {
                self.hovered = None;
            }
            return;
        };

        let local = (pointer - rect.min).to_pos2();
        if self.last_hover != Some(local) {
            self.last_hover = Some(local);
            self.commands.send(Command::Hover(local));
        }
    }

    pub(in crate::app) fn translate_to(&mut self, node: usize) {
        self.stop_spin();
        self.commands.send(Command::Translate(node));
    }

    pub(in crate::app) fn toggle_spin(&mut self, kind: SpinKind) {
        let previous = self.spin.as_ref().map(|spin| spin.kind);
        self.stop_spin();
        if previous == Some(kind) {
            return;
        }

        let request: Arc<dyn RotationRequest> = match kind {
            SpinKind::Repeat => Arc::new(RepeatingRotationRequest::new(SPIN_STEP_RADIANS, 0.0)),
            SpinKind::Wobble => Arc::new(WobblingRotationRequest::new()),
        };
        self.commands.send(Command::Rotate(Arc::clone(&request)));
        self.spin = Some(Spin { kind, request });
    }

    pub(in crate::app) fn stop_spin(&mut self) {
        if let Some(spin) = self.spin.take() {
            self.commands.send(Command::EndRotation(spin.request));
        }
    }
}

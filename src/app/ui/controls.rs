use eframe::egui::{self, Key, Ui};

use crate::util::format_duration_ms;

use super::super::commands::Command;
use super::super::{SpinKind, ViewModel};

const MAX_BUDGET_MS: u64 = 500;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("View");
        ui.horizontal(|ui| {
            if ui.button("Refresh").clicked() {
                self.commands.send(Command::Refresh);
            }
            if ui.button("Centre root").clicked() {
                self.translate_to(self.graph.root_node());
            }
        });
        ui.horizontal(|ui| {
            for (kind, label) in [(SpinKind::Repeat, "Spin"), (SpinKind::Wobble, "Wobble")] {
                let active = self.spin.as_ref().is_some_and(|spin| spin.kind == kind);
                if ui.selectable_label(active, label).clicked() {
                    self.toggle_spin(kind);
                }
            }
        });
        ui.add(egui::Slider::new(&mut self.drag_sensitivity, 0.2..=3.0).text("drag sensitivity"));
        if self.config.nontree_links
            && self.graph.nontree_link_count() > 0
            && ui
                .checkbox(&mut self.show_nontree_links, "Show non-tree links")
                .changed()
        {
            self.apply_nontree_visibility();
        }

        ui.separator();
        ui.heading("Position");
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                self.commands.send(Command::SavePosition);
                self.saved_positions += 1;
            }
            let has_saved = self.saved_positions > 0;
            if ui.add_enabled(has_saved, egui::Button::new("Restore")).clicked() {
                self.stop_spin();
                self.commands.send(Command::RestorePosition);
                self.saved_positions -= 1;
            }
            if ui.add_enabled(has_saved, egui::Button::new("Discard")).clicked() {
                self.commands.send(Command::DiscardPosition);
                self.saved_positions -= 1;
            }
        });
        ui.label(format!("saved positions: {}", self.saved_positions));
        ui.horizontal(|ui| {
            if ui.button("Bookmark").clicked() {
                self.commands.send(Command::Bookmark);
            }
            let bookmark = self.bookmark;
            if ui
                .add_enabled(bookmark.is_some(), egui::Button::new("Go to bookmark"))
                .clicked()
                && let Some(position) = bookmark
            {
                self.stop_spin();
                self.commands.send(Command::GoTo(position));
            }
        });
        if let Some(position) = &self.bookmark {
            ui.small(format!(
                "bookmark centred on {}",
                self.graph.node_label(position.center_node)
            ));
        }

        ui.separator();
        self.draw_search(ui);

        ui.separator();
        self.draw_budgets(ui);

        ui.separator();
        ui.checkbox(&mut self.show_fps_bar, "Show FPS");
    }

    fn apply_nontree_visibility(&self) {
        let graph = &self.graph;
        for node in 0..graph.node_count() {
            for link in graph.node_nontree_index(node)..graph.node_links_end_index(node) {
                graph.set_link_visible(link, self.show_nontree_links);
            }
        }
        self.commands.send(Command::Refresh);
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.heading("Search");
        let response = ui.text_edit_singleline(&mut self.search);
        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

        let matches = self.search_matches();
        if submitted && let Some(&best) = matches.first() {
            self.translate_to(best);
        }

        egui::ScrollArea::vertical()
            .id_salt("search_results")
            .max_height(220.0)
            .show(ui, |ui| {
                for node in matches {
                    let current = self.centered == Some(node);
                    let response = ui.selectable_label(current, self.graph.node_label(node));
                    if response.clicked() {
                        self.translate_to(node);
                    } else if response.hovered() && self.hovered != Some(node) {
                        self.hovered = Some(node);
                        self.commands.send(Command::Highlight(node));
                    }
                }
            });
    }

    fn draw_budgets(&mut self, ui: &mut Ui) {
        ui.heading("Frame budgets");
        let mut changed = false;
        for (label, value) in [
            ("rotation ms", &mut self.config.max_rotation_ms),
            ("translation ms", &mut self.config.max_translation_ms),
            ("completion ms", &mut self.config.max_completion_ms),
        ] {
            changed |= ui
                .add(egui::Slider::new(value, 0..=MAX_BUDGET_MS).text(label))
                .changed();
        }

        let budgets = self.config.budgets();
        if changed {
            self.commands.send(Command::SetBudgets(budgets));
        }
        ui.small(format!(
            "rotation {}, translation {}, completion {}",
            format_duration_ms(budgets.rotation),
            format_duration_ms(budgets.translation),
            format_duration_ms(budgets.completion)
        ));
        ui.small("0 leaves a phase unbounded");
    }
}

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::render::{Primitive, Viewport};

use super::super::render_utils::{
    HIGHLIGHT_COLOR, HIGHLIGHT_RADIUS, draw_background, link_stroke, node_radius, rgb,
    segment_visible, to_screen,
};
use super::super::{SearchCache, ViewModel};

const SEARCH_RESULT_LIMIT: usize = 40;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    // Best matches first, ties broken by node order.
    pub(in crate::app) fn search_matches(&mut self) -> Vec<usize> {
        let query = self.search.trim();
        if query.is_empty() {
            return Vec::new();
        }

        if let Some(cached) = &self.search_cache
            && cached.query == query
        {
            return cached.matches.clone();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = self
            .graph
            .labels()
            .filter_map(|(node, label)| {
                fuzzy_match_score(&matcher, label, query).map(|score| (score, node))
            })
            .collect::<Vec<_>>();
        scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let matches = scored
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(|(_, node)| node)
            .collect::<Vec<_>>();

        self.search_cache = Some(SearchCache {
            query: query.to_owned(),
            matches: matches.clone(),
        });
        matches
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_canvas_resize(rect);
        self.handle_drag_rotation(&response);
        self.handle_pick(rect, &response);
        self.handle_hover(rect, &response);

        let viewport = Viewport::new(f64::from(rect.width()), f64::from(rect.height()));
        draw_background(&painter, rect, viewport);

        let mut drawn_nodes = 0usize;
        let mut drawn_links = 0usize;
        let mut hovered_at = None;
        {
            let frame = self.frame.lock();
            let model = frame.model;
            for primitive in &frame.primitives {
                match *primitive {
                    Primitive::Link {
                        from,
                        to,
                        kind,
                        color,
                    } => {
                        let start = to_screen(rect, model, viewport, from);
                        let end = to_screen(rect, model, viewport, to);
                        if segment_visible(rect, start, end) {
                            painter.line_segment([start, end], link_stroke(kind, color));
                            drawn_links += 1;
                        }
                    }
                    Primitive::Node {
                        at, size, color, ..
                    } => {
                        let position = to_screen(rect, model, viewport, at);
                        if rect.contains(position) {
                            painter.circle_filled(position, node_radius(size), rgb(color));
                            drawn_nodes += 1;
                        }
                    }
                    Primitive::Highlight { node, at } => {
                        if self.hovered == Some(node) {
                            let position = to_screen(rect, model, viewport, at);
                            painter.circle_stroke(
                                position,
                                HIGHLIGHT_RADIUS,
                                Stroke::new(1.6, HIGHLIGHT_COLOR),
                            );
                            hovered_at = Some(position);
                        }
                    }
                }
            }
        }
        self.visible_node_count = drawn_nodes;
        self.visible_link_count = drawn_links;

        if let Some(node) = self.hovered {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });

            let label = self.graph.node_label(node);
            if let Some(position) = hovered_at {
                painter.text(
                    position + vec2(HIGHLIGHT_RADIUS + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{label}  |  children {}",
                    self.graph.child_count(node)
                ),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.drag.is_some() || self.spin.is_some() {
            ui.ctx().request_repaint();
        }
    }
}

use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, vec2};
use glam::{DMat4, DVec3};

use crate::render::{LinkKind, NodeSize, Viewport, project_point};

pub(super) const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub(super) const HIGHLIGHT_RADIUS: f32 = 9.0;

pub(super) fn rgb(color: u32) -> Color32 {
    Color32::from_rgb((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

// Background plus the rim of the ball, which is where everything
// infinitely far away ends up.
pub(super) fn draw_background(painter: &Painter, rect: Rect, viewport: Viewport) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let center = viewport.center();
    let radius = viewport.pixels_per_unit() as f32;
    painter.circle_filled(
        rect.min + vec2(center.x as f32, center.y as f32),
        radius,
        Color32::from_rgb(24, 29, 37),
    );
    painter.circle_stroke(
        rect.min + vec2(center.x as f32, center.y as f32),
        radius,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 140)),
    );
}

pub(super) fn to_screen(rect: Rect, model: DMat4, viewport: Viewport, p: DVec3) -> Pos2 {
    let pixel = project_point(model, viewport, p);
    rect.min + vec2(pixel.x as f32, pixel.y as f32)
}

pub(super) fn node_radius(size: NodeSize) -> f32 {
    match size {
        NodeSize::Near => 4.5,
        NodeSize::Middle => 2.8,
        NodeSize::Far => 1.4,
    }
}

pub(super) fn link_stroke(kind: LinkKind, color: u32) -> Stroke {
    match kind {
        LinkKind::Tree => Stroke::new(1.0, rgb(color)),
        LinkKind::Nontree => Stroke::new(0.8, dim_color(rgb(color), 0.7)),
    }
}

// Rect-overlap test used to skip primitives that project off the canvas.
pub(super) fn segment_visible(rect: Rect, start: Pos2, end: Pos2) -> bool {
    let min_x = start.x.min(end.x);
    let max_x = start.x.max(end.x);
    let min_y = start.y.min(end.y);
    let max_y = start.y.max(end.y);

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

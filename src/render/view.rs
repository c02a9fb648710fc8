use glam::{DMat4, DVec2, DVec3};

// The eye sits on +z looking at the origin.
pub const EYE_DISTANCE: f64 = 3.0;

const BALL_FILL: f64 = 0.45;
const PICK_RADIUS_PIXELS: f64 = 10.0;
const PICK_EQUIVALENCE_RADIUS_PIXELS: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn pixels_per_unit(self) -> f64 {
        self.width.min(self.height) * BALL_FILL
    }

    pub fn center(self) -> DVec2 {
        DVec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn to_screen(self, view: DVec2) -> DVec2 {
        let scale = self.pixels_per_unit();
        self.center() + DVec2::new(view.x * scale, -view.y * scale)
    }

    pub fn from_screen(self, pixel: DVec2) -> DVec2 {
        let scale = self.pixels_per_unit();
        let offset = pixel - self.center();
        DVec2::new(offset.x / scale, -offset.y / scale)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

pub fn perspective(eye: DVec3) -> DVec2 {
    let scale = 1.0 / (1.0 - eye.z / EYE_DISTANCE);
    eye.truncate() * scale
}

pub fn project_point(model: DMat4, viewport: Viewport, p: DVec3) -> DVec2 {
    viewport.to_screen(perspective(model.transform_point3(p)))
}

pub struct ViewParameters {
    object: DMat4,
    saved: Vec<DMat4>,
    viewport: Viewport,
}

impl ViewParameters {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            object: DMat4::IDENTITY,
            saved: Vec::new(),
            viewport,
        }
    }

    pub fn object_transform(&self) -> DMat4 {
        self.object
    }

    pub fn set_object_transform(&mut self, transform: DMat4) {
        self.object = transform;
    }

    pub fn extend_object_transform(&mut self, rotation: DMat4) -> DMat4 {
        self.object = rotation * self.object;
        self.object
    }

    pub fn save_object_transform(&mut self) {
        self.saved.push(self.object);
    }

    pub fn restore_object_transform(&mut self) -> bool {
        match self.saved.pop() {
            Some(transform) => {
                self.object = transform;
                true
            }
            None => false,
        }
    }

    pub fn discard_object_transform(&mut self) -> bool {
        self.saved.pop().is_some()
    }

    pub fn saved_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn to_eye(&self, p: DVec3) -> DVec3 {
        self.object.transform_point3(p)
    }

    #[cfg(test)]
    pub fn project(&self, p: DVec3) -> DVec2 {
        project_point(self.object, self.viewport, p)
    }

    pub fn pick_radius(&self) -> f64 {
        PICK_RADIUS_PIXELS / self.viewport.pixels_per_unit()
    }

    pub fn pick_equivalence_radius(&self) -> f64 {
        PICK_EQUIVALENCE_RADIUS_PIXELS / self.viewport.pixels_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::rotation_y;

    #[test]
    fn origin_projects_to_the_viewport_center() {
        let view = ViewParameters::new(Viewport::new(400.0, 200.0));
        let center = view.project(DVec3::ZERO);
        assert_relative_eq!(center.x, 200.0);
        assert_relative_eq!(center.y, 100.0);
    }

    #[test]
    fn nearer_points_spread_further_from_center() {
        let near = perspective(DVec3::new(0.5, 0.0, 0.8));
        let far = perspective(DVec3::new(0.5, 0.0, -0.8));
        assert!(near.x > far.x);
        assert!(far.x > 0.0);
    }

    #[test]
    fn screen_round_trips_through_view_coordinates() {
        let viewport = Viewport::new(640.0, 480.0);
        let pixel = DVec2::new(500.0, 90.0);
        let back = viewport.to_screen(viewport.from_screen(pixel));
        assert_relative_eq!(back.x, pixel.x, epsilon = 1.0e-9);
        assert_relative_eq!(back.y, pixel.y, epsilon = 1.0e-9);
    }

    #[test]
    fn saved_transforms_nest() {
        let mut view = ViewParameters::new(Viewport::default());
        view.save_object_transform();
        view.extend_object_transform(rotation_y(0.3));
        let turned = view.object_transform();
        view.save_object_transform();
        view.extend_object_transform(rotation_y(0.3));

        assert!(view.restore_object_transform());
        assert_eq!(view.object_transform(), turned);
        assert!(view.restore_object_transform());
        assert_eq!(view.object_transform(), DMat4::IDENTITY);
        assert!(!view.restore_object_transform());
        assert!(!view.discard_object_transform());
    }
}

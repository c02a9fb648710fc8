use glam::{DMat4, DVec3, DVec4};

pub const ORIGIN: DVec4 = DVec4::new(0.0, 0.0, 0.0, 1.0);

pub fn minkowski_dot(a: DVec4, b: DVec4) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z - a.w * b.w
}

pub fn project(p: DVec4) -> DVec3 {
    p.truncate() / p.w
}

pub fn vector_length(p: DVec4) -> f64 {
    project(p).length()
}

// Reflection across point p: I(4) - 2 * (p pT) I(3,1) / <p,p>_h.
pub fn reflection(p: DVec4) -> DMat4 {
    let inner = minkowski_dot(p, p);
    let scale = -2.0 / inner;
    let column = |c: f64| DVec4::new(p.x * c, p.y * c, p.z * c, p.w * c) * scale;

    // Column j of (p pT) I(3,1) is p * p[j], negated for the w column.
    let outer = DMat4::from_cols(column(p.x), column(p.y), column(p.z), column(-p.w));
    outer + DMat4::IDENTITY
}

// Hyperbolic translation carrying `source` onto `destination`: reflect in the
// source, then in the midpoint of the two.
pub fn translation(source: DVec4, destination: DVec4) -> DMat4 {
    let s_s = minkowski_dot(source, source);
    let d_d = minkowski_dot(destination, destination);
    let s_d = minkowski_dot(source, destination);

    let midpoint = source * (d_d * s_d).sqrt() + destination * (s_s * s_d).sqrt();
    reflection(midpoint) * reflection(source)
}

pub fn translation_along_x(distance: f64) -> DMat4 {
    let (sinh, cosh) = (distance.sinh(), distance.cosh());
    DMat4::from_cols(
        DVec4::new(cosh, 0.0, 0.0, sinh),
        DVec4::Y,
        DVec4::Z,
        DVec4::new(sinh, 0.0, 0.0, cosh),
    )
}

pub fn rotation_x(angle: f64) -> DMat4 {
    DMat4::from_rotation_x(angle)
}

pub fn rotation_y(angle: f64) -> DMat4 {
    DMat4::from_rotation_y(angle)
}

pub fn rotation_z(angle: f64) -> DMat4 {
    DMat4::from_rotation_z(angle)
}

// Rotation taking +x onto the unit vector `direction`.
pub fn rotation_from_x(direction: DVec3) -> DMat4 {
    let direction = direction.normalize_or_zero();
    if direction == DVec3::ZERO {
        return DMat4::IDENTITY;
    }
    let quat = glam::DQuat::from_rotation_arc(DVec3::X, direction);
    DMat4::from_quat(quat)
}

// Drag rotation: vertical motion turns about x, horizontal about y.
pub fn drag_rotation(horizontal: f64, vertical: f64) -> DMat4 {
    rotation_y(horizontal) * rotation_x(vertical)
}

// Cheap visual radius: 1 at the centre of the ball, 0 at the boundary.
pub fn visual_radius(p: DVec4) -> f64 {
    let d = p.truncate().length_squared() / (p.w * p.w);
    1.0 - d
}

// Homogeneous, so the sign of w is irrelevant.
#[cfg(test)]
pub fn is_inside_ball(p: DVec4) -> bool {
    minkowski_dot(p, p) < 0.0
}

use glam::DMat4;

// Snapshot of where the camera is: the node traversal starts from, the
// object rotation and the cumulative hyperbolic transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayPosition {
    pub center_node: usize,
    pub rotation: DMat4,
    pub translation: DMat4,
}

impl DisplayPosition {
    pub fn new(center_node: usize, rotation: DMat4, translation: DMat4) -> Self {
        Self {
            center_node,
            rotation,
            translation,
        }
    }
}

use std::f64::consts::TAU;

use glam::DMat4;
use parking_lot::{Condvar, Mutex};

use crate::geometry::{drag_rotation, rotation_z};

const WOBBLE_RADIUS: f64 = 2.5;
const WOBBLE_SEGMENTS: usize = 18;

// Pull-based source of incremental rotations for the render loop. `None`
// ends the rotation.
pub trait RotationRequest: Send + Sync {
    fn get_rotation(&self) -> Option<DMat4>;
    // Returns once the puller has seen the end.
    fn end(&self);
}

struct Progress<T> {
    rotating: bool,
    observed_end: bool,
    data: T,
}

// The shared bookkeeping of every request: `end()` blocks until the render
// loop has pulled past the end.
struct RotationState<T> {
    progress: Mutex<Progress<T>>,
    changed: Condvar,
}

impl<T> RotationState<T> {
    fn new(data: T) -> Self {
        Self {
            progress: Mutex::new(Progress {
                rotating: true,
                observed_end: false,
                data,
            }),
            changed: Condvar::new(),
        }
    }

    fn end(&self) {
        let mut progress = self.progress.lock();
        progress.rotating = false;
        self.changed.notify_all();
        while !progress.observed_end {
            self.changed.wait(&mut progress);
        }
    }
}

fn observe_end<T>(progress: &mut Progress<T>, changed: &Condvar) -> Option<DMat4> {
    progress.observed_end = true;
    changed.notify_all();
    None
}

#[derive(Default)]
struct DragDelta {
    horizontal: f64,
    vertical: f64,
}

// Accumulates drag deltas from the UI; `get_rotation` blocks until there is
// a delta to hand out or the drag ends.
pub struct InteractiveRotationRequest {
    state: RotationState<DragDelta>,
}

impl InteractiveRotationRequest {
    pub fn new() -> Self {
        Self {
            state: RotationState::new(DragDelta::default()),
        }
    }

    pub fn rotate(&self, horizontal: f64, vertical: f64) {
        let mut progress = self.state.progress.lock();
        progress.data.horizontal += horizontal;
        progress.data.vertical += vertical;
        self.state.changed.notify_all();
    }
}

impl Default for InteractiveRotationRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationRequest for InteractiveRotationRequest {
    fn get_rotation(&self) -> Option<DMat4> {
        let mut progress = self.state.progress.lock();
        loop {
            let delta = &mut progress.data;
            if delta.horizontal != 0.0 || delta.vertical != 0.0 {
                let rotation = drag_rotation(delta.horizontal, delta.vertical);
                *delta = DragDelta::default();
                return Some(rotation);
            }
            if !progress.rotating {
                return observe_end(&mut *progress, &self.state.changed);
            }
            self.state.changed.wait(&mut progress);
        }
    }

    fn end(&self) {
        self.state.end();
    }
}

// Spins by a constant step until ended.
pub struct RepeatingRotationRequest {
    state: RotationState<DMat4>,
}

impl RepeatingRotationRequest {
    pub fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            state: RotationState::new(drag_rotation(horizontal, vertical)),
        }
    }
}

impl RotationRequest for RepeatingRotationRequest {
    fn get_rotation(&self) -> Option<DMat4> {
        let mut progress = self.state.progress.lock();
        if progress.rotating {
            Some(progress.data)
        } else {
            observe_end(&mut *progress, &self.state.changed)
        }
    }

    fn end(&self) {
        self.state.end();
    }
}

struct Wobble {
    rotations: Vec<DMat4>,
    position: usize,
}

// Traces a small circle with the view direction, one segment per pull.
pub struct WobblingRotationRequest {
    state: RotationState<Wobble>,
}

impl WobblingRotationRequest {
    pub fn new() -> Self {
        Self {
            state: RotationState::new(Wobble {
                rotations: wobble_rotations(WOBBLE_RADIUS, WOBBLE_SEGMENTS),
                position: 0,
            }),
        }
    }
}

impl Default for WobblingRotationRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationRequest for WobblingRotationRequest {
    fn get_rotation(&self) -> Option<DMat4> {
        let mut progress = self.state.progress.lock();
        if !progress.rotating {
            return observe_end(&mut *progress, &self.state.changed);
        }
        let wobble = &mut progress.data;
        let rotation = wobble.rotations[wobble.position];
        wobble.position = (wobble.position + 1) % wobble.rotations.len();
        Some(rotation)
    }

    fn end(&self) {
        self.state.end();
    }
}

// Rotations between consecutive points of a circle in the xy plane, with
// the coordinates read as degrees.
fn wobble_rotations(radius: f64, segments: usize) -> Vec<DMat4> {
    let points = (0..segments)
        .map(|i| {
            let angle = TAU * i as f64 / segments as f64;
            rotation_z(angle).transform_point3(glam::DVec3::new(radius, 0.0, 0.0))
        })
        .collect::<Vec<_>>();

    (0..segments)
        .map(|i| {
            let start = points[i];
            let end = points[(i + 1) % segments];
            drag_rotation((end.x - start.x).to_radians(), (end.y - start.y).to_radians())
        })
        .collect()
}

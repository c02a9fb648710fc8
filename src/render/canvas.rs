use std::sync::Arc;

use glam::{DMat4, DVec3};
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSize {
    Near,
    Middle,
    Far,
}

impl NodeSize {
    const MIDDLE_THRESHOLD: f64 = 0.5;
    const FAR_THRESHOLD: f64 = 0.2;

    pub fn from_radius(radius: f64) -> Self {
        if radius < Self::FAR_THRESHOLD {
            Self::Far
        } else if radius < Self::MIDDLE_THRESHOLD {
            Self::Middle
        } else {
            Self::Near
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Tree,
    Nontree,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Node {
        node: usize,
        at: DVec3,
        size: NodeSize,
        color: u32,
    },
    Link {
        from: DVec3,
        to: DVec3,
        kind: LinkKind,
        color: u32,
    },
    Highlight {
        node: usize,
        at: DVec3,
    },
}

// Draw surface for the render loop. Points are in the transformed object
// space; the model transform turns them to eye space.
pub trait Canvas: Send {
    fn clear(&mut self);
    fn set_model_transform(&mut self, model: DMat4);
    fn draw(&mut self, primitive: Primitive);
    // Shows what was drawn since the last flush on top of the visible frame.
    fn flush(&mut self);
    // Replaces the visible frame with everything drawn since the last clear.
    fn swap(&mut self);
}

#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub primitives: Vec<Primitive>,
    pub model: DMat4,
    pub generation: u64,
}

pub type SharedFrame = Arc<Mutex<Frame>>;

type RepaintHook = Box<dyn Fn() + Send>;

// Back buffer owned by the render loop; the published frame is shared with
// the UI thread.
pub struct DisplayList {
    back: Vec<Primitive>,
    published: usize,
    model: DMat4,
    front: SharedFrame,
    repaint: Option<RepaintHook>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self {
            back: Vec::new(),
            published: 0,
            model: DMat4::IDENTITY,
            front: Arc::new(Mutex::new(Frame::default())),
            repaint: None,
        }
    }

    pub fn with_repaint(mut self, repaint: impl Fn() + Send + 'static) -> Self {
        self.repaint = Some(Box::new(repaint));
        self
    }

    pub fn frame(&self) -> SharedFrame {
        Arc::clone(&self.front)
    }

    fn publish(&mut self, replace: bool) {
        {
            let mut front = self.front.lock();
            if replace {
                front.primitives.clear();
                front.primitives.extend_from_slice(&self.back);
            } else {
                front.primitives.extend_from_slice(&self.back[self.published..]);
            }
            front.model = self.model;
            front.generation += 1;
        }
        self.published = self.back.len();
        if let Some(repaint) = &self.repaint {
            repaint();
        }
    }
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for DisplayList {
    fn clear(&mut self) {
        self.back.clear();
        self.published = 0;
    }

    fn set_model_transform(&mut self, model: DMat4) {
        self.model = model;
    }

    fn draw(&mut self, primitive: Primitive) {
        self.back.push(primitive);
    }

    fn flush(&mut self) {
        self.publish(false);
    }

    fn swap(&mut self) {
        self.publish(true);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn node(node: usize) -> Primitive {
        Primitive::Node {
            node,
            at: DVec3::ZERO,
            size: NodeSize::Near,
            color: 0,
        }
    }

    #[test]
    fn flush_appends_and_swap_replaces() {
        let repaints = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&repaints);
        let mut list = DisplayList::new().with_repaint(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let frame = list.frame();

        list.draw(node(0));
        list.draw(node(1));
        list.swap();
        assert_eq!(frame.lock().primitives.len(), 2);

        list.draw(node(2));
        list.flush();
        assert_eq!(frame.lock().primitives.len(), 3);

        list.clear();
        list.draw(node(3));
        // Nothing visible changes until the new frame is published.
        assert_eq!(frame.lock().primitives.len(), 3);
        list.swap();

        let front = frame.lock();
        assert_eq!(front.primitives, vec![node(3)]);
        assert_eq!(front.generation, 3);
        assert_eq!(repaints.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn node_sizes_follow_radius_tiers() {
        assert_eq!(NodeSize::from_radius(0.9), NodeSize::Near);
        assert_eq!(NodeSize::from_radius(0.3), NodeSize::Middle);
        assert_eq!(NodeSize::from_radius(0.05), NodeSize::Far);
    }
}

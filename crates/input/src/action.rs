use glam::{Vec2, Vec3};
use std::collections::BTreeSet;

/// A discrete action produced by the window layer.
///
/// The demo consumes actions, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Rotate the view by a mouse delta, in pixels.
    Look(Vec2),
    /// Drop the bomb (ignored while it is falling or a burst is active).
    DropBomb,
    /// Show or hide the HUD.
    ToggleHud,
    /// Put the camera back at its start pose.
    ResetCamera,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}

/// A button that moves the camera while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    Boost,
}

/// Camera-relative movement for one frame, each axis in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveIntent {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub boost: bool,
}

impl MoveIntent {
    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.right == 0.0 && self.up == 0.0
    }

    /// Intent as a (right, up, forward) vector.
    pub fn axes(&self) -> Vec3 {
        Vec3::new(self.right, self.up, self.forward)
    }
}

/// Currently held movement buttons.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: BTreeSet<Button>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.held.insert(button);
        } else {
            self.held.remove(&button);
        }
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held.contains(&button)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Opposing buttons cancel out.
    pub fn intent(&self) -> MoveIntent {
        let axis = |pos: Button, neg: Button| {
            (self.is_held(pos) as i8 - self.is_held(neg) as i8) as f32
        };
        MoveIntent {
            forward: axis(Button::Forward, Button::Back),
            right: axis(Button::Right, Button::Left),
            up: axis(Button::Up, Button::Down),
            boost: self.is_held(Button::Boost),
        }
    }
}

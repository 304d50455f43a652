use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::BombConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BombState {
    Idle,
    Falling,
}

/// A kinematic projectile: `Idle -> Falling -> Idle`.
///
/// Dropping re-arms the bomb at its start position. Each tick it loses a
/// fixed height; once at or below the ground it hides, returns to idle and
/// reports where it landed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bomb {
    position: Vec3,
    start: Vec3,
    fall_speed: f32,
    ground_height: f32,
    state: BombState,
    visible: bool,
}

impl Bomb {
    pub fn new(start: Vec3, fall_speed: f32, ground_height: f32) -> Self {
        Self {
            position: start,
            start,
            fall_speed,
            ground_height,
            state: BombState::Idle,
            visible: false,
        }
    }

    pub fn from_config(config: &BombConfig) -> Self {
        Self::new(config.start, config.fall_speed, config.ground_height)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn state(&self) -> BombState {
        self.state
    }

    pub fn is_falling(&self) -> bool {
        self.state == BombState::Falling
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn ground_height(&self) -> f32 {
        self.ground_height
    }

    /// Start a drop. Rejected while already falling or while an explosion
    /// is still on screen.
    pub fn drop(&mut self, explosion_active: bool) -> bool {
        if self.is_falling() || explosion_active {
            tracing::debug!(state = ?self.state, explosion_active, "bomb drop rejected");
            return false;
        }
        self.position = self.start;
        self.state = BombState::Falling;
        self.visible = true;
        tracing::debug!(start = ?self.start, "bomb dropped");
        true
    }

    /// Advance one tick. Returns the landing position on the tick the bomb
    /// reaches the ground, `None` otherwise.
    pub fn tick(&mut self) -> Option<Vec3> {
        if !self.is_falling() {
            return None;
        }
        self.position.y -= self.fall_speed;
        if self.position.y > self.ground_height {
            return None;
        }
        self.state = BombState::Idle;
        self.visible = false;
        tracing::debug!(position = ?self.position, "bomb landed");
        Some(self.position)
    }
}

impl Default for Bomb {
    fn default() -> Self {
        Self::from_config(&BombConfig::default())
    }
}

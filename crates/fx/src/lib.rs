//! Effect kernel: particle emissions, the simulator that ticks them, and the
//! falling bomb that sets them off.
//!
//! # Invariants
//! - Particle counts are fixed when an emission spawns.
//! - Each tick moves every particle by exactly its velocity. There is no
//!   frame-time scaling, so on-screen speed follows the display refresh rate.
//! - Opacity and scale are pure functions of time since spawn.
//! - At most one burst is active; a new burst tears down the previous one.
//! - Spawning never fails loudly: a missing sprite pool skips the spawn.

pub mod bomb;
pub mod config;
pub mod emission;
pub mod simulator;
pub mod stage;

pub use bomb::{Bomb, BombState};
pub use config::{
    BlendMode, BombConfig, ConfigError, DemoConfig, EmissionConfig, Fade, Shape, VisualTemplate,
};
pub use emission::{DrawItem, Emission, EmissionId, EmissionKind, Visual};
pub use simulator::{FxEvent, Simulator, SpawnSkipped};
pub use stage::{Detonation, Stage};

pub fn crate_info() -> &'static str {
    "blastfield-fx v0.1.0"
}

//! Input mapped to demo actions.
//!
//! # Invariants
//! - Consumers see actions and movement intents, never raw key codes.
//! - Movement is level-triggered (held buttons); everything else is
//!   edge-triggered (one action per press).

pub mod action;

pub use action::{Action, Button, InputState, MoveIntent};

pub fn crate_info() -> &'static str {
    "blastfield-input v0.1.0"
}

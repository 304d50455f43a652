//! Shared types for the blastfield crates.
//!
//! # Invariants
//! - Timestamps are milliseconds on the host's monotonic clock.
//! - Nothing in here owns simulation state.

pub mod types;

pub use types::{Aabb, Timestamp};

pub fn crate_info() -> &'static str {
    "blastfield-common v0.1.0"
}

//! Rendering Adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers never mutate simulator state.
//! - A [`Frame`] is rebuilt from the simulator every frame; renderers keep
//!   no per-emission state between frames.
//!
//! The debug text renderer backs the CLI and tests. The wgpu backend lives in
//! `blastfield-render-wgpu` and consumes the same [`Frame`].

mod renderer;

pub use renderer::{DebugTextRenderer, Frame, RenderView, Renderer};

pub fn crate_info() -> &'static str {
    "blastfield-render v0.1.0"
}

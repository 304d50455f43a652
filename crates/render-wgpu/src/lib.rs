//! wgpu render backend for blastfield.
//!
//! Draws a ground grid, the falling bomb, particle emissions as instanced
//! quads and the flash as a fullscreen overlay. Sprites are procedural: the
//! sprite id only picks a falloff variant.
//!
//! # Invariants
//! - Renderer never mutates simulator state.
//! - Camera motion is NOT part of the effect simulation.
//! - Instance buffers are rewritten from the [`blastfield_render::Frame`]
//!   every frame.

mod camera;
mod gpu;
mod shaders;

pub use camera::FlyCamera;
pub use gpu::WgpuRenderer;

pub fn crate_info() -> &'static str {
    "blastfield-render-wgpu v0.1.0"
}

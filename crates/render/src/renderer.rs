use std::fmt::Write;

use blastfield_common::Timestamp;
use blastfield_fx::{DrawItem, EmissionKind, Stage};
use glam::Vec3;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.5, 10.0),
            target: Vec3::new(0.0, 1.5, 0.0),
            fov_degrees: 75.0,
        }
    }
}

/// Everything drawn in one frame.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub tick: u64,
    pub now: Timestamp,
    pub view: RenderView,
    /// Bomb position while it is visible.
    pub bomb: Option<Vec3>,
    pub items: Vec<DrawItem<'a>>,
}

impl<'a> Frame<'a> {
    /// Snapshot a stage for drawing.
    pub fn capture(stage: &'a Stage, now: Timestamp, view: RenderView) -> Self {
        let bomb = stage.bomb();
        Self {
            tick: stage.simulator().tick(),
            now,
            view,
            bomb: bomb.is_visible().then(|| bomb.position()),
            items: stage.simulator().draw_list(),
        }
    }

    pub fn particle_count(&self) -> usize {
        self.items.iter().map(|i| i.positions.len()).sum()
    }

    /// Combined opacity of every screen-space flash, clamped to 1.
    pub fn flash_opacity(&self) -> f32 {
        self.items
            .iter()
            .filter(|i| i.kind.is_screen_space())
            .map(|i| i.opacity)
            .sum::<f32>()
            .min(1.0)
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads a frame and produces output. It never mutates the
/// simulator.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&self, frame: &Frame<'_>) -> Self::Output;
}

/// Produces a human-readable description of a frame.
///
/// Useful for CLI output, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &Frame<'_>) -> String {
        let mut out = String::new();
        let view = &frame.view;
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "=== Frame (tick={}, t={:.0}ms) ===",
            frame.tick,
            frame.now.as_millis()
        );
        let _ = writeln!(
            out,
            "Emissions: {}  Particles: {}",
            frame.items.len(),
            frame.particle_count()
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z,
            view.fov_degrees
        );
        match frame.bomb {
            Some(p) => {
                let _ = writeln!(out, "Bomb: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
            }
            None => {
                let _ = writeln!(out, "Bomb: hidden");
            }
        }

        for item in &frame.items {
            let _ = write!(
                out,
                "  [#{}] {} opacity={:.2}",
                item.id.0, item.kind, item.opacity
            );
            match item.kind {
                EmissionKind::Burst | EmissionKind::Smoke => {
                    let c = centroid(item.positions);
                    let _ = write!(
                        out,
                        " particles={} centroid=({:.2}, {:.2}, {:.2})",
                        item.positions.len(),
                        c.x,
                        c.y,
                        c.z
                    );
                }
                EmissionKind::Shockwave => {
                    let _ = write!(out, " radius={:.2}", item.ring_radius);
                }
                EmissionKind::Flash => {}
            }
            out.push('\n');
        }

        out
    }
}

fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

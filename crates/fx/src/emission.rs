use std::f32::consts::{PI, TAU};
use std::fmt;

use blastfield_assets::SpriteId;
use blastfield_common::Timestamp;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{BlendMode, EmissionConfig, Fade, Shape};

/// Handle to a spawned emission. Never reused within one simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmissionId(pub u64);

/// What an emission looks like and how it updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionKind {
    Burst,
    Smoke,
    Shockwave,
    Flash,
}

impl EmissionKind {
    /// Only one emission of an exclusive kind may be active at a time.
    pub fn is_exclusive(self) -> bool {
        matches!(self, EmissionKind::Burst)
    }

    pub fn has_particles(self) -> bool {
        matches!(self, EmissionKind::Burst | EmissionKind::Smoke)
    }

    pub fn is_screen_space(self) -> bool {
        matches!(self, EmissionKind::Flash)
    }
}

impl fmt::Display for EmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmissionKind::Burst => "burst",
            EmissionKind::Smoke => "smoke",
            EmissionKind::Shockwave => "shockwave",
            EmissionKind::Flash => "flash",
        };
        f.write_str(name)
    }
}

/// Visual descriptor, fixed at spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    pub sprite: Option<SpriteId>,
    pub blend: BlendMode,
    pub size: f32,
    pub base_opacity: f32,
    pub tint: [f32; 3],
}

/// Result of advancing an emission by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Retired,
}

/// One live effect instance.
///
/// Positions and velocities are parallel buffers of equal, fixed length, so
/// the position buffer can be handed to a renderer as-is.
#[derive(Debug, Clone)]
pub struct Emission {
    id: EmissionId,
    kind: EmissionKind,
    origin: Vec3,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    lift: f32,
    start: Timestamp,
    duration_ms: f64,
    delay_ms: f64,
    fade: Fade,
    ring_radius: f32,
    growth_rate: f32,
    visual: Visual,
    opacity: f32,
    scale: f32,
    ticks: u64,
}

impl Emission {
    /// Build a fresh emission from a preset, sampling its particles.
    pub(crate) fn generate<R: Rng>(
        id: EmissionId,
        config: &EmissionConfig,
        origin: Vec3,
        now: Timestamp,
        sprite: Option<SpriteId>,
        rng: &mut R,
    ) -> Self {
        let count = config.particle_count();
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        let mut lift = 0.0;
        let mut ring_radius = 0.0;
        let mut growth_rate = 0.0;

        match config.shape {
            Shape::Radial {
                max_radius,
                max_speed,
                jitter,
            } => {
                for _ in 0..count {
                    let r = rng.random::<f32>() * max_radius;
                    let theta = rng.random::<f32>() * TAU;
                    let phi = rng.random::<f32>() * PI;
                    let offset = Vec3::new(
                        r * phi.sin() * theta.cos(),
                        r * phi.sin() * theta.sin(),
                        r * phi.cos(),
                    );
                    let speed = rng.random::<f32>() * max_speed;
                    let noise = symmetric(rng) * jitter;
                    positions.push(origin + offset);
                    velocities.push(offset.normalize_or_zero() * speed + noise);
                }
            }
            Shape::Plume {
                spread,
                height,
                drift,
                rise_min,
                rise_range,
                lift: per_tick,
            } => {
                lift = per_tick;
                for _ in 0..count {
                    let s = symmetric(rng);
                    let offset = Vec3::new(s.x * spread, rng.random::<f32>() * height, s.z * spread);
                    let d = symmetric(rng);
                    let rise = rise_min + rng.random::<f32>() * rise_range;
                    positions.push(origin + offset);
                    velocities.push(Vec3::new(d.x * drift, rise, d.z * drift));
                }
            }
            Shape::Ring {
                radius,
                growth_rate: rate,
            } => {
                ring_radius = radius;
                growth_rate = rate;
            }
            Shape::Overlay => {}
        }

        let visual = Visual {
            sprite,
            blend: config.visual.blend,
            size: config.visual.size,
            base_opacity: config.visual.base_opacity,
            tint: config.visual.tint,
        };

        Self {
            id,
            kind: config.kind(),
            origin,
            positions,
            velocities,
            lift,
            start: now,
            duration_ms: config.duration_ms,
            delay_ms: config.delay_ms,
            fade: config.fade,
            ring_radius,
            growth_rate,
            visual,
            opacity: visual.base_opacity,
            scale: 1.0,
            ticks: 0,
        }
    }

    pub fn id(&self) -> EmissionId {
        self.id
    }

    pub fn kind(&self) -> EmissionKind {
        self.kind
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }

    /// Opacity as of the last tick.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Ring scale as of the last tick. Always 1 for non-ring kinds.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Current ring radius in world units.
    pub fn ring_radius(&self) -> f32 {
        self.ring_radius * self.scale
    }

    /// Ticks in which particles actually moved.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed_ms(&self, now: Timestamp) -> f64 {
        now.millis_since(self.start)
    }

    /// Opacity at `elapsed_ms` after spawn.
    pub fn opacity_at(&self, elapsed_ms: f64) -> f32 {
        let elapsed_ms = elapsed_ms.max(0.0);
        if elapsed_ms < self.delay_ms {
            return self.visual.base_opacity;
        }
        let opacity = match self.fade {
            Fade::Linear => {
                self.visual.base_opacity * (1.0 - elapsed_ms / self.duration_ms) as f32
            }
            Fade::Window { start, window_ms } => start - (elapsed_ms / window_ms) as f32,
        };
        opacity.max(0.0)
    }

    /// Ring scale at `elapsed_ms` after spawn.
    pub fn scale_at(&self, elapsed_ms: f64) -> f32 {
        match self.kind {
            EmissionKind::Shockwave => {
                1.0 + (elapsed_ms.max(0.0) / 1000.0) as f32 * self.growth_rate
            }
            _ => 1.0,
        }
    }

    /// Apply one tick: move every particle by its velocity, refresh the
    /// derived opacity and scale, and report whether the emission is done.
    pub(crate) fn advance(&mut self, now: Timestamp) -> Status {
        let elapsed = self.elapsed_ms(now);
        let started = elapsed >= self.delay_ms;

        if started {
            for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
                *p += *v;
                p.y += self.lift;
            }
            self.ticks += 1;
        }

        self.opacity = self.opacity_at(elapsed);
        self.scale = self.scale_at(elapsed);

        if elapsed > self.duration_ms || (started && self.opacity <= 0.0) {
            Status::Retired
        } else {
            Status::Active
        }
    }

    /// Borrow as a renderer-facing draw item.
    pub fn draw_item(&self) -> DrawItem<'_> {
        DrawItem {
            id: self.id,
            kind: self.kind,
            origin: self.origin,
            positions: &self.positions,
            visual: &self.visual,
            opacity: self.opacity,
            scale: self.scale,
            ring_radius: self.ring_radius(),
        }
    }
}

/// Everything a renderer needs to draw one emission.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub id: EmissionId,
    pub kind: EmissionKind,
    pub origin: Vec3,
    pub positions: &'a [Vec3],
    pub visual: &'a Visual,
    pub opacity: f32,
    pub scale: f32,
    pub ring_radius: f32,
}

/// Per-axis uniform sample in `[-1, 1)`.
fn symmetric<R: Rng>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.random::<f32>() * 2.0 - 1.0,
        rng.random::<f32>() * 2.0 - 1.0,
        rng.random::<f32>() * 2.0 - 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn spawn(config: &EmissionConfig, origin: Vec3) -> Emission {
        let mut rng = StdRng::seed_from_u64(3);
        Emission::generate(EmissionId(1), config, origin, Timestamp::ZERO, None, &mut rng)
    }

    #[test]
    fn burst_particles_start_inside_radius() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let e = spawn(&EmissionConfig::burst(), origin);
        assert_eq!(e.particle_count(), 500);
        for p in e.positions() {
            assert!(p.distance(origin) <= 0.5 + 1e-5);
        }
    }

    #[test]
    fn burst_velocity_is_bounded() {
        let e = spawn(&EmissionConfig::burst(), Vec3::ZERO);
        // Outward speed up to 0.2 plus up to 0.025 noise per axis.
        let bound = 0.2 + (3.0f32).sqrt() * 0.025 + 1e-5;
        for v in e.velocities() {
            assert!(v.length() <= bound);
        }
    }

    #[test]
    fn burst_velocity_points_outward_on_average() {
        let e = spawn(&EmissionConfig::burst(), Vec3::ZERO);
        let outward = e
            .positions()
            .iter()
            .zip(e.velocities())
            .filter(|(p, v)| p.dot(**v) > 0.0)
            .count();
        assert!(outward > 400);
    }

    #[test]
    fn smoke_spawns_at_origin_height_and_rises() {
        let origin = Vec3::new(0.0, -1.0, -5.0);
        let e = spawn(&EmissionConfig::smoke(), origin);
        assert_eq!(e.particle_count(), 50);
        for (p, v) in e.positions().iter().zip(e.velocities()) {
            assert_eq!(p.y, origin.y);
            assert!((p.x - origin.x).abs() <= 0.5);
            assert!((p.z - origin.z).abs() <= 0.5);
            assert!(v.y >= 0.05 && v.y <= 0.15 + 1e-6);
            assert!(v.x.abs() <= 0.01 && v.z.abs() <= 0.01);
        }
    }

    #[test]
    fn mushroom_spawns_in_column() {
        let e = spawn(&EmissionConfig::mushroom(), Vec3::ZERO);
        assert_eq!(e.particle_count(), 400);
        assert!(e.positions().iter().all(|p| p.y >= 0.0 && p.y <= 2.0));
        assert!(e.positions().iter().any(|p| p.y > 0.5));
        // No delay, so the fade starts from the spawn opacity.
        assert_eq!(e.opacity_at(0.0), 0.35);
        assert!(e.opacity_at(16.0) < 0.35);
    }

    #[test]
    fn ring_and_overlay_have_no_particles() {
        let ring = spawn(&EmissionConfig::shockwave(), Vec3::ZERO);
        let flash = spawn(&EmissionConfig::flash(), Vec3::ZERO);
        assert_eq!(ring.particle_count(), 0);
        assert_eq!(flash.particle_count(), 0);
        assert_eq!(ring.kind(), EmissionKind::Shockwave);
        assert!(flash.kind().is_screen_space());
    }

    #[test]
    fn linear_fade_hits_zero_at_duration() {
        let e = spawn(&EmissionConfig::burst(), Vec3::ZERO);
        assert_eq!(e.opacity_at(0.0), 1.0);
        assert!((e.opacity_at(1000.0) - 0.5).abs() < 1e-6);
        assert_eq!(e.opacity_at(2000.0), 0.0);
        assert_eq!(e.opacity_at(5000.0), 0.0);
    }

    #[test]
    fn window_fade_uses_its_own_clock() {
        let e = spawn(&EmissionConfig::smoke(), Vec3::ZERO);
        // Held at base opacity until the delay passes.
        assert_eq!(e.opacity_at(100.0), 0.2);
        assert!((e.opacity_at(600.0) - (0.3 - 0.15)).abs() < 1e-6);
        // Fade runs out at 1200ms, long before the 6000ms lifetime.
        assert_eq!(e.opacity_at(1200.0), 0.0);
    }

    #[test]
    fn shockwave_scale_and_fade() {
        let e = spawn(&EmissionConfig::shockwave(), Vec3::ZERO);
        assert_eq!(e.scale_at(0.0), 1.0);
        assert!((e.scale_at(500.0) - 4.0).abs() < 1e-6);
        assert!((e.opacity_at(500.0) - 0.4).abs() < 1e-6);
        assert_eq!(e.opacity_at(1000.0), 0.0);
    }

    #[test]
    fn delayed_emission_holds_still() {
        let mut e = spawn(&EmissionConfig::smoke(), Vec3::ZERO);
        let before = e.positions().to_vec();
        assert_eq!(e.advance(Timestamp::from_millis(100.0)), Status::Active);
        assert_eq!(e.positions(), before.as_slice());
        assert_eq!(e.ticks(), 0);
        e.advance(Timestamp::from_millis(600.0));
        assert_eq!(e.ticks(), 1);
        assert_ne!(e.positions(), before.as_slice());
    }

    #[test]
    fn lift_adds_constant_height_per_tick() {
        let mut e = spawn(&EmissionConfig::mushroom(), Vec3::ZERO);
        let p0 = e.positions()[0];
        let v0 = e.velocities()[0];
        for i in 1..=10 {
            e.advance(Timestamp::from_millis(i as f64 * 16.0));
        }
        let expected_y = p0.y + 10.0 * (v0.y + 0.01);
        assert!((e.positions()[0].y - expected_y).abs() < 1e-4);
    }

    #[test]
    fn draw_item_mirrors_state() {
        let mut e = spawn(&EmissionConfig::shockwave(), Vec3::new(0.0, -1.0, 0.0));
        e.advance(Timestamp::from_millis(500.0));
        let item = e.draw_item();
        assert_eq!(item.kind, EmissionKind::Shockwave);
        assert!((item.ring_radius - 2.0).abs() < 1e-5);
        assert!((item.opacity - 0.4).abs() < 1e-5);
        assert!(item.positions.is_empty());
    }

    #[test]
    fn kind_display() {
        assert_eq!(EmissionKind::Burst.to_string(), "burst");
        assert_eq!(EmissionKind::Flash.to_string(), "flash");
    }
}

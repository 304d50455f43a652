//! Effect presets and demo configuration.
//!
//! Every effect kind is described by one [`EmissionConfig`] row: particle
//! count, spawn shape, fade curve and visual template. `Default` carries the
//! tuned demo values; `config/blastfield.yaml` mirrors them.

use std::collections::BTreeMap;
use std::path::Path;

use blastfield_assets::AssetManifest;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::emission::EmissionKind;

/// How a sprite is composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Additive,
    Alpha,
}

/// Visual parameters fixed at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualTemplate {
    pub blend: BlendMode,
    /// World-space sprite size for particles.
    pub size: f32,
    pub base_opacity: f32,
    /// Linear RGB tint.
    pub tint: [f32; 3],
}

/// Spawn rule. The rule also decides the emission kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Shape {
    /// Points sampled inside a sphere, flying outward.
    Radial {
        max_radius: f32,
        /// Upper bound of the per-tick outward speed.
        max_speed: f32,
        /// Per-axis velocity noise, sampled in `[-jitter, jitter]`.
        jitter: f32,
    },
    /// A rising column: horizontal jitter, upward velocity.
    Plume {
        /// Horizontal half-width of the spawn area.
        spread: f32,
        /// Vertical extent of the spawn area above the origin.
        #[serde(default)]
        height: f32,
        /// Horizontal drift speed bound.
        drift: f32,
        rise_min: f32,
        rise_range: f32,
        /// Constant extra height added every tick.
        #[serde(default)]
        lift: f32,
    },
    /// A flat expanding ring, no particles.
    Ring {
        radius: f32,
        /// Scale gained per second.
        growth_rate: f32,
    },
    /// Full-viewport overlay, no particles.
    Overlay,
}

impl Shape {
    pub fn kind(&self) -> EmissionKind {
        match self {
            Shape::Radial { .. } => EmissionKind::Burst,
            Shape::Plume { .. } => EmissionKind::Smoke,
            Shape::Ring { .. } => EmissionKind::Shockwave,
            Shape::Overlay => EmissionKind::Flash,
        }
    }
}

/// Opacity curve over an emission's life.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum Fade {
    /// `base_opacity * (1 - elapsed / duration)`.
    Linear,
    /// `start - elapsed / window_ms`, independent of the emission duration.
    Window { start: f32, window_ms: f64 },
}

/// One row of the effect table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionConfig {
    /// Particle count. Ignored for rings and overlays.
    #[serde(default)]
    pub count: usize,
    /// Structural lifetime in milliseconds.
    pub duration_ms: f64,
    /// Time after spawn before particles start moving.
    #[serde(default)]
    pub delay_ms: f64,
    /// Sprite pool to draw from. `None` for effects without a sprite.
    #[serde(default)]
    pub pool: Option<String>,
    pub shape: Shape,
    pub fade: Fade,
    pub visual: VisualTemplate,
}

impl EmissionConfig {
    pub fn kind(&self) -> EmissionKind {
        self.shape.kind()
    }

    /// Number of particles an emission of this preset carries.
    pub fn particle_count(&self) -> usize {
        if self.kind().has_particles() {
            self.count
        } else {
            0
        }
    }

    pub fn burst() -> Self {
        Self {
            count: 500,
            duration_ms: 2000.0,
            delay_ms: 0.0,
            pool: Some("explosion".into()),
            shape: Shape::Radial {
                max_radius: 0.5,
                max_speed: 0.2,
                jitter: 0.025,
            },
            fade: Fade::Linear,
            visual: VisualTemplate {
                blend: BlendMode::Additive,
                size: 0.3,
                base_opacity: 1.0,
                tint: [1.0, 0.667, 0.0],
            },
        }
    }

    pub fn smoke() -> Self {
        Self {
            count: 50,
            duration_ms: 6000.0,
            delay_ms: 500.0,
            pool: Some("smoke".into()),
            shape: Shape::Plume {
                spread: 0.5,
                height: 0.0,
                drift: 0.01,
                rise_min: 0.05,
                rise_range: 0.1,
                lift: 0.0,
            },
            fade: Fade::Window {
                start: 0.3,
                window_ms: 4000.0,
            },
            visual: VisualTemplate {
                blend: BlendMode::Additive,
                size: 1.0,
                base_opacity: 0.2,
                tint: [1.0, 1.0, 1.0],
            },
        }
    }

    pub fn mushroom() -> Self {
        Self {
            count: 400,
            duration_ms: 8000.0,
            delay_ms: 0.0,
            pool: Some("smoke".into()),
            shape: Shape::Plume {
                spread: 1.5,
                height: 2.0,
                drift: 0.015,
                rise_min: 0.01,
                rise_range: 0.03,
                lift: 0.01,
            },
            fade: Fade::Window {
                start: 0.35,
                window_ms: 8000.0,
            },
            visual: VisualTemplate {
                blend: BlendMode::Alpha,
                size: 1.2,
                base_opacity: 0.35,
                tint: [0.55, 0.5, 0.45],
            },
        }
    }

    pub fn shockwave() -> Self {
        Self {
            count: 0,
            duration_ms: 1000.0,
            delay_ms: 0.0,
            pool: None,
            shape: Shape::Ring {
                radius: 0.5,
                growth_rate: 6.0,
            },
            fade: Fade::Linear,
            visual: VisualTemplate {
                blend: BlendMode::Additive,
                size: 1.0,
                base_opacity: 0.8,
                tint: [1.0, 0.8, 0.5],
            },
        }
    }

    pub fn flash() -> Self {
        Self {
            count: 0,
            duration_ms: 250.0,
            delay_ms: 0.0,
            pool: None,
            shape: Shape::Overlay,
            fade: Fade::Linear,
            visual: VisualTemplate {
                blend: BlendMode::Alpha,
                size: 1.0,
                base_opacity: 0.9,
                tint: [1.0, 0.95, 0.8],
            },
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            preset: name.to_string(),
            reason: reason.to_string(),
        };
        if !positive(self.duration_ms) {
            return Err(invalid("duration_ms must be positive"));
        }
        if self.delay_ms < 0.0 {
            return Err(invalid("delay_ms must not be negative"));
        }
        if self.kind().has_particles() && self.count == 0 {
            return Err(invalid("particle effects need a non-zero count"));
        }
        if let Fade::Window { start, window_ms } = self.fade {
            if !positive(window_ms) {
                return Err(invalid("fade window_ms must be positive"));
            }
            // Without a delay the first advance would jump straight to `start`.
            if self.delay_ms == 0.0 && start > self.visual.base_opacity {
                return Err(invalid("fade start above base_opacity with no delay"));
            }
        }
        Ok(())
    }
}

// False for NaN as well as for zero and negatives.
fn positive(v: f64) -> bool {
    v > 0.0
}

/// Falling bomb parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BombConfig {
    /// Where the bomb is re-armed on every drop.
    pub start: Vec3,
    /// Height lost per tick.
    pub fall_speed: f32,
    /// The bomb detonates once its height is at or below this.
    pub ground_height: f32,
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            start: Vec3::new(0.0, 5.0, -5.0),
            fall_speed: 0.07,
            ground_height: -1.0,
        }
    }
}

/// Errors from loading or validating a [`DemoConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("detonation chain names unknown preset `{0}`")]
    UnknownPreset(String),
    #[error("preset `{preset}`: {reason}")]
    Invalid { preset: String, reason: String },
}

/// Top-level demo configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Seed for particle sampling and sprite selection.
    pub seed: u64,
    pub bomb: BombConfig,
    /// Presets fired, in order, when the bomb lands.
    pub chain: Vec<String>,
    pub presets: BTreeMap<String, EmissionConfig>,
    pub assets: AssetManifest,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert("burst".to_string(), EmissionConfig::burst());
        presets.insert("smoke".to_string(), EmissionConfig::smoke());
        presets.insert("mushroom".to_string(), EmissionConfig::mushroom());
        presets.insert("shockwave".to_string(), EmissionConfig::shockwave());
        presets.insert("flash".to_string(), EmissionConfig::flash());

        Self {
            seed: 42,
            bomb: BombConfig::default(),
            chain: ["burst", "smoke", "shockwave", "flash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            presets,
            assets: AssetManifest::default(),
        }
    }
}

impl DemoConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.as_ref().display(), presets = config.presets.len(), "config loaded");
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.chain {
            if !self.presets.contains_key(name) {
                return Err(ConfigError::UnknownPreset(name.clone()));
            }
        }
        for (name, preset) in &self.presets {
            preset.validate(name)?;
        }
        if !positive(self.bomb.fall_speed as f64) {
            return Err(ConfigError::Invalid {
                preset: "bomb".into(),
                reason: "fall_speed must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn preset(&self, name: &str) -> Option<&EmissionConfig> {
        self.presets.get(name)
    }
}

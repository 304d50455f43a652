use std::collections::BTreeMap;

use blastfield_assets::SpritePools;
use blastfield_common::Timestamp;
use glam::Vec3;
use serde::Serialize;

use crate::bomb::Bomb;
use crate::config::{DemoConfig, EmissionConfig};
use crate::emission::{EmissionId, EmissionKind};
use crate::simulator::{Simulator, SpawnSkipped};

/// Result of one bomb landing: which parts of the chain spawned and which
/// were skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detonation {
    pub position: Vec3,
    pub at: Timestamp,
    pub spawned: Vec<EmissionId>,
    pub skipped: Vec<(String, SpawnSkipped)>,
}

/// The bomb and the simulator wired together.
///
/// A landing fires every preset of the detonation chain, in order, at the
/// landing position.
#[derive(Debug, Clone)]
pub struct Stage {
    simulator: Simulator,
    bomb: Bomb,
    presets: BTreeMap<String, EmissionConfig>,
    chain: Vec<String>,
}

impl Stage {
    pub fn from_config(config: &DemoConfig) -> Self {
        Self {
            simulator: Simulator::with_seed(config.seed),
            bomb: Bomb::from_config(&config.bomb),
            presets: config.presets.clone(),
            chain: config.chain.clone(),
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    pub fn bomb(&self) -> &Bomb {
        &self.bomb
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn preset(&self, name: &str) -> Option<&EmissionConfig> {
        self.presets.get(name)
    }

    /// Start a bomb drop unless one is falling or a burst is still active.
    pub fn drop_bomb(&mut self) -> bool {
        let explosion_active = self.simulator.has_active(EmissionKind::Burst);
        self.bomb.drop(explosion_active)
    }

    /// Spawn a single named preset.
    pub fn spawn_preset(
        &mut self,
        name: &str,
        origin: Vec3,
        now: Timestamp,
        pools: &SpritePools,
    ) -> Result<EmissionId, SpawnSkipped> {
        let Some(config) = self.presets.get(name) else {
            return Err(SpawnSkipped::UnknownPreset(name.to_string()));
        };
        self.simulator.try_spawn(config, origin, now, pools)
    }

    /// Fire the whole detonation chain at `position`.
    pub fn detonate_at(&mut self, position: Vec3, now: Timestamp, pools: &SpritePools) -> Detonation {
        let _span = tracing::info_span!("detonate").entered();
        let mut detonation = Detonation {
            position,
            at: now,
            spawned: Vec::new(),
            skipped: Vec::new(),
        };

        for name in &self.chain {
            let result = match self.presets.get(name) {
                Some(config) => self.simulator.try_spawn(config, position, now, pools),
                None => Err(SpawnSkipped::UnknownPreset(name.clone())),
            };
            match result {
                Ok(id) => detonation.spawned.push(id),
                Err(reason) => {
                    tracing::warn!(preset = %name, "chain spawn skipped: {reason}");
                    detonation.skipped.push((name.clone(), reason));
                }
            }
        }

        tracing::info!(
            ?position,
            spawned = detonation.spawned.len(),
            skipped = detonation.skipped.len(),
            "detonation"
        );
        detonation
    }

    /// One frame: advance live emissions, then move the bomb. A landing
    /// spawns the chain after the advance, so fresh emissions start
    /// untouched.
    pub fn tick(&mut self, now: Timestamp, pools: &SpritePools) -> Option<Detonation> {
        self.simulator.advance(now);
        let landed = self.bomb.tick()?;
        Some(self.detonate_at(landed, now, pools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BombConfig;
    use blastfield_assets::Sprite;

    fn pools() -> SpritePools {
        let mut pools = SpritePools::new();
        pools.insert("explosion", Sprite::builtin("flare_01.png"));
        pools.insert("smoke", Sprite::builtin("smoke_01.png"));
        pools
    }

    fn stage() -> Stage {
        let mut config = DemoConfig::default();
        config.bomb = BombConfig {
            start: Vec3::new(0.0, 5.0, 0.0),
            fall_speed: 0.07,
            ground_height: 0.5,
        };
        Stage::from_config(&config)
    }

    fn run(stage: &mut Stage, pools: &SpritePools, frames: u32) -> Vec<(u32, Detonation)> {
        let mut out = Vec::new();
        for frame in 1..=frames {
            let now = Timestamp::from_millis(frame as f64 * 16.0);
            if let Some(d) = stage.tick(now, pools) {
                out.push((frame, d));
            }
        }
        out
    }

    #[test]
    fn single_detonation_on_landing_tick() {
        let pools = pools();
        let mut stage = stage();
        assert!(stage.drop_bomb());

        let detonations = run(&mut stage, &pools, 100);
        assert_eq!(detonations.len(), 1);
        let (frame, det) = &detonations[0];
        assert_eq!(*frame, 65);
        assert_eq!(det.spawned.len(), 4);
        assert!(det.skipped.is_empty());
        assert!(!stage.bomb().is_falling());

        let sim = stage.simulator();
        assert!(sim.has_active(EmissionKind::Burst));
        assert!(sim.has_active(EmissionKind::Smoke));
    }

    #[test]
    fn drop_rejected_while_falling_or_exploding() {
        let pools = pools();
        let mut stage = stage();
        assert!(stage.drop_bomb());
        assert!(!stage.drop_bomb());

        run(&mut stage, &pools, 65);
        assert!(stage.simulator().has_active(EmissionKind::Burst));
        assert!(!stage.drop_bomb());

        // Burst lasts 2000ms; the 16ms clock started at 1040ms.
        let mut now = 1040.0;
        while stage.simulator().has_active(EmissionKind::Burst) {
            now += 16.0;
            stage.tick(Timestamp::from_millis(now), &pools);
        }
        assert!(stage.drop_bomb());
    }

    #[test]
    fn cold_pools_skip_sprite_presets() {
        let empty = SpritePools::new();
        let mut stage = stage();
        let det = stage.detonate_at(Vec3::ZERO, Timestamp::ZERO, &empty);
        assert_eq!(det.spawned.len(), 2);
        let names: Vec<&str> = det.skipped.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["burst", "smoke"]);
        assert!(stage.simulator().has_active(EmissionKind::Shockwave));
        assert!(stage.simulator().has_active(EmissionKind::Flash));
    }

    #[test]
    fn unknown_preset_is_skipped() {
        let mut stage = stage();
        let err = stage
            .spawn_preset("nuke", Vec3::ZERO, Timestamp::ZERO, &pools())
            .unwrap_err();
        assert_eq!(err, SpawnSkipped::UnknownPreset("nuke".into()));
        assert!(stage.spawn_preset("mushroom", Vec3::ZERO, Timestamp::ZERO, &pools()).is_ok());
    }
}

use std::collections::BTreeMap;

use blastfield_assets::SpritePools;
use blastfield_common::Timestamp;
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::EmissionConfig;
use crate::emission::{DrawItem, Emission, EmissionId, EmissionKind, Status};

/// Why a spawn request produced nothing. Never surfaced as a failure; the
/// request is dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum SpawnSkipped {
    #[error("sprite pool `{0}` is not loaded yet")]
    AssetNotReady(String),
    #[error("unknown effect preset `{0}`")]
    UnknownPreset(String),
}

/// A record of every change to the active set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FxEvent {
    /// A new emission entered the active set.
    Spawned {
        id: EmissionId,
        kind: EmissionKind,
        at: Timestamp,
        particles: usize,
    },
    /// An exclusive emission was torn down to make room for `by`.
    Preempted { id: EmissionId, by: EmissionId },
    /// A spawn request was dropped.
    Skipped {
        kind: EmissionKind,
        reason: SpawnSkipped,
    },
    /// An emission was removed on request before it finished.
    TornDown { id: EmissionId, kind: EmissionKind },
    /// An emission ran out its lifetime and left the active set.
    Retired {
        id: EmissionId,
        kind: EmissionKind,
        at: Timestamp,
    },
}

/// Owns every active emission and advances them once per frame.
///
/// The render loop calls [`advance`](Self::advance) exactly once per frame.
/// Emissions never schedule themselves; retirement removes them from the
/// iterated set.
#[derive(Debug, Clone)]
pub struct Simulator {
    emissions: BTreeMap<EmissionId, Emission>,
    next_id: u64,
    tick: u64,
    seed: u64,
    rng: StdRng,
    event_log: Vec<FxEvent>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A simulator whose particle sampling is reproducible from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            emissions: BTreeMap::new(),
            next_id: 1,
            tick: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
            event_log: Vec::new(),
        }
    }

    /// Number of completed `advance` calls.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn active_count(&self) -> usize {
        self.emissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }

    pub fn get(&self, id: EmissionId) -> Option<&Emission> {
        self.emissions.get(&id)
    }

    /// Active emissions in spawn order.
    pub fn emissions(&self) -> impl Iterator<Item = &Emission> {
        self.emissions.values()
    }

    pub fn count_of(&self, kind: EmissionKind) -> usize {
        self.emissions().filter(|e| e.kind() == kind).count()
    }

    pub fn has_active(&self, kind: EmissionKind) -> bool {
        self.emissions().any(|e| e.kind() == kind)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[FxEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<FxEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Spawn an emission, or report why nothing was spawned.
    ///
    /// A skipped request leaves the active set untouched: an active burst is
    /// only torn down once its replacement is certain to spawn.
    pub fn try_spawn(
        &mut self,
        config: &EmissionConfig,
        origin: Vec3,
        now: Timestamp,
        pools: &SpritePools,
    ) -> Result<EmissionId, SpawnSkipped> {
        let kind = config.kind();

        let sprite = match &config.pool {
            Some(pool) => match pools.choose(pool, &mut self.rng) {
                Some(sprite) => Some(sprite.id),
                None => {
                    let reason = SpawnSkipped::AssetNotReady(pool.clone());
                    self.event_log.push(FxEvent::Skipped {
                        kind,
                        reason: reason.clone(),
                    });
                    return Err(reason);
                }
            },
            None => None,
        };

        let id = EmissionId(self.next_id);
        self.next_id += 1;

        if kind.is_exclusive() {
            let previous: Vec<EmissionId> = self
                .emissions
                .values()
                .filter(|e| e.kind() == kind)
                .map(Emission::id)
                .collect();
            for old in previous {
                self.emissions.remove(&old);
                tracing::debug!(old = old.0, new = id.0, %kind, "emission preempted");
                self.event_log.push(FxEvent::Preempted { id: old, by: id });
            }
        }

        let emission = Emission::generate(id, config, origin, now, sprite, &mut self.rng);
        let particles = emission.particle_count();
        self.emissions.insert(id, emission);
        self.event_log.push(FxEvent::Spawned {
            id,
            kind,
            at: now,
            particles,
        });
        tracing::debug!(id = id.0, %kind, particles, ?origin, "emission spawned");
        Ok(id)
    }

    /// Spawn an emission. Returns `None` when the request was skipped,
    /// which callers must tolerate (sprites may still be loading).
    pub fn spawn(
        &mut self,
        config: &EmissionConfig,
        origin: Vec3,
        now: Timestamp,
        pools: &SpritePools,
    ) -> Option<EmissionId> {
        match self.try_spawn(config, origin, now, pools) {
            Ok(id) => Some(id),
            Err(reason) => {
                tracing::warn!(kind = %config.kind(), "spawn skipped: {reason}");
                None
            }
        }
    }

    /// Tear an emission down immediately.
    pub fn teardown(&mut self, id: EmissionId) -> Option<Emission> {
        let emission = self.emissions.remove(&id)?;
        tracing::debug!(id = id.0, kind = %emission.kind(), "emission torn down");
        self.event_log.push(FxEvent::TornDown {
            id,
            kind: emission.kind(),
        });
        Some(emission)
    }

    /// Advance every active emission by one tick and retire the finished
    /// ones. Returns the ids retired this tick.
    pub fn advance(&mut self, now: Timestamp) -> Vec<EmissionId> {
        let _span = tracing::info_span!("fx_advance").entered();
        self.tick += 1;

        let mut retired = Vec::new();
        for (id, emission) in self.emissions.iter_mut() {
            if emission.advance(now) == Status::Retired {
                retired.push(*id);
            }
        }

        for id in &retired {
            if let Some(e) = self.emissions.remove(id) {
                tracing::debug!(id = id.0, kind = %e.kind(), "emission retired");
                self.event_log.push(FxEvent::Retired {
                    id: *id,
                    kind: e.kind(),
                    at: now,
                });
            }
        }

        tracing::trace!(
            tick = self.tick,
            active = self.emissions.len(),
            retired = retired.len(),
            "fx advance complete"
        );

        retired
    }

    /// Draw-ready view of every active emission.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        self.emissions.values().map(Emission::draw_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastfield_assets::Sprite;

    fn ms(t: f64) -> Timestamp {
        Timestamp::from_millis(t)
    }

    fn loaded_pools() -> SpritePools {
        let mut pools = SpritePools::new();
        for name in ["flare_01.png", "spark_01.png"] {
            pools.insert("explosion", Sprite::builtin(name));
        }
        pools.insert("smoke", Sprite::builtin("smoke_01.png"));
        pools
    }

    fn burst(count: usize, radius: f32) -> EmissionConfig {
        let mut cfg = EmissionConfig::burst();
        cfg.count = count;
        if let crate::config::Shape::Radial { max_radius, .. } = &mut cfg.shape {
            *max_radius = radius;
        }
        cfg
    }

    #[test]
    fn simulator_starts_empty() {
        let sim = Simulator::new();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.active_count(), 0);
        assert!(sim.draw_list().is_empty());
    }

    #[test]
    fn particle_count_is_fixed_for_life() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(1);
        let b = sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        let s = sim.spawn(&EmissionConfig::smoke(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        for i in 1..=60 {
            sim.advance(ms(i as f64 * 16.0));
            assert_eq!(sim.get(b).unwrap().particle_count(), 500);
            assert_eq!(sim.get(s).unwrap().particle_count(), 50);
        }
    }

    #[test]
    fn step_ignores_frame_delta() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(2);
        let id = sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        let start = sim.get(id).unwrap().positions().to_vec();
        let vel = sim.get(id).unwrap().velocities().to_vec();

        // Wildly uneven frame times: 1ms, 50ms, 3ms, 200ms.
        for t in [1.0, 51.0, 54.0, 254.0] {
            sim.advance(ms(t));
        }

        let e = sim.get(id).unwrap();
        for i in 0..e.particle_count() {
            let expected = start[i] + vel[i] * 4.0;
            assert!(e.positions()[i].distance(expected) < 1e-5);
        }
    }

    #[test]
    fn opacity_never_increases_for_linear_kinds() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(3);
        let ids = [
            sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap(),
            sim.spawn(&EmissionConfig::shockwave(), Vec3::ZERO, ms(0.0), &pools).unwrap(),
            sim.spawn(&EmissionConfig::flash(), Vec3::ZERO, ms(0.0), &pools).unwrap(),
        ];
        for id in ids {
            let e = sim.get(id).unwrap();
            let mut last = f32::INFINITY;
            let mut t = 0.0;
            while t <= e.duration_ms() {
                let o = e.opacity_at(t);
                assert!(o <= last);
                last = o;
                t += 7.0;
            }
            assert_eq!(e.opacity_at(e.duration_ms()), 0.0);
        }
    }

    #[test]
    fn new_burst_replaces_old_one() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(4);
        let first = sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        for i in 1..=10 {
            sim.advance(ms(i as f64 * 16.0));
        }

        let far = Vec3::new(100.0, 0.0, 0.0);
        let second = sim.spawn(&EmissionConfig::burst(), far, ms(170.0), &pools).unwrap();

        assert_ne!(first, second);
        assert_eq!(sim.count_of(EmissionKind::Burst), 1);
        assert!(sim.get(first).is_none());
        let e = sim.get(second).unwrap();
        assert_eq!(e.ticks(), 0);
        assert!(e.positions().iter().all(|p| p.distance(far) <= 0.5 + 1e-4));
        assert!(sim.events().contains(&FxEvent::Preempted {
            id: first,
            by: second
        }));
    }

    #[test]
    fn bursts_do_not_evict_other_kinds() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(5);
        sim.spawn(&EmissionConfig::smoke(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        sim.spawn(&EmissionConfig::smoke(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        sim.spawn(&EmissionConfig::shockwave(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        assert_eq!(sim.count_of(EmissionKind::Smoke), 2);
        assert_eq!(sim.count_of(EmissionKind::Shockwave), 1);
        assert_eq!(sim.count_of(EmissionKind::Burst), 1);
        assert_eq!(sim.active_count(), 4);
    }

    #[test]
    fn empty_pool_skips_spawn() {
        let empty = SpritePools::new();
        let mut sim = Simulator::with_seed(6);
        assert!(sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &empty).is_none());
        assert!(sim.spawn(&EmissionConfig::smoke(), Vec3::ZERO, ms(0.0), &empty).is_none());
        assert_eq!(sim.active_count(), 0);
        assert_eq!(
            sim.events(),
            &[
                FxEvent::Skipped {
                    kind: EmissionKind::Burst,
                    reason: SpawnSkipped::AssetNotReady("explosion".into()),
                },
                FxEvent::Skipped {
                    kind: EmissionKind::Smoke,
                    reason: SpawnSkipped::AssetNotReady("smoke".into()),
                },
            ]
        );
    }

    #[test]
    fn skipped_burst_keeps_active_burst() {
        let mut pools = loaded_pools();
        let mut sim = Simulator::with_seed(7);
        let first = sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        pools.clear();
        assert!(sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(10.0), &pools).is_none());
        assert!(sim.get(first).is_some());
        assert_eq!(sim.active_count(), 1);
    }

    #[test]
    fn spriteless_kinds_need_no_pool() {
        let empty = SpritePools::new();
        let mut sim = Simulator::with_seed(8);
        assert!(sim.spawn(&EmissionConfig::shockwave(), Vec3::ZERO, ms(0.0), &empty).is_some());
        assert!(sim.spawn(&EmissionConfig::flash(), Vec3::ZERO, ms(0.0), &empty).is_some());
        assert_eq!(sim.active_count(), 2);
    }

    #[test]
    fn burst_end_to_end() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(9);
        let id = sim.spawn(&burst(500, 0.5), Vec3::ZERO, ms(0.0), &pools).unwrap();
        let start = sim.get(id).unwrap().positions().to_vec();
        let vel = sim.get(id).unwrap().velocities().to_vec();

        let mut ticks = 0.0;
        for i in 1..=10 {
            sim.advance(ms(i as f64 * 100.0));
            ticks += 1.0;
        }

        let e = sim.get(id).unwrap();
        assert!((e.opacity() - 0.5).abs() < 1e-4);
        for i in 0..500 {
            let moved = e.positions()[i] - start[i];
            assert!(moved.distance(vel[i] * ticks) < 1e-5);
        }

        let retired = sim.advance(ms(2001.0));
        assert_eq!(retired, vec![id]);
        assert!(sim.get(id).is_none());
        assert!(!sim.has_active(EmissionKind::Burst));
        assert!(matches!(
            sim.events().last(),
            Some(FxEvent::Retired { kind: EmissionKind::Burst, .. })
        ));
    }

    #[test]
    fn smoke_outlives_its_fade_window_only_until_faded() {
        let pools = loaded_pools();
        let mut sim = Simulator::with_seed(10);
        let id = sim.spawn(&EmissionConfig::smoke(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        sim.advance(ms(1100.0));
        assert!(sim.get(id).is_some());
        sim.advance(ms(1200.0));
        assert!(sim.get(id).is_none());
    }

    #[test]
    fn same_seed_same_particles() {
        let pools = loaded_pools();
        let mut a = Simulator::with_seed(11);
        let mut b = Simulator::with_seed(11);
        let ia = a.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        let ib = b.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        let ea = a.get(ia).unwrap();
        let eb = b.get(ib).unwrap();
        assert_eq!(ea.positions(), eb.positions());
        assert_eq!(ea.visual().sprite, eb.visual().sprite);
    }

    #[test]
    fn teardown_and_drain() {
        let pools = loaded_pools();
        let mut sim = Simulator::new();
        let id = sim.spawn(&EmissionConfig::flash(), Vec3::ZERO, ms(0.0), &pools).unwrap();
        assert!(sim.teardown(id).is_some());
        assert!(sim.teardown(id).is_none());
        assert!(sim.is_empty());
        let events = sim.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], FxEvent::Spawned { .. }));
        assert_eq!(
            events[1],
            FxEvent::TornDown {
                id,
                kind: EmissionKind::Flash
            }
        );
        assert!(sim.events().is_empty());
    }

    #[test]
    fn draw_list_covers_active_set() {
        let pools = loaded_pools();
        let mut sim = Simulator::new();
        sim.spawn(&EmissionConfig::burst(), Vec3::ZERO, ms(0.0), &pools);
        sim.spawn(&EmissionConfig::flash(), Vec3::ZERO, ms(0.0), &pools);
        let list = sim.draw_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].kind, EmissionKind::Burst);
        assert_eq!(list[0].positions.len(), 500);
        assert!(list[0].visual.sprite.is_some());
        assert!(list[1].visual.sprite.is_none());
    }
}

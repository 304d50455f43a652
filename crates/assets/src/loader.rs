use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{AssetError, Sprite, SpriteId, SpritePools, SpriteSource};

/// Which sprites belong to which pool, and where to find them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    /// Directory the sprite files live in. `None` registers built-in
    /// procedural sprites under the same names instead of reading files.
    pub dir: Option<PathBuf>,
    /// Maximum number of sprites loaded per frame.
    pub load_budget: usize,
    /// Pool name to sprite file names.
    pub pools: BTreeMap<String, Vec<String>>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        let explosion = [
            "circle_01.png",
            "dirt_01.png",
            "flame_01.png",
            "fire_01.png",
            "flare_01.png",
            "light_01.png",
            "magic_01.png",
            "star_01.png",
            "spark_01.png",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let smoke = (1..=9).map(|i| format!("smoke_{i:02}.png")).collect();

        let mut pools = BTreeMap::new();
        pools.insert("explosion".to_string(), explosion);
        pools.insert("smoke".to_string(), smoke);

        Self {
            dir: None,
            load_budget: 2,
            pools,
        }
    }
}

impl AssetManifest {
    /// Total number of sprite entries across all pools.
    pub fn sprite_count(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }
}

/// Progress report from one [`SpriteLoader::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded_this_frame: usize,
    pub failed_this_frame: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
struct PendingSprite {
    pool: String,
    name: String,
    path: Option<PathBuf>,
}

/// Loads manifest sprites into [`SpritePools`] under a per-frame budget.
///
/// Nothing is loaded until [`poll`](Self::poll) runs, so the first frames
/// after startup always see empty pools.
#[derive(Debug, Clone)]
pub struct SpriteLoader {
    queue: VecDeque<PendingSprite>,
    budget: usize,
    loaded: usize,
    failed: usize,
}

impl SpriteLoader {
    pub fn new(manifest: &AssetManifest) -> Self {
        let mut queue = VecDeque::with_capacity(manifest.sprite_count());
        // Interleave pools so every pool gets its first sprite early.
        let longest = manifest.pools.values().map(Vec::len).max().unwrap_or(0);
        for i in 0..longest {
            for (pool, names) in &manifest.pools {
                if let Some(name) = names.get(i) {
                    queue.push_back(PendingSprite {
                        pool: pool.clone(),
                        name: name.clone(),
                        path: manifest.dir.as_ref().map(|d| d.join(name)),
                    });
                }
            }
        }
        Self {
            queue,
            budget: manifest.load_budget.max(1),
            loaded: 0,
            failed: 0,
        }
    }

    /// Load up to the per-frame budget of pending sprites.
    pub fn poll(&mut self, pools: &mut SpritePools) -> LoadProgress {
        let mut progress = LoadProgress::default();
        for _ in 0..self.budget {
            let Some(pending) = self.queue.pop_front() else {
                break;
            };
            let sprite = match &pending.path {
                Some(path) => load_file(&pending.name, path),
                None => Ok(Sprite::builtin(pending.name.clone())),
            };
            match sprite {
                Ok(sprite) => {
                    tracing::debug!(pool = %pending.pool, sprite = %sprite.name, "sprite loaded");
                    pools.insert(&pending.pool, sprite);
                    progress.loaded_this_frame += 1;
                }
                Err(e) => {
                    tracing::warn!(pool = %pending.pool, "{e}");
                    progress.failed_this_frame += 1;
                }
            }
        }
        self.loaded += progress.loaded_this_frame;
        self.failed += progress.failed_this_frame;
        progress.remaining = self.queue.len();
        progress
    }

    /// Drain the whole queue regardless of budget.
    pub fn load_all(&mut self, pools: &mut SpritePools) -> LoadProgress {
        let mut total = LoadProgress::default();
        while !self.is_finished() {
            let p = self.poll(pools);
            total.loaded_this_frame += p.loaded_this_frame;
            total.failed_this_frame += p.failed_this_frame;
        }
        total
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

fn load_file(name: &str, path: &Path) -> Result<Sprite, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(AssetError::Empty(path.to_path_buf()));
    }
    Ok(Sprite {
        name: name.to_string(),
        id: SpriteId::from_bytes(&bytes),
        source: SpriteSource::File(path.to_path_buf()),
        byte_len: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_matches_demo_pools() {
        let m = AssetManifest::default();
        assert_eq!(m.pools["explosion"].len(), 9);
        assert_eq!(m.pools["smoke"].len(), 9);
        assert_eq!(m.pools["smoke"][0], "smoke_01.png");
        assert_eq!(m.sprite_count(), 18);
    }

    #[test]
    fn pools_stay_empty_until_polled() {
        let loader = SpriteLoader::new(&AssetManifest::default());
        let pools = SpritePools::new();
        assert_eq!(loader.remaining(), 18);
        assert!(!pools.is_ready("explosion"));
    }

    #[test]
    fn poll_respects_budget() {
        let mut loader = SpriteLoader::new(&AssetManifest::default());
        let mut pools = SpritePools::new();
        let p = loader.poll(&mut pools);
        assert_eq!(p.loaded_this_frame, 2);
        assert_eq!(p.remaining, 16);
        // Interleaved: one sprite per pool after the first frame.
        assert_eq!(pools.pool("explosion").len(), 1);
        assert_eq!(pools.pool("smoke").len(), 1);
    }

    #[test]
    fn load_all_drains_queue() {
        let mut loader = SpriteLoader::new(&AssetManifest::default());
        let mut pools = SpritePools::new();
        let total = loader.load_all(&mut pools);
        assert!(loader.is_finished());
        assert_eq!(total.loaded_this_frame, 18);
        assert_eq!(loader.loaded(), 18);
        assert_eq!(pools.total(), 18);
    }

    #[test]
    fn loads_files_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spark_01.png"), b"spark-bytes").unwrap();
        std::fs::write(dir.path().join("empty.png"), b"").unwrap();

        let mut pools_map = BTreeMap::new();
        pools_map.insert(
            "explosion".to_string(),
            vec![
                "spark_01.png".to_string(),
                "missing.png".to_string(),
                "empty.png".to_string(),
            ],
        );
        let manifest = AssetManifest {
            dir: Some(dir.path().to_path_buf()),
            load_budget: 8,
            pools: pools_map,
        };

        let mut loader = SpriteLoader::new(&manifest);
        let mut pools = SpritePools::new();
        let p = loader.poll(&mut pools);
        assert_eq!(p.loaded_this_frame, 1);
        assert_eq!(p.failed_this_frame, 2);
        assert_eq!(loader.failed(), 2);

        let sprite = &pools.pool("explosion")[0];
        assert_eq!(sprite.name, "spark_01.png");
        assert_eq!(sprite.byte_len, 11);
        assert_eq!(sprite.id, SpriteId::from_bytes(b"spark-bytes"));
        assert!(matches!(sprite.source, SpriteSource::File(_)));
    }

    #[test]
    fn zero_budget_still_progresses() {
        let manifest = AssetManifest {
            load_budget: 0,
            ..AssetManifest::default()
        };
        let mut loader = SpriteLoader::new(&manifest);
        let mut pools = SpritePools::new();
        assert_eq!(loader.poll(&mut pools).loaded_this_frame, 1);
    }
}

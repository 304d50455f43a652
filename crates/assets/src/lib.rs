//! Sprite pools: named collections of interchangeable sprites.
//!
//! Effects pick a sprite uniformly at random from a pool when they spawn.
//! Pools start empty and are filled by [`SpriteLoader`] a few sprites per
//! frame, so callers must treat "pool empty" as a normal state.
//!
//! Sprites are identified by content-addressed hashes. The renderer consumes
//! sprites by id, never by raw file paths.

mod loader;

pub use loader::{AssetManifest, LoadProgress, SpriteLoader};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Content-addressed sprite ID computed from the sprite data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(pub u64);

impl SpriteId {
    /// Hash raw bytes into an id.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        let mut id = [0u8; 8];
        id.copy_from_slice(&result[..8]);
        SpriteId(u64::from_le_bytes(id))
    }

    /// Small stable variant index, used by renderers without real textures
    /// to vary the procedural sprite shape.
    pub fn variant(self, variants: u32) -> u32 {
        (self.0 % variants.max(1) as u64) as u32
    }
}

/// Where a sprite's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteSource {
    /// Loaded from a file on disk.
    File(PathBuf),
    /// Generated by the renderer; no backing file.
    Builtin,
}

/// A loaded sprite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub name: String,
    pub id: SpriteId,
    pub source: SpriteSource,
    pub byte_len: u64,
}

impl Sprite {
    /// A built-in sprite, hashed from its name.
    pub fn builtin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: SpriteId::from_bytes(name.as_bytes()),
            name,
            source: SpriteSource::Builtin,
            byte_len: 0,
        }
    }
}

/// Errors from sprite loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read sprite {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sprite file {0} is empty")]
    Empty(PathBuf),
}

/// Named sprite pools.
///
/// Pool membership is deduplicated by content id, so loading the same file
/// twice does not skew random selection.
#[derive(Debug, Clone, Default)]
pub struct SpritePools {
    pools: BTreeMap<String, Vec<Sprite>>,
}

impl SpritePools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sprite to a pool. Returns false if the pool already held a
    /// sprite with the same content id.
    pub fn insert(&mut self, pool: &str, sprite: Sprite) -> bool {
        let entries = self.pools.entry(pool.to_string()).or_default();
        if entries.iter().any(|s| s.id == sprite.id) {
            return false;
        }
        entries.push(sprite);
        true
    }

    /// All sprites in a pool. Unknown pools are empty.
    pub fn pool(&self, name: &str) -> &[Sprite] {
        self.pools.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True once the pool holds at least one sprite.
    pub fn is_ready(&self, name: &str) -> bool {
        !self.pool(name).is_empty()
    }

    /// Pick a sprite uniformly at random. `None` while the pool is empty.
    pub fn choose<R: Rng>(&self, name: &str, rng: &mut R) -> Option<&Sprite> {
        let pool = self.pool(name);
        if pool.is_empty() {
            return None;
        }
        Some(&pool[rng.random_range(0..pool.len())])
    }

    /// Pool names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Total number of sprites across all pools.
    pub fn total(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

pub fn crate_info() -> &'static str {
    "blastfield-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn unknown_pool_is_empty() {
        let pools = SpritePools::new();
        assert!(pools.pool("explosion").is_empty());
        assert!(!pools.is_ready("explosion"));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pools.choose("explosion", &mut rng).is_none());
    }

    #[test]
    fn content_addressed_dedup() {
        let mut pools = SpritePools::new();
        assert!(pools.insert("smoke", Sprite::builtin("smoke_01.png")));
        assert!(!pools.insert("smoke", Sprite::builtin("smoke_01.png")));
        assert!(pools.insert("smoke", Sprite::builtin("smoke_02.png")));
        assert_eq!(pools.pool("smoke").len(), 2);
        assert_eq!(pools.total(), 2);
    }

    #[test]
    fn choose_covers_whole_pool() {
        let mut pools = SpritePools::new();
        for name in ["a", "b", "c"] {
            pools.insert("fx", Sprite::builtin(name));
        }
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(pools.choose("fx", &mut rng).unwrap().name.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn sprite_id_is_stable() {
        assert_eq!(SpriteId::from_bytes(b"flare"), SpriteId::from_bytes(b"flare"));
        assert_ne!(SpriteId::from_bytes(b"flare"), SpriteId::from_bytes(b"spark"));
        assert!(SpriteId::from_bytes(b"flare").variant(4) < 4);
    }
}

//! Write-once store for per-segment artifacts. File names carry a fingerprint
//! of every input the artifact depends on, so changed velocities, lengths or
//! timesteps miss the cache instead of reading stale data.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::models::{ArtifactKey, ElapsedTimeTable, Segment};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Distance made good per timestep
    Rates,
    Elapsed,
}

impl ArtifactKind {
    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Rates => "rate.json",
            ArtifactKind::Elapsed => "elapsed.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self, key: &ArtifactKey, fingerprint: u64, kind: ArtifactKind) -> PathBuf {
        let segment: String = key
            .segment
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{}_{}_{:016x}.{}", segment, key.speed, fingerprint, kind.extension()))
    }

    pub fn load_rates(&self, key: &ArtifactKey, fingerprint: u64) -> Option<Vec<f64>> {
        self.read(&self.path(key, fingerprint, ArtifactKind::Rates))
    }

    pub fn store_rates(&self, key: &ArtifactKey, fingerprint: u64, rates: &[f64]) -> Result<()> {
        self.write(&self.path(key, fingerprint, ArtifactKind::Rates), rates)
    }

    pub fn load_table(&self, key: &ArtifactKey, fingerprint: u64) -> Option<ElapsedTimeTable> {
        self.read(&self.path(key, fingerprint, ArtifactKind::Elapsed))
    }

    pub fn store_table(&self, key: &ArtifactKey, fingerprint: u64, table: &ElapsedTimeTable) -> Result<()> {
        self.write(&self.path(key, fingerprint, ArtifactKind::Elapsed), table)
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let text = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => {
                debug!("Cache hit: {}", path.display());
                Some(value)
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes through a temporary file so readers never see a partial entry.
    /// An existing entry is kept unless it no longer parses.
    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if let Ok(text) = fs::read_to_string(path) {
            if serde_json::from_str::<serde_json::Value>(&text).is_ok() {
                return Ok(());
            }
            warn!("Replacing unreadable cache entry {}", path.display());
        }
        let text = serde_json::to_string(value)?;
        let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        debug!("Cached {}", path.display());
        Ok(())
    }
}

/// Hash of everything a segment artifact is derived from.
pub fn fingerprint(segment: &Segment, timestep_seconds: f64) -> u64 {
    let mut hasher = DefaultHasher::new();
    segment.id.hash(&mut hasher);
    segment.length.to_bits().hash(&mut hasher);
    timestep_seconds.to_bits().hash(&mut hasher);
    for series in [&segment.start, &segment.end] {
        series.node.hash(&mut hasher);
        for v in &series.velocities {
            v.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::VelocitySeries;
    use tempfile::tempdir;

    fn segment(length: f64, current: f64) -> Segment {
        Segment::new(
            length,
            VelocitySeries::constant("North Head", current, 8),
            VelocitySeries::constant("Point/B", current, 8),
        )
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let base = fingerprint(&segment(4.0, 1.0), 300.0);
        assert_eq!(base, fingerprint(&segment(4.0, 1.0), 300.0));
        assert_ne!(base, fingerprint(&segment(4.5, 1.0), 300.0));
        assert_ne!(base, fingerprint(&segment(4.0, 1.25), 300.0));
        assert_ne!(base, fingerprint(&segment(4.0, 1.0), 600.0));
    }

    #[test]
    fn test_table_round_trip_and_stale_miss() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::open(dir.path().join("artifacts")).unwrap();
        let seg = segment(4.0, 1.0);
        let key = ArtifactKey::new(seg.id.clone(), 5.0);
        let fp = fingerprint(&seg, 300.0);
        let table = ElapsedTimeTable::new(vec![3, 3, 4]);

        assert!(cache.load_table(&key, fp).is_none());
        cache.store_table(&key, fp, &table).unwrap();
        assert_eq!(cache.load_table(&key, fp), Some(table));
        assert!(cache.load_table(&key, fp ^ 1).is_none());
    }

    #[test]
    fn test_file_names_are_sanitised() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::open(dir.path()).unwrap();
        let key = ArtifactKey::new(segment(1.0, 0.0).id, -2.5);
        let name = cache.path(&key, 0xab, ArtifactKind::Rates);
        let name = name.file_name().unwrap().to_string_lossy();
        assert_eq!(name, "North_Head-Point_B_-2.5_00000000000000ab.rate.json");
    }

    #[test]
    fn test_corrupt_entry_is_ignored() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::open(dir.path()).unwrap();
        let key = ArtifactKey::new(segment(1.0, 0.0).id, 3.0);
        fs::write(cache.path(&key, 7, ArtifactKind::Rates), "not json").unwrap();
        assert!(cache.load_rates(&key, 7).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_replaced() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::open(dir.path()).unwrap();
        let key = ArtifactKey::new(segment(1.0, 0.0).id, 3.0);
        let path = cache.path(&key, 7, ArtifactKind::Elapsed);
        fs::write(&path, "{\"steps\":[3,3").unwrap();
        assert!(cache.load_table(&key, 7).is_none());

        let table = ElapsedTimeTable::new(vec![3, 3, 2]);
        cache.store_table(&key, 7, &table).unwrap();
        assert_eq!(cache.load_table(&key, 7), Some(table));
        // only the entry itself remains
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

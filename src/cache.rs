//! Persistent key-value cache, backed by an embedded `sled` store. The
//! cache is the only shared mutable resource in the system: keys are
//! independent, last-writer-wins, and a lost update merely costs a future
//! re-resolve, so no locking beyond what `sled` itself provides is needed.

use crate::error::Result;
use crate::types::ResolvedLocation;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    location: ResolvedLocation,
    expires_at: u64,
}

/// An optional capability: when absent, the handler runs cache-less and
/// every request fully resolves (section 5's "process-wide state" note).
#[derive(Clone)]
pub struct Cache {
    db: sled::Db,
    ttl_secs: u64,
}

impl Cache {
    pub fn open(path: &str, ttl_secs: u64) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db, ttl_secs })
    }

    pub fn get(&self, key: &str) -> Option<ResolvedLocation> {
        match self.db.get(key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<StoredEntry>(&bytes) {
                Ok(entry) => {
                    if entry.expires_at < now_secs() {
                        debug!(key, "cache entry expired");
                        None
                    } else {
                        Some(entry.location)
                    }
                }
                Err(e) => {
                    warn!(key, error = %e, "failed to deserialize cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read error");
                None
            }
        }
    }

    pub fn put(&self, key: &str, location: &ResolvedLocation) {
        let entry = StoredEntry {
            location: location.clone(),
            expires_at: now_secs() + self.ttl_secs,
        };
        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(e) = self.db.insert(key, bytes) {
                    warn!(key, error = %e, "cache write error");
                }
            }
            Err(e) => warn!(key, error = %e, "failed to serialize cache entry"),
        }
    }

    pub fn delete(&self, key: &str) {
        if let Err(e) = self.db.remove(key) {
            warn!(key, error = %e, "cache delete error");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> (Cache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path().to_str().unwrap(), 2_592_000).unwrap();
        (cache, dir)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (cache, _dir) = temp_cache();
        let loc = ResolvedLocation {
            location_name: "Perth, Australia".to_string(),
            location_coord: Some([-31.9523, 115.8613]),
        };
        cache.put("artist:tame impala", &loc);
        assert_eq!(cache.get("artist:tame impala"), Some(loc));
    }

    #[test]
    fn missing_key_is_none() {
        let (cache, _dir) = temp_cache();
        assert_eq!(cache.get("artist:nobody"), None);
    }

    #[test]
    fn delete_removes_entry() {
        let (cache, _dir) = temp_cache();
        let loc = ResolvedLocation::unknown();
        cache.put("artist:x", &loc);
        cache.delete("artist:x");
        assert_eq!(cache.get("artist:x"), None);
    }

    #[test]
    fn expired_entry_reads_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path().to_str().unwrap(), 0).unwrap();
        let loc = ResolvedLocation::unknown();
        cache.put("artist:stale", &loc);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(cache.get("artist:stale"), None);
    }
}

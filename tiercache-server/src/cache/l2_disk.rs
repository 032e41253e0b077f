//! L2 Disk Cache
//!
//! Larger overflow tier. The in-memory index is authoritative for every read;
//! each write is mirrored to a per-key file by the write-behind [`Persister`]
//! and those files are never read back during normal operation. Disk
//! failures degrade L2 to a memory-only tier without surfacing errors.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::persister::{PersistHook, Persister, decode_blob};
use super::stats::TierStats;
use crate::compression::{CompressionConfig, Compressor};
use crate::core::{CacheEntry, now_millis};

/// L2 Disk Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct L2CacheConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub max_entries: usize,
    /// Gzip blobs and use the `.json.gz` extension
    pub compression: bool,
    /// Maximum pending disk writes; overflow drops writes, never removals
    pub queue_capacity: usize,
    /// Rebuild the index from existing files at startup
    pub rehydrate_on_start: bool,
}

impl Default for L2CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("./data/cache/l2"),
            max_entries: 10_000,
            compression: true,
            queue_capacity: 1024,
            rehydrate_on_start: false,
        }
    }
}

#[derive(Debug, Default)]
struct L2State {
    index: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// L2 Disk Cache
#[derive(Debug)]
pub struct L2DiskCache {
    config: L2CacheConfig,
    compressor: Compressor,
    state: Mutex<L2State>,
    persister: Persister,
}

impl L2DiskCache {
    /// Open the L2 tier. Must be called inside a tokio runtime.
    pub fn open(config: L2CacheConfig) -> Self {
        Self::open_with_hook(config, None)
    }

    /// Open the L2 tier with an observability hook for disk operations
    pub fn open_with_hook(mut config: L2CacheConfig, hook: Option<PersistHook>) -> Self {
        config.max_entries = config.max_entries.max(1);
        if let Err(e) = fs::create_dir_all(&config.directory) {
            warn!(
                "L2 directory {:?} unavailable, running memory-only: {}",
                config.directory, e
            );
        }

        let compressor = Compressor::new(CompressionConfig {
            enabled: config.compression,
            ..Default::default()
        });

        let mut state = L2State::default();
        if config.rehydrate_on_start {
            state.index = load_from_disk(&config, &compressor, now_millis());
            info!(
                "L2 rehydrated {} entries from {:?}",
                state.index.len(),
                config.directory
            );
        }

        let persister = Persister::spawn(compressor.clone(), config.queue_capacity, hook);

        Self {
            config,
            compressor,
            state: Mutex::new(state),
            persister,
        }
    }

    /// Get a value from the in-memory index
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_at(key, now_millis())
    }

    pub(crate) fn get_at(&self, key: &str, now: u64) -> Option<Vec<u8>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let expired = match state.index.get_mut(key) {
            None => {
                state.misses += 1;
                debug!("L2 MISS: {}", key);
                return None;
            }
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => {
                entry.touch(now);
                let value = entry.value.clone();
                state.hits += 1;
                debug!("L2 HIT: {}", key);
                return Some(value);
            }
        };

        if expired {
            state.index.remove(key);
            state.misses += 1;
            self.persister.remove(self.file_path(key));
            debug!("L2 EXPIRED: {}", key);
        }
        None
    }

    /// Insert or update a value; the disk write happens in the background
    pub fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        self.set_at(key, value, ttl_secs, now_millis());
    }

    pub(crate) fn set_at(&self, key: &str, value: Vec<u8>, ttl_secs: u64, now: u64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let snapshot = match state.index.get_mut(key) {
            Some(entry) => {
                entry.refresh(value, ttl_secs, now);
                entry.clone()
            }
            None => {
                if state.index.len() >= self.config.max_entries {
                    self.evict_oldest(state);
                }
                let entry = CacheEntry::new(value, ttl_secs, now);
                state.index.insert(key.to_string(), entry.clone());
                entry
            }
        };

        // Enqueued under the lock so disk order follows index order
        self.persister.write(self.file_path(key), key, snapshot);
    }

    /// Remove a key and best-effort delete its file
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.index.remove(key).is_some();
        self.persister.remove(self.file_path(key));
        removed
    }

    /// Empty the index, reset counters and sweep the directory
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = L2State::default();
        self.persister.sweep(self.config.directory.clone());
        info!("L2 cleared");
    }

    /// Whether a live entry exists, without touching counters
    pub fn contains(&self, key: &str) -> bool {
        let now = now_millis();
        self.state
            .lock()
            .index
            .get(key)
            .is_some_and(|e| !e.is_expired(now))
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.config.max_entries
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn stats(&self) -> TierStats {
        let state = self.state.lock();
        TierStats::new(
            state.hits,
            state.misses,
            state.evictions,
            state.index.len(),
            self.config.max_entries,
        )
    }

    /// Deterministic file path for a key
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.config.directory.join(format!(
            "{}.{}",
            sanitize_key(key),
            self.compressor.extension()
        ))
    }

    /// Wait for all queued disk operations to complete
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    /// Linear scan for the entry with the oldest access time
    fn evict_oldest(&self, state: &mut L2State) {
        let oldest = state
            .index
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            state.index.remove(&key);
            state.evictions += 1;
            self.persister.remove(self.file_path(&key));
            debug!("L2 EVICT: {}", key);
        }
    }
}

/// Replace every character that is unsafe in a file name with `_`
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Rebuild an index from persisted blobs, skipping unreadable and expired
/// records. Keeps the most recently accessed entries when over capacity.
fn load_from_disk(
    config: &L2CacheConfig,
    compressor: &Compressor,
    now: u64,
) -> HashMap<String, CacheEntry> {
    let suffix = format!(".{}", compressor.extension());
    let dir = match fs::read_dir(&config.directory) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("L2 rehydrate skipped, cannot read {:?}: {}", config.directory, e);
            return HashMap::new();
        }
    };

    let mut records = Vec::new();
    for file in dir.flatten() {
        let path = file.path();
        let is_blob = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix));
        if !is_blob {
            continue;
        }

        let record = fs::read(&path)
            .map_err(crate::core::CacheError::from)
            .and_then(|blob| decode_blob(compressor, &blob));
        match record {
            Ok(record) if !record.entry.is_expired(now) => records.push(record),
            Ok(_) => debug!("L2 rehydrate skipping expired {:?}", path),
            Err(e) => warn!("L2 rehydrate skipping {:?}: {}", path, e),
        }
    }

    records.sort_by(|a, b| b.entry.last_accessed_at.cmp(&a.entry.last_accessed_at));
    records.truncate(config.max_entries);
    records.into_iter().map(|r| (r.key, r.entry)).collect()
}

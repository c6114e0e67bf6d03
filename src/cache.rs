//! Query-keyed TTL cache.
//!
//! One JSON file per fingerprint under `<context>/cache/`. The fingerprint
//! is the normalized query text itself; lookups are exact-match only. The
//! cache is advisory: losing an entry, or failing to write one, degrades
//! performance but never correctness, because every caller falls back to
//! the backend fetch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;

const CACHE_SUBDIR: &str = "cache";

/// Whether a cached payload came from a successful or a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Ok,
    Err,
}

/// A memoized outcome for one exact query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub status: CacheStatus,
    pub payload: String,
    pub stored_at_ms: u64,
}

pub struct CacheStore<'c> {
    dir: PathBuf,
    clock: &'c dyn Clock,
}

impl<'c> CacheStore<'c> {
    pub fn new(context_dir: &Path, clock: &'c dyn Clock) -> Self {
        let dir = context_dir.join(CACHE_SUBDIR);
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), %err, "cache_dir_create_failed");
        }
        Self { dir, clock }
    }

    /// Look up a fresh entry for `fingerprint`.
    ///
    /// Returns `None` when no entry exists, the entry is older than
    /// `ttl_seconds`, the file is unreadable or corrupt, or a file-name
    /// hash collision stored a foreign fingerprint there. `ttl_seconds`
    /// of zero disables the cache entirely.
    pub fn get(&self, fingerprint: &str, ttl_seconds: u64) -> Option<CacheEntry> {
        if ttl_seconds == 0 {
            return None;
        }
        let path = self.entry_path(fingerprint);
        let bytes = fs::read(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %path.display(), %err, "cache_entry_corrupt");
                return None;
            }
        };
        if entry.fingerprint != fingerprint {
            return None;
        }
        let age_ms = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
        if age_ms > ttl_seconds.saturating_mul(1000) {
            debug!(fingerprint, age_ms, "cache_entry_expired");
            return None;
        }
        Some(entry)
    }

    /// Persist an entry, replacing any prior entry for the same
    /// fingerprint. Write failures are logged and swallowed; the cache is
    /// never a prerequisite for correctness.
    pub fn put(&self, fingerprint: &str, status: CacheStatus, payload: &str) {
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            status,
            payload: payload.to_string(),
            stored_at_ms: self.clock.now_ms(),
        };
        if let Err(err) = self.write_entry(&entry) {
            warn!(fingerprint, %err, "cache_put_failed");
        }
    }

    /// Remove entry files older than `ttl_seconds`, plus any that no
    /// longer parse. Best effort; returns the number removed.
    pub fn purge_expired(&self, ttl_seconds: u64) -> usize {
        let now = self.clock.now_ms();
        let max_age_ms = ttl_seconds.saturating_mul(1000);
        self.remove_matching(|path| match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => now.saturating_sub(entry.stored_at_ms) > max_age_ms,
                Err(_) => true,
            },
            Err(_) => false,
        })
    }

    /// Remove every entry file. Best effort; returns the number removed.
    pub fn clear(&self) -> usize {
        self.remove_matching(|_| true)
    }

    fn remove_matching(&self, should_remove: impl Fn(&Path) -> bool) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && should_remove(&path)
                && fs::remove_file(&path).is_ok()
            {
                removed += 1;
            }
        }
        removed
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(&entry.fingerprint);
        let json = serde_json::to_vec(entry)?;
        // Write-then-rename so a concurrent reader never sees a partial
        // entry; concurrent writers race with last-writer-wins.
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(entry_file_name(fingerprint))
    }
}

/// Map a fingerprint to a stable, filesystem-safe file name: a readable
/// sanitized prefix plus an FNV-1a digest of the full text. The digest
/// alone is not trusted for identity; `get` re-checks the embedded
/// fingerprint.
fn entry_file_name(fingerprint: &str) -> String {
    let prefix: String = fingerprint
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(40)
        .collect::<String>()
        .to_ascii_lowercase();
    let digest = fnv1a64(fingerprint.as_bytes());
    if prefix.is_empty() {
        format!("{digest:016x}.json")
    } else {
        format!("{prefix}-{digest:016x}.json")
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

//! In-memory TTL cache for LLM completions.
//!
//! Keyed by the SHA-256 of the full prompt, so an identical context +
//! instruction skips the completion call entirely. The lookup happens
//! before the call is initiated, never after.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct PromptCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl PromptCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Cache key for a prompt: hex SHA-256 digest.
    pub fn key(prompt: &str) -> String {
        hex::encode(Sha256::digest(prompt.as_bytes()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                stats.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                stats.misses += 1;
                None
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries.lock().unwrap().insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drops expired entries, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = *self.stats.lock().unwrap();
        stats.size = self.entries.lock().unwrap().len();
        stats
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        *self.stats.lock().unwrap() = CacheStats::default();
    }
}

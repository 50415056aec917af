//! Keyed chunk store with TTL and capacity eviction.
//!
//! A performance cache, not a durable store: losing an entry degrades to
//! "re-run the invocation", surfaced as a recoverable `NotFound`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gmt_core::EngineError;
use sha2::{Digest, Sha256};
use tracing::debug;
use ulid::Ulid;

use crate::split::split_text;

/// One retrieved page of a previously split result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 1-based index of this chunk.
    pub index: usize,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug)]
struct ChunkRecord {
    chunks: Vec<String>,
    inserted: Instant,
    created_at: DateTime<Utc>,
}

/// In-memory chunk cache behind a single mutex.
///
/// Readers see either a fully-populated entry or none at all; splits under
/// different keys never interfere.
pub struct ChunkStore {
    inner: Mutex<HashMap<String, ChunkRecord>>,
    ttl: Duration,
    max_entries: usize,
}

impl ChunkStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Split `text` and store the sequence under `key`. Returns the chunk count.
    ///
    /// Idempotent per key: if an entry already exists the prior segmentation is
    /// kept, so a resumed split never recomputes (or changes) its chunks.
    pub fn store(&self, key: &str, text: &str, max_chars: usize) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = inner.get(key) {
            return existing.chunks.len();
        }

        Self::evict_expired(&mut inner, self.ttl);
        if inner.len() >= self.max_entries {
            Self::evict_oldest(&mut inner);
        }

        // Guards against a zero-sized chunk config; split_text requires > 0.
        let chunks = split_text(text, max_chars.max(1));
        let total = chunks.len();
        debug!(key, total, "stored chunk sequence");
        inner.insert(
            key.to_string(),
            ChunkRecord {
                chunks,
                inserted: Instant::now(),
                created_at: Utc::now(),
            },
        );
        total
    }

    /// Retrieve one chunk by 1-based index.
    ///
    /// `InvalidInput` outside `[1, total]`; `NotFound` when the key is unknown
    /// or the entry has aged out.
    pub fn get(&self, key: &str, index: usize) -> Result<Chunk, EngineError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let expired = inner
            .get(key)
            .is_some_and(|record| record.inserted.elapsed() > self.ttl);
        if expired {
            inner.remove(key);
        }

        let record = inner
            .get(key)
            .ok_or_else(|| EngineError::NotFound(key.to_string()))?;

        let total = record.chunks.len();
        if index == 0 || index > total {
            return Err(EngineError::InvalidInput(format!(
                "chunk index {index} out of range [1, {total}] for key '{key}'"
            )));
        }

        Ok(Chunk {
            text: record.chunks[index - 1].clone(),
            index,
            total,
            has_more: index < total,
        })
    }

    /// Creation timestamp of an entry, if present and not expired.
    pub fn created_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(key)
            .filter(|record| record.inserted.elapsed() <= self.ttl)
            .map(|record| record.created_at)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(inner: &mut HashMap<String, ChunkRecord>, ttl: Duration) {
        inner.retain(|key, record| {
            let keep = record.inserted.elapsed() <= ttl;
            if !keep {
                debug!(key, "evicting expired chunk entry");
            }
            keep
        });
    }

    fn evict_oldest(inner: &mut HashMap<String, ChunkRecord>) {
        let oldest = inner
            .iter()
            .min_by_key(|(_, record)| record.inserted)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(key, "evicting oldest chunk entry at capacity");
            inner.remove(&key);
        }
    }
}

/// Derive a cache key from the original instruction and a continuation token.
pub fn derive_key(prompt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(b"\0");
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Fresh continuation token for a split whose caller supplied none.
pub fn generate_token() -> String {
    Ulid::new().to_string()
}

/*!
 * Translation result caching.
 *
 * Bounded, TTL'd, LRU-evicted store mapping (backend, source language,
 * target language, normalized text) to a translated string. Avoids redundant
 * backend calls for text the pipeline has already translated.
 */

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use log::debug;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::app_config::BackendKind;

/// Cache key combining backend, language pair and normalized source text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    /// Backend that produced the translation
    backend: BackendKind,
    /// Source language code
    source_language: String,
    /// Target language code
    target_language: String,
    /// Trimmed source text
    source_text: String,
}

impl CacheKey {
    fn new(backend: BackendKind, source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            backend,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            source_text: source_text.trim().to_string(),
        }
    }
}

/// A cached translation returned on lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTranslation {
    /// The translated text
    pub translation: String,
    /// Backend that produced it
    pub backend: BackendKind,
}

/// Stored entry with recency and age bookkeeping
#[derive(Debug, Clone)]
struct StoredEntry {
    translation: String,
    stored_at: Instant,
    seq: u64,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of live entries
    pub size: usize,
    /// Hit percentage over all requests, 0 when nothing was requested yet
    pub hit_rate: f64,
    /// Total lookup count
    pub total_requests: u64,
    /// Lookup count answered from the cache
    pub cached_requests: u64,
}

/// Mutable cache state behind one lock; recency is a monotonic sequence
/// indexed by a BTreeMap so eviction finds the LRU entry in O(log n).
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, StoredEntry>,
    recency: BTreeMap<u64, CacheKey>,
    next_seq: u64,
    total_requests: u64,
    cached_requests: u64,
}

impl CacheState {
    /// Move an entry to the most-recently-used position
    fn touch(&mut self, key: &CacheKey) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.seq);
            entry.seq = seq;
            self.recency.insert(seq, key.clone());
        }
    }

    /// Remove the entry both from the store and the recency index
    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.seq);
        }
    }
}

/// Translation cache for storing and retrieving translations
pub struct TranslationCache {
    /// Internal cache storage
    state: RwLock<CacheState>,
    /// Maximum number of entries before LRU eviction
    max_entries: usize,
    /// Age after which an entry is treated as absent
    ttl: Duration,
    /// Backends an un-pinned lookup scans, in priority order
    scan_backends: Vec<BackendKind>,
}

impl TranslationCache {
    /// Create a new translation cache. Un-pinned lookups scan only the
    /// given backends.
    pub fn new(max_entries: usize, ttl: Duration, scan_backends: Vec<BackendKind>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries,
            ttl,
            scan_backends,
        }
    }

    /// Get a translation from the cache.
    ///
    /// With `backend = None` the configured backends are scanned in priority
    /// order and the first TTL-valid hit wins. Expired entries are physically
    /// removed and reported absent. A hit refreshes the entry's recency.
    pub fn get(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        backend: Option<BackendKind>,
    ) -> Option<CachedTranslation> {
        let mut state = self.state.write();
        state.total_requests += 1;

        let candidates: Vec<BackendKind> = match backend {
            Some(kind) => vec![kind],
            None => self.scan_backends.clone(),
        };

        let now = Instant::now();
        for kind in candidates {
            let key = CacheKey::new(kind, source_text, source_language, target_language);
            let Some(entry) = state.entries.get(&key) else {
                continue;
            };

            if now.duration_since(entry.stored_at) >= self.ttl {
                state.remove(&key);
                debug!(
                    "Cache entry expired for '{}' ({} -> {}, {})",
                    truncate_text(source_text, 30),
                    source_language,
                    target_language,
                    kind
                );
                continue;
            }

            let translation = entry.translation.clone();
            state.cached_requests += 1;
            state.touch(&key);

            debug!(
                "Cache hit for '{}' ({} -> {}, {})",
                truncate_text(source_text, 30),
                source_language,
                target_language,
                kind
            );

            return Some(CachedTranslation { translation, backend: kind });
        }

        debug!(
            "Cache miss for '{}' ({} -> {})",
            truncate_text(source_text, 30),
            source_language,
            target_language
        );
        None
    }

    /// Store a translation in the cache, evicting the least-recently-used
    /// entry when at capacity. The new entry becomes most-recently-used.
    pub fn set(
        &self,
        source_text: &str,
        translation: &str,
        source_language: &str,
        target_language: &str,
        backend: BackendKind,
    ) {
        let key = CacheKey::new(backend, source_text, source_language, target_language);
        let mut state = self.state.write();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            if let Some((_, lru_key)) = state.recency.iter().next().map(|(s, k)| (*s, k.clone())) {
                state.remove(&lru_key);
                debug!(
                    "Cache evicted LRU entry '{}'",
                    truncate_text(&lru_key.source_text, 30)
                );
            }
        }

        // Replace any previous entry for this key outright
        state.remove(&key);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.recency.insert(seq, key.clone());
        state.entries.insert(
            key,
            StoredEntry {
                translation: translation.to_string(),
                stored_at: Instant::now(),
                seq,
            },
        );

        debug!(
            "Cached translation for '{}' ({} -> {}, {})",
            truncate_text(source_text, 30),
            source_language,
            target_language,
            backend
        );
    }

    /// Empty the store and reset counters. Used on configuration change,
    /// since cached results are backend/language-pair specific.
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = CacheState::default();
        debug!("Translation cache cleared");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let hit_rate = if state.total_requests > 0 {
            state.cached_requests as f64 / state.total_requests as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: state.entries.len(),
            hit_rate,
            total_requests: state.total_requests,
            cached_requests: state.cached_requests,
        }
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_length).collect::<String>())
    }
}

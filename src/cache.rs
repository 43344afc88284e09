use crate::i18n::StringMap;
use crate::storage::{BlobStore, CACHE_BLOB};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub key: String,
    pub language: String,
}

impl CacheKey {
    pub fn new(key: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            language: language.into(),
        }
    }

    /// Snapshot form: `<byte length of key>:<key>_<language>`.
    ///
    /// The length prefix makes the split point explicit, so keys and language
    /// codes may contain `_` without colliding.
    pub fn encode(&self) -> String {
        format!("{}:{}_{}", self.key.len(), self.key, self.language)
    }

    /// Inverse of [`CacheKey::encode`].
    pub fn decode(encoded: &str) -> Option<Self> {
        let (len, rest) = encoded.split_once(':')?;
        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let len: usize = len.parse().ok()?;
        let key = rest.get(..len)?;
        let language = rest.get(len..)?.strip_prefix('_')?;
        Some(Self::new(key, language))
    }
}

/// A cached value and the time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    /// Write time, milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Read-only projection over the current entry set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    #[serde(rename = "estimatedSizeKB")]
    pub estimated_size_kb: u64,
}

/// Cache tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// When false the cache never stores or returns anything
    pub enabled: bool,
    /// Entries older than this are expired
    pub ttl: Duration,
    /// Estimated-size budget that triggers eviction
    pub max_size_bytes: u64,
    /// Fixed per-entry size used for the estimate
    pub avg_entry_bytes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(24 * 60 * 60),
            max_size_bytes: 10 * 1024 * 1024,
            avg_entry_bytes: 100,
        }
    }
}

type EntryMap = HashMap<CacheKey, CacheEntry>;

/// Serialized snapshot taken under the entry lock and written after it.
struct PendingWrite {
    generation: u64,
    /// `None` removes the blob
    bytes: Option<Vec<u8>>,
}

/// Expiring, size-bounded translation cache with a durable snapshot.
///
/// Entries are keyed by `(string key, language)` and carry their write time.
/// Expiration is checked lazily on read; eviction drops the oldest fifth of
/// the entries (by write time) when the estimated size exceeds the budget.
///
/// Every read-modify-write of the entry map happens under one lock, so an
/// insertion runs at most one eviction pass. The snapshot is serialized under
/// that lock but written to the store after it is released; snapshots carry a
/// generation and a write older than the last one stored is dropped.
pub struct ExpiringCache {
    settings: CacheSettings,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    entries: Mutex<EntryMap>,
    generation: AtomicU64,
    written: Mutex<u64>,
}

impl ExpiringCache {
    /// Open the cache on the system clock, restoring the persisted snapshot.
    pub fn open(settings: CacheSettings, store: Arc<dyn BlobStore>) -> Self {
        Self::with_clock(settings, store, Arc::new(SystemClock))
    }

    /// Open the cache with an explicit clock.
    ///
    /// A snapshot that cannot be read or parsed is removed from the store and
    /// the cache starts empty.
    pub fn with_clock(
        settings: CacheSettings,
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let entries = if settings.enabled {
            load_snapshot(store.as_ref())
        } else {
            EntryMap::new()
        };

        Self {
            settings,
            store,
            clock,
            entries: Mutex::new(entries),
            generation: AtomicU64::new(0),
            written: Mutex::new(0),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Look up a translation. An expired entry is evicted and reported as absent.
    pub fn get(&self, key: &str, language: &str) -> Option<String> {
        if !self.settings.enabled {
            return None;
        }

        let cache_key = CacheKey::new(key, language);
        let now = self.clock.now_millis();
        let pending = {
            let mut entries = self.entries();
            match entries.get(&cache_key) {
                None => return None,
                Some(entry) if !self.is_expired(entry, now) => return Some(entry.value.clone()),
                Some(_) => {}
            }

            debug!("Cache entry expired: {:?}", cache_key);
            entries.remove(&cache_key);
            self.snapshot(&entries)
        };
        self.write(pending);
        None
    }

    /// Store a translation, evicting first if the cache is over budget.
    pub fn put(&self, key: &str, value: &str, language: &str) {
        if !self.settings.enabled {
            return;
        }

        let now = self.clock.now_millis();
        let pending = {
            let mut entries = self.entries();
            self.insert(&mut entries, CacheKey::new(key, language), value, now);
            self.snapshot(&entries)
        };
        self.write(pending);
    }

    /// Store many translations for one language with a single snapshot write.
    pub fn put_batch<I, K, V>(&self, translations: I, language: &str)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if !self.settings.enabled {
            return;
        }

        let now = self.clock.now_millis();
        let pending = {
            let mut entries = self.entries();
            let mut written = 0usize;
            for (key, value) in translations {
                self.insert(
                    &mut entries,
                    CacheKey::new(key.as_ref(), language),
                    value.as_ref(),
                    now,
                );
                written += 1;
            }

            if written == 0 {
                return;
            }
            self.snapshot(&entries)
        };
        self.write(pending);
    }

    pub fn remove(&self, key: &str, language: &str) {
        let pending = {
            let mut entries = self.entries();
            entries.remove(&CacheKey::new(key, language));
            self.snapshot(&entries)
        };
        self.write(pending);
    }

    /// Drop every entry for `language`.
    pub fn clear_language(&self, language: &str) {
        let pending = {
            let mut entries = self.entries();
            let before = entries.len();
            entries.retain(|cache_key, _| cache_key.language != language);
            debug!(
                "Cleared {} cache entries for language {}",
                before - entries.len(),
                language
            );
            self.snapshot(&entries)
        };
        self.write(pending);
    }

    /// Drop every entry and the durable snapshot.
    pub fn clear_all(&self) {
        let pending = {
            let mut entries = self.entries();
            entries.clear();
            PendingWrite {
                generation: self.next_generation(),
                bytes: None,
            }
        };
        self.write(Some(pending));
    }

    /// All non-expired translations for `language`.
    pub fn get_all_for_language(&self, language: &str) -> StringMap {
        let now = self.clock.now_millis();
        self.entries()
            .iter()
            .filter(|(cache_key, entry)| {
                cache_key.language == language && !self.is_expired(entry, now)
            })
            .map(|(cache_key, entry)| (cache_key.key.clone(), entry.value.clone()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let entries = self.entries();
        let expired_entries = entries
            .values()
            .filter(|entry| self.is_expired(entry, now))
            .count();

        CacheStats {
            total_entries: entries.len(),
            active_entries: entries.len() - expired_entries,
            expired_entries,
            estimated_size_kb: self.estimated_size_bytes(entries.len()) / 1024,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, EntryMap> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry, now: i64) -> bool {
        let age = now.saturating_sub(entry.timestamp);
        age >= 0 && age as u128 >= self.settings.ttl.as_millis()
    }

    fn estimated_size_bytes(&self, count: usize) -> u64 {
        (count as u64).saturating_mul(self.settings.avg_entry_bytes)
    }

    fn insert(&self, entries: &mut EntryMap, cache_key: CacheKey, value: &str, now: i64) {
        if self.estimated_size_bytes(entries.len()) > self.settings.max_size_bytes {
            evict_oldest(entries);
        }
        entries.insert(
            cache_key,
            CacheEntry {
                value: value.to_string(),
                timestamp: now,
            },
        );
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Serialize the entry map. Call with the entry lock held.
    fn snapshot(&self, entries: &EntryMap) -> Option<PendingWrite> {
        let snapshot: BTreeMap<String, &CacheEntry> = entries
            .iter()
            .map(|(cache_key, entry)| (cache_key.encode(), entry))
            .collect();

        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => Some(PendingWrite {
                generation: self.next_generation(),
                bytes: Some(bytes),
            }),
            Err(e) => {
                warn!("Failed to serialize cache snapshot: {}", e);
                None
            }
        }
    }

    /// Hand a snapshot to the store. Call without the entry lock held.
    fn write(&self, pending: Option<PendingWrite>) {
        let Some(pending) = pending else {
            return;
        };

        let mut written = self.written.lock().unwrap_or_else(|p| p.into_inner());
        if pending.generation <= *written {
            debug!("Skipping stale cache snapshot {}", pending.generation);
            return;
        }

        let result = match &pending.bytes {
            Some(bytes) => self.store.set(CACHE_BLOB, bytes),
            None => self.store.remove(CACHE_BLOB),
        };
        if let Err(e) = result {
            warn!("Failed to persist cache snapshot: {}", e);
        }
        *written = pending.generation;
    }
}

/// Remove the oldest 20% of entries by write time (at least one).
fn evict_oldest(entries: &mut EntryMap) {
    if entries.is_empty() {
        return;
    }

    let mut by_age: Vec<(CacheKey, i64)> = entries
        .iter()
        .map(|(cache_key, entry)| (cache_key.clone(), entry.timestamp))
        .collect();
    by_age.sort_by_key(|(_, timestamp)| *timestamp);

    let evict_count = (entries.len() / 5).max(1);
    for (cache_key, _) in by_age.into_iter().take(evict_count) {
        entries.remove(&cache_key);
    }
    debug!("Evicted {} oldest cache entries", evict_count);
}

fn load_snapshot(store: &dyn BlobStore) -> EntryMap {
    let bytes = match store.get(CACHE_BLOB) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return EntryMap::new(),
        Err(e) => {
            warn!("Failed to read cache snapshot, starting empty: {}", e);
            reset_snapshot(store);
            return EntryMap::new();
        }
    };

    match serde_json::from_slice::<HashMap<String, CacheEntry>>(&bytes) {
        Ok(snapshot) => {
            let entries: EntryMap = snapshot
                .into_iter()
                .filter_map(|(encoded, entry)| CacheKey::decode(&encoded).map(|k| (k, entry)))
                .collect();
            debug!("Loaded {} cached translations", entries.len());
            entries
        }
        Err(e) => {
            warn!("Corrupt cache snapshot, starting empty: {}", e);
            reset_snapshot(store);
            EntryMap::new()
        }
    }
}

fn reset_snapshot(store: &dyn BlobStore) {
    if let Err(e) = store.remove(CACHE_BLOB) {
        warn!("Failed to clear corrupt cache snapshot: {}", e);
    }
}

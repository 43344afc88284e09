use crate::cache::{CacheKey, CacheStats, ExpiringCache};
use crate::config::Config;
use crate::error::TranslationError;
use crate::i18n::{
    interpolate, pluralize, BaseStrings, Language, LanguagePreferenceStore, MetricsReport,
    StringMap, TranslationMetrics,
};
use crate::storage::BlobStore;
use crate::tasks::TaskQueue;
use crate::translation::BatchTranslationClient;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

/// Outcome of a single lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub key: String,
    pub original_text: String,
    pub translated_text: String,
    pub target_language: String,
    /// True when the text came from the session overlay or the cache
    pub from_cache: bool,
}

/// Handle returned by [`AiLang::add_language_change_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// Translations known this session for one language.
struct Overlay {
    language: String,
    strings: StringMap,
}

struct Inner {
    config: Config,
    base: BaseStrings,
    cache: ExpiringCache,
    preference: LanguagePreferenceStore,
    client: BatchTranslationClient,
    metrics: Arc<TranslationMetrics>,
    overlay: RwLock<Overlay>,
    in_flight: Mutex<HashSet<CacheKey>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    mock_translations: RwLock<Option<StringMap>>,
    tasks: TaskQueue,
}

/// Translation context. Cloning is cheap and shares all state.
///
/// Lookups never block and never fail: a miss returns the base string and
/// schedules a background fill on the task queue.
#[derive(Clone)]
pub struct AiLang {
    inner: Arc<Inner>,
}

impl AiLang {
    /// Build the context, detecting the device language from the environment.
    pub async fn init(
        config: Config,
        base_strings: BaseStrings,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self, TranslationError> {
        let preference = LanguagePreferenceStore::new(store.clone(), &config.default_language);
        Self::build(config, base_strings, store, preference)
    }

    /// Build the context with a fixed device locale (`None` for no locale).
    pub async fn init_with_locale(
        config: Config,
        base_strings: BaseStrings,
        store: Arc<dyn BlobStore>,
        device_locale: Option<&str>,
    ) -> Result<Self, TranslationError> {
        let preference = LanguagePreferenceStore::new(store.clone(), &config.default_language)
            .with_device_locale(device_locale);
        Self::build(config, base_strings, store, preference)
    }

    fn build(
        config: Config,
        base_strings: BaseStrings,
        store: Arc<dyn BlobStore>,
        preference: LanguagePreferenceStore,
    ) -> Result<Self, TranslationError> {
        config.validate()?;

        let metrics = Arc::new(TranslationMetrics::new());
        let client = BatchTranslationClient::new(&config)?.with_metrics(metrics.clone());
        let cache = ExpiringCache::open(config.cache_settings(), store);
        let language = preference.init();

        let strings = if language != config.default_language {
            cache.get_all_for_language(&language)
        } else {
            StringMap::new()
        };
        info!(
            "AiLang initialized: language {}, {} base strings, {} cached translations",
            language,
            base_strings.len(),
            strings.len()
        );

        let ailang = Self {
            inner: Arc::new(Inner {
                config,
                base: base_strings,
                cache,
                preference,
                client,
                metrics,
                overlay: RwLock::new(Overlay {
                    language: language.clone(),
                    strings,
                }),
                in_flight: Mutex::new(HashSet::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                mock_translations: RwLock::new(None),
                tasks: TaskQueue::new(),
            }),
        };

        if language != ailang.inner.config.default_language {
            ailang.schedule_language_fill(language);
        }
        Ok(ailang)
    }

    // ==================== Lookup ====================

    /// Text for `key` in the active language.
    ///
    /// Falls back to the base string, then to the key itself.
    pub fn t(&self, key: &str) -> String {
        self.lookup(key).translated_text
    }

    /// [`t`](Self::t) followed by `{name}` substitution.
    pub fn t_params<I, K, V>(&self, key: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        interpolate(&self.t(key), params)
    }

    /// [`t`](Self::t) followed by `singular|plural` selection for `count`.
    pub fn t_count(&self, key: &str, count: i64) -> String {
        pluralize(&self.t(key), count)
    }

    /// Like [`t`](Self::t), with where the text came from.
    pub fn lookup(&self, key: &str) -> TranslationResult {
        let inner = &self.inner;
        let language = inner.preference.current_language();
        let original = inner.base.get_or_key(key).to_string();
        let result = |translated: String, from_cache: bool| TranslationResult {
            key: key.to_string(),
            original_text: original.clone(),
            translated_text: translated,
            target_language: language.clone(),
            from_cache,
        };

        if let Some(mocks) = read(&inner.mock_translations).as_ref() {
            let text = mocks.get(key).cloned().unwrap_or_else(|| key.to_string());
            return result(text, false);
        }

        if language == inner.config.default_language {
            return result(original.clone(), false);
        }

        if let Some(text) = inner.overlay_get(key, &language) {
            inner.metrics.record_cache_hit();
            return result(text, true);
        }

        if let Some(text) = inner.cache.get(key, &language) {
            inner.metrics.record_cache_hit();
            inner.overlay_insert(key, &text, &language);
            return result(text, true);
        }

        inner.metrics.record_cache_miss();
        self.schedule_key_fill(key, &language);
        result(original.clone(), false)
    }

    // ==================== Language ====================

    pub fn current_language(&self) -> String {
        self.inner.preference.current_language()
    }

    pub fn default_language(&self) -> &str {
        &self.inner.config.default_language
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        self.inner.preference.supported_languages()
    }

    /// Whether the active language is written right to left.
    pub fn is_rtl(&self) -> bool {
        self.inner.preference.is_rtl(&self.current_language())
    }

    pub fn language_name(&self, code: &str) -> String {
        self.inner.preference.language_name(code)
    }

    pub fn native_name(&self, code: &str) -> String {
        self.inner.preference.native_name(code)
    }

    /// Switch the active language.
    ///
    /// Returns false, changing nothing, when `code` is unsupported or already
    /// active. Otherwise persists the choice, drops the session overlay,
    /// schedules a fill of the whole vocabulary and notifies listeners.
    pub fn set_language(&self, code: &str) -> bool {
        let inner = &self.inner;
        if !inner.preference.is_supported(code) {
            warn!("Ignoring switch to unsupported language {}", code);
            return false;
        }

        {
            let mut overlay = write(&inner.overlay);
            let previous = inner.preference.current_language();
            if previous == code || !inner.preference.set_current_language(code) {
                return false;
            }
            *overlay = Overlay {
                language: code.to_string(),
                strings: StringMap::new(),
            };
            info!("Language changed from {} to {}", previous, code);
        }

        if code != inner.config.default_language {
            self.schedule_language_fill(code.to_string());
        }
        self.notify_language_change(code);
        true
    }

    /// Translate and cache every base string for `code` that is not cached yet,
    /// without switching to it.
    ///
    /// Returns how many strings were translated.
    pub async fn preload_language(&self, code: &str) -> Result<usize, TranslationError> {
        if !self.inner.preference.is_supported(code) {
            return Err(TranslationError::Config(format!(
                "language '{}' is not supported",
                code
            )));
        }
        if code == self.inner.config.default_language {
            return Ok(0);
        }

        let translated = self.inner.fill_language(code).await?;
        info!("Preloaded {} translations for {}", translated, code);
        Ok(translated)
    }

    // ==================== Listeners ====================

    /// Call `listener` with the new code after every committed language change.
    pub fn add_language_change_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_language_change_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify_language_change(&self, code: &str) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(code))).is_err() {
                error!("Language change listener panicked for {}", code);
            }
        }
    }

    // ==================== Cache and diagnostics ====================

    /// Drop every cached translation, persisted and in-session.
    pub fn clear_cache(&self) {
        self.inner.cache.clear_all();
        write(&self.inner.overlay).strings.clear();
        info!("Translation cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.inner.metrics.report()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Answer every lookup from `translations` (or the key) without touching
    /// the cache or the provider. `None` restores normal lookups.
    pub fn set_mock_translations(&self, translations: Option<StringMap>) {
        *write(&self.inner.mock_translations) = translations;
    }

    /// Wait for all background fills started so far.
    pub async fn flush(&self) {
        self.inner.tasks.flush().await;
    }

    /// Number of background fills still running.
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.pending()
    }

    // ==================== Background fills ====================

    fn schedule_key_fill(&self, key: &str, language: &str) {
        let inner = &self.inner;
        let Some(source) = inner.base.get(key) else {
            debug!("No base string for {}, not translating", key);
            return;
        };

        let cache_key = CacheKey::new(key, language);
        if !lock(&inner.in_flight).insert(cache_key.clone()) {
            return;
        }

        let mut strings = StringMap::new();
        strings.insert(key.to_string(), source.to_string());

        let task_inner = inner.clone();
        inner.tasks.submit(async move {
            let language = cache_key.language.clone();
            match task_inner.client.translate_batch(&strings, &language).await {
                Ok(translated) => task_inner.store_translations(&translated, &language),
                Err(e) => warn!(
                    "Background translation of {} to {} failed: {}",
                    cache_key.key, language, e
                ),
            }
            lock(&task_inner.in_flight).remove(&cache_key);
        });
    }

    fn schedule_language_fill(&self, language: String) {
        let inner = self.inner.clone();
        self.inner.tasks.submit(async move {
            match inner.fill_language(&language).await {
                Ok(count) => debug!("Background fill translated {} strings for {}", count, language),
                Err(e) => warn!("Background translation to {} failed: {}", language, e),
            }
        });
    }
}

impl Inner {
    /// Translate the base strings missing for `language` and store them.
    async fn fill_language(&self, language: &str) -> Result<usize, TranslationError> {
        let cached = self.cache.get_all_for_language(language);
        let known = {
            let overlay = read(&self.overlay);
            if overlay.language == language {
                overlay.strings.clone()
            } else {
                StringMap::new()
            }
        };

        let missing: StringMap = self
            .base
            .iter()
            .filter(|(key, _)| !cached.contains_key(*key) && !known.contains_key(*key))
            .map(|(key, text)| (key.clone(), text.clone()))
            .collect();
        if missing.is_empty() {
            debug!("Nothing to translate for {}", language);
            return Ok(0);
        }

        let translated = self.client.translate_batch(&missing, language).await?;
        self.store_translations(&translated, language);
        Ok(translated.len())
    }

    /// Cache translations, and show them this session if `language` is still active.
    fn store_translations(&self, translated: &StringMap, language: &str) {
        self.cache.put_batch(translated, language);

        let mut overlay = write(&self.overlay);
        if overlay.language == language {
            overlay
                .strings
                .extend(translated.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else {
            debug!(
                "Language changed to {} during fill for {}, overlay untouched",
                overlay.language, language
            );
        }
    }

    fn overlay_get(&self, key: &str, language: &str) -> Option<String> {
        let overlay = read(&self.overlay);
        if overlay.language == language {
            overlay.strings.get(key).cloned()
        } else {
            None
        }
    }

    fn overlay_insert(&self, key: &str, text: &str, language: &str) {
        let mut overlay = write(&self.overlay);
        if overlay.language == language {
            overlay.strings.insert(key.to_string(), text.to_string());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

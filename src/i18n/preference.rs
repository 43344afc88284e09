//! Active language resolution and persistence.

use crate::i18n::{Language, LanguageRegistry};
use crate::storage::{BlobStore, LANGUAGE_BLOB};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Environment variables consulted for the device locale, in priority order.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

#[derive(Debug, Clone)]
enum DeviceLocale {
    Environment,
    Fixed(Option<String>),
}

/// Holds the active language code and persists it across restarts.
pub struct LanguagePreferenceStore {
    store: Arc<dyn BlobStore>,
    default_language: String,
    device_locale: DeviceLocale,
    current: RwLock<String>,
}

impl LanguagePreferenceStore {
    /// Create a store whose current language starts as `default_language`.
    ///
    /// Call [`init`](Self::init) to resolve the persisted preference.
    pub fn new(store: Arc<dyn BlobStore>, default_language: impl Into<String>) -> Self {
        let default_language = default_language.into();
        Self {
            store,
            current: RwLock::new(default_language.clone()),
            default_language,
            device_locale: DeviceLocale::Environment,
        }
    }

    /// Use a fixed device locale (e.g. `"fr_FR.UTF-8"`) instead of the environment.
    pub fn with_device_locale(mut self, locale: Option<&str>) -> Self {
        self.device_locale = DeviceLocale::Fixed(locale.map(str::to_string));
        self
    }

    /// Resolve the active language: persisted preference if supported, then the
    /// device language if supported, then the configured default.
    pub fn init(&self) -> String {
        let resolved = self
            .load_persisted()
            .or_else(|| self.detect_device_language())
            .unwrap_or_else(|| self.default_language.clone());

        debug!("Active language resolved to {}", resolved);
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = resolved.clone();
        resolved
    }

    pub fn current_language(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn is_supported(&self, code: &str) -> bool {
        LanguageRegistry::get().is_supported(code)
    }

    /// Switch and persist the active language.
    ///
    /// Unsupported codes are logged and ignored; returns whether the code was accepted.
    pub fn set_current_language(&self, code: &str) -> bool {
        if !self.is_supported(code) {
            warn!("Language {} is not supported", code);
            return false;
        }

        *self.current.write().unwrap_or_else(|p| p.into_inner()) = code.to_string();
        if let Err(e) = self.store.set(LANGUAGE_BLOB, code.as_bytes()) {
            warn!("Failed to persist language preference: {}", e);
        }
        true
    }

    pub fn is_rtl(&self, code: &str) -> bool {
        LanguageRegistry::is_rtl(code)
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        LanguageRegistry::get()
            .list_all()
            .iter()
            .map(Language::from)
            .collect()
    }

    /// English name for `code`, or the code itself when unknown.
    pub fn language_name(&self, code: &str) -> String {
        LanguageRegistry::get()
            .get_by_code(code)
            .map(|lang| lang.name.to_string())
            .unwrap_or_else(|| code.to_string())
    }

    /// Native name for `code`, or the code itself when unknown.
    pub fn native_name(&self, code: &str) -> String {
        LanguageRegistry::get()
            .get_by_code(code)
            .map(|lang| lang.native_name.to_string())
            .unwrap_or_else(|| code.to_string())
    }

    /// Supported language of the device locale, if any.
    pub fn detect_device_language(&self) -> Option<String> {
        let locale = match &self.device_locale {
            DeviceLocale::Fixed(locale) => locale.clone(),
            DeviceLocale::Environment => LOCALE_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|value| !value.trim().is_empty()),
        }?;

        language_from_locale(&locale).filter(|code| self.is_supported(code))
    }

    fn load_persisted(&self) -> Option<String> {
        let bytes = match self.store.get(LANGUAGE_BLOB) {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!("Failed to load language preference: {}", e);
                return None;
            }
        };

        let code = String::from_utf8(bytes).ok()?.trim().to_string();
        if self.is_supported(&code) {
            Some(code)
        } else {
            debug!("Ignoring unsupported persisted language {:?}", code);
            None
        }
    }
}

/// Language part of a POSIX-style locale: `es_ES.UTF-8` → `es`.
fn language_from_locale(locale: &str) -> Option<String> {
    let base = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }

    let language = base.split(['_', '-']).next().unwrap_or_default();
    if language.is_empty() {
        None
    } else {
        Some(language.to_ascii_lowercase())
    }
}

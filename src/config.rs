use crate::cache::CacheSettings;
use crate::error::TranslationError;
use crate::i18n::LanguageRegistry;
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone)]
pub struct Config {
    // Provider
    pub api_key: String,
    pub api_url: String,
    pub timeout: Duration,

    // Languages
    pub default_language: String,

    // Cache
    pub cache_enabled: bool,
    pub cache_duration: Duration,
    pub max_cache_size_mb: u64,
    pub avg_entry_bytes: u64,

    // Batching
    pub batch_size: usize,
    pub batch_delay: Duration,

    // Retry
    pub retry_count: u32,
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,

    // Files
    pub base_strings_path: Option<PathBuf>,
    pub storage_dir: PathBuf,
}

impl Config {
    /// Defaults for everything except the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            default_language: "en".to_string(),
            cache_enabled: true,
            cache_duration: Duration::from_secs(24 * 60 * 60),
            max_cache_size_mb: 10,
            avg_entry_bytes: 100,
            batch_size: 50,
            batch_delay: Duration::from_millis(100),
            retry_count: 3,
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            base_strings_path: None,
            storage_dir: PathBuf::from(".ailang"),
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::new(
            std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?,
        );

        Ok(Self {
            api_url: std::env::var("GEMINI_API_URL").unwrap_or(defaults.api_url.clone()),
            timeout: env_parse("AILANG_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),

            default_language: std::env::var("AILANG_DEFAULT_LANGUAGE")
                .unwrap_or(defaults.default_language.clone()),

            cache_enabled: env_parse("AILANG_CACHE_ENABLED").unwrap_or(defaults.cache_enabled),
            cache_duration: env_parse("AILANG_CACHE_DURATION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_duration),
            max_cache_size_mb: env_parse("AILANG_MAX_CACHE_SIZE_MB")
                .unwrap_or(defaults.max_cache_size_mb),

            batch_size: env_parse("AILANG_BATCH_SIZE").unwrap_or(defaults.batch_size),
            retry_count: env_parse("AILANG_RETRY_COUNT").unwrap_or(defaults.retry_count),

            base_strings_path: std::env::var("AILANG_BASE_STRINGS").ok().map(PathBuf::from),
            storage_dir: std::env::var("AILANG_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir.clone()),

            ..defaults
        })
    }

    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.api_key.trim().is_empty() {
            return Err(TranslationError::Config("API key is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TranslationError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.retry_count == 0 {
            return Err(TranslationError::Config(
                "retry count must be at least 1".to_string(),
            ));
        }
        if !LanguageRegistry::get().is_supported(&self.default_language) {
            return Err(TranslationError::Config(format!(
                "default language '{}' is not supported",
                self.default_language
            )));
        }
        Ok(())
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.cache_enabled,
            ttl: self.cache_duration,
            max_size_bytes: self.max_cache_size_mb.saturating_mul(1024 * 1024),
            avg_entry_bytes: self.avg_entry_bytes,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.retry_count, self.initial_retry_delay)
            .with_max_delay(self.max_retry_delay)
    }
}

/// Parse an optional variable, ignoring unset or malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 11] = [
        "GEMINI_API_KEY",
        "GEMINI_API_URL",
        "AILANG_DEFAULT_LANGUAGE",
        "AILANG_CACHE_ENABLED",
        "AILANG_CACHE_DURATION_SECS",
        "AILANG_MAX_CACHE_SIZE_MB",
        "AILANG_BATCH_SIZE",
        "AILANG_TIMEOUT_SECS",
        "AILANG_RETRY_COUNT",
        "AILANG_BASE_STRINGS",
        "AILANG_STORAGE_DIR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("key");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.default_language, "en");
        assert!(config.cache_enabled);
        assert_eq!(config.cache_duration, Duration::from_secs(86_400));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.batch_delay, Duration::from_millis(100));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_count, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("GEMINI_API_KEY", "secret");
        std::env::set_var("AILANG_DEFAULT_LANGUAGE", "es");
        std::env::set_var("AILANG_CACHE_ENABLED", "false");
        std::env::set_var("AILANG_BATCH_SIZE", "20");
        std::env::set_var("AILANG_CACHE_DURATION_SECS", "60");
        std::env::set_var("AILANG_STORAGE_DIR", "/tmp/ailang-test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.default_language, "es");
        assert!(!config.cache_enabled);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.cache_duration, Duration::from_secs(60));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/ailang-test"));
        assert_eq!(config.retry_count, 3);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_malformed_numbers() {
        clear_env();
        std::env::set_var("GEMINI_API_KEY", "secret");
        std::env::set_var("AILANG_BATCH_SIZE", "lots");
        std::env::set_var("AILANG_RETRY_COUNT", "-1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.retry_count, 3);

        clear_env();
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::new("  ");
        assert!(matches!(config.validate(), Err(TranslationError::Config(_))));

        config = Config::new("key");
        config.batch_size = 0;
        assert!(config.validate().is_err());

        config = Config::new("key");
        config.retry_count = 0;
        assert!(config.validate().is_err());

        config = Config::new("key");
        config.default_language = "en-US".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::new("key");
        config.max_cache_size_mb = 2;
        config.initial_retry_delay = Duration::from_millis(250);

        let cache = config.cache_settings();
        assert_eq!(cache.max_size_bytes, 2 * 1024 * 1024);
        assert_eq!(cache.avg_entry_bytes, 100);
        assert_eq!(cache.ttl, config.cache_duration);

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert_eq!(retry.max_delay, Duration::from_secs(30));
    }
}

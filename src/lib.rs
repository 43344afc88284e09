//! AI-backed string translation with batched provider calls and an expiring
//! local cache.
//!
//! ```rust,ignore
//! use ailang::{AiLang, BaseStrings, Config, FileStore};
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let strings = BaseStrings::load("strings_en.json")?;
//! let store = Arc::new(FileStore::open(&config.storage_dir)?);
//!
//! let ailang = AiLang::init(config, strings, store).await?;
//! ailang.set_language("es");
//! println!("{}", ailang.t_count("items", 3));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod i18n;
pub mod retry;
pub mod storage;
pub mod tasks;
pub mod translation;

pub use cache::{CacheStats, ExpiringCache};
pub use config::Config;
pub use error::TranslationError;
pub use facade::{AiLang, ListenerId, TranslationResult};
pub use i18n::{BaseStrings, Language, StringMap};
pub use storage::{BlobStore, FileStore, MemoryStore};
pub use translation::BatchTranslationClient;

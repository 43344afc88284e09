//! Internationalization (i18n) module.
//!
//! Everything about languages and strings that does not talk to the
//! translation provider.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the supported languages and their metadata
//! - `language`: Validated language handle
//! - `preference`: Active language resolution and persistence
//! - `strings`: Base strings in the default language
//! - `format`: `{name}` interpolation and `singular|plural` selection
//! - `validator`: Checks on translated values
//! - `metrics`: Lookup and provider counters
//!
//! # Example
//!
//! ```rust,ignore
//! use ailang::i18n::{interpolate, pluralize, Language};
//!
//! let spanish = Language::from_code("es")?;
//! assert_eq!(interpolate("Hi {name}", [("name", "Ana")]), "Hi Ana");
//! assert_eq!(pluralize("{count} item|{count} items", 2), "2 items");
//! ```

mod format;
mod language;
mod metrics;
mod preference;
mod registry;
mod strings;
mod validator;

pub use format::{interpolate, pluralize};
pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use preference::LanguagePreferenceStore;
pub use registry::{LanguageConfig, LanguageRegistry, RTL_LANGUAGES};
pub use strings::{BaseStrings, StringMap};
pub use validator::{TranslationValidator, ValidationReport};

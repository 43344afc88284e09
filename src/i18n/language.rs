//! Language type: validated handle into the registry.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

/// A supported language.
///
/// Only constructible from a registry entry, so the accessors never miss.
/// Equality is by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
}

impl Language {
    /// Create a Language from a language code string.
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is in the registry
    /// * `Err` if the code is unknown
    pub fn from_code(code: &str) -> Result<Language> {
        match LanguageRegistry::get().get_by_code(code) {
            Some(config) => Ok(Language::from(config)),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// English name (e.g., "Spanish")
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name in the language itself (e.g., "Español")
    pub fn native_name(&self) -> &'static str {
        self.native_name
    }

    pub fn is_rtl(&self) -> bool {
        LanguageRegistry::is_rtl(self.code)
    }
}

impl From<&LanguageConfig> for Language {
    fn from(config: &LanguageConfig) -> Self {
        Language {
            code: config.code,
            name: config.name,
            native_name: config.native_name,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

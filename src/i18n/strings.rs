//! Base (source-language) strings handed to the core at startup.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Ordered key → text mapping used throughout the crate.
pub type StringMap = BTreeMap<String, String>;

/// Immutable vocabulary in the default language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseStrings {
    strings: StringMap,
}

impl BaseStrings {
    pub fn new(strings: StringMap) -> Self {
        Self { strings }
    }

    /// Load a flat JSON object of `key: text` pairs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read base strings from {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Invalid base strings file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let strings: StringMap =
            serde_json::from_str(json).context("Base strings must be a JSON object of strings")?;
        Ok(Self::new(strings))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Base text for `key`, or the key itself when unknown.
    pub fn get_or_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.strings.iter()
    }

    pub fn as_map(&self) -> &StringMap {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BaseStrings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

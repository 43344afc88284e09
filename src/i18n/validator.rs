//! Translation quality validation module.
//!
//! Checks that a translated value kept what the provider was told to keep:
//! `{token}` placeholders verbatim and the `singular|plural` shape. Findings
//! are advisory; the translation is used either way.

use crate::i18n::StringMap;
use regex::Regex;
use std::sync::OnceLock;

/// Validation report for one value or one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_warnings()
    }
}

/// Validator for translated strings.
pub struct TranslationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate one translated value against its source text.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        if orig_placeholders != trans_placeholders {
            report.warnings.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        let orig_forms = Self::plural_forms(original);
        let trans_forms = Self::plural_forms(translated);
        if orig_forms != trans_forms {
            report.warnings.push(format!(
                "Plural form mismatch: original has {} forms, translation has {}",
                orig_forms, trans_forms
            ));
        }

        report
    }

    /// Validate a whole chunk: per-key checks plus missing keys.
    pub fn validate_batch(source: &StringMap, translated: &StringMap) -> ValidationReport {
        let mut report = ValidationReport::new();

        for (key, original) in source {
            match translated.get(key) {
                Some(value) => {
                    for warning in Self::validate(original, value).warnings {
                        report.warnings.push(format!("{}: {}", key, warning));
                    }
                }
                None => report
                    .warnings
                    .push(format!("{}: missing from translation response", key)),
            }
        }

        report
    }

    /// All `{token}` placeholders, sorted so order changes are not flagged.
    fn extract_placeholders(text: &str) -> Vec<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"\{[A-Za-z0-9_]+\}").expect("placeholder pattern is valid")
        });

        let mut placeholders: Vec<String> = regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        placeholders.sort();
        placeholders
    }

    /// 1 for plain text, 2 for `singular|plural`.
    fn plural_forms(text: &str) -> usize {
        if text.contains('|') {
            2
        } else {
            1
        }
    }
}

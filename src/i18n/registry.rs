//! Language registry: Single source of truth for all supported languages.
//!
//! The table is built once on first access through a `OnceLock` and is
//! read-only afterwards.

use std::sync::OnceLock;

/// Static metadata for a supported language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "es", "fr")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "Spanish", "French")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "Español", "Français")
    pub native_name: &'static str,
}

/// Codes of languages written right-to-left.
///
/// Not every code here is in the registry; the check is independent of support.
pub const RTL_LANGUAGES: [&str; 8] = ["ar", "he", "fa", "ur", "yi", "ps", "sd", "ug"];

/// Registry of supported languages.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the shared registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its exact, case-sensitive code.
    ///
    /// No locale negotiation is done: `"en-US"` does not match `"en"`.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All languages in registry order.
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// Check if a language code is supported.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// Check if a language code is written right-to-left.
    pub fn is_rtl(code: &str) -> bool {
        RTL_LANGUAGES.contains(&code)
    }
}

fn lang(code: &'static str, name: &'static str, native_name: &'static str) -> LanguageConfig {
    LanguageConfig {
        code,
        name,
        native_name,
    }
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        lang("en", "English", "English"),
        lang("hi", "Hindi", "हिन्दी"),
        lang("es", "Spanish", "Español"),
        lang("fr", "French", "Français"),
        lang("de", "German", "Deutsch"),
        lang("it", "Italian", "Italiano"),
        lang("pt", "Portuguese", "Português"),
        lang("ru", "Russian", "Русский"),
        lang("ja", "Japanese", "日本語"),
        lang("ko", "Korean", "한국어"),
        lang("zh", "Chinese", "中文"),
        lang("ar", "Arabic", "العربية"),
        lang("tr", "Turkish", "Türkçe"),
        lang("nl", "Dutch", "Nederlands"),
        lang("pl", "Polish", "Polski"),
        lang("sv", "Swedish", "Svenska"),
        lang("th", "Thai", "ไทย"),
        lang("vi", "Vietnamese", "Tiếng Việt"),
        lang("id", "Indonesian", "Bahasa Indonesia"),
        lang("ms", "Malay", "Bahasa Melayu"),
        lang("fil", "Filipino", "Filipino"),
        lang("bn", "Bengali", "বাংলা"),
        lang("ta", "Tamil", "தமிழ்"),
        lang("te", "Telugu", "తెలుగు"),
        lang("mr", "Marathi", "मराठी"),
        lang("gu", "Gujarati", "ગુજરાતી"),
        lang("kn", "Kannada", "ಕನ್ನಡ"),
        lang("ml", "Malayalam", "മലയാളം"),
        lang("pa", "Punjabi", "ਪੰਜਾਬੀ"),
        lang("ur", "Urdu", "اردو"),
        lang("el", "Greek", "Ελληνικά"),
        lang("cs", "Czech", "Čeština"),
        lang("ro", "Romanian", "Română"),
        lang("hu", "Hungarian", "Magyar"),
        lang("fi", "Finnish", "Suomi"),
        lang("no", "Norwegian", "Norsk"),
        lang("da", "Danish", "Dansk"),
        lang("uk", "Ukrainian", "Українська"),
        lang("he", "Hebrew", "עברית"),
        lang("fa", "Persian", "فارسی"),
        lang("sw", "Swahili", "Kiswahili"),
        lang("af", "Afrikaans", "Afrikaans"),
        lang("bg", "Bulgarian", "Български"),
        lang("ca", "Catalan", "Català"),
        lang("hr", "Croatian", "Hrvatski"),
        lang("et", "Estonian", "Eesti"),
        lang("lv", "Latvian", "Latviešu"),
        lang("lt", "Lithuanian", "Lietuvių"),
        lang("sk", "Slovak", "Slovenčina"),
        lang("sl", "Slovenian", "Slovenščina"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_registry_has_fifty_languages() {
        assert_eq!(LanguageRegistry::get().list_all().len(), 50);
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = LanguageRegistry::get()
            .list_all()
            .iter()
            .map(|lang| lang.code)
            .collect();
        assert_eq!(codes.len(), 50);
    }

    #[test]
    fn test_get_by_code_spanish() {
        let config = LanguageRegistry::get().get_by_code("es").unwrap();
        assert_eq!(config.name, "Spanish");
        assert_eq!(config.native_name, "Español");
    }

    #[test]
    fn test_three_letter_code() {
        assert!(LanguageRegistry::get().is_supported("fil"));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_supported("en"));
        assert!(!registry.is_supported("EN"));
        assert!(!registry.is_supported("en-US"));
        assert!(!registry.is_supported(""));
        assert!(!registry.is_supported("xx"));
    }

    #[test]
    fn test_rtl_languages() {
        for code in ["ar", "he", "fa", "ur", "yi", "ps", "sd", "ug"] {
            assert!(LanguageRegistry::is_rtl(code), "{} should be RTL", code);
        }
        assert!(!LanguageRegistry::is_rtl("en"));
        assert!(!LanguageRegistry::is_rtl("hi"));
        assert!(!LanguageRegistry::is_rtl("AR"));
    }
}

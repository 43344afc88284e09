//! Literal `{name}` substitution and the two-form `singular|plural` rule.

use std::fmt::Display;

/// Replace every `{name}` with the value's `Display` text, for each parameter.
///
/// Placeholders without a matching parameter are left as they are.
pub fn interpolate<I, K, V>(text: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let mut result = text.to_string();
    for (name, value) in params {
        let token = format!("{{{}}}", name.as_ref());
        if result.contains(&token) {
            result = result.replace(&token, &value.to_string());
        }
    }
    result
}

/// Pick a plural alternative and fill in `{count}`.
///
/// Text containing `|` is split at every separator: the first alternative is
/// used when `count == 1`, the second otherwise. Further alternatives are
/// ignored. Text without `|` only gets `{count}` substituted.
pub fn pluralize(text: &str, count: i64) -> String {
    if !text.contains('|') {
        return interpolate(text, [("count", count)]);
    }

    let mut alternatives = text.split('|');
    let singular = alternatives.next().unwrap_or_default();
    let chosen = if count == 1 {
        singular
    } else {
        alternatives.next().unwrap_or(singular)
    };
    chosen.replace("{count}", &count.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_interpolate_single_param() {
        assert_eq!(
            interpolate("Hello, {name}!", [("name", "John")]),
            "Hello, John!"
        );
    }

    #[test]
    fn test_interpolate_replaces_every_occurrence() {
        assert_eq!(
            interpolate("{name} and {name}", [("name", "Ana")]),
            "Ana and Ana"
        );
    }

    #[test]
    fn test_interpolate_leaves_unmatched_placeholders() {
        assert_eq!(
            interpolate("Hi {name}, you have {count} messages", [("name", "Li")]),
            "Hi Li, you have {count} messages"
        );
    }

    #[test]
    fn test_interpolate_mixed_value_types() {
        let text = interpolate("{user} scored {points}", vec![("user", "Kim".to_string())]);
        let text = interpolate(&text, [("points", 42)]);
        assert_eq!(text, "Kim scored 42");
    }

    #[test]
    fn test_pluralize_one() {
        assert_eq!(pluralize("{count} item|{count} items", 1), "1 item");
    }

    #[test]
    fn test_pluralize_zero_and_many() {
        assert_eq!(pluralize("{count} item|{count} items", 0), "0 items");
        assert_eq!(pluralize("{count} item|{count} items", 5), "5 items");
        assert_eq!(pluralize("{count} item|{count} items", -1), "-1 items");
    }

    #[test]
    fn test_pluralize_ignores_alternatives_after_the_second() {
        assert_eq!(pluralize("one|many|extra", 3), "many");
        assert_eq!(pluralize("one|many|extra", 1), "one");
    }

    #[test]
    fn test_pluralize_extra_alternative_does_not_leak_into_plural() {
        assert_eq!(
            pluralize("{count} one|{count} many|{count} extra", 3),
            "3 many"
        );
    }

    #[test]
    fn test_pluralize_without_separator_substitutes_count() {
        assert_eq!(pluralize("{count} files", 3), "3 files");
        assert_eq!(pluralize("Files", 3), "Files");
    }

    proptest! {
        #[test]
        fn prop_pluralize_without_separator_matches_interpolate(
            text in "[^|]*",
            count in any::<i64>(),
        ) {
            prop_assert_eq!(pluralize(&text, count), interpolate(&text, [("count", count)]));
        }

        #[test]
        fn prop_singular_form_chosen_only_for_one(
            singular in "[a-z ]{1,10}",
            plural in "[A-Z ]{1,10}",
            count in any::<i64>(),
        ) {
            let text = format!("{}|{}", singular, plural);
            let expected = if count == 1 { singular } else { plural };
            prop_assert_eq!(pluralize(&text, count), expected);
        }
    }
}

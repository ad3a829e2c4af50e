//! Boilerplate removal.
//!
//! A [`Cleaner`] is a small substitution engine: the restaurant's ordered
//! [`BoilerplateRule`]s run first, then weekday names are stripped, and only
//! then is whitespace collapsed. Keeping line breaks until the end lets a
//! rule anchor on them, and running the broad notice rules before the
//! weekday rule keeps a notice such as "Von 13. Oktober bis 17. Oktober"
//! intact until it is removed as a whole.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::MenuError;
use crate::config::BoilerplateRule;

static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r"\b(?:Mo|Di|Mi|Do|Fr|Sa|So|Montag|Dienstag|Mittwoch|Donnerstag|Freitag|Samstag|Sonntag|Mon(?:day)?|Tue(?:sday)?|Wed(?:nesday)?|Thu(?:rsday)?|Fri(?:day)?|Sat(?:urday)?|Sun(?:day)?)\b",
    )
    .case_insensitive(true)
    .build()
    .expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone)]
struct CompiledRule {
    re: Regex,
    replacement: String,
}

/// Compiled cleaning rules for one restaurant.
#[derive(Debug, Clone)]
pub struct Cleaner {
    rules: Vec<CompiledRule>,
    strip_weekdays: bool,
}

impl Cleaner {
    /// Compiles `rules` in order.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Pattern`] for the first rule that does not
    /// compile.
    pub fn new(rules: &[BoilerplateRule], strip_weekdays: bool) -> Result<Self, MenuError> {
        let rules = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(rule.case_insensitive)
                    .build()
                    .map(|re| CompiledRule {
                        re,
                        replacement: rule.replacement.clone(),
                    })
                    .map_err(|source| MenuError::Pattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            strip_weekdays,
        })
    }

    /// Returns `raw` with boilerplate removed and whitespace collapsed to
    /// single spaces.
    #[must_use]
    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.to_owned();

        for rule in &self.rules {
            // Replacements are literal; `$` in a configured replacement is
            // not a capture reference.
            text = rule
                .re
                .replace_all(&text, regex::NoExpand(&rule.replacement))
                .into_owned();
        }

        if self.strip_weekdays {
            text = remove_weekdays(&text);
        }

        normalize_whitespace(&text)
    }
}

/// Deletes German and English weekday names, full or abbreviated.
#[must_use]
pub fn remove_weekdays(text: &str) -> String {
    WEEKDAY_RE.replace_all(text, "").into_owned()
}

/// Collapses every whitespace run, line breaks included, into one space.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn weitblick_rules() -> Vec<BoilerplateRule> {
        vec![
            BoilerplateRule::remove("WEITBLICK.*?Market"),
            BoilerplateRule::remove(r"Von\s+\d{1,2}\.\s*\w+\s+bis\s+\d{1,2}\.\s*\w+"),
            BoilerplateRule::remove("Tagesaktuelle.*"),
            BoilerplateRule::remove("Ab sofort.*Barzahlung.*"),
            BoilerplateRule {
                pattern: r" \| ".into(),
                replacement: ", ".into(),
                case_insensitive: false,
            },
        ]
    }

    #[test]
    fn removes_weekdays_in_both_languages() {
        assert_eq!(
            normalize_whitespace(&remove_weekdays("Montag Linsensuppe MON Friday Fr. Mo")),
            "Linsensuppe ."
        );
    }

    #[test]
    fn keeps_words_that_merely_start_with_a_weekday() {
        assert_eq!(remove_weekdays("Sojabohnen Donut Mozzarella"), "Sojabohnen Donut Mozzarella");
    }

    #[test]
    fn cleans_weitblick_column() {
        let cleaner = Cleaner::new(&weitblick_rules(), true).unwrap();
        let raw = "WEITBLICK Kantine am Market\nVon 13. Oktober bis 17. Oktober\nMontag\nCurrywurst | Pommes\n7,20 €\nTagesaktuelle Preise an der Kasse\nAb sofort keine Barzahlung mehr";
        assert_eq!(cleaner.clean(raw), "Currywurst, Pommes 7,20 €");
    }

    #[test]
    fn notice_removal_runs_before_weekday_removal() {
        // Stripping "Mo" and "Fr" first would break the notice pattern and
        // leave "Gültig 13.10. bis 17.10." behind.
        let rules = vec![BoilerplateRule::remove(
            r"Gültig\s+Mo\s+\d{1,2}\.\d{1,2}\.\s+bis\s+Fr\s+\d{1,2}\.\d{1,2}\.",
        )];
        let cleaner = Cleaner::new(&rules, true).unwrap();
        let cleaned = cleaner.clean("Gültig Mo 13.10. bis Fr 17.10.\nSuppe 3,50 €");
        assert_eq!(cleaned, "Suppe 3,50 €");
        assert!(!cleaned.contains("bis"));
    }

    #[test]
    fn replacement_is_literal() {
        let rules = vec![BoilerplateRule {
            pattern: "EUR".into(),
            replacement: "$1".into(),
            case_insensitive: false,
        }];
        let cleaner = Cleaner::new(&rules, false).unwrap();
        assert_eq!(cleaner.clean("3,50 EUR"), "3,50 $1");
    }

    #[test]
    fn invalid_rule_is_reported() {
        let err = Cleaner::new(&[BoilerplateRule::remove("(unclosed")], true).unwrap_err();
        assert!(matches!(err, MenuError::Pattern { ref pattern, .. } if pattern == "(unclosed"));
    }
}

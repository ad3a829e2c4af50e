//! Price tokens and name/price field extraction.
//!
//! A price token is 1–3 digits, a comma or period, and exactly two digits,
//! optionally followed by the currency symbol. Digits that belong to a longer
//! number (`1.234,50`, `12.10.2025`) are not prices.

use std::sync::LazyLock;

use regex::Regex;

use crate::MenuError;

static BARE_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})[.,](\d{2})\b").expect("valid regex"));

/// Location and value of one price token inside a string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceToken {
    /// Byte offset of the first digit.
    pub start: usize,
    /// Byte offset just past the token, including a trailing currency
    /// symbol when one follows.
    pub end: usize,
    pub value: f64,
}

/// Price-token matcher bound to one currency symbol.
#[derive(Debug, Clone)]
pub struct PricePattern {
    re: Regex,
}

impl PricePattern {
    /// # Errors
    ///
    /// Returns [`MenuError::Pattern`] if the symbol produces an invalid
    /// pattern (it is escaped, so this only happens for pathological input).
    pub fn new(currency_symbol: &str) -> Result<Self, MenuError> {
        let pattern = if currency_symbol.trim().is_empty() {
            r"\b(\d{1,3})[.,](\d{2})\b".to_owned()
        } else {
            format!(
                r"\b(\d{{1,3}})[.,](\d{{2}})\b(?:\s*{})?",
                regex::escape(currency_symbol.trim())
            )
        };
        let re = Regex::new(&pattern).map_err(|source| MenuError::Pattern { pattern, source })?;
        Ok(Self { re })
    }

    /// All price tokens in `text`, left to right.
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = PriceToken> + 'a {
        collect_tokens(&self.re, text)
    }
}

fn collect_tokens<'a>(re: &'a Regex, text: &'a str) -> impl Iterator<Item = PriceToken> + 'a {
    re.captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        let units = caps.get(1)?;
        let cents = caps.get(2)?;

        if separator_then_digit(text[..units.start()].chars().rev())
            || separator_then_digit(text[cents.end()..].chars())
        {
            return None;
        }

        let value = format!("{}.{}", units.as_str(), cents.as_str())
            .parse::<f64>()
            .ok()?;
        Some(PriceToken {
            start: units.start(),
            end: whole.end(),
            value,
        })
    })
}

/// Whether the text next to a token is a separator followed by more digits,
/// i.e. the token is a slice of a thousands-grouped number or a date.
fn separator_then_digit(mut chars: impl Iterator<Item = char>) -> bool {
    matches!(
        (chars.next(), chars.next()),
        (Some('.' | ','), Some(c)) if c.is_ascii_digit()
    )
}

/// Splits a raw item into its name and price.
///
/// The last price token decides: the trimmed text before it is the name and
/// its digits, with a decimal comma read as a point, are the price. Without
/// a price token the whole trimmed string is the name and the price is the
/// `0.0` sentinel.
#[must_use]
pub fn split_name_price(item: &str) -> (String, f64) {
    match collect_tokens(&BARE_PRICE_RE, item).last() {
        Some(token) => (item[..token.start].trim().to_owned(), token.value),
        None => {
            log::debug!("No price token in {item:?}, using 0.0");
            (item.trim().to_owned(), 0.0)
        }
    }
}

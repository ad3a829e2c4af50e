//! Item segmentation: cutting a cleaned region into raw dish strings.
//!
//! The price token is the delimiter. With
//! [`PriceDelimiterMode::CurrencySymbol`] the text is cut at each currency
//! symbol; with [`PriceDelimiterMode::LookaheadPattern`] it is cut right after
//! each price token so every item ends in exactly one price. Joining the
//! output with spaces and segmenting it again yields the same items.

use crate::MenuError;
use crate::config::{PriceDelimiterMode, SaladBarRule};
use crate::price::PricePattern;

/// Splits cleaned text into item strings for one restaurant.
#[derive(Debug, Clone)]
pub struct ItemSegmenter {
    mode: PriceDelimiterMode,
    symbol: String,
    prices: PricePattern,
    salad_bar: Option<SaladBarRule>,
}

impl ItemSegmenter {
    /// # Errors
    ///
    /// Returns [`MenuError::Config`] when symbol splitting is requested
    /// without a currency symbol.
    pub fn new(
        mode: PriceDelimiterMode,
        currency_symbol: &str,
        salad_bar: Option<SaladBarRule>,
    ) -> Result<Self, MenuError> {
        let symbol = currency_symbol.trim().to_owned();
        if mode == PriceDelimiterMode::CurrencySymbol && symbol.is_empty() {
            return Err(MenuError::Config(
                "currency-symbol splitting needs a currency_symbol".into(),
            ));
        }

        Ok(Self {
            mode,
            prices: PricePattern::new(&symbol)?,
            symbol,
            salad_bar,
        })
    }

    /// Item strings of one cleaned region, in reading order.
    #[must_use]
    pub fn segment(&self, cleaned: &str) -> Vec<String> {
        let items = match self.mode {
            PriceDelimiterMode::CurrencySymbol => self.split_at_symbol(cleaned),
            PriceDelimiterMode::LookaheadPattern => self.split_after_prices(cleaned),
        };

        match &self.salad_bar {
            Some(rule) => self.apply_salad_bar(rule, items),
            None => items,
        }
    }

    fn split_at_symbol(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = text.split(self.symbol.as_str()).collect();
        let last = pieces.len().saturating_sub(1);

        pieces
            .iter()
            .enumerate()
            .filter_map(|(i, piece)| {
                let piece = piece.trim();
                if piece.is_empty() {
                    None
                } else if i < last {
                    Some(format!("{piece} {}", self.symbol))
                } else {
                    // Trailing text that no symbol terminated.
                    Some(piece.to_owned())
                }
            })
            .collect()
    }

    fn split_after_prices(&self, text: &str) -> Vec<String> {
        let mut items = Vec::new();
        let mut start = 0;

        for token in self.prices.tokens(text) {
            let item = text[start..token.end].trim();
            if !item.is_empty() {
                items.push(item.to_owned());
            }
            start = token.end;
        }

        let rest = text[start..].trim();
        if !rest.is_empty() {
            items.push(rest.to_owned());
        }
        items
    }

    /// Replaces a leading multi-tier salad-bar listing with one synthetic
    /// item per tier: the rule's label followed by the last two words of
    /// the tier's chunk.
    ///
    /// The listing starts at an item naming the trigger and continues, up to
    /// `tiers` items, only through items that name the trigger again or
    /// carry nothing but a price.
    fn apply_salad_bar(&self, rule: &SaladBarRule, items: Vec<String>) -> Vec<String> {
        let trigger = rule.trigger.to_lowercase();
        let names_trigger = |item: &str| item.to_lowercase().contains(&trigger);
        if !items.first().is_some_and(|first| names_trigger(first)) {
            return items;
        }

        let tiers = 1 + items
            .iter()
            .take(rule.tiers)
            .skip(1)
            .take_while(|item| names_trigger(item) || self.is_bare_price(item))
            .count();
        let mut out = Vec::with_capacity(items.len());

        for chunk in &items[..tiers] {
            let words: Vec<&str> = chunk.split_whitespace().collect();
            let has_symbol = !self.symbol.is_empty() && words.last() == Some(&self.symbol.as_str());
            let words: Vec<&str> = words
                .into_iter()
                .filter(|w| *w != self.symbol && !w.to_lowercase().contains(&trigger))
                .collect();
            let tail = &words[words.len().saturating_sub(2)..];

            let mut synthetic = rule.label.clone();
            for word in tail {
                synthetic.push(' ');
                synthetic.push_str(word);
            }
            if has_symbol {
                synthetic.push(' ');
                synthetic.push_str(&self.symbol);
            }
            log::debug!("Salad-bar tier {chunk:?} -> {synthetic:?}");
            out.push(synthetic);
        }

        out.extend(items.into_iter().skip(tiers));
        out
    }

    /// Whether `item` is a price token and nothing else.
    fn is_bare_price(&self, item: &str) -> bool {
        let mut rest = item.to_owned();
        let tokens: Vec<_> = self.prices.tokens(item).collect();
        if tokens.is_empty() {
            return false;
        }
        for token in tokens.iter().rev() {
            rest.replace_range(token.start..token.end, " ");
        }
        if !self.symbol.is_empty() {
            rest = rest.replace(self.symbol.as_str(), " ");
        }
        rest.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segmenter(mode: PriceDelimiterMode, salad_bar: bool) -> ItemSegmenter {
        ItemSegmenter::new(mode, "€", salad_bar.then(SaladBarRule::default)).unwrap()
    }

    #[test]
    fn splits_at_currency_symbol() {
        let items = segmenter(PriceDelimiterMode::CurrencySymbol, false)
            .segment("Tagessuppe 3,50 € Schweinebraten mit Knödel 9,90€ Hinweis");
        assert_eq!(
            items,
            vec!["Tagessuppe 3,50 €", "Schweinebraten mit Knödel 9,90 €", "Hinweis"]
        );
    }

    #[test]
    fn splits_after_each_price() {
        let items = segmenter(PriceDelimiterMode::LookaheadPattern, false)
            .segment("Linsensuppe 4,20 Currywurst, Pommes 7,20€ Kaiserschmarrn 6.90 € Obst");
        assert_eq!(
            items,
            vec!["Linsensuppe 4,20", "Currywurst, Pommes 7,20€", "Kaiserschmarrn 6.90 €", "Obst"]
        );
    }

    #[test]
    fn empty_text_has_no_items() {
        assert!(segmenter(PriceDelimiterMode::CurrencySymbol, true).segment("").is_empty());
        assert!(segmenter(PriceDelimiterMode::LookaheadPattern, true).segment("  ").is_empty());
    }

    #[test]
    fn rebuilds_salad_bar_tiers() {
        let items = segmenter(PriceDelimiterMode::LookaheadPattern, true)
            .segment("Salatbar 2,00 3,50 Currywurst 7,20€");
        assert_eq!(items, vec!["Salatbar 2,00", "Salatbar 3,50", "Currywurst 7,20€"]);
    }

    #[test]
    fn keeps_tier_words_and_symbol() {
        let items = segmenter(PriceDelimiterMode::CurrencySymbol, true)
            .segment("SALATBAR klein 2,00 € Salatbar groß 3,50 € Suppe 4,00 €");
        assert_eq!(
            items,
            vec!["Salatbar klein 2,00 €", "Salatbar groß 3,50 €", "Suppe 4,00 €"]
        );
    }

    #[test]
    fn single_price_salad_bar_leaves_next_dish_alone() {
        for mode in [PriceDelimiterMode::CurrencySymbol, PriceDelimiterMode::LookaheadPattern] {
            let items = segmenter(mode, true)
                .segment("Salatbar 3,50 € Currywurst mit Pommes 7,20 € Suppe 4,00 €");
            assert_eq!(
                items,
                vec!["Salatbar 3,50 €", "Currywurst mit Pommes 7,20 €", "Suppe 4,00 €"],
                "{mode:?}"
            );
        }
    }

    #[test]
    fn bare_price_continues_the_listing() {
        let items = segmenter(PriceDelimiterMode::CurrencySymbol, true)
            .segment("Salatbar klein 2,00 € 3,50 € Suppe 4,00 €");
        assert_eq!(
            items,
            vec!["Salatbar klein 2,00 €", "Salatbar 3,50 €", "Suppe 4,00 €"]
        );
    }

    #[test]
    fn salad_bar_rule_needs_trigger_in_first_item() {
        let items = segmenter(PriceDelimiterMode::LookaheadPattern, true)
            .segment("Suppe 3,50 Salatbar 2,00 Braten 9,90");
        assert_eq!(items, vec!["Suppe 3,50", "Salatbar 2,00", "Braten 9,90"]);
    }

    #[test]
    fn segmentation_is_idempotent() {
        let inputs = [
            (PriceDelimiterMode::CurrencySymbol, "Tagessuppe 3,50 € Schweinebraten 9,90€"),
            (PriceDelimiterMode::CurrencySymbol, "Salatbar klein 2,00 € groß 3,50 € Suppe 4,00 € Rest"),
            (PriceDelimiterMode::LookaheadPattern, "Salatbar 2,00 3,50 Currywurst 7,20€"),
            (PriceDelimiterMode::LookaheadPattern, "Suppe 4,20 Eintopf 5.10 € ohne Preis"),
        ];
        for (mode, input) in inputs {
            let segmenter = segmenter(mode, true);
            let once = segmenter.segment(input);
            let twice = segmenter.segment(&once.join(" "));
            assert_eq!(once, twice, "{input}");
        }
    }

    #[test]
    fn symbol_mode_requires_symbol() {
        assert!(matches!(
            ItemSegmenter::new(PriceDelimiterMode::CurrencySymbol, " ", None),
            Err(MenuError::Config(_))
        ));
        assert!(ItemSegmenter::new(PriceDelimiterMode::LookaheadPattern, "", None).is_ok());
    }
}

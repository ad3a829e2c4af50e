//! Turning a [`StructuredMenu`] into dated, priced [`MenuItem`] records.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, Month, NaiveDate};
use regex::Regex;

use crate::MenuError;
use crate::config::DateBase;
use crate::model::{MenuItem, SectionKey, StructuredMenu};
use crate::price::split_name_price;
use crate::store::MenuStore;

static VALIDITY_NOTICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bVon\s+(\d{1,2})\.\s*(\p{L}+)\s+bis\b").expect("valid regex")
});

/// Dates a menu resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    /// Date of the run; labelled sections are dated here.
    pub today: NaiveDate,
    /// Date of day-offset 0.
    pub base: NaiveDate,
}

impl DateContext {
    /// A context whose base is `today`.
    #[must_use]
    pub const fn today(today: NaiveDate) -> Self {
        Self { today, base: today }
    }

    /// Resolves `date_base` for a run on `today`. `full_text` is the
    /// document's text, consulted only for [`DateBase::ValidityNotice`].
    #[must_use]
    pub fn resolve(date_base: DateBase, today: NaiveDate, full_text: Option<&str>) -> Self {
        let base = match date_base {
            DateBase::Today => today,
            DateBase::WeekStart => week_start(today),
            DateBase::ValidityNotice => {
                match full_text.and_then(|text| parse_validity_notice(text, today)) {
                    Some(date) => date,
                    None => {
                        log::warn!("No validity notice found, dating the menu from {today}");
                        today
                    }
                }
            }
        };
        Self { today, base }
    }

    /// Date of a section.
    #[must_use]
    pub fn date_for(&self, key: &SectionKey) -> NaiveDate {
        match key {
            SectionKey::Day(offset) => self.base + chrono::Duration::days(i64::from(*offset)),
            SectionKey::Label(_) => self.today,
        }
    }
}

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// First date of a "Von 13. Oktober bis 17. Oktober" notice.
///
/// The notice carries no year, so the day is placed in the year before,
/// of, or after `today`, whichever lands closest to `today`.
#[must_use]
pub fn parse_validity_notice(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = VALIDITY_NOTICE_RE.captures(text)?;

    let day = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let month = german_month(caps.get(2)?.as_str())?.number_from_month();

    [today.year() - 1, today.year(), today.year() + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|candidate| (*candidate - today).num_days().abs())
}

fn german_month(name: &str) -> Option<Month> {
    let month = match name.to_lowercase().as_str() {
        "januar" | "jänner" => Month::January,
        "februar" => Month::February,
        "märz" | "maerz" => Month::March,
        "april" => Month::April,
        "mai" => Month::May,
        "juni" => Month::June,
        "juli" => Month::July,
        "august" => Month::August,
        "september" => Month::September,
        "oktober" => Month::October,
        "november" => Month::November,
        "dezember" => Month::December,
        _ => return None,
    };
    Some(month)
}

/// Writes the records of one document into a [`MenuStore`].
pub struct RecordBuilder<'a, S: MenuStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: MenuStore + ?Sized> RecordBuilder<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves the restaurant and replaces its records, one day at a time,
    /// with one record per raw item. Returns the records in menu order.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::RestaurantResolution`] when the restaurant cannot
    /// be resolved (nothing is written), or [`MenuError::Store`] when a day
    /// cannot be replaced. Days replaced before the failure stay replaced.
    pub fn build(
        &self,
        restaurant_name: &str,
        menu: &StructuredMenu,
        dates: &DateContext,
    ) -> Result<Vec<MenuItem>, MenuError> {
        let restaurant = self
            .store
            .find_or_create_restaurant(restaurant_name)
            .map_err(|source| MenuError::RestaurantResolution {
                name: restaurant_name.to_owned(),
                source,
            })?;

        let items: Vec<MenuItem> = menu
            .iter()
            .flat_map(|(key, raw_items)| {
                let date = dates.date_for(key);
                raw_items.iter().map(move |raw| (date, raw))
            })
            .map(|(date, raw)| {
                let (name, price) = split_name_price(raw);
                MenuItem {
                    name,
                    price,
                    date,
                    restaurant: restaurant.clone(),
                }
            })
            .collect();

        let mut days: BTreeMap<NaiveDate, Vec<MenuItem>> = BTreeMap::new();
        for item in &items {
            log::debug!("{} {}: {} ({:.2})", restaurant.name, item.date, item.name, item.price);
            days.entry(item.date).or_default().push(item.clone());
        }
        for (date, day) in &days {
            self.store.replace_menu(&restaurant, *date, day)?;
        }

        Ok(items)
    }
}

//! Menu-document extraction for canteens and restaurants.
//!
//! A menu PDF goes through a fixed chain of stages, each driven by the
//! restaurant's [`RestaurantConfig`]:
//!
//! 1. [`loader`] opens the document as flat text or positioned fragments.
//! 2. [`layout`] cuts it into one region per day column or menu section.
//! 3. [`cleaner`] strips boilerplate and weekday names.
//! 4. [`items`] splits the cleaned text into raw dish strings.
//! 5. [`price`] separates dish names from prices.
//! 6. [`records`] dates the dishes and hands them to a [`MenuStore`].
//!
//! [`update_restaurant`] runs the whole chain and never fails; a document
//! that cannot be parsed yields zero records and an error log entry.

pub mod cleaner;
pub mod config;
mod error;
pub mod items;
pub mod layout;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod price;
pub mod records;
pub mod store;

pub use config::{Config, RestaurantConfig};
pub use error::{MenuError, StoreError};
pub use loader::{MemoryDocument, PageSource, PdfDocument};
pub use model::{MenuItem, RestaurantRef, SectionKey, StructuredMenu};
pub use pipeline::{MenuPipeline, update_all, update_restaurant};
pub use price::split_name_price;
pub use store::{InMemoryStore, MenuStore};

use chrono::{Datelike, NaiveDate};

/// Parses a `YYYY-MM-DD` or `YYYY/MM/DD` query parameter.
#[must_use]
pub fn parse_date_param(input: &str) -> Option<NaiveDate> {
    let parts: Vec<_> = input
        .split(['-', '/'])
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let year = parts[0].parse::<i32>().ok()?;
    let month = parts[1].parse::<u32>().ok()?;
    let day = parts[2].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_date_separators() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 19);
        assert_eq!(parse_date_param("2026-10-19"), expected);
        assert_eq!(parse_date_param("2026/10/19"), expected);
        assert_eq!(parse_date_param("2026-13-01"), None);
        assert_eq!(parse_date_param("19.10.2026"), None);
    }

    #[test]
    fn formats_with_padding() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(format_date(date), "2026-03-02");
    }
}

//! Per-restaurant pipeline configuration.
//!
//! Every vendor template difference is expressed here as data so a layout
//! change means editing `restaurants.toml`, not the parser. A config file
//! holds one `[[restaurant]]` table per menu document:
//!
//! ```toml
//! [[restaurant]]
//! name = "Weitblick"
//! document = "menus/Wochenkarte.pdf"
//! price_delimiter = "lookahead-pattern"
//!
//! [restaurant.layout]
//! strategy = "fixed-margin"
//! band_width = 173.0
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::MenuError;

/// All restaurants known to an update job.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "restaurant", default)]
    pub restaurants: Vec<RestaurantConfig>,
}

impl Config {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Config`] if the TOML is malformed or a
    /// restaurant entry is inconsistent.
    pub fn from_toml_str(source: &str) -> Result<Self, MenuError> {
        let config: Self = toml::from_str(source).map_err(|e| MenuError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file. Relative `document` paths are resolved against
    /// the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, MenuError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| MenuError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&source)?;

        if let Some(base) = path.parent() {
            for restaurant in &mut config.restaurants {
                if restaurant.document.is_relative() {
                    restaurant.document = base.join(&restaurant.document);
                }
            }
        }

        log::debug!(
            "Loaded {} restaurant(s) from {}",
            config.restaurants.len(),
            path.display()
        );
        Ok(config)
    }

    #[must_use]
    pub fn restaurant(&self, name: &str) -> Option<&RestaurantConfig> {
        self.restaurants
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    fn validate(&self) -> Result<(), MenuError> {
        let mut seen = BTreeSet::new();
        for restaurant in &self.restaurants {
            if restaurant.name.trim().is_empty() {
                return Err(MenuError::Config("restaurant name must not be empty".into()));
            }
            if !seen.insert(restaurant.name.to_lowercase()) {
                return Err(MenuError::Config(format!(
                    "restaurant `{}` is configured twice",
                    restaurant.name
                )));
            }
            if restaurant.day_count == 0 {
                return Err(MenuError::Config(format!(
                    "restaurant `{}`: day_count must be at least 1",
                    restaurant.name
                )));
            }
            if let Some(rule) = &restaurant.salad_bar
                && rule.tiers == 0
            {
                return Err(MenuError::Config(format!(
                    "restaurant `{}`: salad_bar.tiers must be at least 1",
                    restaurant.name
                )));
            }
        }
        Ok(())
    }
}

/// How one restaurant's menu document is turned into items.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestaurantConfig {
    /// Unique restaurant name, used to resolve its identity in the store.
    pub name: String,
    /// Local path of the downloaded PDF.
    pub document: PathBuf,
    /// Where the update job downloads the PDF from, if anywhere.
    #[serde(default)]
    pub source_url: Option<String>,
    pub layout: LayoutStrategy,
    /// Zero-based page read by the geometric layouts.
    #[serde(default)]
    pub page: usize,
    /// Number of day columns on a weekly document.
    #[serde(default = "default_day_count")]
    pub day_count: u32,
    #[serde(default)]
    pub price_delimiter: PriceDelimiterMode,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Boilerplate rules, applied in order before weekday removal.
    #[serde(default)]
    pub boilerplate: Vec<BoilerplateRule>,
    #[serde(default = "default_true")]
    pub strip_weekdays: bool,
    #[serde(default)]
    pub salad_bar: Option<SaladBarRule>,
    #[serde(default)]
    pub date_base: DateBase,
}

impl RestaurantConfig {
    /// A minimal config for `name` reading `document`; everything else
    /// takes its default.
    #[must_use]
    pub fn new(name: impl Into<String>, document: impl Into<PathBuf>, layout: LayoutStrategy) -> Self {
        Self {
            name: name.into(),
            document: document.into(),
            source_url: None,
            layout,
            page: 0,
            day_count: default_day_count(),
            price_delimiter: PriceDelimiterMode::default(),
            currency_symbol: default_currency_symbol(),
            boilerplate: Vec::new(),
            strip_weekdays: true,
            salad_bar: None,
            date_base: DateBase::default(),
        }
    }
}

const fn default_day_count() -> u32 {
    5
}

fn default_currency_symbol() -> String {
    "€".to_owned()
}

const fn default_true() -> bool {
    true
}

/// Strategy used to cut a document into regions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum LayoutStrategy {
    /// Fixed vertical bands, one per day.
    FixedMargin(FixedMarginLayout),
    /// One column per detected weekday label.
    AnchorDetection(AnchorLayout),
    /// Single-day document split at section marker words.
    Sections(SectionsLayout),
}

impl LayoutStrategy {
    /// Whether the strategy needs positioned fragments rather than flat
    /// text.
    #[must_use]
    pub const fn is_geometric(&self) -> bool {
        matches!(self, Self::FixedMargin(_) | Self::AnchorDetection(_))
    }
}

/// Band geometry for [`LayoutStrategy::FixedMargin`]. The defaults were
/// calibrated against the Weitblick weekly template.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixedMarginLayout {
    pub horizontal_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    /// Width of each band; `None` splits the usable width evenly.
    pub band_width: Option<f64>,
}

impl Default for FixedMarginLayout {
    fn default() -> Self {
        Self {
            horizontal_margin: 60.0,
            top_margin: 96.0,
            bottom_margin: 44.0,
            band_width: None,
        }
    }
}

/// Anchor search parameters for [`LayoutStrategy::AnchorDetection`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnchorLayout {
    /// Day labels; a label's position in the list is its day-offset.
    pub labels: Vec<String>,
    /// Maximum distance of an anchor from the mean anchor height.
    pub vertical_tolerance: f64,
    /// Horizontal reach of a column either side of its anchor centre.
    pub half_width: f64,
    /// Distance of the column bottom from the page bottom.
    pub bottom_margin: f64,
}

impl Default for AnchorLayout {
    fn default() -> Self {
        Self {
            labels: ["Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            vertical_tolerance: 10.0,
            half_width: 86.5,
            bottom_margin: 44.0,
        }
    }
}

/// Section markers for [`LayoutStrategy::Sections`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SectionsLayout {
    /// Markers in document order; each starts a section named by `label`.
    pub markers: Vec<SectionMarker>,
    /// Label of the text before the first marker found.
    pub leading_label: String,
    /// Label used when none of the markers occur.
    pub fallback_label: String,
}

impl Default for SectionsLayout {
    fn default() -> Self {
        Self {
            markers: vec![
                SectionMarker {
                    marker: "TAGESKARTE".into(),
                    label: "Tageskarte".into(),
                },
                SectionMarker {
                    marker: "Dessert".into(),
                    label: "Dessert".into(),
                },
            ],
            leading_label: "Mittagstisch".into(),
            fallback_label: "All".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionMarker {
    /// Literal, case-sensitive text that starts the section.
    pub marker: String,
    pub label: String,
}

/// How cleaned text is cut into items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceDelimiterMode {
    /// Cut at every currency symbol.
    #[default]
    CurrencySymbol,
    /// Cut after every price token, symbol or not.
    LookaheadPattern,
}

/// One declarative substitution applied by the cleaner.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoilerplateRule {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

impl BoilerplateRule {
    /// A case-insensitive rule deleting every match of `pattern`.
    #[must_use]
    pub fn remove(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: String::new(),
            case_insensitive: true,
        }
    }
}

/// Multi-tier salad-bar listing at the top of a day column.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaladBarRule {
    /// Case-insensitive token that marks the listing.
    pub trigger: String,
    /// Name given to every synthetic tier item.
    pub label: String,
    /// Number of leading items consumed by the listing.
    pub tiers: usize,
}

impl Default for SaladBarRule {
    fn default() -> Self {
        Self {
            trigger: "salatbar".into(),
            label: "Salatbar".into(),
            tiers: 2,
        }
    }
}

/// Date that day-offset 0 of a weekly document resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateBase {
    /// The day the document is parsed.
    #[default]
    Today,
    /// Monday of the current week.
    WeekStart,
    /// First day of the document's "Von .. bis .." notice.
    ValidityNotice,
}

//! The end-to-end flow for one restaurant: load, segment, clean, split,
//! extract and record.

use chrono::NaiveDate;

use crate::MenuError;
use crate::cleaner::Cleaner;
use crate::config::{Config, DateBase, RestaurantConfig};
use crate::items::ItemSegmenter;
use crate::layout::LayoutSegmenter;
use crate::loader::{PageSource, PdfDocument};
use crate::model::{MenuItem, StructuredMenu};
use crate::records::{DateContext, RecordBuilder};
use crate::store::MenuStore;

/// A restaurant's configuration compiled into ready-to-run stages.
#[derive(Debug, Clone)]
pub struct MenuPipeline {
    name: String,
    page: usize,
    date_base: DateBase,
    layout: LayoutSegmenter,
    cleaner: Cleaner,
    items: ItemSegmenter,
}

impl MenuPipeline {
    /// Compiles every pattern the configuration names.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Pattern`] or [`MenuError::Config`] when the
    /// configuration cannot be compiled. Nothing is read yet.
    pub fn new(config: &RestaurantConfig) -> Result<Self, MenuError> {
        Ok(Self {
            name: config.name.clone(),
            page: config.page,
            date_base: config.date_base,
            layout: LayoutSegmenter::new(&config.layout, config.day_count)?,
            cleaner: Cleaner::new(&config.boilerplate, config.strip_weekdays)?,
            items: ItemSegmenter::new(
                config.price_delimiter,
                &config.currency_symbol,
                config.salad_bar.clone(),
            )?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw item strings per section, without touching any store.
    ///
    /// # Errors
    ///
    /// Propagates loader failures such as a missing page.
    pub fn extract(&self, source: &dyn PageSource) -> Result<StructuredMenu, MenuError> {
        let mut menu = StructuredMenu::new();

        for region in self.layout.segment(source, self.page)? {
            let cleaned = self.cleaner.clean(&region.text());
            let items = self.items.segment(&cleaned);
            if items.is_empty() {
                log::warn!("{}: no items in {}", self.name, region.key);
            } else {
                log::debug!("{}: {} items in {}", self.name, items.len(), region.key);
            }
            menu.push(region.key, items);
        }

        Ok(menu)
    }

    /// Extracts the menu and writes its records into `store`.
    ///
    /// # Errors
    ///
    /// Returns the first loader, restaurant-resolution or store failure.
    pub fn run<S: MenuStore + ?Sized>(
        &self,
        source: &dyn PageSource,
        store: &S,
        today: NaiveDate,
    ) -> Result<Vec<MenuItem>, MenuError> {
        let menu = self.extract(source)?;

        let full_text = match self.date_base {
            DateBase::ValidityNotice => Some(source.full_text()?),
            DateBase::Today | DateBase::WeekStart => None,
        };
        let dates = DateContext::resolve(self.date_base, today, full_text.as_deref());

        let items = RecordBuilder::new(store).build(&self.name, &menu, &dates)?;
        log::info!(
            "{}: {} items across {} sections",
            self.name,
            items.len(),
            menu.section_count()
        );
        Ok(items)
    }
}

/// Parses one restaurant's local document into `store`.
///
/// Never fails: a document that cannot be opened, parsed or recorded is
/// logged and counts as zero items.
pub fn update_restaurant<S: MenuStore + ?Sized>(
    config: &RestaurantConfig,
    store: &S,
    today: NaiveDate,
) -> usize {
    match try_update(config, store, today) {
        Ok(items) => items.len(),
        Err(err) => {
            log::error!("Skipping {}: {err}", config.name);
            0
        }
    }
}

fn try_update<S: MenuStore + ?Sized>(
    config: &RestaurantConfig,
    store: &S,
    today: NaiveDate,
) -> Result<Vec<MenuItem>, MenuError> {
    let pipeline = MenuPipeline::new(config)?;
    let document = PdfDocument::open(&config.document)?;
    pipeline.run(&document, store, today)
}

/// Runs [`update_restaurant`] for every configured restaurant and returns
/// the total number of records written.
pub fn update_all<S: MenuStore + ?Sized>(config: &Config, store: &S, today: NaiveDate) -> usize {
    let total = config
        .restaurants
        .iter()
        .map(|restaurant| update_restaurant(restaurant, store, today))
        .sum();
    log::info!("Update finished: {total} items");
    total
}

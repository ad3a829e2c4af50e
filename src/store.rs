//! Persistence seam for finished menu records.
//!
//! The pipeline only ever talks to a [`MenuStore`]; the binary and the tests
//! share the [`InMemoryStore`] shipped here.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::StoreError;
use crate::model::{MenuItem, RestaurantRef};

/// Where menu records end up.
///
/// Implementations must make [`find_or_create_restaurant`] idempotent: two
/// calls with the same name return the same identity.
///
/// [`find_or_create_restaurant`]: MenuStore::find_or_create_restaurant
pub trait MenuStore {
    /// Looks up a restaurant by name, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read or written.
    fn find_or_create_restaurant(&self, name: &str) -> Result<RestaurantRef, StoreError>;

    /// Drops every record of `restaurant` on `date`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be written.
    fn clear_menu(&self, restaurant: &RestaurantRef, date: NaiveDate) -> Result<(), StoreError>;

    /// Persists one record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be written.
    fn save(&self, item: &MenuItem) -> Result<(), StoreError>;

    /// Replaces every record of `restaurant` on `date` with `items`.
    ///
    /// The default clears and then saves one record at a time, so a failing
    /// save leaves the day partly written. Stores that can swap a day in one
    /// step should override it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be written.
    fn replace_menu(
        &self,
        restaurant: &RestaurantRef,
        date: NaiveDate,
        items: &[MenuItem],
    ) -> Result<(), StoreError> {
        self.clear_menu(restaurant, date)?;
        items.iter().try_for_each(|item| self.save(item))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    restaurants: Vec<RestaurantRef>,
    menus: BTreeMap<NaiveDate, Vec<MenuItem>>,
}

/// Mutex-guarded store used by the server and in tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Every known restaurant, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn restaurants(&self) -> Result<Vec<RestaurantRef>, StoreError> {
        Ok(self.lock()?.restaurants.clone())
    }

    /// Records for `date`, optionally narrowed to one restaurant (matched
    /// case-insensitively).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn menu_for(
        &self,
        date: NaiveDate,
        restaurant: Option<&str>,
    ) -> Result<Vec<MenuItem>, StoreError> {
        let state = self.lock()?;
        let items = state.menus.get(&date).map(Vec::as_slice).unwrap_or_default();

        Ok(items
            .iter()
            .filter(|item| {
                restaurant.is_none_or(|name| item.restaurant.name.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect())
    }

    /// Total number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.menus.values().map(Vec::len).sum())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl MenuStore for InMemoryStore {
    fn find_or_create_restaurant(&self, name: &str) -> Result<RestaurantRef, StoreError> {
        let mut state = self.lock()?;

        if let Some(existing) = state.restaurants.iter().find(|r| r.name == name) {
            return Ok(existing.clone());
        }

        let id = u32::try_from(state.restaurants.len() + 1)
            .map_err(|_| StoreError::Unavailable("restaurant id space exhausted".into()))?;
        let restaurant = RestaurantRef {
            id,
            name: name.to_owned(),
        };
        log::info!("Created restaurant {name} (id {id})");
        state.restaurants.push(restaurant.clone());
        Ok(restaurant)
    }

    fn clear_menu(&self, restaurant: &RestaurantRef, date: NaiveDate) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(items) = state.menus.get_mut(&date) {
            items.retain(|item| item.restaurant.id != restaurant.id);
        }
        Ok(())
    }

    fn save(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.lock()?
            .menus
            .entry(item.date)
            .or_default()
            .push(item.clone());
        Ok(())
    }

    fn replace_menu(
        &self,
        restaurant: &RestaurantRef,
        date: NaiveDate,
        items: &[MenuItem],
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let day = state.menus.entry(date).or_default();
        day.retain(|item| item.restaurant.id != restaurant.id);
        day.extend(items.iter().cloned());
        Ok(())
    }
}

//! Value types passed between the pipeline stages.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page coordinates, origin top-left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[must_use]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether the point lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// A run of text on one baseline together with its bounding box.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub bbox: BBox,
}

impl Fragment {
    #[must_use]
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// One page of a document as positioned text fragments.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page {
    /// Zero-based page index.
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub fragments: Vec<Fragment>,
}

/// Key of one region of a menu: a weekly column or a named section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    /// Days after the date base (0 = first column).
    Day(u32),
    /// Named section of a single-day document, e.g. `"Tageskarte"`.
    Label(String),
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(offset) => write!(f, "Day {}", offset + 1),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Raw item strings grouped by section, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredMenu {
    sections: Vec<(SectionKey, Vec<String>)>,
}

impl StructuredMenu {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Appends `items` to `key`, creating the section on first use.
    pub fn push(&mut self, key: SectionKey, items: Vec<String>) {
        if let Some((_, existing)) = self.sections.iter_mut().find(|(k, _)| *k == key) {
            existing.extend(items);
        } else {
            self.sections.push((key, items));
        }
    }

    #[must_use]
    pub fn get(&self, key: &SectionKey) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, items)| items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionKey, &[String])> {
        self.sections
            .iter()
            .map(|(key, items)| (key, items.as_slice()))
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|(_, items)| items.len()).sum()
    }
}

/// Identity of a restaurant as known to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestaurantRef {
    pub id: u32,
    pub name: String,
}

/// A finished dish record ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    /// Price in the menu's currency; `0.0` when the entry carried no price.
    pub price: f64,
    pub date: NaiveDate,
    pub restaurant: RestaurantRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structured_menu_keeps_insertion_order() {
        let mut menu = StructuredMenu::new();
        menu.push(SectionKey::Label("Tageskarte".into()), vec!["b".into()]);
        menu.push(SectionKey::Label("Mittagstisch".into()), vec!["a".into()]);
        menu.push(SectionKey::Label("Tageskarte".into()), vec!["c".into()]);

        let keys: Vec<String> = menu.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["Tageskarte", "Mittagstisch"]);
        assert_eq!(
            menu.get(&SectionKey::Label("Tageskarte".into())),
            Some(&["b".to_string(), "c".to_string()][..])
        );
        assert_eq!(menu.item_count(), 3);
    }

    #[test]
    fn bbox_union_and_containment() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 20.0, 12.0);
        assert_eq!(a.union(&b), BBox::new(0.0, 0.0, 20.0, 12.0));
        assert!(a.contains_point(10.0, 0.0));
        assert!(!a.contains_point(10.5, 5.0));
        assert_eq!(b.center(), (12.5, 8.5));
    }
}

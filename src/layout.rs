//! Layout segmentation: cutting a document into one region per day column
//! or per menu section.

use regex::Regex;

use crate::MenuError;
use crate::config::{AnchorLayout, FixedMarginLayout, LayoutStrategy, SectionsLayout};
use crate::loader::PageSource;
use crate::model::{BBox, Fragment, Page, SectionKey};

/// Fragments of one column or section, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub key: SectionKey,
    /// Page area the region covers; `None` when the region was cut from
    /// flat text or no anchor located it.
    pub bounds: Option<BBox>,
    pub fragments: Vec<Fragment>,
}

impl RawRegion {
    fn empty(key: SectionKey) -> Self {
        Self {
            key,
            bounds: None,
            fragments: Vec::new(),
        }
    }

    fn from_text(key: SectionKey, text: &str) -> Self {
        Self {
            key,
            bounds: None,
            fragments: vec![Fragment::new(text, BBox::new(0.0, 0.0, 0.0, 0.0))],
        }
    }

    /// Fragment texts joined line by line.
    #[must_use]
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.text.trim().is_empty())
    }
}

/// Splits pages into regions according to a [`LayoutStrategy`].
#[derive(Debug, Clone)]
pub struct LayoutSegmenter {
    strategy: LayoutStrategy,
    day_count: u32,
    anchors: Vec<Regex>,
}

impl LayoutSegmenter {
    /// # Errors
    ///
    /// Returns [`MenuError::Pattern`] if an anchor label cannot be turned
    /// into a pattern.
    pub fn new(strategy: &LayoutStrategy, day_count: u32) -> Result<Self, MenuError> {
        let anchors = match strategy {
            LayoutStrategy::AnchorDetection(layout) => layout
                .labels
                .iter()
                .map(|label| {
                    let pattern = format!(r"(?i)\b{}\b", regex::escape(label.trim()));
                    Regex::new(&pattern).map_err(|source| MenuError::Pattern { pattern, source })
                })
                .collect::<Result<Vec<_>, _>>()?,
            LayoutStrategy::FixedMargin(_) | LayoutStrategy::Sections(_) => Vec::new(),
        };

        Ok(Self {
            strategy: strategy.clone(),
            day_count,
            anchors,
        })
    }

    /// Reads what the strategy needs from `source` and segments it.
    ///
    /// # Errors
    ///
    /// Propagates loader failures; an empty page is not an error.
    pub fn segment(
        &self,
        source: &dyn PageSource,
        page_index: usize,
    ) -> Result<Vec<RawRegion>, MenuError> {
        if self.strategy.is_geometric() {
            let page = source.page(page_index)?;
            Ok(self.segment_page(&page))
        } else {
            Ok(self.segment_text(&source.full_text()?))
        }
    }

    /// Segments positioned fragments. The sections strategy reads the page
    /// as flat text.
    #[must_use]
    pub fn segment_page(&self, page: &Page) -> Vec<RawRegion> {
        match &self.strategy {
            LayoutStrategy::FixedMargin(layout) => fixed_margin(page, layout, self.day_count),
            LayoutStrategy::AnchorDetection(layout) => {
                anchor_detection(page, layout, &self.anchors, self.day_count)
            }
            LayoutStrategy::Sections(layout) => {
                let text = fragments_in(page, None)
                    .into_iter()
                    .map(|f| f.text)
                    .collect::<Vec<_>>()
                    .join("\n");
                sections(&text, layout)
            }
        }
    }

    /// Segments flat text. Geometric strategies have nothing to cut, so
    /// the whole text becomes day 0.
    #[must_use]
    pub fn segment_text(&self, text: &str) -> Vec<RawRegion> {
        match &self.strategy {
            LayoutStrategy::Sections(layout) => sections(text, layout),
            LayoutStrategy::FixedMargin(_) | LayoutStrategy::AnchorDetection(_) => {
                vec![RawRegion::from_text(SectionKey::Day(0), text)]
            }
        }
    }
}

/// Fragments whose centre lies in `bounds` (all when `None`), sorted
/// top-to-bottom then left-to-right.
fn fragments_in(page: &Page, bounds: Option<&BBox>) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = page
        .fragments
        .iter()
        .filter(|f| {
            bounds.is_none_or(|b| {
                let (cx, cy) = f.bbox.center();
                b.contains_point(cx, cy)
            })
        })
        .cloned()
        .collect();
    fragments.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    fragments
}

fn region_for(page: &Page, day: u32, bounds: BBox) -> RawRegion {
    let fragments = fragments_in(page, Some(&bounds));
    if fragments.is_empty() {
        log::warn!("Day {day}: no text inside {bounds:?} on page {}", page.index);
    }
    RawRegion {
        key: SectionKey::Day(day),
        bounds: Some(bounds),
        fragments,
    }
}

fn fixed_margin(page: &Page, layout: &FixedMarginLayout, day_count: u32) -> Vec<RawRegion> {
    let usable = (page.width - 2.0 * layout.horizontal_margin).max(0.0);
    let band_width = layout
        .band_width
        .unwrap_or_else(|| usable / f64::from(day_count));
    let top = layout.top_margin;
    let bottom = page.height - layout.bottom_margin;

    (0..day_count)
        .map(|day| {
            let left = layout.horizontal_margin + f64::from(day) * band_width;
            region_for(page, day, BBox::new(left, top, left + band_width, bottom))
        })
        .collect()
}

fn anchor_detection(
    page: &Page,
    layout: &AnchorLayout,
    labels: &[Regex],
    day_count: u32,
) -> Vec<RawRegion> {
    let mut candidates: Vec<(usize, BBox)> = Vec::new();
    for fragment in fragments_in(page, None) {
        for (day, label) in labels.iter().enumerate() {
            if label.is_match(&fragment.text) {
                candidates.push((day, fragment.bbox));
            }
        }
    }

    if candidates.is_empty() {
        log::warn!("No day anchors found on page {}", page.index);
        return (0..day_count)
            .map(|day| RawRegion::empty(SectionKey::Day(day)))
            .collect();
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_y = candidates.iter().map(|(_, b)| b.center().1).sum::<f64>() / candidates.len() as f64;
    candidates.retain(|(day, bbox)| {
        let keep = (bbox.center().1 - mean_y).abs() <= layout.vertical_tolerance;
        if !keep {
            log::debug!("Dropping anchor for day {day} at y={:.1} (mean {mean_y:.1})", bbox.center().1);
        }
        keep
    });

    let bottom = page.height - layout.bottom_margin;
    (0..day_count)
        .map(|day| {
            let anchor = candidates
                .iter()
                .find(|(d, _)| *d == day as usize)
                .map(|(_, bbox)| *bbox);
            match anchor {
                Some(anchor) => {
                    let (cx, _) = anchor.center();
                    let bounds = BBox::new(
                        cx - layout.half_width,
                        anchor.y0,
                        cx + layout.half_width,
                        bottom,
                    );
                    region_for(page, day, bounds)
                }
                None => {
                    log::warn!("No anchor for day {day} on page {}", page.index);
                    RawRegion::empty(SectionKey::Day(day))
                }
            }
        })
        .collect()
}

fn sections(text: &str, layout: &SectionsLayout) -> Vec<RawRegion> {
    let mut regions = Vec::new();
    let mut label = layout.leading_label.as_str();
    let mut rest = text;

    for marker in &layout.markers {
        if marker.marker.is_empty() {
            continue;
        }
        if let Some((before, after)) = rest.split_once(marker.marker.as_str()) {
            regions.push(RawRegion::from_text(SectionKey::Label(label.to_owned()), before));
            label = marker.label.as_str();
            rest = after;
        } else {
            log::debug!("Section marker {:?} not found", marker.marker);
        }
    }

    if regions.is_empty() {
        return vec![RawRegion::from_text(
            SectionKey::Label(layout.fallback_label.clone()),
            text,
        )];
    }

    regions.push(RawRegion::from_text(SectionKey::Label(label.to_owned()), rest));
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionMarker;
    use pretty_assertions::assert_eq;

    fn frag(text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Fragment {
        Fragment::new(text, BBox::new(x0, y0, x1, y1))
    }

    fn page(fragments: Vec<Fragment>) -> Page {
        Page {
            index: 0,
            width: 985.0,
            height: 700.0,
            fragments,
        }
    }

    fn texts(region: &RawRegion) -> Vec<&str> {
        region.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn fixed_margin_assigns_fragments_by_centre() {
        let layout = LayoutStrategy::FixedMargin(FixedMarginLayout {
            band_width: Some(173.0),
            ..FixedMarginLayout::default()
        });
        let segmenter = LayoutSegmenter::new(&layout, 5).unwrap();
        let regions = segmenter.segment_page(&page(vec![
            // Header above the top margin.
            frag("WEITBLICK", 400.0, 20.0, 500.0, 40.0),
            frag("Currywurst 7,20 €", 70.0, 150.0, 200.0, 160.0),
            frag("Salatbar", 70.0, 120.0, 150.0, 130.0),
            // Straddles the first band edge but its centre is in band 1.
            frag("Linsen 6,50 €", 220.0, 120.0, 330.0, 130.0),
            frag("Fisch 9,90 €", 760.0, 120.0, 860.0, 130.0),
            // Footer below the bottom margin.
            frag("Ab sofort keine Barzahlung", 70.0, 670.0, 300.0, 680.0),
        ]));

        assert_eq!(regions.len(), 5);
        assert_eq!(regions[0].key, SectionKey::Day(0));
        assert_eq!(texts(&regions[0]), vec!["Salatbar", "Currywurst 7,20 €"]);
        assert_eq!(texts(&regions[1]), vec!["Linsen 6,50 €"]);
        assert!(regions[2].is_empty());
        assert!(regions[3].is_empty());
        assert_eq!(texts(&regions[4]), vec!["Fisch 9,90 €"]);
        assert_eq!(regions[4].bounds, Some(BBox::new(752.0, 96.0, 925.0, 656.0)));
    }

    #[test]
    fn fixed_margin_splits_evenly_without_band_width() {
        let layout = LayoutStrategy::FixedMargin(FixedMarginLayout {
            horizontal_margin: 0.0,
            top_margin: 0.0,
            bottom_margin: 0.0,
            band_width: None,
        });
        let segmenter = LayoutSegmenter::new(&layout, 2).unwrap();
        let mut p = page(vec![frag("links", 10.0, 10.0, 20.0, 20.0), frag("rechts", 600.0, 10.0, 620.0, 20.0)]);
        p.width = 1000.0;
        let regions = segmenter.segment_page(&p);
        assert_eq!(regions[0].bounds, Some(BBox::new(0.0, 0.0, 500.0, 700.0)));
        assert_eq!(texts(&regions[1]), vec!["rechts"]);
    }

    #[test]
    fn anchor_detection_ignores_stray_labels() {
        let layout = LayoutStrategy::AnchorDetection(AnchorLayout::default());
        let segmenter = LayoutSegmenter::new(&layout, 5).unwrap();
        let regions = segmenter.segment_page(&page(vec![
            frag("Montag", 100.0, 100.0, 140.0, 110.0),
            frag("Dienstag", 280.0, 102.0, 330.0, 112.0),
            frag("Mittwoch", 460.0, 99.0, 510.0, 109.0),
            frag("Donnerstag", 640.0, 101.0, 700.0, 111.0),
            // Friday's header is missing; this mention sits lower in the
            // body and must not become an anchor.
            frag("Freitag geschlossen", 800.0, 140.0, 900.0, 150.0),
            frag("Suppe 3,50 €", 90.0, 130.0, 160.0, 140.0),
            frag("Braten 9,90 €", 270.0, 130.0, 340.0, 140.0),
        ]));

        assert_eq!(regions.len(), 5);
        assert_eq!(texts(&regions[0]), vec!["Montag", "Suppe 3,50 €"]);
        assert_eq!(texts(&regions[1]), vec!["Dienstag", "Braten 9,90 €"]);
        assert_eq!(texts(&regions[2]), vec!["Mittwoch"]);
        assert_eq!(regions[4], RawRegion::empty(SectionKey::Day(4)));
        assert_eq!(regions[0].bounds, Some(BBox::new(33.5, 100.0, 206.5, 656.0)));
    }

    #[test]
    fn anchor_detection_without_anchors_yields_empty_days() {
        let layout = LayoutStrategy::AnchorDetection(AnchorLayout::default());
        let segmenter = LayoutSegmenter::new(&layout, 5).unwrap();
        let regions = segmenter.segment_page(&page(vec![frag("Suppe 3,50 €", 90.0, 130.0, 160.0, 140.0)]));
        assert_eq!(regions.len(), 5);
        assert!(regions.iter().all(RawRegion::is_empty));
    }

    #[test]
    fn sections_split_at_markers() {
        let layout = LayoutStrategy::Sections(SectionsLayout::default());
        let segmenter = LayoutSegmenter::new(&layout, 1).unwrap();
        let regions = segmenter.segment_text("Suppe 3,50 €\nTAGESKARTE\nBraten 9,90 €\nDessert\nEis 2,50 €");

        let keys: Vec<String> = regions.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["Mittagstisch", "Tageskarte", "Dessert"]);
        assert_eq!(regions[1].text().trim(), "Braten 9,90 €");
        assert_eq!(regions[2].text().trim(), "Eis 2,50 €");
    }

    #[test]
    fn sections_skip_missing_markers() {
        let layout = SectionsLayout {
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
            ..SectionsLayout::default()
        };
        let regions = sections("Suppe 3,50 € TAGESKARTE Braten 9,90 €", &layout);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].key, SectionKey::Label("Tageskarte".into()));
    }

    #[test]
    fn sections_fall_back_to_single_section() {
        let regions = sections("Tagessuppe 3,50 € Schweinebraten 9,90 €", &SectionsLayout::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].key, SectionKey::Label("All".into()));
    }
}

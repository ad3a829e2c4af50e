//! Document loading.
//!
//! [`PdfDocument`] reads a PDF from disk and exposes it either as one flat
//! string (for layouts that only need reading order) or as pages of
//! positioned [`Fragment`]s (for layouts that cut the page geometrically).
//! [`MemoryDocument`] serves the same interface from data already in memory.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use pdf_extract::{Document, MediaBox, OutputDev, OutputError, Transform};

use crate::MenuError;
use crate::model::{BBox, Fragment, Page};

/// Horizontal gap, in font sizes, above which two glyphs on one baseline
/// belong to different fragments.
const FRAGMENT_GAP: f64 = 1.5;
/// Horizontal gap, in font sizes, above which a space is inserted.
const SPACE_GAP: f64 = 0.1;

/// Text of a menu document, flat or positioned.
pub trait PageSource {
    /// The text of every page in reading order.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Extraction`] if the content cannot be decoded.
    fn full_text(&self) -> Result<String, MenuError>;

    /// Positioned fragments of one zero-based page.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::MissingPage`] for an index past the last page,
    /// or [`MenuError::Extraction`] if the content cannot be decoded.
    fn page(&self, index: usize) -> Result<Page, MenuError>;
}

/// A PDF file opened from disk.
pub struct PdfDocument {
    path: PathBuf,
    bytes: Vec<u8>,
    doc: Document,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Opens and parses the PDF at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::DocumentOpen`] if the file is missing,
    /// unreadable, or not a PDF.
    pub fn open(path: &Path) -> Result<Self, MenuError> {
        let open_error = |reason: String| MenuError::DocumentOpen {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = std::fs::read(path).map_err(|e| open_error(e.to_string()))?;
        let doc = Document::load_mem(&bytes).map_err(|e| open_error(e.to_string()))?;

        log::debug!(
            "Opened {} ({} bytes, {} pages)",
            path.display(),
            bytes.len(),
            doc.get_pages().len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            doc,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Positioned fragments of every page.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Extraction`] if the content cannot be decoded.
    pub fn pages(&self) -> Result<Vec<Page>, MenuError> {
        let mut collector = FragmentCollector::default();
        guard_extraction(|| pdf_extract::output_doc(&self.doc, &mut collector))?;
        Ok(collector.pages)
    }
}

impl PageSource for PdfDocument {
    fn full_text(&self) -> Result<String, MenuError> {
        guard_extraction(|| pdf_extract::extract_text_from_mem(&self.bytes))
    }

    fn page(&self, index: usize) -> Result<Page, MenuError> {
        let count = self.page_count();
        if index >= count {
            return Err(MenuError::MissingPage { index, count });
        }
        self.pages()?
            .into_iter()
            .find(|page| page.index == index)
            .ok_or(MenuError::MissingPage { index, count })
    }
}

/// Runs a `pdf_extract` call, turning both its errors and its panics on
/// malformed content into [`MenuError::Extraction`].
fn guard_extraction<T>(
    extract: impl FnOnce() -> Result<T, OutputError>,
) -> Result<T, MenuError> {
    match catch_unwind(AssertUnwindSafe(extract)) {
        Ok(result) => result.map_err(|e| MenuError::Extraction(e.to_string())),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(MenuError::Extraction(format!("PDF decoder panicked: {reason}")))
        }
    }
}

#[derive(Debug)]
struct Run {
    text: String,
    bbox: BBox,
    baseline: f64,
    font_size: f64,
}

#[derive(Debug)]
struct PageBuilder {
    page: Page,
    origin_x: f64,
    top: f64,
    run: Option<Run>,
}

impl PageBuilder {
    fn flush(&mut self) {
        if let Some(run) = self.run.take() {
            let text = run.text.trim();
            if !text.is_empty() {
                self.page.fragments.push(Fragment::new(text, run.bbox));
            }
        }
    }

    fn push_glyph(&mut self, glyph: &str, x: f64, baseline: f64, advance: f64, font_size: f64) {
        let bbox = BBox::new(x, baseline - font_size, x + advance, baseline);

        if let Some(run) = &mut self.run {
            let gap = x - run.bbox.x1;
            let same_line = (baseline - run.baseline).abs() <= run.font_size * 0.5;
            let adjacent = gap >= -run.font_size * 0.5 && gap <= run.font_size * FRAGMENT_GAP;

            if same_line && adjacent {
                if gap > run.font_size * SPACE_GAP && !run.text.ends_with(' ') {
                    run.text.push(' ');
                }
                run.text.push_str(glyph);
                run.bbox = run.bbox.union(&bbox);
                return;
            }
        }

        self.flush();
        if glyph.trim().is_empty() {
            return;
        }
        self.run = Some(Run {
            text: glyph.to_owned(),
            bbox,
            baseline,
            font_size,
        });
    }
}

/// Collects glyphs from `pdf_extract` into per-page fragments with a
/// top-left origin.
#[derive(Debug, Default)]
struct FragmentCollector {
    pages: Vec<Page>,
    current: Option<PageBuilder>,
}

impl OutputDev for FragmentCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.current = Some(PageBuilder {
            page: Page {
                index: page_num.saturating_sub(1) as usize,
                width: media_box.urx - media_box.llx,
                height: media_box.ury - media_box.lly,
                fragments: Vec::new(),
            },
            origin_x: media_box.llx,
            top: media_box.ury,
            run: None,
        });
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        if let Some(mut builder) = self.current.take() {
            builder.flush();
            log::debug!(
                "Page {}: {} fragments",
                builder.page.index,
                builder.page.fragments.len()
            );
            self.pages.push(builder.page);
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let Some(builder) = &mut self.current else {
            return Ok(());
        };
        let size = font_size * (trm.m11 * trm.m22).abs().sqrt();
        let x = trm.m31 - builder.origin_x;
        let baseline = builder.top - trm.m32;
        builder.push_glyph(char, x, baseline, width * size, size);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// A document held in memory: flat text, positioned pages, or both.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    text: Option<String>,
    pages: Vec<Page>,
}

impl MemoryDocument {
    /// A document that only has flat text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            pages: Vec::new(),
        }
    }

    /// A document made of positioned pages. Its flat text is the fragment
    /// texts in reading order.
    #[must_use]
    pub fn from_pages(pages: Vec<Page>) -> Self {
        Self { text: None, pages }
    }

    /// Overrides the flat text, e.g. to carry a header that lies outside
    /// every region.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl PageSource for MemoryDocument {
    fn full_text(&self) -> Result<String, MenuError> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        let mut lines = Vec::new();
        for page in &self.pages {
            let mut fragments: Vec<&Fragment> = page.fragments.iter().collect();
            fragments.sort_by(|a, b| {
                a.bbox
                    .y0
                    .total_cmp(&b.bbox.y0)
                    .then(a.bbox.x0.total_cmp(&b.bbox.x0))
            });
            lines.extend(fragments.into_iter().map(|f| f.text.as_str()));
        }
        Ok(lines.join("\n"))
    }

    fn page(&self, index: usize) -> Result<Page, MenuError> {
        self.pages
            .iter()
            .find(|page| page.index == index)
            .cloned()
            .ok_or(MenuError::MissingPage {
                index,
                count: self.pages.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> PageBuilder {
        PageBuilder {
            page: Page {
                index: 0,
                width: 600.0,
                height: 800.0,
                fragments: Vec::new(),
            },
            origin_x: 0.0,
            top: 800.0,
            run: None,
        }
    }

    fn push_word(builder: &mut PageBuilder, word: &str, mut x: f64, baseline: f64) -> f64 {
        for c in word.chars() {
            builder.push_glyph(&c.to_string(), x, baseline, 5.0, 10.0);
            x += 5.0;
        }
        x
    }

    #[test]
    fn groups_glyphs_into_fragments() {
        let mut b = builder();
        let end = push_word(&mut b, "Suppe", 100.0, 200.0);
        push_word(&mut b, "3,50", end + 3.0, 200.0);
        // Far to the right: the next column.
        push_word(&mut b, "Braten", 300.0, 200.0);
        // Next line of the first column.
        push_word(&mut b, "Salat", 100.0, 214.0);
        b.flush();

        let texts: Vec<&str> = b.page.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Suppe 3,50", "Braten", "Salat"]);
        assert_eq!(b.page.fragments[0].bbox, BBox::new(100.0, 190.0, 148.0, 200.0));
    }

    #[test]
    fn whitespace_glyphs_do_not_start_fragments() {
        let mut b = builder();
        b.push_glyph(" ", 10.0, 100.0, 5.0, 10.0);
        b.flush();
        assert!(b.page.fragments.is_empty());
    }

    #[test]
    fn missing_file_is_a_document_open_error() {
        let err = PdfDocument::open(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, MenuError::DocumentOpen { .. }));
    }

    #[test]
    fn garbage_file_is_a_document_open_error() {
        let path = std::env::temp_dir().join(format!("speisekarte-garbage-{}.pdf", std::process::id()));
        std::fs::write(&path, b"this is not a pdf").unwrap();
        let err = PdfDocument::open(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, MenuError::DocumentOpen { .. }));
    }

    #[test]
    fn memory_document_orders_fragments_for_flat_text() {
        let doc = MemoryDocument::from_pages(vec![Page {
            index: 0,
            width: 100.0,
            height: 100.0,
            fragments: vec![
                Fragment::new("unten", BBox::new(0.0, 50.0, 10.0, 60.0)),
                Fragment::new("rechts", BBox::new(50.0, 10.0, 60.0, 20.0)),
                Fragment::new("links", BBox::new(0.0, 10.0, 10.0, 20.0)),
            ],
        }]);
        assert_eq!(doc.full_text().unwrap(), "links\nrechts\nunten");
        assert!(matches!(
            doc.page(1),
            Err(MenuError::MissingPage { index: 1, count: 1 })
        ));
    }
}

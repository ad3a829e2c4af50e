//! Error types shared by the extraction pipeline and the persistence seam.

use std::path::PathBuf;

/// Errors that abort the extraction of a single menu document.
///
/// None of these are fatal to an update job: [`crate::update_restaurant`]
/// logs them and reports zero items for the affected restaurant.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// The document is missing, unreadable, or not a valid PDF.
    #[error("failed to open document {}: {reason}", path.display())]
    DocumentOpen {
        /// Path that was being opened.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The PDF opened but its content could not be interpreted.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// The configured page does not exist in the document.
    #[error("page {index} not present (document has {count} pages)")]
    MissingPage {
        /// Zero-based page index that was requested.
        index: usize,
        /// Number of pages the document actually has.
        count: usize,
    },

    /// A configured boilerplate or marker pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern source.
        pattern: String,
        /// Compilation failure reported by the regex engine.
        #[source]
        source: regex::Error,
    },

    /// The restaurant configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The persistence collaborator could not resolve or create the
    /// restaurant identity, so every record of the document was discarded.
    #[error("restaurant `{name}` could not be resolved: {source}")]
    RestaurantResolution {
        /// Restaurant name that was being resolved.
        name: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Saving a record failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a [`crate::store::MenuStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store lock was poisoned by a panicking writer.
    #[error("menu store lock poisoned")]
    Poisoned,

    /// The store refused the operation.
    #[error("menu store unavailable: {0}")]
    Unavailable(String),
}

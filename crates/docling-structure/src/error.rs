//! Error types for the layout structuring engine
//!
//! Only conditions that would make the hierarchy or the export structurally
//! invalid are errors. Per-detection problems (low confidence, degenerate
//! boxes, unknown class ids, failed text extraction) are absorbed by the
//! pipeline and surface in the run metadata instead.
//!
//! # Examples
//!
//! ```
//! use docling_structure::{StructureConfigBuilder, StructureError};
//!
//! let err = StructureConfigBuilder::new()
//!     .confidence_threshold(1.5)
//!     .build()
//!     .unwrap_err();
//! assert!(err.is_config_error());
//! ```

use crate::labels::LayoutLabel;
use thiserror::Error;

/// Errors that abort a structuring run
///
/// # Error Categories
///
/// - **Configuration Errors** ([`Config`]): invalid thresholds or label tables
/// - **Structural Errors** ([`MissingHeadingLevel`], [`InvalidInput`]): the run
///   cannot produce a valid hierarchy and must not emit partial output
/// - **Output Errors** ([`Serialization`], [`Csv`], [`Io`]): writing the artifact failed
///
/// [`Config`]: StructureError::Config
/// [`MissingHeadingLevel`]: StructureError::MissingHeadingLevel
/// [`InvalidInput`]: StructureError::InvalidInput
/// [`Serialization`]: StructureError::Serialization
/// [`Csv`]: StructureError::Csv
/// [`Io`]: StructureError::Io
#[derive(Error, Debug)]
pub enum StructureError {
    /// Invalid configuration (user error, fixable)
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Description of what is invalid in the configuration
        reason: String,
    },

    /// A heading label reached the hierarchy builder without a level entry
    #[error("No heading level configured for label '{label}'")]
    MissingHeadingLevel {
        /// The heading label that could not be ranked
        label: LayoutLabel,
    },

    /// The run input is inconsistent (duplicate pages, non-finite values, ...)
    #[error("Invalid run input: {reason}")]
    InvalidInput {
        /// Description of the inconsistency
        reason: String,
    },

    /// JSON serialization failed
    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV rendering failed
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StructureError {
    /// Returns true if this error is a configuration error (user-fixable)
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the run input or label tables would have produced an
    /// invalid hierarchy
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_fatal_structure_error(&self) -> bool {
        matches!(
            self,
            Self::MissingHeadingLevel { .. } | Self::InvalidInput { .. }
        )
    }

    /// Returns true if this is an I/O error
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Type alias for Result with `StructureError`
pub type Result<T> = std::result::Result<T, StructureError>;

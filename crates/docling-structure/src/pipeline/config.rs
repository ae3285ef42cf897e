use crate::error::{Result, StructureError};
use crate::labels::{HeadingLevels, LabelTable};

/// Default minimum detector score for a detection to survive
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.50;

/// Default vertical distance (pixels) within which two centers share a row
pub const DEFAULT_ROW_TOLERANCE: f64 = 20.0;

/// Validated configuration for a structuring run
///
/// Build with [`StructureConfigBuilder`]; `Default` gives the same values as
/// `StructureConfigBuilder::new().build()`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureConfig {
    /// Detections scoring below this are dropped
    pub confidence_threshold: f64,
    /// Row tolerance for the reading-order comparator (pixels)
    pub row_tolerance: f64,
    /// Detector class id → label
    pub label_table: LabelTable,
    /// Heading label → level
    pub heading_levels: HeadingLevels,
    /// Close a synthesized page section when the page number advances
    pub close_default_section_on_page_change: bool,
}

impl Default for StructureConfig {
    #[inline]
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            label_table: LabelTable::default(),
            heading_levels: HeadingLevels::default(),
            close_default_section_on_page_change: true,
        }
    }
}

/// Builder for [`StructureConfig`]
///
/// # Examples
///
/// ```
/// use docling_structure::StructureConfigBuilder;
///
/// # fn main() -> docling_structure::Result<()> {
/// let config = StructureConfigBuilder::new()
///     .confidence_threshold(0.35)
///     .row_tolerance(12.0)
///     .build()?;
/// assert_eq!(config.confidence_threshold, 0.35);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StructureConfigBuilder {
    confidence_threshold: f64,
    row_tolerance: f64,
    label_table: LabelTable,
    heading_levels: HeadingLevels,
    close_default_section_on_page_change: bool,
}

impl Default for StructureConfigBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl StructureConfigBuilder {
    /// Create a new config builder with defaults
    ///
    /// Default settings:
    /// - Confidence threshold: 0.50
    /// - Row tolerance: 20 px
    /// - Label table: 11-class `DocLayNet`
    /// - Heading levels: Title 1, Section-header 2, Page-header 3, Caption 4
    /// - Synthesized page sections close on page change
    #[inline]
    #[must_use = "returns a new builder with default settings"]
    pub fn new() -> Self {
        let defaults = StructureConfig::default();
        Self {
            confidence_threshold: defaults.confidence_threshold,
            row_tolerance: defaults.row_tolerance,
            label_table: defaults.label_table,
            heading_levels: defaults.heading_levels,
            close_default_section_on_page_change: defaults.close_default_section_on_page_change,
        }
    }

    /// Set the minimum detector score (inclusive)
    #[inline]
    #[must_use = "returns the updated builder"]
    pub const fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the reading-order row tolerance in pixels
    #[inline]
    #[must_use = "returns the updated builder"]
    pub const fn row_tolerance(mut self, tolerance: f64) -> Self {
        self.row_tolerance = tolerance;
        self
    }

    /// Replace the class id → label table
    #[inline]
    #[must_use = "returns the updated builder"]
    pub fn label_table(mut self, table: LabelTable) -> Self {
        self.label_table = table;
        self
    }

    /// Replace the heading level table
    #[inline]
    #[must_use = "returns the updated builder"]
    pub fn heading_levels(mut self, levels: HeadingLevels) -> Self {
        self.heading_levels = levels;
        self
    }

    /// Whether a synthesized page section is closed when the page advances
    #[inline]
    #[must_use = "returns the updated builder"]
    pub const fn close_default_section_on_page_change(mut self, close: bool) -> Self {
        self.close_default_section_on_page_change = close;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    /// Returns [`StructureError::Config`] if the threshold is outside `[0, 1]`,
    /// the row tolerance is negative or not finite, the label table is empty,
    /// or the heading level table is incomplete.
    pub fn build(self) -> Result<StructureConfig> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(StructureError::Config {
                reason: format!(
                    "confidence threshold must be within [0, 1], got {}",
                    self.confidence_threshold
                ),
            });
        }
        if !self.row_tolerance.is_finite() || self.row_tolerance < 0.0 {
            return Err(StructureError::Config {
                reason: format!(
                    "row tolerance must be a non-negative number of pixels, got {}",
                    self.row_tolerance
                ),
            });
        }
        if self.label_table.is_empty() {
            return Err(StructureError::Config {
                reason: "label table has no classes".to_string(),
            });
        }
        self.heading_levels
            .validate()
            .map_err(|reason| StructureError::Config { reason })?;

        Ok(StructureConfig {
            confidence_threshold: self.confidence_threshold,
            row_tolerance: self.row_tolerance,
            label_table: self.label_table,
            heading_levels: self.heading_levels,
            close_default_section_on_page_change: self.close_default_section_on_page_change,
        })
    }
}

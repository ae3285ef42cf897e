//! Structuring pipeline driver
//!
//! Runs the per-page stages (normalize, sequence) for each page, re-sorts the
//! page results by page number, then builds the hierarchy over the
//! document-ordered detections and assembles the export.

use crate::error::{Result, StructureError};
use crate::pipeline::config::StructureConfig;
use crate::pipeline::data_structures::{Detection, PageInput};
use crate::pipeline::export::{render_outline, StructureDocument};
use crate::pipeline::hierarchy::build_hierarchy;
use crate::pipeline::normalizer::{DetectionNormalizer, NormalizeStats};
use crate::pipeline::reading_order::{ReadingOrderConfig, ReadingOrderSequencer};
use crate::pipeline::text::TextExtractor;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

/// Normalized, sequenced detections of one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub image_path: Option<String>,
    /// Upstream processing time reported by the run input
    pub processing_time_ms: Option<f64>,
    /// Detections in reading order (`reading_order` 1..=N)
    pub detections: Vec<Detection>,
    pub stats: NormalizeStats,
    /// Time spent in the core for this page
    pub core_time: Duration,
}

/// Result of a full run
#[derive(Debug, Clone, PartialEq)]
pub struct StructureOutput {
    pub document: StructureDocument,
}

impl StructureOutput {
    /// Serialize the JSON artifact
    ///
    /// # Errors
    /// Returns [`StructureError::Serialization`] if encoding fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        self.document.to_json(pretty)
    }

    /// Render the CSV projection
    ///
    /// # Errors
    /// Returns an error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String> {
        self.document.to_csv()
    }

    /// Markdown outline of the structure forest
    #[must_use = "returns the rendered outline"]
    pub fn outline(&self) -> String {
        render_outline(&self.document.document_structure)
    }

    /// Write the JSON artifact to `path`
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_json(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Write the CSV projection to `path`
    ///
    /// # Errors
    /// Returns an error if rendering or writing fails.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let csv = self.to_csv()?;
        std::fs::write(path, csv)?;
        Ok(())
    }
}

/// Post-processing pipeline over detector output
///
/// # Examples
/// ```
/// use docling_structure::{PageInput, RawDetection, SkipTextExtractor, StructureConfig, StructurePipeline};
///
/// # fn main() -> docling_structure::Result<()> {
/// let page = PageInput::new(1, 612, 792)
///     .with_detection(RawDetection::new(50.0, 40.0, 560.0, 80.0, 0.93, 10.0));
/// let pipeline = StructurePipeline::new(StructureConfig::default());
/// let output = pipeline.run(&[page], &SkipTextExtractor)?;
/// assert_eq!(output.document.all_detections.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StructurePipeline {
    config: StructureConfig,
}

impl StructurePipeline {
    #[must_use = "returns a new pipeline"]
    pub const fn new(config: StructureConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use = "returns the pipeline configuration"]
    pub const fn config(&self) -> &StructureConfig {
        &self.config
    }

    /// Normalize and sequence one page
    ///
    /// # Errors
    /// Returns [`StructureError::InvalidInput`] if the page fails validation.
    pub fn process_page(
        &self,
        page: &PageInput,
        extractor: &dyn TextExtractor,
    ) -> Result<PageResult> {
        validate_page(page)?;
        let start = Instant::now();

        let normalizer =
            DetectionNormalizer::new(self.config.confidence_threshold, &self.config.label_table);
        let (mut detections, stats) = normalizer.normalize_page(page, extractor);

        let sequencer = ReadingOrderSequencer::new(ReadingOrderConfig {
            row_tolerance: self.config.row_tolerance,
        });
        sequencer.sequence(&mut detections);

        let core_time = start.elapsed();
        debug!(
            "Page {}: {} raw, {} kept, {} below threshold, {} degenerate ({:.2} ms)",
            page.page_number,
            stats.raw,
            stats.kept,
            stats.below_threshold,
            stats.degenerate,
            core_time.as_secs_f64() * 1000.0
        );

        Ok(PageResult {
            page_number: page.page_number,
            width: page.width,
            height: page.height,
            image_path: page.image_path.clone(),
            processing_time_ms: page.processing_time_ms,
            detections,
            stats,
            core_time,
        })
    }

    /// Process every page and assemble the export
    ///
    /// Pages may arrive in any order. Nothing is returned unless every page and
    /// the hierarchy succeed.
    ///
    /// # Errors
    /// - [`StructureError::InvalidInput`] for duplicate or zero page numbers,
    ///   non-finite input values and scores outside `[0, 1]`
    /// - [`StructureError::MissingHeadingLevel`] for an unranked heading label
    pub fn run(&self, pages: &[PageInput], extractor: &dyn TextExtractor) -> Result<StructureOutput> {
        let start = Instant::now();

        let mut seen = HashSet::with_capacity(pages.len());
        for page in pages {
            if !seen.insert(page.page_number) {
                return Err(StructureError::InvalidInput {
                    reason: format!("duplicate page number {}", page.page_number),
                });
            }
        }

        let mut results = pages
            .iter()
            .map(|page| self.process_page(page, extractor))
            .collect::<Result<Vec<_>>>()?;
        results.sort_by_key(|result| result.page_number);

        let ordered: Vec<Detection> = results
            .iter()
            .flat_map(|result| result.detections.iter().cloned())
            .collect();
        let forest = build_hierarchy(
            &ordered,
            &self.config.heading_levels,
            self.config.close_default_section_on_page_change,
        )?;

        let generated_at = chrono::Utc::now().to_rfc3339();
        let document =
            StructureDocument::assemble(&results, forest, &self.config, start.elapsed(), generated_at);

        let meta = &document.metadata;
        info!(
            "Structured {} pages: {} detections, {} top-level nodes, {} dropped below threshold {:.2}",
            meta.total_pages,
            meta.total_detections,
            document.document_structure.len(),
            meta.dropped_detections.below_threshold,
            meta.confidence_threshold
        );
        if meta.text_extraction.regions > 0 && meta.text_extraction.regions_with_text == 0 {
            warn!(
                "No text extracted for any of {} regions; headings and content use fallback strings",
                meta.text_extraction.regions
            );
        }
        if meta.unknown_labels > 0 {
            debug!("{} detections had unknown class ids", meta.unknown_labels);
        }

        Ok(StructureOutput { document })
    }
}

fn validate_page(page: &PageInput) -> Result<()> {
    if page.page_number == 0 {
        return Err(StructureError::InvalidInput {
            reason: "page numbers are 1-based, got 0".to_string(),
        });
    }
    if !page.scale.iter().all(|s| s.is_finite()) {
        return Err(StructureError::InvalidInput {
            reason: format!("page {}: non-finite scale {:?}", page.page_number, page.scale),
        });
    }
    if let Some(index) = page.detections.iter().position(|raw| !raw.is_finite()) {
        return Err(StructureError::InvalidInput {
            reason: format!(
                "page {}: raw detection #{index} has non-finite values",
                page.page_number
            ),
        });
    }
    if let Some((index, raw)) = page
        .detections
        .iter()
        .enumerate()
        .find(|(_, raw)| !(0.0..=1.0).contains(&raw.score))
    {
        return Err(StructureError::InvalidInput {
            reason: format!(
                "page {}: raw detection #{index} has score {} outside [0, 1]",
                page.page_number, raw.score
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LayoutLabel;
    use crate::pipeline::data_structures::RawDetection;
    use crate::pipeline::text::{PrecomputedTextExtractor, SkipTextExtractor};

    fn intro_page() -> PageInput {
        PageInput::new(1, 612, 792)
            .with_text_detection(RawDetection::new(10.0, 40.0, 100.0, 90.0, 0.80, 9.0), "body")
            .with_text_detection(RawDetection::new(10.0, 10.0, 100.0, 30.0, 0.95, 10.0), "Intro")
    }

    #[test]
    fn test_process_page_orders_detections() {
        let pipeline = StructurePipeline::default();
        let page = intro_page();
        let extractor = PrecomputedTextExtractor::from_pages(std::slice::from_ref(&page));

        let result = pipeline.process_page(&page, &extractor).unwrap();
        assert_eq!(result.detections[0].label, LayoutLabel::Title);
        assert_eq!(result.detections[0].reading_order, 1);
        assert_eq!(result.detections[0].id, "p1_d1");
        assert_eq!(result.detections[1].extracted_text, "body");
        assert_eq!(result.stats.kept, 2);
    }

    #[test]
    fn test_run_sorts_pages() {
        let pipeline = StructurePipeline::default();
        let mut second = intro_page();
        second.page_number = 2;
        let pages = [second, intro_page()];

        let output = pipeline.run(&pages, &SkipTextExtractor).unwrap();
        let order: Vec<(u32, u32)> = output
            .document
            .all_detections
            .iter()
            .map(|d| (d.page_number, d.reading_order))
            .collect();
        assert_eq!(order, [(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert_eq!(output.document.pages[0].page_number, 1);
    }

    #[test]
    fn test_duplicate_pages_rejected() {
        let pipeline = StructurePipeline::default();
        let err = pipeline
            .run(&[intro_page(), intro_page()], &SkipTextExtractor)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate page number 1"));
    }

    #[test]
    fn test_page_zero_rejected() {
        let pipeline = StructurePipeline::default();
        let err = pipeline
            .run(&[PageInput::new(0, 10, 10)], &SkipTextExtractor)
            .unwrap_err();
        assert!(err.is_fatal_structure_error());
    }

    #[test]
    fn test_non_finite_raw_rejected() {
        let pipeline = StructurePipeline::default();
        let page = PageInput::new(1, 10, 10)
            .with_detection(RawDetection::new(f64::NAN, 0.0, 5.0, 5.0, 0.9, 9.0));
        assert!(pipeline.run(&[page], &SkipTextExtractor).is_err());
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let pipeline = StructurePipeline::default();
        for score in [1.7, -0.1] {
            let page = PageInput::new(1, 10, 10)
                .with_detection(RawDetection::new(0.0, 0.0, 5.0, 5.0, score, 9.0));
            let err = pipeline.process_page(&page, &SkipTextExtractor).unwrap_err();
            assert!(err.to_string().contains("outside [0, 1]"), "{err}");
        }

        let edges = PageInput::new(1, 10, 10)
            .with_detection(RawDetection::new(0.0, 0.0, 5.0, 5.0, 0.0, 9.0))
            .with_detection(RawDetection::new(0.0, 6.0, 5.0, 9.0, 1.0, 9.0));
        assert!(pipeline.process_page(&edges, &SkipTextExtractor).is_ok());
    }

    #[test]
    fn test_empty_page_contributes_nothing() {
        let pipeline = StructurePipeline::default();
        let output = pipeline
            .run(&[PageInput::new(1, 612, 792)], &SkipTextExtractor)
            .unwrap();
        assert!(output.document.document_structure.is_empty());
        assert_eq!(output.document.pages[0].detection_count, 0);
        assert_eq!(output.document.metadata.total_pages, 1);
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let output = StructurePipeline::default()
            .run(&[intro_page()], &SkipTextExtractor)
            .unwrap();

        let json_path = dir.path().join("out.json");
        let csv_path = dir.path().join("out.csv");
        output.write_json(&json_path, true).unwrap();
        output.write_csv(&csv_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["metadata"]["totalDetections"], 2);
        assert_eq!(std::fs::read_to_string(csv_path).unwrap().lines().count(), 3);
    }
}

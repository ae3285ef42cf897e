//! Detection normalizer
//!
//! Turns raw detector tuples into [`Detection`]s:
//! 1. Drop tuples scoring below the confidence threshold
//! 2. Scale the box into page pixels (`round(x * sx)`, `round(y * sy)`), clamped to the page
//! 3. Drop degenerate geometry (zero page size, non-positive box width/height)
//! 4. Resolve the class id through the label table (unknown ids become `Unknown`)
//! 5. Derive normalized box, width, height, area and center
//! 6. Ask the text extractor for the region's text (Picture regions get a placeholder)

// Pixel coordinates are rounded from f64 detector output; page sizes fit i32
#![allow(clippy::cast_possible_truncation)]

use crate::labels::{LabelTable, LayoutLabel};
use crate::pipeline::data_structures::{round4, Detection, PageInput, PixelBox, RawDetection};
use crate::pipeline::text::{TextExtractor, TextRequest, PICTURE_PLACEHOLDER};
use log::trace;

/// Result of normalizing one raw tuple
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// The detection survived
    Kept(Detection),
    /// Score below the confidence threshold
    BelowThreshold,
    /// Zero page size or a box without positive width and height
    Degenerate,
}

/// Per-page tally of normalizer decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub raw: usize,
    pub kept: usize,
    pub below_threshold: usize,
    pub degenerate: usize,
    pub unknown_labels: usize,
}

/// Stateless detection normalizer
#[derive(Debug, Clone, Copy)]
pub struct DetectionNormalizer<'a> {
    confidence_threshold: f64,
    label_table: &'a LabelTable,
}

impl<'a> DetectionNormalizer<'a> {
    #[must_use = "returns a new normalizer"]
    pub const fn new(confidence_threshold: f64, label_table: &'a LabelTable) -> Self {
        Self {
            confidence_threshold,
            label_table,
        }
    }

    /// Normalize one raw tuple from `page`
    ///
    /// `raw_index` is the tuple's position in the detector output and becomes
    /// part of the detection id. The returned detection has `reading_order == 0`
    /// until the sequencer runs.
    pub fn normalize(
        &self,
        raw: &RawDetection,
        raw_index: usize,
        page: &PageInput,
        extractor: &dyn TextExtractor,
    ) -> NormalizeOutcome {
        if !raw.is_finite() {
            return NormalizeOutcome::Degenerate;
        }
        if raw.score < self.confidence_threshold {
            return NormalizeOutcome::BelowThreshold;
        }
        if page.width == 0 || page.height == 0 {
            return NormalizeOutcome::Degenerate;
        }

        let bbox = scale_box(raw, page);
        if !bbox.is_valid() {
            return NormalizeOutcome::Degenerate;
        }

        let label = self.label_table.resolve(raw.class_id);
        let extracted_text = if label.is_image_only() {
            PICTURE_PLACEHOLDER.to_string()
        } else {
            extractor.extract(&TextRequest {
                page_number: page.page_number,
                raw_index,
                image_path: page.image_path.as_deref(),
                bbox,
            })
        };

        NormalizeOutcome::Kept(Detection {
            id: format!("p{}_d{}", page.page_number, raw_index),
            page_number: page.page_number,
            label,
            confidence: round4(raw.score),
            bbox,
            box_normalized: bbox.normalized(page.width, page.height),
            width: bbox.width(),
            height: bbox.height(),
            area: bbox.area(),
            center: bbox.center(),
            reading_order: 0,
            extracted_text,
            page_width: page.width,
            page_height: page.height,
            image_path: page.image_path.clone(),
        })
    }

    /// Normalize every raw tuple of a page, in detector order
    pub fn normalize_page(
        &self,
        page: &PageInput,
        extractor: &dyn TextExtractor,
    ) -> (Vec<Detection>, NormalizeStats) {
        let mut stats = NormalizeStats {
            raw: page.detections.len(),
            ..NormalizeStats::default()
        };
        let mut detections = Vec::with_capacity(page.detections.len());

        for (raw_index, raw) in page.detections.iter().enumerate() {
            match self.normalize(raw, raw_index, page, extractor) {
                NormalizeOutcome::Kept(detection) => {
                    if detection.label == LayoutLabel::Unknown {
                        stats.unknown_labels += 1;
                    }
                    detections.push(detection);
                }
                NormalizeOutcome::BelowThreshold => {
                    trace!(
                        "page {} raw #{raw_index}: score {:.4} below threshold {:.2}",
                        page.page_number,
                        raw.score,
                        self.confidence_threshold
                    );
                    stats.below_threshold += 1;
                }
                NormalizeOutcome::Degenerate => {
                    trace!(
                        "page {} raw #{raw_index}: degenerate geometry dropped",
                        page.page_number
                    );
                    stats.degenerate += 1;
                }
            }
        }

        stats.kept = detections.len();
        (detections, stats)
    }
}

/// Map a detector-frame box into page pixels and clamp it to the page
fn scale_box(raw: &RawDetection, page: &PageInput) -> PixelBox {
    let [sx, sy] = page.scale;
    let max_x = f64::from(page.width);
    let max_y = f64::from(page.height);
    let px = |v: f64| (v * sx).round().clamp(0.0, max_x) as i32;
    let py = |v: f64| (v * sy).round().clamp(0.0, max_y) as i32;
    PixelBox::new(px(raw.xmin), py(raw.ymin), px(raw.xmax), py(raw.ymax))
}

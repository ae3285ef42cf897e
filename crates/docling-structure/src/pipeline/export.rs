//! Export assembler
//!
//! Builds the five-view JSON artifact and the CSV projection from the
//! finalized, ordered detections and the hierarchy forest. Nothing here
//! mutates its inputs; every aggregate in [`RunMetadata`] is a fold over the
//! finished per-page results.

use crate::error::{Result, StructureError};
use crate::labels::{HeadingLevels, LayoutLabel};
use crate::pipeline::config::StructureConfig;
use crate::pipeline::data_structures::{round4, round_to, Detection, PixelBox};
use crate::pipeline::executor::PageResult;
use crate::pipeline::hierarchy::StructureNode;
use crate::pipeline::text::has_real_text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Column order of the CSV projection
pub const CSV_HEADER: [&str; 11] = [
    "page",
    "label",
    "confidence",
    "xmin",
    "ymin",
    "xmax",
    "ymax",
    "width",
    "height",
    "area",
    "reading_order",
];

/// Processing note attached to every Table suggestion
pub const TABLE_NOTE: &str = "Table region: run table structure recognition before OCR";

/// Text-extraction coverage over non-Picture regions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextExtractionStats {
    pub regions: usize,
    pub regions_with_text: usize,
    /// `regions_with_text / regions`, 0 when there are no regions
    pub success_rate: f64,
}

/// Detections removed by the normalizer, summed over the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedDetections {
    pub below_threshold: usize,
    pub degenerate: usize,
}

/// `metadata` block of the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub total_pages: usize,
    pub total_detections: usize,
    pub element_counts: BTreeMap<LayoutLabel, usize>,
    pub confidence_threshold: f64,
    pub row_tolerance: f64,
    pub processing_time_seconds: f64,
    pub text_extraction: TextExtractionStats,
    pub dropped_detections: DroppedDetections,
    pub unknown_labels: usize,
    pub generated_at: String,
    pub heading_levels: HeadingLevels,
}

impl RunMetadata {
    fn fold(
        pages: &[PageResult],
        config: &StructureConfig,
        core_time: Duration,
        generated_at: String,
    ) -> Self {
        let detections = || pages.iter().flat_map(|page| page.detections.iter());

        let mut element_counts = BTreeMap::new();
        for detection in detections() {
            *element_counts.entry(detection.label).or_insert(0) += 1;
        }

        let regions = detections()
            .filter(|d| !d.label.is_image_only())
            .count();
        let regions_with_text = detections()
            .filter(|d| !d.label.is_image_only() && has_real_text(&d.extracted_text))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if regions == 0 {
            0.0
        } else {
            round4(regions_with_text as f64 / regions as f64)
        };

        let dropped = pages
            .iter()
            .fold(DroppedDetections::default(), |acc, page| DroppedDetections {
                below_threshold: acc.below_threshold + page.stats.below_threshold,
                degenerate: acc.degenerate + page.stats.degenerate,
            });

        let upstream_seconds: f64 = pages
            .iter()
            .filter_map(|page| page.processing_time_ms)
            .sum::<f64>()
            / 1000.0;

        Self {
            total_pages: pages.len(),
            total_detections: detections().count(),
            element_counts,
            confidence_threshold: config.confidence_threshold,
            row_tolerance: config.row_tolerance,
            processing_time_seconds: round_to(upstream_seconds + core_time.as_secs_f64(), 3),
            text_extraction: TextExtractionStats {
                regions,
                regions_with_text,
                success_rate,
            },
            dropped_detections: dropped,
            unknown_labels: pages.iter().map(|page| page.stats.unknown_labels).sum(),
            generated_at,
            heading_levels: config.heading_levels.clone(),
        }
    }
}

/// One entry of the `pages` view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    /// Normalization and sequencing time for this page, rounded to 3 decimals
    #[serde(default)]
    pub core_time_ms: f64,
    pub detection_count: usize,
    pub detections: Vec<Detection>,
}

/// Fixed re-processing priority per label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    /// Needs a dedicated pass (table structure) before OCR
    Special,
}

/// Reduced detection record for downstream re-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrSuggestion {
    pub id: String,
    pub page_number: u32,
    #[serde(rename = "box")]
    pub bbox: PixelBox,
    pub box_normalized: [f64; 4],
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OcrSuggestion {
    fn new(detection: &Detection, priority: Priority, note: Option<&str>) -> Self {
        Self {
            id: detection.id.clone(),
            page_number: detection.page_number,
            bbox: detection.bbox,
            box_normalized: detection.box_normalized,
            priority,
            note: note.map(str::to_string),
        }
    }
}

/// `ocrProcessingSuggestions` view; every key is always present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSuggestions {
    #[serde(rename = "Text")]
    pub text: Vec<OcrSuggestion>,
    #[serde(rename = "Title")]
    pub title: Vec<OcrSuggestion>,
    #[serde(rename = "Table")]
    pub table: Vec<OcrSuggestion>,
    #[serde(rename = "List-item")]
    pub list_item: Vec<OcrSuggestion>,
}

/// Partition detections by label, keeping document order within each label
#[must_use = "returns the grouped detections"]
pub fn group_by_label<'a>(
    detections: impl IntoIterator<Item = &'a Detection>,
) -> BTreeMap<LayoutLabel, Vec<&'a Detection>> {
    let mut groups: BTreeMap<LayoutLabel, Vec<&Detection>> = BTreeMap::new();
    for detection in detections {
        groups.entry(detection.label).or_default().push(detection);
    }
    groups
}

impl OcrSuggestions {
    /// Build the four suggestion lists from the grouped-by-label view
    fn from_groups(groups: &BTreeMap<LayoutLabel, Vec<&Detection>>) -> Self {
        let suggest = |label: LayoutLabel, priority: Priority, note: Option<&'static str>| {
            groups.get(&label).map_or_else(Vec::new, |detections| {
                detections
                    .iter()
                    .map(|detection| OcrSuggestion::new(detection, priority, note))
                    .collect()
            })
        };
        Self {
            text: suggest(LayoutLabel::Text, Priority::High, None),
            title: suggest(LayoutLabel::Title, Priority::High, None),
            table: suggest(LayoutLabel::Table, Priority::Special, Some(TABLE_NOTE)),
            list_item: suggest(LayoutLabel::ListItem, Priority::Medium, None),
        }
    }

    /// Total number of suggested regions
    #[must_use = "returns the number of suggestions"]
    pub fn len(&self) -> usize {
        self.text.len() + self.title.len() + self.table.len() + self.list_item.len()
    }

    #[must_use = "returns whether there are no suggestions"]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDocument {
    pub metadata: RunMetadata,
    pub document_structure: Vec<StructureNode>,
    pub all_detections: Vec<Detection>,
    pub pages: Vec<PageView>,
    pub ocr_processing_suggestions: OcrSuggestions,
}

impl StructureDocument {
    /// Assemble all views from per-page results sorted by page number
    #[must_use = "returns the assembled document"]
    pub fn assemble(
        pages: &[PageResult],
        document_structure: Vec<StructureNode>,
        config: &StructureConfig,
        core_time: Duration,
        generated_at: String,
    ) -> Self {
        let all_detections: Vec<Detection> = pages
            .iter()
            .flat_map(|page| page.detections.iter().cloned())
            .collect();

        let page_views = pages
            .iter()
            .map(|page| PageView {
                page_number: page.page_number,
                width: page.width,
                height: page.height,
                image_path: page.image_path.clone(),
                processing_time_ms: page.processing_time_ms,
                core_time_ms: round_to(page.core_time.as_secs_f64() * 1000.0, 3),
                detection_count: page.detections.len(),
                detections: page.detections.clone(),
            })
            .collect();

        Self {
            metadata: RunMetadata::fold(pages, config, core_time, generated_at),
            document_structure,
            ocr_processing_suggestions: OcrSuggestions::from_groups(&group_by_label(
                &all_detections,
            )),
            all_detections,
            pages: page_views,
        }
    }

    /// Serialize the artifact
    ///
    /// # Errors
    /// Returns [`StructureError::Serialization`] if JSON encoding fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Render the flat view as CSV, header included even with no rows
    ///
    /// # Errors
    /// Returns [`StructureError::Csv`] or [`StructureError::Io`] if writing fails.
    pub fn to_csv(&self) -> Result<String> {
        let mut bytes = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut bytes);
            writer.write_record(CSV_HEADER)?;
            for detection in &self.all_detections {
                writer.serialize(CsvRow::from(detection))?;
            }
            writer.flush()?;
        }
        String::from_utf8(bytes).map_err(|err| {
            StructureError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
    }
}

/// One CSV line, in [`CSV_HEADER`] order
#[derive(Debug, Serialize)]
struct CsvRow {
    page: u32,
    label: LayoutLabel,
    confidence: f64,
    xmin: i32,
    ymin: i32,
    xmax: i32,
    ymax: i32,
    width: i64,
    height: i64,
    area: i64,
    reading_order: u32,
}

impl From<&Detection> for CsvRow {
    fn from(detection: &Detection) -> Self {
        Self {
            page: detection.page_number,
            label: detection.label,
            confidence: detection.confidence,
            xmin: detection.bbox.xmin,
            ymin: detection.bbox.ymin,
            xmax: detection.bbox.xmax,
            ymax: detection.bbox.ymax,
            width: detection.width,
            height: detection.height,
            area: detection.area,
            reading_order: detection.reading_order,
        }
    }
}

/// Render the structure forest as a Markdown outline
///
/// Headings become `#` repeated by level (at most six), content nodes become
/// paragraphs.
#[must_use = "returns the rendered outline"]
pub fn render_outline(forest: &[StructureNode]) -> String {
    let mut out = String::new();
    for node in forest {
        render_node(node, &mut out);
    }
    out
}

fn render_node(node: &StructureNode, out: &mut String) {
    match node {
        StructureNode::Heading(heading) => {
            let hashes = "#".repeat(usize::from(heading.level.clamp(1, 6)));
            let _ = writeln!(out, "{hashes} {}\n", heading.title);
            for child in &heading.children {
                render_node(child, out);
            }
        }
        StructureNode::Content(content) => {
            let _ = writeln!(out, "{}\n", content.content);
        }
    }
}

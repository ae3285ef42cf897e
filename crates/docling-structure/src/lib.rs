//! # Docling Structure - Layout Detection Post-Processing
//!
//! Turns per-page layout detector output (boxes, scores, class ids) and
//! per-region OCR strings into a structured, hierarchical view of a
//! multi-page document.
//!
//! ## Stages
//!
//! - **Normalization**: confidence filtering, scaling into page pixels,
//!   label resolution and derived geometry
//! - **Reading Order**: row-major, left-to-right ordering within each page
//! - **Hierarchy**: heading-level stack nesting content under headings
//! - **Export**: JSON artifact (`metadata`, `documentStructure`,
//!   `allDetections`, `pages`, `ocrProcessingSuggestions`) plus a CSV table
//!
//! OCR itself is out of scope: text arrives through the [`TextExtractor`]
//! seam, either precomputed or from a caller-supplied implementation.
//!
//! ## Quick Start
//!
//! ```
//! use docling_structure::{
//!     PageInput, PrecomputedTextExtractor, RawDetection, StructureConfigBuilder,
//!     StructureNode, StructurePipeline,
//! };
//!
//! # fn main() -> docling_structure::Result<()> {
//! // Detector output for one page: (xmin, ymin, xmax, ymax, score, class id)
//! let page = PageInput::new(1, 612, 792)
//!     .with_text_detection(RawDetection::new(10.0, 10.0, 100.0, 30.0, 0.95, 10.0), "Intro")
//!     .with_text_detection(RawDetection::new(10.0, 40.0, 100.0, 90.0, 0.80, 9.0), "body");
//! let pages = vec![page];
//!
//! let config = StructureConfigBuilder::new().confidence_threshold(0.5).build()?;
//! let pipeline = StructurePipeline::new(config);
//! let output = pipeline.run(&pages, &PrecomputedTextExtractor::from_pages(&pages))?;
//!
//! let StructureNode::Heading(intro) = &output.document.document_structure[0] else {
//!     unreachable!("a Title opens the document");
//! };
//! assert_eq!(intro.title, "Intro");
//! assert_eq!(intro.children.len(), 1);
//!
//! let json = output.to_json(true)?;
//! let csv = output.to_csv()?;
//! # assert!(json.contains("ocrProcessingSuggestions"));
//! # assert!(csv.starts_with("page,label"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Per-detection problems are absorbed and counted in the run metadata. Only
//! structural problems abort a run, see [`StructureError`].

pub mod error;
pub mod labels;
pub mod pipeline;

pub use error::{Result, StructureError};
pub use labels::{HeadingLevels, LabelTable, LayoutLabel};
pub use pipeline::{
    build_hierarchy, group_by_label, render_outline, round4, ContentNode, Detection, HeadingKind,
    HeadingNode, OcrSuggestions, PageInput, PageResult, PixelBox, PrecomputedTextExtractor,
    Priority, RawDetection, RunMetadata, SkipTextExtractor, StructureConfig,
    StructureConfigBuilder, StructureDocument, StructureNode, StructureOutput, StructurePipeline,
    TextExtractor, TextRequest,
};

//! Post-processing pipeline stages
//!
//! - [`normalizer`]: raw detector tuples to [`Detection`]s
//! - [`reading_order`]: per-page reading order
//! - [`hierarchy`]: heading-level stack over document-ordered detections
//! - [`export`]: JSON views, CSV projection and Markdown outline
//! - [`executor`]: driver tying the stages together

pub mod config;
pub mod data_structures;
pub mod executor;
pub mod export;
pub mod hierarchy;
pub mod normalizer;
pub mod reading_order;
pub mod text;

pub use config::{StructureConfig, StructureConfigBuilder};
pub use data_structures::{round4, Detection, PageInput, PixelBox, RawDetection};
pub use executor::{PageResult, StructureOutput, StructurePipeline};
pub use export::{
    group_by_label, render_outline, OcrSuggestions, Priority, RunMetadata, StructureDocument,
};
pub use hierarchy::{build_hierarchy, ContentNode, HeadingKind, HeadingNode, StructureNode};
pub use text::{PrecomputedTextExtractor, SkipTextExtractor, TextExtractor, TextRequest};

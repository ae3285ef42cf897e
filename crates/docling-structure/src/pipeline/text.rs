//! Text-extraction seam
//!
//! The core never runs OCR itself. It hands each surviving box to a
//! [`TextExtractor`] and stores whatever string comes back. A small set of
//! reserved placeholder strings signal that no real text is available; the
//! hierarchy uses [`has_real_text`] to decide when to fall back to a
//! label-derived display string.

use crate::pipeline::data_structures::PixelBox;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Stored for Picture regions, which are never sent to extraction
pub const PICTURE_PLACEHOLDER: &str = "[Picture - no text extraction]";
/// The extractor ran but found nothing
pub const NO_TEXT_PLACEHOLDER: &str = "[No text detected]";
/// The extractor failed for this region
pub const OCR_FAILED_PLACEHOLDER: &str = "[OCR failed]";
/// Extraction was disabled for the run
pub const OCR_SKIPPED_PLACEHOLDER: &str = "[OCR skipped]";

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(Picture - no text extraction|No text detected|OCR skipped|OCR failed(: .*)?)\]$")
        .expect("valid placeholder regex")
});

/// Whether `text` is one of the reserved placeholder strings
///
/// # Examples
/// ```
/// use docling_structure::pipeline::text::is_placeholder;
///
/// assert!(is_placeholder("[No text detected]"));
/// assert!(is_placeholder("[OCR failed: timeout]"));
/// assert!(!is_placeholder("[1] Smith et al."));
/// ```
#[must_use = "returns whether the text is a placeholder"]
pub fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(text.trim())
}

/// Whether `text` carries real extracted content
#[inline]
#[must_use = "returns whether the text is real content"]
pub fn has_real_text(text: &str) -> bool {
    !text.trim().is_empty() && !is_placeholder(text)
}

/// Placeholder for a failed extraction with a short reason
#[must_use = "returns the failure placeholder"]
pub fn ocr_failed(reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        OCR_FAILED_PLACEHOLDER.to_string()
    } else {
        format!("[OCR failed: {reason}]")
    }
}

/// One region handed to the extraction collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRequest<'a> {
    /// 1-based page number
    pub page_number: u32,
    /// Position of the raw tuple in the detector output for the page
    pub raw_index: usize,
    /// Page image reference, if known
    pub image_path: Option<&'a str>,
    /// Region in page pixel space
    pub bbox: PixelBox,
}

/// External collaborator that recognizes text inside a page region
///
/// Implementations must always return a string: real text, or one of the
/// reserved placeholders when nothing could be extracted. Retries belong in
/// the implementation, not in the core.
pub trait TextExtractor {
    fn extract(&self, request: &TextRequest<'_>) -> String;
}

impl<F> TextExtractor for F
where
    F: Fn(&TextRequest<'_>) -> String,
{
    #[inline]
    fn extract(&self, request: &TextRequest<'_>) -> String {
        self(request)
    }
}

/// Extractor used when text extraction is disabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipTextExtractor;

impl TextExtractor for SkipTextExtractor {
    #[inline]
    fn extract(&self, _request: &TextRequest<'_>) -> String {
        OCR_SKIPPED_PLACEHOLDER.to_string()
    }
}

/// Extractor backed by strings an upstream OCR pass already produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecomputedTextExtractor {
    texts: HashMap<(u32, usize), String>,
}

impl PrecomputedTextExtractor {
    #[must_use = "returns an empty extractor"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the `texts` maps of every page input
    #[must_use = "returns an extractor over the page texts"]
    pub fn from_pages(pages: &[crate::pipeline::PageInput]) -> Self {
        let texts = pages
            .iter()
            .flat_map(|page| {
                page.texts
                    .iter()
                    .map(move |(index, text)| ((page.page_number, *index), text.clone()))
            })
            .collect();
        Self { texts }
    }

    /// Register text for `(page, raw index)`
    pub fn insert(&mut self, page_number: u32, raw_index: usize, text: impl Into<String>) {
        self.texts.insert((page_number, raw_index), text.into());
    }
}

impl TextExtractor for PrecomputedTextExtractor {
    fn extract(&self, request: &TextRequest<'_>) -> String {
        match self.texts.get(&(request.page_number, request.raw_index)) {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => NO_TEXT_PLACEHOLDER.to_string(),
        }
    }
}

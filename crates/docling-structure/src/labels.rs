//! Layout classes and the static tables that resolve them
//!
//! Two ordered mappings drive the engine:
//! - [`LabelTable`]: detector class id → [`LayoutLabel`]
//! - [`HeadingLevels`]: heading label → heading level (1 = most significant)
//!
//! Both are plain data so they can be loaded from configuration and validated
//! independently of the hierarchy builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic category of a detected layout region
///
/// Serialized with the `DocLayNet` display names (`"Section-header"`,
/// `"List-item"`, ...) so downstream consumers see the detector vocabulary.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LayoutLabel {
    /// Document title
    #[serde(rename = "Title")]
    Title,
    /// Section or chapter heading
    #[serde(rename = "Section-header")]
    SectionHeader,
    /// Regular body text paragraph
    #[serde(rename = "Text")]
    Text,
    /// Item in a bulleted or numbered list
    #[serde(rename = "List-item")]
    ListItem,
    /// Tabular data structure
    #[serde(rename = "Table")]
    Table,
    /// Raster image or figure (never sent to text extraction)
    #[serde(rename = "Picture")]
    Picture,
    /// Caption for figures or tables
    #[serde(rename = "Caption")]
    Caption,
    /// Mathematical formula
    #[serde(rename = "Formula")]
    Formula,
    /// Running header at top of page
    #[serde(rename = "Page-header")]
    PageHeader,
    /// Running footer at bottom of page
    #[serde(rename = "Page-footer")]
    PageFooter,
    /// Footnote text
    #[serde(rename = "Footnote")]
    Footnote,
    /// Class id not present in the label table
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl LayoutLabel {
    /// All labels, in declaration order
    pub const ALL: [Self; 12] = [
        Self::Title,
        Self::SectionHeader,
        Self::Text,
        Self::ListItem,
        Self::Table,
        Self::Picture,
        Self::Caption,
        Self::Formula,
        Self::PageHeader,
        Self::PageFooter,
        Self::Footnote,
        Self::Unknown,
    ];

    /// Display name as emitted by the detector (`DocLayNet` spelling)
    #[inline]
    #[must_use = "returns the display name of the label"]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::SectionHeader => "Section-header",
            Self::Text => "Text",
            Self::ListItem => "List-item",
            Self::Table => "Table",
            Self::Picture => "Picture",
            Self::Caption => "Caption",
            Self::Formula => "Formula",
            Self::PageHeader => "Page-header",
            Self::PageFooter => "Page-footer",
            Self::Footnote => "Footnote",
            Self::Unknown => "Unknown",
        }
    }

    /// Structure node type: lower-case with separators normalized to `_`
    ///
    /// # Examples
    /// ```
    /// use docling_structure::LayoutLabel;
    ///
    /// assert_eq!(LayoutLabel::Text.node_type(), "text");
    /// assert_eq!(LayoutLabel::ListItem.node_type(), "list_item");
    /// assert_eq!(LayoutLabel::PageFooter.node_type(), "page_footer");
    /// ```
    #[inline]
    #[must_use = "returns the node type string"]
    pub const fn node_type(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::SectionHeader => "section_header",
            Self::Text => "text",
            Self::ListItem => "list_item",
            Self::Table => "table",
            Self::Picture => "picture",
            Self::Caption => "caption",
            Self::Formula => "formula",
            Self::PageHeader => "page_header",
            Self::PageFooter => "page_footer",
            Self::Footnote => "footnote",
            Self::Unknown => "unknown",
        }
    }

    /// Labels that open a heading scope in the hierarchy
    #[inline]
    #[must_use = "returns whether this label is a heading"]
    pub const fn is_heading_candidate(&self) -> bool {
        matches!(
            self,
            Self::Title | Self::SectionHeader | Self::PageHeader | Self::Caption
        )
    }

    /// Labels whose regions carry no text worth extracting
    #[inline]
    #[must_use = "returns whether this label is image-only"]
    pub const fn is_image_only(&self) -> bool {
        matches!(self, Self::Picture)
    }
}

impl fmt::Display for LayoutLabel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayoutLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Normalize: lowercase and drop spaces/hyphens/underscores for matching
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        match normalized.as_str() {
            "title" => Ok(Self::Title),
            "sectionheader" => Ok(Self::SectionHeader),
            "text" => Ok(Self::Text),
            "listitem" => Ok(Self::ListItem),
            "table" => Ok(Self::Table),
            "picture" | "figure" => Ok(Self::Picture),
            "caption" => Ok(Self::Caption),
            "formula" => Ok(Self::Formula),
            "pageheader" => Ok(Self::PageHeader),
            "pagefooter" => Ok(Self::PageFooter),
            "footnote" => Ok(Self::Footnote),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown layout label: '{s}'")),
        }
    }
}

/// `DocLayNet` 11 class labels, index = detector class id
const DOCLAYNET_CLASSES: [LayoutLabel; 11] = [
    LayoutLabel::Caption,       // 0
    LayoutLabel::Footnote,      // 1
    LayoutLabel::Formula,       // 2
    LayoutLabel::ListItem,      // 3
    LayoutLabel::PageFooter,    // 4
    LayoutLabel::PageHeader,    // 5
    LayoutLabel::Picture,       // 6
    LayoutLabel::SectionHeader, // 7
    LayoutLabel::Table,         // 8
    LayoutLabel::Text,          // 9
    LayoutLabel::Title,         // 10
];

/// Ordered class id → label mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<LayoutLabel>,
}

impl Default for LabelTable {
    #[inline]
    fn default() -> Self {
        Self::doclaynet()
    }
}

impl LabelTable {
    /// The 11-class `DocLayNet` table used by DocLayout-YOLO exports
    #[must_use = "returns the default label table"]
    pub fn doclaynet() -> Self {
        Self {
            labels: DOCLAYNET_CLASSES.to_vec(),
        }
    }

    /// Build a table from labels in class-id order
    #[must_use = "returns a label table"]
    pub const fn new(labels: Vec<LayoutLabel>) -> Self {
        Self { labels }
    }

    /// Build a table from label names in class-id order
    ///
    /// # Errors
    /// Returns the offending name if it is not a known layout class.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let labels = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<LayoutLabel>, String>>()?;
        Ok(Self { labels })
    }

    /// Resolve a raw detector class id
    ///
    /// Detectors emit the class id as a float. Negative, fractional,
    /// non-finite or out-of-range ids resolve to [`LayoutLabel::Unknown`].
    ///
    /// # Examples
    /// ```
    /// use docling_structure::{LabelTable, LayoutLabel};
    ///
    /// let table = LabelTable::doclaynet();
    /// assert_eq!(table.resolve(10.0), LayoutLabel::Title);
    /// assert_eq!(table.resolve(42.0), LayoutLabel::Unknown);
    /// ```
    #[must_use = "returns the resolved label"]
    pub fn resolve(&self, class_id: f64) -> LayoutLabel {
        if !class_id.is_finite() || class_id < 0.0 || class_id.fract() != 0.0 {
            return LayoutLabel::Unknown;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = class_id as usize;
        self.labels
            .get(index)
            .copied()
            .unwrap_or(LayoutLabel::Unknown)
    }

    /// Number of class ids in the table
    #[inline]
    #[must_use = "returns the table size"]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no entries
    #[inline]
    #[must_use = "returns whether the table is empty"]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in class-id order
    #[inline]
    #[must_use = "returns the labels in class-id order"]
    pub fn labels(&self) -> &[LayoutLabel] {
        &self.labels
    }
}

/// Ordered heading label → level mapping (1 = most significant)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingLevels {
    levels: BTreeMap<LayoutLabel, u8>,
}

impl Default for HeadingLevels {
    #[inline]
    fn default() -> Self {
        Self::new([
            (LayoutLabel::Title, 1),
            (LayoutLabel::SectionHeader, 2),
            (LayoutLabel::PageHeader, 3),
            (LayoutLabel::Caption, 4),
        ])
    }
}

impl HeadingLevels {
    /// Build a level table from `(label, level)` entries
    ///
    /// The table is not checked for completeness here; see [`Self::validate`].
    #[must_use = "returns a heading level table"]
    pub fn new(entries: impl IntoIterator<Item = (LayoutLabel, u8)>) -> Self {
        Self {
            levels: entries.into_iter().collect(),
        }
    }

    /// Level for a label, if the label is ranked
    #[inline]
    #[must_use = "returns the heading level if present"]
    pub fn level(&self, label: LayoutLabel) -> Option<u8> {
        self.levels.get(&label).copied()
    }

    /// Iterate over `(label, level)` entries in label order
    pub fn iter(&self) -> impl Iterator<Item = (LayoutLabel, u8)> + '_ {
        self.levels.iter().map(|(label, level)| (*label, *level))
    }

    /// Check that every heading label is ranked with a level ≥ 1 and that no
    /// content label is ranked
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (label, level) in &self.levels {
            if !label.is_heading_candidate() {
                return Err(format!("label '{label}' cannot be a heading"));
            }
            if *level == 0 {
                return Err(format!("heading level for '{label}' must be >= 1"));
            }
        }
        if let Some(missing) = LayoutLabel::ALL
            .iter()
            .find(|label| label.is_heading_candidate() && !self.levels.contains_key(label))
        {
            return Err(format!("heading label '{missing}' has no level"));
        }
        Ok(())
    }
}

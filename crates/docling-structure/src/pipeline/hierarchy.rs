//! Heading hierarchy builder
//!
//! Consumes detections in document order `(page_number, reading_order)` and
//! nests them under headings with a single explicit stack of open scopes:
//!
//! - A heading pops every open scope whose level is `>=` its own, attaches to
//!   the new top (or becomes a root) and is pushed.
//! - Content attaches to the top of the stack. With no open scope, a
//!   synthesized `Page N` section is opened for the detection's page.
//!
//! Synthesized sections sit at level 1 and are popped by headings like any
//! other scope, so a deeper heading that follows orphan content nests inside
//! the section. Unless disabled, a section on top of the stack is also closed
//! when the page number advances, so a later page's orphans never land in an
//! earlier page's section.
//!
//! Nodes live in an index arena while the stack is active; children are
//! appended in arrival order and never reordered.

use crate::error::{Result, StructureError};
use crate::labels::{HeadingLevels, LayoutLabel};
use crate::pipeline::data_structures::{Detection, PixelBox};
use crate::pipeline::text::{has_real_text, is_placeholder};
use log::debug;
use serde::{Deserialize, Serialize};

/// Level given to synthesized page sections
pub const DEFAULT_SECTION_LEVEL: u8 = 1;

/// Kind of scope a [`HeadingNode`] represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingKind {
    /// Created from a heading detection
    Heading,
    /// Synthesized for orphan content on a page with no open heading
    Section,
}

/// A scope-opening node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingNode {
    #[serde(rename = "type")]
    pub kind: HeadingKind,
    /// 1 = most significant
    pub level: u8,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LayoutLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<String>,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_order: Option<u32>,
    pub children: Vec<StructureNode>,
}

impl HeadingNode {
    fn from_detection(detection: &Detection, level: u8) -> Self {
        let title = if has_real_text(&detection.extracted_text) {
            detection.extracted_text.trim().to_string()
        } else {
            format!("{} (page {})", detection.label, detection.page_number)
        };
        Self {
            kind: HeadingKind::Heading,
            level,
            title,
            label: Some(detection.label),
            detection_id: Some(detection.id.clone()),
            page_number: detection.page_number,
            reading_order: Some(detection.reading_order),
            children: Vec::new(),
        }
    }

    fn default_section(page_number: u32) -> Self {
        Self {
            kind: HeadingKind::Section,
            level: DEFAULT_SECTION_LEVEL,
            title: format!("Page {page_number}"),
            label: None,
            detection_id: None,
            page_number,
            reading_order: None,
            children: Vec::new(),
        }
    }
}

/// A non-heading detection placed in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Label lower-cased with separators normalized (`list_item`)
    #[serde(rename = "type")]
    pub node_type: String,
    pub content: String,
    pub label: LayoutLabel,
    pub detection_id: String,
    pub page_number: u32,
    pub reading_order: u32,
    pub confidence: f64,
    #[serde(rename = "box")]
    pub bbox: PixelBox,
    pub box_normalized: [f64; 4],
    pub area: i64,
}

impl ContentNode {
    fn from_detection(detection: &Detection) -> Self {
        let text = &detection.extracted_text;
        let content = if has_real_text(text) {
            text.trim().to_string()
        } else if detection.label.is_image_only() && is_placeholder(text) {
            text.clone()
        } else {
            format!("[{} on page {}]", detection.label, detection.page_number)
        };
        Self {
            node_type: detection.label.node_type().to_string(),
            content,
            label: detection.label,
            detection_id: detection.id.clone(),
            page_number: detection.page_number,
            reading_order: detection.reading_order,
            confidence: detection.confidence,
            bbox: detection.bbox,
            box_normalized: detection.box_normalized,
            area: detection.area,
        }
    }
}

/// Node of the document structure forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructureNode {
    Heading(HeadingNode),
    Content(ContentNode),
}

impl StructureNode {
    /// Children of a heading node; content nodes have none
    #[must_use = "returns the node's children"]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Heading(heading) => &heading.children,
            Self::Content(_) => &[],
        }
    }

    /// Number of nodes in this subtree, including `self`
    #[must_use = "returns the subtree size"]
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }
}

/// Arena slot: node payload without children, plus child indices
#[derive(Debug)]
struct ArenaNode {
    node: StructureNode,
    children: Vec<usize>,
}

/// Entry of the open-scope stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenScope {
    node: usize,
    level: u8,
    /// `Some(page)` for a synthesized page section
    default_page: Option<u32>,
}

/// Incremental, stack-based hierarchy builder
///
/// # Examples
/// ```
/// use docling_structure::pipeline::hierarchy::HierarchyBuilder;
/// use docling_structure::HeadingLevels;
///
/// # fn main() -> docling_structure::Result<()> {
/// let levels = HeadingLevels::default();
/// let builder = HierarchyBuilder::new(&levels, true);
/// assert!(builder.finish().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HierarchyBuilder<'a> {
    levels: &'a HeadingLevels,
    close_default_section_on_page_change: bool,
    arena: Vec<ArenaNode>,
    roots: Vec<usize>,
    stack: Vec<OpenScope>,
}

impl<'a> HierarchyBuilder<'a> {
    #[must_use = "returns a new hierarchy builder"]
    pub const fn new(levels: &'a HeadingLevels, close_default_section_on_page_change: bool) -> Self {
        Self {
            levels,
            close_default_section_on_page_change,
            arena: Vec::new(),
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Levels of the open scopes, bottom to top
    #[must_use = "returns the open scope levels"]
    pub fn stack_levels(&self) -> Vec<u8> {
        self.stack.iter().map(|scope| scope.level).collect()
    }

    /// Consume the next detection in document order
    ///
    /// # Errors
    /// Returns [`StructureError::MissingHeadingLevel`] if the detection is a
    /// heading label with no entry in the level table.
    pub fn push(&mut self, detection: &Detection) -> Result<()> {
        if detection.label.is_heading_candidate() {
            self.push_heading(detection)
        } else {
            self.push_content(detection);
            Ok(())
        }
    }

    fn push_heading(&mut self, detection: &Detection) -> Result<()> {
        let level =
            self.levels
                .level(detection.label)
                .ok_or(StructureError::MissingHeadingLevel {
                    label: detection.label,
                })?;

        while self.stack.last().is_some_and(|top| top.level >= level) {
            self.stack.pop();
        }

        let node = self.attach(StructureNode::Heading(HeadingNode::from_detection(
            detection, level,
        )));
        self.stack.push(OpenScope {
            node,
            level,
            default_page: None,
        });
        Ok(())
    }

    fn push_content(&mut self, detection: &Detection) {
        if self.close_default_section_on_page_change {
            if let Some(top) = self.stack.last() {
                if top
                    .default_page
                    .is_some_and(|page| page != detection.page_number)
                {
                    self.stack.pop();
                }
            }
        }

        if self.stack.is_empty() {
            debug!(
                "Opening default section for orphan content on page {}",
                detection.page_number
            );
            let node = self.attach(StructureNode::Heading(HeadingNode::default_section(
                detection.page_number,
            )));
            self.stack.push(OpenScope {
                node,
                level: DEFAULT_SECTION_LEVEL,
                default_page: Some(detection.page_number),
            });
        }

        self.attach(StructureNode::Content(ContentNode::from_detection(detection)));
    }

    /// Store `node` in the arena and append it to the current top scope, or to
    /// the roots when no scope is open
    fn attach(&mut self, node: StructureNode) -> usize {
        let index = self.arena.len();
        self.arena.push(ArenaNode {
            node,
            children: Vec::new(),
        });
        match self.stack.last() {
            Some(top) => self.arena[top.node].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Discard the stack and return the forest
    #[must_use = "returns the built forest"]
    pub fn finish(self) -> Vec<StructureNode> {
        let mut slots: Vec<Option<ArenaNode>> = self.arena.into_iter().map(Some).collect();
        self.roots
            .iter()
            .filter_map(|&root| materialize(&mut slots, root))
            .collect()
    }
}

/// Move an arena node and its subtree out into an owned tree
fn materialize(slots: &mut [Option<ArenaNode>], index: usize) -> Option<StructureNode> {
    let ArenaNode { mut node, children } = slots.get_mut(index)?.take()?;
    if let StructureNode::Heading(heading) = &mut node {
        heading.children = children
            .into_iter()
            .filter_map(|child| materialize(slots, child))
            .collect();
    }
    Some(node)
}

/// Build the structure forest from detections in document order
///
/// # Errors
/// - [`StructureError::InvalidInput`] if the detections are not strictly
///   ordered by `(page_number, reading_order)`
/// - [`StructureError::MissingHeadingLevel`] for an unranked heading label
pub fn build_hierarchy(
    detections: &[Detection],
    levels: &HeadingLevels,
    close_default_section_on_page_change: bool,
) -> Result<Vec<StructureNode>> {
    if let Some(pair) = detections.windows(2).find(|pair| {
        (pair[0].page_number, pair[0].reading_order) >= (pair[1].page_number, pair[1].reading_order)
    }) {
        return Err(StructureError::InvalidInput {
            reason: format!(
                "detections out of document order: {} (page {}, #{}) before {} (page {}, #{})",
                pair[0].id,
                pair[0].page_number,
                pair[0].reading_order,
                pair[1].id,
                pair[1].page_number,
                pair[1].reading_order
            ),
        });
    }

    let mut builder = HierarchyBuilder::new(levels, close_default_section_on_page_change);
    for detection in detections {
        builder.push(detection)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(page: u32, order: u32, label: LayoutLabel, text: &str) -> Detection {
        let bbox = PixelBox::new(10, 10 + order as i32 * 40, 100, 40 + order as i32 * 40);
        Detection {
            id: format!("p{page}_d{order}"),
            page_number: page,
            label,
            confidence: 0.9,
            bbox,
            box_normalized: bbox.normalized(1000, 1000),
            width: bbox.width(),
            height: bbox.height(),
            area: bbox.area(),
            center: bbox.center(),
            reading_order: order,
            extracted_text: text.to_string(),
            page_width: 1000,
            page_height: 1000,
            image_path: None,
        }
    }

    fn heading(node: &StructureNode) -> &HeadingNode {
        match node {
            StructureNode::Heading(h) => h,
            StructureNode::Content(c) => panic!("expected heading, got content {c:?}"),
        }
    }

    fn content(node: &StructureNode) -> &ContentNode {
        match node {
            StructureNode::Content(c) => c,
            StructureNode::Heading(h) => panic!("expected content, got heading {h:?}"),
        }
    }

    fn build(detections: &[Detection]) -> Vec<StructureNode> {
        build_hierarchy(detections, &HeadingLevels::default(), true).unwrap()
    }

    #[test]
    fn test_title_owns_following_text() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Title, "Intro"),
            det(1, 2, LayoutLabel::Text, "body"),
        ]);

        assert_eq!(forest.len(), 1);
        let title = heading(&forest[0]);
        assert_eq!(title.kind, HeadingKind::Heading);
        assert_eq!(title.level, 1);
        assert_eq!(title.title, "Intro");
        assert_eq!(title.children.len(), 1);
        assert_eq!(content(&title.children[0]).content, "body");
        assert_eq!(content(&title.children[0]).node_type, "text");
    }

    #[test]
    fn test_same_level_headings_are_siblings() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Title, "Paper"),
            det(1, 2, LayoutLabel::SectionHeader, "1 Intro"),
            det(1, 3, LayoutLabel::Text, "intro text"),
            det(1, 4, LayoutLabel::SectionHeader, "2 Method"),
        ]);

        assert_eq!(forest.len(), 1);
        let title = heading(&forest[0]);
        assert_eq!(title.children.len(), 2);
        let first = heading(&title.children[0]);
        let second = heading(&title.children[1]);
        assert_eq!(first.title, "1 Intro");
        assert_eq!(first.children.len(), 1);
        assert_eq!(second.title, "2 Method");
        assert!(second.children.is_empty());
    }

    #[test]
    fn test_higher_heading_closes_deeper_scopes() {
        let forest = build(&[
            det(1, 1, LayoutLabel::SectionHeader, "A"),
            det(1, 2, LayoutLabel::Caption, "Figure 1"),
            det(1, 3, LayoutLabel::Title, "Part II"),
            det(1, 4, LayoutLabel::Text, "text"),
        ]);

        assert_eq!(forest.len(), 2);
        let section = heading(&forest[0]);
        assert_eq!(heading(&section.children[0]).level, 4);
        let part = heading(&forest[1]);
        assert_eq!(part.level, 1);
        assert_eq!(content(&part.children[0]).content, "text");
    }

    #[test]
    fn test_orphan_content_gets_one_default_section() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Text, "a"),
            det(1, 2, LayoutLabel::Table, "b"),
        ]);

        assert_eq!(forest.len(), 1);
        let section = heading(&forest[0]);
        assert_eq!(section.kind, HeadingKind::Section);
        assert_eq!(section.title, "Page 1");
        assert_eq!(section.level, DEFAULT_SECTION_LEVEL);
        assert_eq!(section.children.len(), 2);
        assert_eq!(content(&section.children[1]).node_type, "table");
    }

    #[test]
    fn test_default_section_closes_on_page_change() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Text, "page one"),
            det(2, 1, LayoutLabel::Text, "page two"),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(heading(&forest[0]).title, "Page 1");
        assert_eq!(heading(&forest[1]).title, "Page 2");
        assert_eq!(heading(&forest[1]).children.len(), 1);
    }

    #[test]
    fn test_default_section_kept_across_pages_when_disabled() {
        let detections = [
            det(1, 1, LayoutLabel::Text, "page one"),
            det(2, 1, LayoutLabel::Text, "page two"),
        ];
        let forest = build_hierarchy(&detections, &HeadingLevels::default(), false).unwrap();

        assert_eq!(forest.len(), 1);
        assert_eq!(heading(&forest[0]).children.len(), 2);
    }

    #[test]
    fn test_real_heading_spans_pages() {
        let forest = build(&[
            det(1, 1, LayoutLabel::SectionHeader, "Results"),
            det(2, 1, LayoutLabel::Text, "continued"),
        ]);

        assert_eq!(forest.len(), 1);
        assert_eq!(heading(&forest[0]).children.len(), 1);
    }

    #[test]
    fn test_heading_nests_inside_default_section() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Text, "preamble"),
            det(1, 2, LayoutLabel::SectionHeader, "1 Intro"),
            det(1, 3, LayoutLabel::Text, "intro"),
        ]);

        assert_eq!(forest.len(), 1);
        let section = heading(&forest[0]);
        assert_eq!(section.kind, HeadingKind::Section);
        assert_eq!(section.children.len(), 2);
        assert_eq!(content(&section.children[0]).content, "preamble");
        let intro = heading(&section.children[1]);
        assert_eq!(intro.title, "1 Intro");
        assert_eq!(intro.children.len(), 1);
    }

    #[test]
    fn test_caption_after_orphan_text_joins_section() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Text, "body"),
            det(1, 2, LayoutLabel::Caption, "Figure 1"),
        ]);

        assert_eq!(forest.len(), 1);
        let section = heading(&forest[0]);
        assert_eq!(section.title, "Page 1");
        assert_eq!(section.children.len(), 2);
        let caption = heading(&section.children[1]);
        assert_eq!(caption.level, 4);
        assert_eq!(caption.title, "Figure 1");
    }

    #[test]
    fn test_title_replaces_default_section() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Text, "preamble"),
            det(1, 2, LayoutLabel::Title, "Report"),
            det(1, 3, LayoutLabel::Text, "body"),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(heading(&forest[0]).kind, HeadingKind::Section);
        assert_eq!(heading(&forest[0]).children.len(), 1);
        assert_eq!(heading(&forest[1]).title, "Report");
        assert_eq!(heading(&forest[1]).children.len(), 1);
    }

    #[test]
    fn test_fallback_titles_and_content() {
        let forest = build(&[
            det(3, 1, LayoutLabel::Title, "[No text detected]"),
            det(3, 2, LayoutLabel::Text, "  "),
            det(3, 3, LayoutLabel::Picture, "[Picture - no text extraction]"),
        ]);

        let title = heading(&forest[0]);
        assert_eq!(title.title, "Title (page 3)");
        assert_eq!(content(&title.children[0]).content, "[Text on page 3]");
        assert_eq!(
            content(&title.children[1]).content,
            "[Picture - no text extraction]"
        );
    }

    #[test]
    fn test_missing_heading_level_is_fatal() {
        let levels = HeadingLevels::new([(LayoutLabel::Title, 1), (LayoutLabel::SectionHeader, 2)]);
        let err = build_hierarchy(&[det(1, 1, LayoutLabel::Caption, "Fig")], &levels, true)
            .unwrap_err();
        assert!(matches!(
            err,
            StructureError::MissingHeadingLevel {
                label: LayoutLabel::Caption
            }
        ));
    }

    #[test]
    fn test_out_of_order_input_rejected() {
        let err = build_hierarchy(
            &[
                det(1, 2, LayoutLabel::Text, "b"),
                det(1, 1, LayoutLabel::Text, "a"),
            ],
            &HeadingLevels::default(),
            true,
        )
        .unwrap_err();
        assert!(err.is_fatal_structure_error());
    }

    #[test]
    fn test_stack_levels_strictly_increase() {
        let levels = HeadingLevels::default();
        let mut builder = HierarchyBuilder::new(&levels, true);
        let sequence = [
            det(1, 1, LayoutLabel::Title, "T"),
            det(1, 2, LayoutLabel::Caption, "C"),
            det(1, 3, LayoutLabel::SectionHeader, "S"),
            det(1, 4, LayoutLabel::PageHeader, "P"),
        ];
        let expected: [&[u8]; 4] = [&[1], &[1, 4], &[1, 2], &[1, 2, 3]];

        for (detection, expected_levels) in sequence.iter().zip(expected) {
            builder.push(detection).unwrap();
            assert_eq!(builder.stack_levels(), expected_levels);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(build(&[]).is_empty());
    }

    #[test]
    fn test_node_json_shape() {
        let forest = build(&[
            det(1, 1, LayoutLabel::Title, "Intro"),
            det(1, 2, LayoutLabel::ListItem, "- item"),
        ]);
        let json = serde_json::to_value(&forest).unwrap();

        assert_eq!(json[0]["type"], "heading");
        assert_eq!(json[0]["level"], 1);
        assert_eq!(json[0]["detectionId"], "p1_d1");
        assert_eq!(json[0]["readingOrder"], 1);
        assert_eq!(json[0]["children"][0]["type"], "list_item");
        assert_eq!(json[0]["children"][0]["label"], "List-item");
        assert_eq!(json[0]["children"][0]["box"], serde_json::json!([10, 90, 100, 120]));

        let back: Vec<StructureNode> = serde_json::from_value(json).unwrap();
        assert_eq!(back, forest);
    }
}

//! Reading order sequencer - row-major, left-to-right ordering within a page
//!
//! Two detections whose centers are more than `row_tolerance` pixels apart
//! vertically are ordered top to bottom. Otherwise they are treated as the
//! same visual row and ordered by horizontal center.
//!
//! The comparator is not transitive across rows (A~B and B~C on the same row
//! does not put A and C on the same row), so `slice::sort_by`, which may panic
//! on an inconsistent ordering, is not used. A stable insertion sort gives a
//! deterministic result for identical input and keeps detector order for ties.
//!
//! Column boundaries are not detected: on true multi-column pages, rows are
//! read straight across the columns.

// Centers are integer pixels; f64 holds them exactly
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use crate::pipeline::config::DEFAULT_ROW_TOLERANCE;
use crate::pipeline::data_structures::Detection;
use std::cmp::Ordering;

/// Configuration for the reading order sequencer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingOrderConfig {
    /// Vertical distance (pixels) within which two centers share a row
    pub row_tolerance: f64,
}

impl Default for ReadingOrderConfig {
    #[inline]
    fn default() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
        }
    }
}

/// Assigns 1-based `reading_order` to the detections of one page
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReadingOrderSequencer {
    config: ReadingOrderConfig,
}

impl ReadingOrderSequencer {
    #[must_use = "returns a new sequencer"]
    pub const fn new(config: ReadingOrderConfig) -> Self {
        Self { config }
    }

    /// Row-tolerance comparator
    ///
    /// # Examples
    /// ```
    /// use docling_structure::pipeline::reading_order::{ReadingOrderConfig, ReadingOrderSequencer};
    /// use docling_structure::{Detection, LayoutLabel, PixelBox};
    /// # fn det(bbox: PixelBox) -> Detection {
    /// #     Detection { id: String::new(), page_number: 1, label: LayoutLabel::Text,
    /// #         confidence: 0.9, bbox, box_normalized: [0.0; 4], width: bbox.width(),
    /// #         height: bbox.height(), area: bbox.area(), center: bbox.center(),
    /// #         reading_order: 0, extracted_text: String::new(), page_width: 500,
    /// #         page_height: 500, image_path: None }
    /// # }
    /// use std::cmp::Ordering;
    ///
    /// let sequencer = ReadingOrderSequencer::new(ReadingOrderConfig { row_tolerance: 20.0 });
    /// let left = det(PixelBox::new(10, 100, 50, 120));
    /// let right_slightly_higher = det(PixelBox::new(200, 90, 250, 110));
    /// // Centers 10px apart vertically: same row, left first
    /// assert_eq!(sequencer.compare(&left, &right_slightly_higher), Ordering::Less);
    /// ```
    #[must_use = "returns the ordering of the two detections"]
    pub fn compare(&self, a: &Detection, b: &Detection) -> Ordering {
        let dy = (a.center[1] - b.center[1]) as f64;
        if dy.abs() > self.config.row_tolerance {
            dy.total_cmp(&0.0)
        } else {
            a.center[0].cmp(&b.center[0])
        }
    }

    /// Sort one page's detections into reading order and number them 1..=N
    ///
    /// Numbers are assigned only after the sort completes.
    pub fn sequence(&self, detections: &mut [Detection]) {
        // Stable insertion sort: deterministic even though `compare` is not transitive
        for i in 1..detections.len() {
            let mut j = i;
            while j > 0 && self.compare(&detections[j - 1], &detections[j]) == Ordering::Greater {
                detections.swap(j - 1, j);
                j -= 1;
            }
        }

        for (position, detection) in detections.iter_mut().enumerate() {
            detection.reading_order = (position + 1) as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LayoutLabel;
    use crate::pipeline::data_structures::PixelBox;

    fn det(id: &str, bbox: PixelBox) -> Detection {
        Detection {
            id: id.to_string(),
            page_number: 1,
            label: LayoutLabel::Text,
            confidence: 0.9,
            bbox,
            box_normalized: bbox.normalized(1000, 1000),
            width: bbox.width(),
            height: bbox.height(),
            area: bbox.area(),
            center: bbox.center(),
            reading_order: 0,
            extracted_text: String::new(),
            page_width: 1000,
            page_height: 1000,
            image_path: None,
        }
    }

    fn ids(detections: &[Detection]) -> Vec<&str> {
        detections.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_reading_order_basic() {
        let sequencer = ReadingOrderSequencer::default();
        let mut detections = vec![
            det("bottom", PixelBox::new(10, 400, 100, 450)),
            det("top", PixelBox::new(10, 10, 100, 30)),
            det("middle", PixelBox::new(10, 200, 100, 250)),
        ];

        sequencer.sequence(&mut detections);
        assert_eq!(ids(&detections), ["top", "middle", "bottom"]);
        let orders: Vec<u32> = detections.iter().map(|d| d.reading_order).collect();
        assert_eq!(orders, [1, 2, 3]);
    }

    #[test]
    fn test_same_row_left_to_right() {
        let sequencer = ReadingOrderSequencer::default();
        // Right block sits 15px higher: within tolerance, so still the same row
        let mut detections = vec![
            det("right", PixelBox::new(500, 85, 600, 105)),
            det("left", PixelBox::new(10, 100, 100, 120)),
        ];

        sequencer.sequence(&mut detections);
        assert_eq!(ids(&detections), ["left", "right"]);
    }

    #[test]
    fn test_row_tolerance_boundary() {
        let sequencer = ReadingOrderSequencer::new(ReadingOrderConfig {
            row_tolerance: 20.0,
        });
        // Centers exactly 20px apart: same row
        let a = det("a", PixelBox::new(500, 100, 600, 120));
        let b = det("b", PixelBox::new(10, 120, 100, 140));
        assert_eq!(sequencer.compare(&a, &b), Ordering::Greater);

        // 21px apart: different rows, higher first
        let c = det("c", PixelBox::new(10, 121, 100, 141));
        assert_eq!(sequencer.compare(&a, &c), Ordering::Less);
    }

    #[test]
    fn test_ties_keep_detector_order() {
        let sequencer = ReadingOrderSequencer::default();
        let mut detections = vec![
            det("first", PixelBox::new(10, 10, 100, 30)),
            det("second", PixelBox::new(10, 12, 100, 28)),
        ];

        sequencer.sequence(&mut detections);
        assert_eq!(ids(&detections), ["first", "second"]);
    }

    #[test]
    fn test_two_columns_read_across_rows() {
        // Known limitation: columns are not detected, rows are read straight across
        let sequencer = ReadingOrderSequencer::default();
        let mut detections = vec![
            det("left_1", PixelBox::new(10, 10, 400, 60)),
            det("left_2", PixelBox::new(10, 100, 400, 150)),
            det("right_1", PixelBox::new(500, 10, 900, 60)),
            det("right_2", PixelBox::new(500, 100, 900, 150)),
        ];

        sequencer.sequence(&mut detections);
        assert_eq!(ids(&detections), ["left_1", "right_1", "left_2", "right_2"]);
    }

    #[test]
    fn test_empty_page() {
        let sequencer = ReadingOrderSequencer::default();
        let mut detections: Vec<Detection> = Vec::new();
        sequencer.sequence(&mut detections);
        assert!(detections.is_empty());
    }
}

use crate::labels::LayoutLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal places kept for normalized coordinates, confidences and ratios
pub const ROUNDING_PLACES: i32 = 4;

/// Round to [`ROUNDING_PLACES`] decimal places
///
/// # Examples
/// ```
/// use docling_structure::round4;
///
/// assert_eq!(round4(0.123_456), 0.1235);
/// assert_eq!(round4(1.0 / 3.0), 0.3333);
/// ```
#[inline]
#[must_use = "returns the rounded value"]
pub fn round4(value: f64) -> f64 {
    round_to(value, ROUNDING_PLACES)
}

#[inline]
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Axis-aligned box in page pixel space
///
/// Serialized as `[xmin, ymin, xmax, ymax]`. Boxes emitted by the normalizer
/// always satisfy `xmin < xmax` and `ymin < ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct PixelBox {
    /// Left x-coordinate
    pub xmin: i32,
    /// Top y-coordinate
    pub ymin: i32,
    /// Right x-coordinate
    pub xmax: i32,
    /// Bottom y-coordinate
    pub ymax: i32,
}

impl From<[i32; 4]> for PixelBox {
    #[inline]
    fn from([xmin, ymin, xmax, ymax]: [i32; 4]) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }
}

impl From<PixelBox> for [i32; 4] {
    #[inline]
    fn from(bbox: PixelBox) -> Self {
        [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax]
    }
}

impl PixelBox {
    /// Create a box from its edges
    #[inline]
    #[must_use = "returns a new pixel box"]
    pub const fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Width in pixels (may be non-positive for degenerate boxes)
    #[inline]
    #[must_use = "returns the width of the box"]
    pub const fn width(&self) -> i64 {
        self.xmax as i64 - self.xmin as i64
    }

    /// Height in pixels (may be non-positive for degenerate boxes)
    #[inline]
    #[must_use = "returns the height of the box"]
    pub const fn height(&self) -> i64 {
        self.ymax as i64 - self.ymin as i64
    }

    /// Area in square pixels
    #[inline]
    #[must_use = "returns the area of the box"]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Integer midpoint `[cx, cy]` (floor division)
    #[inline]
    #[must_use = "returns the center of the box"]
    pub const fn center(&self) -> [i64; 2] {
        [
            (self.xmin as i64 + self.xmax as i64).div_euclid(2),
            (self.ymin as i64 + self.ymax as i64).div_euclid(2),
        ]
    }

    /// Whether the box has positive width and height
    #[inline]
    #[must_use = "returns whether the box is non-degenerate"]
    pub const fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    /// Box divided by page width/height, rounded to 4 decimal places
    #[must_use = "returns the normalized box"]
    pub fn normalized(&self, page_width: u32, page_height: u32) -> [f64; 4] {
        let w = f64::from(page_width);
        let h = f64::from(page_height);
        [
            round4(f64::from(self.xmin) / w),
            round4(f64::from(self.ymin) / h),
            round4(f64::from(self.xmax) / w),
            round4(f64::from(self.ymax) / h),
        ]
    }
}

/// One located, classified region on one page
///
/// Created by the normalizer, given its reading order by the sequencer, and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Run-unique id, `p{page}_d{raw index}`
    pub id: String,
    /// 1-based source page
    pub page_number: u32,
    /// Resolved layout class
    pub label: LayoutLabel,
    /// Detector score, rounded to 4 decimal places
    pub confidence: f64,
    /// Box in page pixel space
    #[serde(rename = "box")]
    pub bbox: PixelBox,
    /// Box divided by page dimensions, rounded to 4 decimal places
    pub box_normalized: [f64; 4],
    pub width: i64,
    pub height: i64,
    pub area: i64,
    pub center: [i64; 2],
    /// 1-based position within the page (0 until sequenced)
    pub reading_order: u32,
    /// Text from the extraction collaborator, or a reserved placeholder
    pub extracted_text: String,
    /// Page image width in pixels
    pub page_width: u32,
    /// Page image height in pixels
    pub page_height: u32,
    /// Page image reference, if the run input supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// One raw detector output tuple `(xmin, ymin, xmax, ymax, score, classId)`
///
/// Coordinates are in the detector's reference frame. Deserializes from a
/// 6-element array or from an object with named fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetectionRepr")]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub score: f64,
    pub class_id: f64,
}

impl RawDetection {
    /// Build a raw detection from the detector tuple order
    #[inline]
    #[must_use = "returns a raw detection"]
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, score: f64, class_id: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            score,
            class_id,
        }
    }

    /// Whether every component is a finite number
    #[inline]
    #[must_use = "returns whether all values are finite"]
    pub fn is_finite(&self) -> bool {
        [
            self.xmin,
            self.ymin,
            self.xmax,
            self.ymax,
            self.score,
            self.class_id,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDetectionRepr {
    Tuple([f64; 6]),
    #[serde(rename_all = "camelCase")]
    Named {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        #[serde(alias = "confidence")]
        score: f64,
        #[serde(alias = "class_id")]
        class_id: f64,
    },
}

impl From<RawDetectionRepr> for RawDetection {
    fn from(repr: RawDetectionRepr) -> Self {
        match repr {
            RawDetectionRepr::Tuple([xmin, ymin, xmax, ymax, score, class_id]) => {
                Self::new(xmin, ymin, xmax, ymax, score, class_id)
            }
            RawDetectionRepr::Named {
                xmin,
                ymin,
                xmax,
                ymax,
                score,
                class_id,
            } => Self::new(xmin, ymin, xmax, ymax, score, class_id),
        }
    }
}

#[inline]
const fn default_scale() -> [f64; 2] {
    [1.0, 1.0]
}

/// Everything the core needs to know about one page
///
/// Produced by the upstream rasterization/detection/OCR stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    /// 1-based page number
    pub page_number: u32,
    /// Page image width in pixels
    pub width: u32,
    /// Page image height in pixels
    pub height: u32,
    /// `(sx, sy)` mapping detector coordinates into page pixels
    #[serde(default = "default_scale")]
    pub scale: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Upstream processing time (rasterization + inference + OCR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    /// Raw detector output, in detector order
    #[serde(default)]
    pub detections: Vec<RawDetection>,
    /// Precomputed OCR strings keyed by raw detection index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub texts: BTreeMap<usize, String>,
}

impl PageInput {
    /// Page with identity scale and no detections
    #[must_use = "returns a new page input"]
    pub fn new(page_number: u32, width: u32, height: u32) -> Self {
        Self {
            page_number,
            width,
            height,
            scale: default_scale(),
            image_path: None,
            processing_time_ms: None,
            detections: Vec::new(),
            texts: BTreeMap::new(),
        }
    }

    /// Append a raw detection (builder style, used by tests and adapters)
    #[must_use = "returns the page with the detection appended"]
    pub fn with_detection(mut self, raw: RawDetection) -> Self {
        self.detections.push(raw);
        self
    }

    /// Append a raw detection together with its precomputed text
    #[must_use = "returns the page with the detection appended"]
    pub fn with_text_detection(mut self, raw: RawDetection, text: impl Into<String>) -> Self {
        self.texts.insert(self.detections.len(), text.into());
        self.detections.push(raw);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_box_geometry() {
        let bbox = PixelBox::new(10, 40, 100, 90);
        assert_eq!(bbox.width(), 90);
        assert_eq!(bbox.height(), 50);
        assert_eq!(bbox.area(), 4500);
        assert_eq!(bbox.center(), [55, 65]);
        assert!(bbox.is_valid());
        assert!(!PixelBox::new(10, 10, 10, 20).is_valid());
    }

    #[test]
    fn test_pixel_box_serializes_as_array() {
        let json = serde_json::to_string(&PixelBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
    }

    #[test]
    fn test_normalized_box_rounding() {
        let bbox = PixelBox::new(10, 10, 100, 30);
        assert_eq!(bbox.normalized(300, 700), [0.0333, 0.0143, 0.3333, 0.0429]);
    }

    #[test]
    fn test_raw_detection_from_array_and_object() {
        let from_array: RawDetection =
            serde_json::from_str("[1.0, 2.0, 3.0, 4.0, 0.9, 9]").unwrap();
        let from_object: RawDetection = serde_json::from_str(
            r#"{"xmin": 1.0, "ymin": 2.0, "xmax": 3.0, "ymax": 4.0, "score": 0.9, "classId": 9}"#,
        )
        .unwrap();
        assert_eq!(from_array, from_object);
        assert_eq!(from_array.class_id, 9.0);
    }

    #[test]
    fn test_page_input_defaults() {
        let page: PageInput =
            serde_json::from_str(r#"{"pageNumber": 2, "width": 612, "height": 792}"#).unwrap();
        assert_eq!(page.scale, [1.0, 1.0]);
        assert!(page.detections.is_empty());
        assert!(page.texts.is_empty());
    }

    #[test]
    fn test_page_input_text_keys() {
        let page: PageInput = serde_json::from_str(
            r#"{"pageNumber": 1, "width": 10, "height": 10,
                "detections": [[0, 0, 5, 5, 0.9, 9]], "texts": {"0": "hello"}}"#,
        )
        .unwrap();
        assert_eq!(page.texts.get(&0).map(String::as_str), Some("hello"));
    }
}

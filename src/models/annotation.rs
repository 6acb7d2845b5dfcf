// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the core data structures for representing
//! labeled bounding boxes in image-pixel space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an annotation within one image session.
///
/// Identities come from a monotonically increasing counter and are never
/// reused after a deletion, unlike list positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An axis-aligned bounding box `(x1, y1, x2, y2)` in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from two arbitrary corners, swapping coordinates so
    /// that `x1 <= x2` and `y1 <= y2`.
    pub fn from_corners(ax: i32, ay: i32, bx: i32, by: i32) -> Self {
        Self {
            x1: ax.min(bx),
            y1: ay.min(by),
            x2: ax.max(bx),
            y2: ay.max(by),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Area in square pixels (zero for degenerate boxes).
    pub fn area(&self) -> i64 {
        i64::from(self.width().max(0)) * i64::from(self.height().max(0))
    }

    /// `x1 < x2 && y1 < y2`.
    pub fn is_ordered(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Ordered and within `[0, width] x [0, height]`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (w, h) = (i64::from(width), i64::from(height));
        self.is_ordered()
            && self.x1 >= 0
            && self.y1 >= 0
            && i64::from(self.x2) <= w
            && i64::from(self.y2) <= h
    }

    /// Clamp all coordinates into the image rectangle.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }
}

impl From<[i32; 4]> for BBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A labeled bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub label: String,
    pub bbox: BBox,
}

impl Annotation {
    /// Create a new annotation with the given identity, label and box.
    pub fn new(id: AnnotationId, label: impl Into<String>, bbox: BBox) -> Self {
        Self {
            id,
            label: label.into(),
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_swaps() {
        let b = BBox::from_corners(110, 60, 10, 10);
        assert_eq!(b, BBox::new(10, 10, 110, 60));
        assert!(b.is_ordered());
    }

    #[test]
    fn test_fits_within() {
        assert!(BBox::new(0, 0, 200, 100).fits_within(200, 100));
        assert!(!BBox::new(0, 0, 201, 100).fits_within(200, 100));
        assert!(!BBox::new(-1, 0, 20, 10).fits_within(200, 100));
        assert!(!BBox::new(5, 5, 5, 10).fits_within(200, 100));
    }

    #[test]
    fn test_area_and_extent() {
        let b = BBox::new(10, 20, 40, 60);
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 40);
        assert_eq!(b.area(), 1200);
        assert_eq!(BBox::new(10, 10, 5, 20).area(), 0);
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        let back: BBox = serde_json::from_str("[5,6,7,8]").unwrap();
        assert_eq!(back, BBox::new(5, 6, 7, 8));
    }

    #[test]
    fn test_clamped() {
        let b = BBox::new(-5, 3, 250, 120).clamped(200, 100);
        assert_eq!(b, BBox::new(0, 3, 200, 100));
    }
}

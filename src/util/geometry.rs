// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate transformations between image pixels
//! and canvas (display) coordinates under zoom, plus the normalized
//! coordinates used by YOLO label files.

use crate::models::annotation::BBox;
use egui::{pos2, Pos2, Rect, Vec2};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;

/// Margin factor applied when fitting an image to the canvas.
const FIT_MARGIN: f32 = 0.95;

/// Scale and offset mapping image space onto the canvas.
///
/// Display coordinates are relative to the canvas' top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale_factor: f32,
    /// Top-left display position of the image, in whole pixels.
    offset: (i32, i32),
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            offset: (0, 0),
        }
    }
}

impl Viewport {
    pub fn new(scale_factor: f32, offset: (i32, i32)) -> Self {
        Self {
            scale_factor: clamp_scale(scale_factor),
            offset,
        }
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    fn offset_vec(&self) -> Vec2 {
        Vec2::new(self.offset.0 as f32, self.offset.1 as f32)
    }

    /// `p * scale + offset`, unrounded.
    pub fn image_to_display(&self, p: Pos2) -> Pos2 {
        pos2(p.x * self.scale_factor, p.y * self.scale_factor) + self.offset_vec()
    }

    /// `(p - offset) / scale`, unrounded.
    pub fn display_to_image(&self, p: Pos2) -> Pos2 {
        let v = p - self.offset_vec();
        pos2(v.x / self.scale_factor, v.y / self.scale_factor)
    }

    /// Display point to the nearest image pixel.
    pub fn display_to_pixel(&self, p: Pos2) -> (i32, i32) {
        let img = self.display_to_image(p);
        (img.x.round() as i32, img.y.round() as i32)
    }

    pub fn bbox_to_display(&self, bbox: &BBox) -> Rect {
        Rect::from_min_max(
            self.image_to_display(pos2(bbox.x1 as f32, bbox.y1 as f32)),
            self.image_to_display(pos2(bbox.x2 as f32, bbox.y2 as f32)),
        )
    }

    /// Display rectangle to an ordered image-space box, rounding each corner.
    pub fn display_to_bbox(&self, rect: Rect) -> BBox {
        let (ax, ay) = self.display_to_pixel(rect.min);
        let (bx, by) = self.display_to_pixel(rect.max);
        BBox::from_corners(ax, ay, bx, by)
    }

    /// Display-space rectangle covered by the image.
    pub fn image_rect(&self, image_size: (u32, u32)) -> Rect {
        Rect::from_min_max(
            self.image_to_display(Pos2::ZERO),
            self.image_to_display(pos2(image_size.0 as f32, image_size.1 as f32)),
        )
    }

    /// Scale to fit the canvas with a small margin and center the image.
    pub fn fit_to_window(canvas: Vec2, image_size: (u32, u32)) -> Self {
        let (w, h) = image_size;
        if w == 0 || h == 0 || canvas.x <= 1.0 || canvas.y <= 1.0 {
            return Self::default();
        }
        let scale = (canvas.x / w as f32).min(canvas.y / h as f32) * FIT_MARGIN;
        Self::centered(scale, canvas, image_size)
    }

    /// Use `scale_factor` (clamped) and center the scaled image in the canvas.
    ///
    /// The offset goes negative when the scaled image exceeds the canvas.
    pub fn centered(scale_factor: f32, canvas: Vec2, image_size: (u32, u32)) -> Self {
        let scale_factor = clamp_scale(scale_factor);
        let scaled_w = (image_size.0 as f32 * scale_factor).floor();
        let scaled_h = (image_size.1 as f32 * scale_factor).floor();
        let offset = (
            ((canvas.x.floor() - scaled_w) / 2.0).floor() as i32,
            ((canvas.y.floor() - scaled_h) / 2.0).floor() as i32,
        );
        Self {
            scale_factor,
            offset,
        }
    }

    /// Change the scale by `delta` and recenter.
    pub fn zoomed(&self, delta: f32, canvas: Vec2, image_size: (u32, u32)) -> Self {
        Self::centered(self.scale_factor + delta, canvas, image_size)
    }
}

pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

/// Convert pixel coordinates to normalized coordinates (0.0 to 1.0).
pub fn normalize_coordinates(pixel_x: f64, pixel_y: f64, width: u32, height: u32) -> (f64, f64) {
    (pixel_x / width as f64, pixel_y / height as f64)
}

/// Convert normalized coordinates to pixel coordinates.
pub fn denormalize_coordinates(x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
    (x * width as f64, y * height as f64)
}

/// Box to YOLO `(center_x, center_y, width, height)`, all normalized.
pub fn bbox_to_yolo(bbox: &BBox, width: u32, height: u32) -> [f64; 4] {
    let (cx, cy) = normalize_coordinates(
        f64::from(bbox.x1 + bbox.x2) / 2.0,
        f64::from(bbox.y1 + bbox.y2) / 2.0,
        width,
        height,
    );
    let (w, h) = normalize_coordinates(
        f64::from(bbox.width()),
        f64::from(bbox.height()),
        width,
        height,
    );
    [cx, cy, w, h]
}

/// YOLO normalized center/size back to a pixel box, rounded to the nearest pixel.
pub fn yolo_to_bbox(values: [f64; 4], width: u32, height: u32) -> BBox {
    let (cx, cy) = denormalize_coordinates(values[0], values[1], width, height);
    let (w, h) = denormalize_coordinates(values[2], values[3], width, height);
    BBox::from_corners(
        (cx - w / 2.0).round() as i32,
        (cy - h / 2.0).round() as i32,
        (cx + w / 2.0).round() as i32,
        (cy + h / 2.0).round() as i32,
    )
}

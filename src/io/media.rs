// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image file loading and folder listing.
//!
//! Decoded images are converted to RGBA8 so they can be uploaded as an
//! egui texture without further conversion.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Extensions offered when annotating.
pub const ANNOTATE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Extensions picked up by batch inference.
pub const INFERENCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// A decoded image, tightly packed RGBA8.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode an image file into RGBA8 pixels.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(LoadedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Read only the header to get `(width, height)`.
pub fn image_size(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).with_context(|| format!("Failed to read size of {}", path.display()))
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Image files directly inside `folder`, sorted by file name.
pub fn list_images(folder: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder {}", folder.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, extensions))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

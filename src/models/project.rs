// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-image session state.
//!
//! A session owns the annotation set of the image currently on screen and
//! is discarded when the operator switches images.

use super::store::AnnotationSet;
use std::path::{Path, PathBuf};

/// The currently loaded image and its annotations.
#[derive(Debug, Clone)]
pub struct ImageSession {
    pub image_path: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    pub annotations: AnnotationSet,
}

impl ImageSession {
    /// Create a session with an empty annotation set.
    pub fn new(image_path: impl Into<PathBuf>, image_width: u32, image_height: u32) -> Self {
        Self {
            image_path: image_path.into(),
            image_width,
            image_height,
            annotations: AnnotationSet::new(),
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.annotations.is_dirty()
    }
}

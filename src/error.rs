// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation core.

use crate::models::annotation::{AnnotationId, BBox};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One annotation failing the bounds invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsViolation {
    /// Zero-based list position.
    pub position: usize,
    pub id: Option<AnnotationId>,
    pub label: String,
    pub bbox: BBox,
    /// Image size the box was checked against, if any.
    pub image_size: Option<(u32, u32)>,
}

impl fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "box #{} ({}) is outside the image or degenerate: ({},{})-({},{})",
            self.position + 1,
            self.label,
            self.bbox.x1,
            self.bbox.y1,
            self.bbox.x2,
            self.bbox.y2
        )?;
        if let Some((w, h)) = self.image_size {
            write!(f, ", image size {} x {}", w, h)?;
        }
        Ok(())
    }
}

/// Errors raised by the annotation store, codecs, ledger and detector.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(BoundsViolation),

    #[error("Label '{label}' is not in the class list")]
    MissingLabel { label: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed annotation file {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },

    #[error("Detection failed for {}: {reason}", image.display())]
    Detector { image: PathBuf, reason: String },
}

impl AnnotationError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Errors that must block the operator until acknowledged.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::InvalidBounds(_) | Self::MissingLabel { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnnotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_names_index_and_label() {
        let v = BoundsViolation {
            position: 2,
            id: Some(AnnotationId(7)),
            label: "dog".into(),
            bbox: BBox::new(10, 10, 300, 50),
            image_size: Some((200, 100)),
        };
        let text = AnnotationError::InvalidBounds(v).to_string();
        assert!(text.contains("#3"));
        assert!(text.contains("dog"));
        assert!(text.contains("200 x 100"));
    }

    #[test]
    fn test_blocking_kinds() {
        assert!(AnnotationError::MissingLabel { label: "x".into() }.is_blocking());
        assert!(!AnnotationError::malformed("a.xml", "bad").is_blocking());
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! JSON annotation files (`<image>_annotations.json`).

use crate::error::{AnnotationError, Result};
use crate::models::annotation::{AnnotationId, BBox};
use crate::models::project::ImageSession;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct JsonAnnotation {
    label: String,
    bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<AnnotationId>,
}

/// On-disk document. Only `annotations` is read back; the rest is informational.
#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    image_path: String,
    #[serde(default)]
    image_size: [u32; 2],
    #[serde(default = "default_scale")]
    scale_factor: f32,
    annotations: Vec<JsonAnnotation>,
}

fn default_scale() -> f32 {
    1.0
}

pub fn encode(session: &ImageSession, scale_factor: f32) -> Result<String> {
    let doc = JsonDocument {
        image_path: session.image_path().display().to_string(),
        image_size: [session.image_width, session.image_height],
        scale_factor,
        annotations: session
            .annotations
            .iter()
            .map(|a| JsonAnnotation {
                label: a.label.clone(),
                bbox: a.bbox,
                id: Some(a.id),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| AnnotationError::malformed(session.image_path(), e.to_string()))
}

/// Parse `(label, bbox)` pairs in file order. `path` is only used for errors.
pub fn decode(text: &str, path: &Path) -> Result<Vec<(String, BBox)>> {
    let doc: JsonDocument =
        serde_json::from_str(text).map_err(|e| AnnotationError::malformed(path, e.to_string()))?;
    doc.annotations
        .into_iter()
        .enumerate()
        .map(|(i, a)| {
            if a.label.trim().is_empty() {
                Err(AnnotationError::malformed(
                    path,
                    format!("annotation {} has an empty label", i + 1),
                ))
            } else {
                Ok((a.label, a.bbox))
            }
        })
        .collect()
}

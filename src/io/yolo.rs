// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! YOLO text annotation files (`<image>.txt`) plus the folder's
//! `classes.txt` and optional `dataset.yaml`.
//!
//! Each line is `class_index center_x center_y width height` with the four
//! geometric values normalized to the image size.

use crate::error::{AnnotationError, Result};
use crate::models::annotation::BBox;
use crate::models::labels::{parse_label_lines, LabelRegistry};
use crate::util::geometry::{bbox_to_yolo, yolo_to_bbox};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CLASSES_FILE: &str = "classes.txt";
pub const DATASET_FILE: &str = "dataset.yaml";

/// Format one annotation line with 6 decimal digits.
pub fn format_line(class_index: usize, bbox: &BBox, image_size: (u32, u32)) -> String {
    let [cx, cy, w, h] = bbox_to_yolo(bbox, image_size.0, image_size.1);
    format!("{} {:.6} {:.6} {:.6} {:.6}", class_index, cx, cy, w, h)
}

/// Render `(label, bbox)` pairs. Fails on the first label missing from `labels`.
pub fn encode<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a BBox)>,
    image_size: (u32, u32),
    labels: &LabelRegistry,
) -> Result<String> {
    let mut out = String::new();
    for (label, bbox) in entries {
        let class_index = labels.class_index(label)?;
        out.push_str(&format_line(class_index, bbox, image_size));
        out.push('\n');
    }
    Ok(out)
}

/// Parse a label file against `classes`. `path` is only used for errors.
pub fn decode(
    text: &str,
    path: &Path,
    image_size: (u32, u32),
    classes: &[String],
) -> Result<Vec<(String, BBox)>> {
    let mut entries = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 5 {
            return Err(AnnotationError::malformed(
                path,
                format!("line {}: expected 5 fields, found {}", line_no, parts.len()),
            ));
        }
        let class_index: usize = parts[0].parse().map_err(|_| {
            AnnotationError::malformed(path, format!("line {}: bad class index '{}'", line_no, parts[0]))
        })?;
        let label = classes.get(class_index).ok_or_else(|| {
            AnnotationError::malformed(
                path,
                format!("line {}: class {} not in a list of {}", line_no, class_index, classes.len()),
            )
        })?;
        let mut values = [0f64; 4];
        for (slot, raw) in values.iter_mut().zip(&parts[1..5]) {
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| AnnotationError::malformed(path, format!("line {}: bad number '{}'", line_no, raw)))?;
        }
        entries.push((label.clone(), yolo_to_bbox(values, image_size.0, image_size.1)));
    }
    Ok(entries)
}

pub fn classes_path(dir: &Path) -> PathBuf {
    dir.join(CLASSES_FILE)
}

/// Read `classes.txt` from `dir`; missing means empty.
pub fn read_class_list(dir: &Path) -> Result<Vec<String>> {
    let path = classes_path(dir);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(parse_label_lines(&text).map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(AnnotationError::io(path, e)),
    }
}

/// Write `classes.txt` if it differs from the registry. Returns whether it was written.
pub fn sync_class_list(dir: &Path, labels: &LabelRegistry) -> Result<bool> {
    if read_class_list(dir)? == labels.labels() {
        return Ok(false);
    }
    let path = classes_path(dir);
    let mut text = labels.labels().join("\n");
    text.push('\n');
    std::fs::write(&path, text).map_err(|e| AnnotationError::io(&path, e))?;
    log::info!("Wrote {} classes to {}", labels.len(), path.display());
    Ok(true)
}

#[derive(Debug, Serialize)]
struct DatasetConfig {
    path: String,
    train: &'static str,
    val: &'static str,
    test: &'static str,
    nc: usize,
    names: BTreeMap<usize, String>,
}

/// Write an Ultralytics-style `dataset.yaml` describing the class list.
pub fn write_dataset_yaml(dir: &Path, labels: &LabelRegistry) -> Result<PathBuf> {
    let config = DatasetConfig {
        path: dir.display().to_string(),
        train: "images/train",
        val: "images/val",
        test: "images/test",
        nc: labels.len(),
        names: labels.labels().iter().cloned().enumerate().collect(),
    };
    let path = dir.join(DATASET_FILE);
    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| AnnotationError::io(&path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    std::fs::write(&path, yaml).map_err(|e| AnnotationError::io(&path, e))?;
    log::info!("Wrote dataset config {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_line_scenario() {
        let labels = LabelRegistry::from_labels(["a", "b", "dog"]);
        let bbox = BBox::new(50, 25, 150, 75);
        let text = encode([("dog", &bbox)], (200, 100), &labels).unwrap();
        assert_eq!(text, "2 0.500000 0.500000 0.500000 0.500000\n");
    }

    #[test]
    fn test_encode_missing_label_aborts() {
        let labels = LabelRegistry::from_labels(["a"]);
        let bbox = BBox::new(0, 0, 10, 10);
        let err = encode([("a", &bbox), ("ghost", &bbox)], (100, 100), &labels).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingLabel { ref label } if label == "ghost"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_decode_rounds_to_nearest_pixel() {
        let classes = vec!["a".to_string(), "b".to_string()];
        let text = "1 0.500000 0.500000 0.500000 0.500000\n\n0 0.1 0.1 0.05 0.05\n";
        let entries = decode(text, Path::new("x.txt"), (200, 100), &classes).unwrap();
        assert_eq!(entries[0], ("b".to_string(), BBox::new(50, 25, 150, 75)));
        assert_eq!(entries[1], ("a".to_string(), BBox::new(15, 8, 25, 13)));
    }

    #[test]
    fn test_decode_malformed_lines() {
        let classes = vec!["a".to_string()];
        for bad in ["0 0.5 0.5 0.5", "x 0.5 0.5 0.5 0.5", "3 0.5 0.5 0.5 0.5", "0 0.5 nan 0.5 0.5"] {
            let err = decode(bad, Path::new("x.txt"), (10, 10), &classes).unwrap_err();
            assert!(matches!(err, AnnotationError::MalformedSource { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_sync_class_list_writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut labels = LabelRegistry::from_labels(["cat", "dog"]);
        assert!(sync_class_list(dir.path(), &labels).unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(CLASSES_FILE)).unwrap(),
            "cat\ndog\n"
        );
        assert!(!sync_class_list(dir.path(), &labels).unwrap());
        labels.register("bird");
        assert!(sync_class_list(dir.path(), &labels).unwrap());
        assert_eq!(read_class_list(dir.path()).unwrap(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn test_dataset_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::from_labels(["cat", "dog"]);
        let path = write_dataset_yaml(dir.path(), &labels).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(value["nc"].as_u64(), Some(2));
        assert_eq!(value["train"].as_str(), Some("images/train"));
        assert_eq!(value["names"].as_mapping().map(|m| m.len()), Some(2));
        assert!(text.contains("1: dog"));
    }
}

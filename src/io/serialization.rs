// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation file saving and loading.
//!
//! This module picks the annotation file next to an image for the selected
//! format and dispatches to the JSON, PASCAL VOC or YOLO codec. Bounds are
//! validated once here, before any codec runs, in both directions.

use super::{json, voc, yolo};
use crate::error::{AnnotationError, Result};
use crate::models::labels::LabelRegistry;
use crate::models::project::ImageSession;
use crate::models::store::AnnotationSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk annotation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFormat {
    #[default]
    Json,
    Voc,
    Yolo,
}

impl AnnotationFormat {
    pub const ALL: [AnnotationFormat; 3] = [Self::Json, Self::Voc, Self::Yolo];

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Voc => "VOC",
            Self::Yolo => "YOLO",
        }
    }
}

/// Annotation file for `image` in `format`, in the image's directory.
pub fn annotation_path(image: &Path, format: AnnotationFormat) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match format {
        AnnotationFormat::Json => format!("{}_annotations.json", stem),
        AnnotationFormat::Voc => format!("{}.xml", stem),
        AnnotationFormat::Yolo => format!("{}.txt", stem),
    };
    image.with_file_name(name)
}

/// Directory holding the image, used for companion files.
pub fn image_dir(image: &Path) -> PathBuf {
    image
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Informational; recorded in JSON files only.
    pub scale_factor: f32,
    /// Write `dataset.yaml` whenever `classes.txt` is rewritten.
    pub write_dataset_yaml: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            write_dataset_yaml: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// The set was empty and a stale file was removed.
    Deleted(PathBuf),
    /// The set was empty and there was no file.
    Nothing,
}

/// Fail with the first bounds violation, if any.
fn validate(set: &AnnotationSet, image_size: (u32, u32)) -> Result<()> {
    match set.validate_bounds(image_size).into_iter().next() {
        Some(violation) => Err(AnnotationError::InvalidBounds(violation)),
        None => Ok(()),
    }
}

/// Save the session's annotations in `format`.
///
/// Nothing is written unless every box passes validation and, for YOLO,
/// every label is in the registry. On success the set is marked clean.
pub fn save(
    session: &mut ImageSession,
    format: AnnotationFormat,
    labels: &LabelRegistry,
    options: SaveOptions,
) -> Result<SaveOutcome> {
    validate(&session.annotations, session.image_size())?;
    let path = annotation_path(session.image_path(), format);

    if session.annotations.is_empty() {
        let outcome = match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("No annotations left, removed {}", path.display());
                SaveOutcome::Deleted(path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SaveOutcome::Nothing,
            Err(e) => return Err(AnnotationError::io(&path, e)),
        };
        session.annotations.mark_clean();
        return Ok(outcome);
    }

    let text = match format {
        AnnotationFormat::Json => json::encode(session, options.scale_factor)?,
        AnnotationFormat::Voc => voc::encode(
            session.image_path(),
            session.image_size(),
            session.annotations.iter().map(|a| voc::VocObject {
                name: &a.label,
                bbox: a.bbox,
                confidence: None,
            }),
        )?,
        AnnotationFormat::Yolo => {
            let text = yolo::encode(
                session.annotations.iter().map(|a| (a.label.as_str(), &a.bbox)),
                session.image_size(),
                labels,
            )?;
            sync_companions(&image_dir(session.image_path()), labels, options)?;
            text
        }
    };

    std::fs::write(&path, text).map_err(|e| AnnotationError::io(&path, e))?;
    session.annotations.mark_clean();
    log::info!(
        "Saved {} annotations as {} to {}",
        session.annotations.len(),
        format.name(),
        path.display()
    );
    Ok(SaveOutcome::Written(path))
}

/// Keep `classes.txt` (and optionally `dataset.yaml`) in line with the registry.
pub fn sync_companions(dir: &Path, labels: &LabelRegistry, options: SaveOptions) -> Result<()> {
    if yolo::sync_class_list(dir, labels)? && options.write_dataset_yaml {
        yolo::write_dataset_yaml(dir, labels)?;
    }
    Ok(())
}

/// Load the annotations stored next to `image_path` in `format`.
///
/// A missing file yields an empty set. A file that cannot be parsed, or
/// whose boxes fail validation against `image_size`, is reported as
/// [`AnnotationError::MalformedSource`].
pub fn load(
    image_path: &Path,
    image_size: (u32, u32),
    format: AnnotationFormat,
    labels: &LabelRegistry,
) -> Result<AnnotationSet> {
    let path = annotation_path(image_path, format);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AnnotationSet::new()),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            return Err(AnnotationError::malformed(&path, e.to_string()))
        }
        Err(e) => return Err(AnnotationError::io(&path, e)),
    };

    let entries = match format {
        AnnotationFormat::Json => json::decode(&text, &path)?,
        AnnotationFormat::Voc => {
            let doc = voc::decode(&text, &path)?;
            if let Some((w, h)) = doc.size.filter(|size| *size != image_size) {
                log::warn!(
                    "{} records size {}x{}, image is {}x{}",
                    path.display(),
                    w,
                    h,
                    image_size.0,
                    image_size.1
                );
            }
            doc.objects
        }
        AnnotationFormat::Yolo => {
            let classes = if labels.is_empty() {
                yolo::read_class_list(&image_dir(image_path))?
            } else {
                labels.labels().to_vec()
            };
            yolo::decode(&text, &path, image_size, &classes)?
        }
    };

    let set = AnnotationSet::from_entries(entries);
    if let Some(violation) = set.validate_bounds(image_size).into_iter().next() {
        return Err(AnnotationError::malformed(&path, violation.to_string()));
    }
    log::info!("Loaded {} annotations from {}", set.len(), path.display());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::BBox;
    use std::collections::HashSet;

    fn session_in(dir: &Path) -> ImageSession {
        let mut s = ImageSession::new(dir.join("street.jpg"), 200, 100);
        s.annotations.add("car", BBox::new(50, 25, 150, 75)).unwrap();
        s.annotations.add("person", BBox::new(0, 0, 20, 60)).unwrap();
        s
    }

    fn pairs(set: &AnnotationSet) -> HashSet<(String, BBox)> {
        set.iter().map(|a| (a.label.clone(), a.bbox)).collect()
    }

    #[test]
    fn test_annotation_paths() {
        let img = Path::new("/data/set/img 01.png");
        assert_eq!(
            annotation_path(img, AnnotationFormat::Json),
            PathBuf::from("/data/set/img 01_annotations.json")
        );
        assert_eq!(annotation_path(img, AnnotationFormat::Voc), PathBuf::from("/data/set/img 01.xml"));
        assert_eq!(annotation_path(img, AnnotationFormat::Yolo), PathBuf::from("/data/set/img 01.txt"));
    }

    #[test]
    fn test_json_and_voc_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::new();
        for format in [AnnotationFormat::Json, AnnotationFormat::Voc] {
            let mut session = session_in(dir.path());
            let expected = pairs(&session.annotations);
            let outcome = save(&mut session, format, &labels, SaveOptions::default()).unwrap();
            assert!(matches!(outcome, SaveOutcome::Written(_)));
            assert!(!session.is_dirty());

            let loaded = load(session.image_path(), (200, 100), format, &labels).unwrap();
            assert_eq!(pairs(&loaded), expected, "{:?}", format);
            assert!(!loaded.is_dirty());
        }
    }

    #[test]
    fn test_yolo_roundtrip_and_companions() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::from_labels(["person", "bike", "car"]);
        let mut session = session_in(dir.path());
        save(&mut session, AnnotationFormat::Yolo, &labels, SaveOptions::default()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("street.txt")).unwrap();
        assert_eq!(text.lines().next(), Some("2 0.500000 0.500000 0.500000 0.500000"));
        assert!(dir.path().join(yolo::CLASSES_FILE).exists());
        assert!(dir.path().join(yolo::DATASET_FILE).exists());

        // Class names fall back to classes.txt when the registry is empty.
        let loaded = load(session.image_path(), (200, 100), AnnotationFormat::Yolo, &LabelRegistry::new()).unwrap();
        assert_eq!(pairs(&loaded), pairs(&session.annotations));
    }

    #[test]
    fn test_yolo_missing_label_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::from_labels(["car"]);
        let mut session = session_in(dir.path());
        let err = save(&mut session, AnnotationFormat::Yolo, &labels, SaveOptions::default()).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingLabel { .. }));
        assert!(!dir.path().join("street.txt").exists());
        assert!(session.is_dirty());
    }

    #[test]
    fn test_out_of_bounds_refused_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path());
        session.annotations.add("kite", BBox::new(180, 10, 260, 40)).unwrap();
        for format in AnnotationFormat::ALL {
            let err = save(&mut session, format, &LabelRegistry::from_labels(["car", "person", "kite"]), SaveOptions::default())
                .unwrap_err();
            match err {
                AnnotationError::InvalidBounds(v) => {
                    assert_eq!(v.position, 2);
                    assert_eq!(v.label, "kite");
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(!annotation_path(session.image_path(), format).exists());
        }
        assert_eq!(session.annotations.len(), 3);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_saving_empty_set_deletes_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::new();
        let mut session = session_in(dir.path());
        save(&mut session, AnnotationFormat::Json, &labels, SaveOptions::default()).unwrap();
        let path = annotation_path(session.image_path(), AnnotationFormat::Json);
        assert!(path.exists());

        let ids: Vec<_> = session.annotations.iter().map(|a| a.id).collect();
        for id in ids {
            session.annotations.remove(id);
        }
        let outcome = save(&mut session, AnnotationFormat::Json, &labels, SaveOptions::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Deleted(path.clone()));
        assert!(!path.exists());
        assert!(!session.is_dirty());

        session.annotations.add("x", BBox::new(1, 1, 2, 2)).unwrap();
        session.annotations.clear();
        let outcome = save(&mut session, AnnotationFormat::Json, &labels, SaveOptions::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Nothing);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load(&dir.path().join("a.jpg"), (10, 10), AnnotationFormat::Voc, &LabelRegistry::new()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_and_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        std::fs::write(annotation_path(&image, AnnotationFormat::Json), "{ nope").unwrap();
        let err = load(&image, (10, 10), AnnotationFormat::Json, &LabelRegistry::new()).unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedSource { .. }));

        std::fs::write(
            annotation_path(&image, AnnotationFormat::Json),
            r#"{"annotations": [{"label": "a", "bbox": [0, 0, 50, 5]}]}"#,
        )
        .unwrap();
        let err = load(&image, (10, 10), AnnotationFormat::Json, &LabelRegistry::new()).unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedSource { .. }));
    }

    #[test]
    fn test_voc_recorded_size_mismatch_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelRegistry::new();
        let mut session = session_in(dir.path());
        let expected = pairs(&session.annotations);
        save(&mut session, AnnotationFormat::Voc, &labels, SaveOptions::default()).unwrap();

        // The file records 200x100; the image on disk was resized since.
        let loaded = load(session.image_path(), (400, 200), AnnotationFormat::Voc, &labels).unwrap();
        assert_eq!(pairs(&loaded), expected);
    }
}

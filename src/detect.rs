// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pre-annotation with an external object detector.
//!
//! The detector itself is opaque: an image goes in, a list of
//! `(class_name, confidence, box)` comes out. [`BatchInference`] walks a
//! folder one image per [`BatchInference::tick`] so the UI stays responsive,
//! and writes each result through the VOC or YOLO codec.

use crate::error::{AnnotationError, Result};
use crate::io::serialization::{self, annotation_path, image_dir, AnnotationFormat, SaveOptions};
use crate::io::{media, voc, yolo};
use crate::models::annotation::BBox;
use crate::models::labels::LabelRegistry;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One raw detection as reported by the detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in image pixels, possibly fractional.
    #[serde(rename = "box")]
    pub xyxy: [f64; 4],
}

/// Confidence and IoU thresholds, each in `[0, 1]` with two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confidence: f32,
    pub iou: f32,
}

fn clamp_threshold(v: f32) -> f32 {
    if v.is_finite() {
        (v.clamp(0.0, 1.0) * 100.0).round() / 100.0
    } else {
        0.5
    }
}

impl Thresholds {
    pub fn new(confidence: f32, iou: f32) -> Self {
        Self {
            confidence: clamp_threshold(confidence),
            iou: clamp_threshold(iou),
        }
    }
}

/// An object detector.
pub trait Detector {
    fn detect(&mut self, image: &Path, thresholds: Thresholds) -> Result<Vec<Detection>>;
}

/// Runs an external program per image and reads a JSON array of
/// detections from its stdout.
///
/// Invocation: `<program> <args..> [--model <model>] --source <image> --conf <c> --iou <i>`.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    pub program: String,
    pub args: Vec<String>,
    pub model: Option<PathBuf>,
}

impl CommandDetector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<PathBuf>) -> Self {
        self.model = model;
        self
    }
}

impl Detector for CommandDetector {
    fn detect(&mut self, image: &Path, thresholds: Thresholds) -> Result<Vec<Detection>> {
        let fail = |reason: String| AnnotationError::Detector {
            image: image.to_path_buf(),
            reason,
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("--source")
            .arg(image)
            .arg("--conf")
            .arg(format!("{:.2}", thresholds.confidence))
            .arg("--iou")
            .arg(format!("{:.2}", thresholds.iou));

        log::debug!("Running detector {} on {}", self.program, image.display());
        let output = cmd
            .output()
            .map_err(|e| fail(format!("failed to run {}: {}", self.program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_slice(&output.stdout).map_err(|e| fail(format!("bad detector output: {}", e)))
    }
}

/// A detection ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BBox,
}

/// Drop non-positive scores, round and clamp boxes to the image, and drop
/// boxes that end up empty.
pub fn sanitize(detections: Vec<Detection>, image_size: (u32, u32)) -> Vec<CleanDetection> {
    detections
        .into_iter()
        .filter(|d| d.confidence > 0.0 && !d.class_name.trim().is_empty())
        .filter_map(|d| {
            let [x1, y1, x2, y2] = d.xyxy.map(|v| v.round() as i32);
            let bbox = BBox::from_corners(x1, y1, x2, y2).clamped(image_size.0, image_size.1);
            bbox.is_ordered().then(|| CleanDetection {
                label: d.class_name.trim().to_string(),
                confidence: d.confidence,
                bbox,
            })
        })
        .collect()
}

/// Output formats offered for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceFormat {
    #[default]
    Voc,
    Yolo,
}

impl InferenceFormat {
    pub fn annotation_format(self) -> AnnotationFormat {
        match self {
            Self::Voc => AnnotationFormat::Voc,
            Self::Yolo => AnnotationFormat::Yolo,
        }
    }
}

/// Write detections for one image. Nothing is written when none survive.
///
/// For YOLO the detected class names are registered first and the folder's
/// class list is brought in line with the registry.
pub fn write_detections(
    image: &Path,
    image_size: (u32, u32),
    format: InferenceFormat,
    detections: &[CleanDetection],
    labels: &mut LabelRegistry,
    options: SaveOptions,
) -> Result<Option<PathBuf>> {
    if detections.is_empty() {
        return Ok(None);
    }
    let path = annotation_path(image, format.annotation_format());
    let text = match format {
        InferenceFormat::Voc => voc::encode(
            image,
            image_size,
            detections.iter().map(|d| voc::VocObject {
                name: &d.label,
                bbox: d.bbox,
                confidence: Some(d.confidence),
            }),
        )?,
        InferenceFormat::Yolo => {
            for d in detections {
                labels.register(d.label.as_str());
            }
            let text = yolo::encode(
                detections.iter().map(|d| (d.label.as_str(), &d.bbox)),
                image_size,
                labels,
            )?;
            serialization::sync_companions(&image_dir(image), labels, options)?;
            text
        }
    };
    std::fs::write(&path, text).map_err(|e| AnnotationError::io(&path, e))?;
    Ok(Some(path))
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchState {
    Running,
    Finished,
    Failed { image: PathBuf, message: String },
}

/// Progress snapshot for the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f32 / self.total as f32
        }
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0) as u32
    }
}

/// A batch inference job advanced one image per tick.
#[derive(Debug)]
pub struct BatchInference {
    images: Vec<PathBuf>,
    next: usize,
    thresholds: Thresholds,
    format: InferenceFormat,
    options: SaveOptions,
    written: usize,
    state: BatchState,
}

impl BatchInference {
    /// Plan a job over a single image or every image in a folder.
    pub fn new(
        source: &Path,
        thresholds: Thresholds,
        format: InferenceFormat,
        options: SaveOptions,
    ) -> anyhow::Result<Self> {
        let images = if source.is_file() {
            vec![source.to_path_buf()]
        } else if source.is_dir() {
            media::list_images(source, media::INFERENCE_EXTENSIONS)?
        } else {
            anyhow::bail!("Source {} does not exist", source.display());
        };
        log::info!(
            "Batch inference over {} images from {}",
            images.len(),
            source.display()
        );
        let state = if images.is_empty() {
            BatchState::Finished
        } else {
            BatchState::Running
        };
        Ok(Self {
            images,
            next: 0,
            thresholds,
            format,
            options,
            written: 0,
            state,
        })
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BatchState::Running
    }

    pub fn progress(&self) -> Progress {
        Progress {
            done: self.next,
            total: self.images.len(),
        }
    }

    /// Annotation files written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Process the next image. The first failure stops the job.
    pub fn tick(&mut self, detector: &mut dyn Detector, labels: &mut LabelRegistry) -> Progress {
        if !self.is_running() {
            return self.progress();
        }
        let Some(image) = self.images.get(self.next).cloned() else {
            self.state = BatchState::Finished;
            return self.progress();
        };

        match self.process(&image, detector, labels) {
            Ok(written) => {
                self.next += 1;
                if written {
                    self.written += 1;
                }
                if self.next >= self.images.len() {
                    log::info!("Batch inference finished, {} files written", self.written);
                    self.state = BatchState::Finished;
                }
            }
            Err(e) => {
                log::error!("Batch inference stopped: {}", e);
                self.state = BatchState::Failed {
                    image,
                    message: e.to_string(),
                };
            }
        }
        self.progress()
    }

    fn process(&self, image: &Path, detector: &mut dyn Detector, labels: &mut LabelRegistry) -> Result<bool> {
        let image_size = media::image_size(image).map_err(|e| AnnotationError::Detector {
            image: image.to_path_buf(),
            reason: format!("{:#}", e),
        })?;
        let raw = detector.detect(image, self.thresholds)?;
        let found = raw.len();
        let detections = sanitize(raw, image_size);
        let written = write_detections(image, image_size, self.format, &detections, labels, self.options)?;
        log::info!(
            "{}: {} detections, {} kept",
            image.display(),
            found,
            detections.len()
        );
        Ok(written.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Returns canned detections keyed by file name.
    struct FakeDetector {
        results: HashMap<String, Vec<Detection>>,
        calls: usize,
    }

    impl Detector for FakeDetector {
        fn detect(&mut self, image: &Path, _thresholds: Thresholds) -> Result<Vec<Detection>> {
            self.calls += 1;
            let name = image.file_name().unwrap().to_string_lossy().into_owned();
            Ok(self.results.get(&name).cloned().unwrap_or_default())
        }
    }

    fn det(class_name: &str, confidence: f32, xyxy: [f64; 4]) -> Detection {
        Detection {
            class_name: class_name.into(),
            confidence,
            xyxy,
        }
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        image::RgbImage::new(w, h).save(path).unwrap();
    }

    #[test]
    fn test_detection_json_shape() {
        let parsed: Vec<Detection> =
            serde_json::from_str(r#"[{"class_name": "dog", "confidence": 0.9, "box": [1.5, 2, 30, 40]}]"#)
                .unwrap();
        assert_eq!(parsed[0], det("dog", 0.9, [1.5, 2.0, 30.0, 40.0]));
    }

    #[test]
    fn test_thresholds_clamped_to_two_decimals() {
        let t = Thresholds::new(1.7, 0.456);
        assert_eq!(t.confidence, 1.0);
        assert!((t.iou - 0.46).abs() < 1e-6);
    }

    #[test]
    fn test_sanitize() {
        let out = sanitize(
            vec![
                det("dog", 0.8, [10.4, 10.6, 50.5, 60.0]),
                det("cat", 0.0, [0.0, 0.0, 10.0, 10.0]),
                det("car", 0.5, [90.0, 10.0, 150.0, 20.0]),
                det("kite", 0.5, [120.0, 10.0, 150.0, 20.0]),
            ],
            (100, 100),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bbox, BBox::new(10, 11, 51, 60));
        assert_eq!(out[1].bbox, BBox::new(90, 10, 100, 20));
    }

    #[test]
    fn test_batch_runs_one_image_per_tick_voc() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 100, 80);
        write_png(&dir.path().join("b.png"), 100, 80);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let mut detector = FakeDetector {
            results: HashMap::from([("a.png".to_string(), vec![det("dog", 0.87654, [5.0, 5.0, 40.0, 30.0])])]),
            calls: 0,
        };
        let mut labels = LabelRegistry::new();
        let mut job = BatchInference::new(
            dir.path(),
            Thresholds::new(0.25, 0.45),
            InferenceFormat::Voc,
            SaveOptions::default(),
        )
        .unwrap();

        assert_eq!(job.tick(&mut detector, &mut labels), Progress { done: 1, total: 2 });
        assert!(job.is_running());
        assert_eq!(detector.calls, 1);
        let p = job.tick(&mut detector, &mut labels);
        assert_eq!(p.percent(), 100);
        assert_eq!(job.state(), &BatchState::Finished);
        assert_eq!(job.written(), 1);

        let xml = std::fs::read_to_string(dir.path().join("a.xml")).unwrap();
        assert!(xml.contains("<confidence>0.8765</confidence>"));
        assert!(!dir.path().join("b.xml").exists());

        // Further ticks are no-ops.
        job.tick(&mut detector, &mut labels);
        assert_eq!(detector.calls, 2);
    }

    #[test]
    fn test_batch_yolo_registers_classes() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("street.png");
        write_png(&image, 200, 100);
        let mut detector = FakeDetector {
            results: HashMap::from([(
                "street.png".to_string(),
                vec![det("car", 0.9, [50.0, 25.0, 150.0, 75.0])],
            )]),
            calls: 0,
        };
        let mut labels = LabelRegistry::from_labels(["person", "bike"]);
        let mut job = BatchInference::new(
            &image,
            Thresholds::new(0.5, 0.5),
            InferenceFormat::Yolo,
            SaveOptions::default(),
        )
        .unwrap();
        job.tick(&mut detector, &mut labels);

        assert_eq!(labels.index_of("car"), Some(2));
        let txt = std::fs::read_to_string(dir.path().join("street.txt")).unwrap();
        assert_eq!(txt, "2 0.500000 0.500000 0.500000 0.500000\n");
        let classes = std::fs::read_to_string(dir.path().join(yolo::CLASSES_FILE)).unwrap();
        assert_eq!(classes, "person\nbike\ncar\n");
    }

    #[test]
    fn test_batch_stops_on_failure() {
        struct Broken;
        impl Detector for Broken {
            fn detect(&mut self, image: &Path, _t: Thresholds) -> Result<Vec<Detection>> {
                Err(AnnotationError::Detector {
                    image: image.to_path_buf(),
                    reason: "model missing".into(),
                })
            }
        }
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 10, 10);
        let mut job = BatchInference::new(
            dir.path(),
            Thresholds::new(0.5, 0.5),
            InferenceFormat::Voc,
            SaveOptions::default(),
        )
        .unwrap();
        job.tick(&mut Broken, &mut LabelRegistry::new());
        assert!(matches!(job.state(), BatchState::Failed { message, .. } if message.contains("model missing")));
        assert_eq!(job.progress().done, 0);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = BatchInference::new(
            &dir.path().join("nope"),
            Thresholds::new(0.5, 0.5),
            InferenceFormat::Voc,
            SaveOptions::default(),
        );
        assert!(res.is_err());
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Batch pre-annotation page.

use crate::config::DetectorConfig;
use crate::detect::{BatchInference, BatchState, CommandDetector, InferenceFormat, Thresholds};
use crate::io::media;
use crate::io::serialization::SaveOptions;
use crate::models::labels::LabelRegistry;
use std::path::PathBuf;

pub struct InferencePage {
    program: String,
    args: Vec<String>,
    model: String,
    source: String,
    confidence: f32,
    iou: f32,
    format: InferenceFormat,
    detector: Option<CommandDetector>,
    job: Option<BatchInference>,
    status: String,
}

impl InferencePage {
    pub fn new(config: &DetectorConfig) -> Self {
        let thresholds = Thresholds::new(config.confidence, config.iou);
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            model: String::new(),
            source: String::new(),
            confidence: thresholds.confidence,
            iou: thresholds.iou,
            format: InferenceFormat::Voc,
            detector: None,
            job: None,
            status: "Ready".to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.as_ref().is_some_and(BatchInference::is_running)
    }

    fn start(&mut self, options: SaveOptions) {
        if self.program.trim().is_empty() {
            self.status = "No detector program configured (detector.program)".to_string();
            return;
        }
        if self.source.trim().is_empty() {
            self.status = "Choose an image or a folder first".to_string();
            return;
        }
        let model = (!self.model.trim().is_empty()).then(|| PathBuf::from(self.model.trim()));
        let thresholds = Thresholds::new(self.confidence, self.iou);
        match BatchInference::new(PathBuf::from(self.source.trim()).as_path(), thresholds, self.format, options) {
            Ok(job) => {
                self.status = if job.progress().total == 0 {
                    "No images found in the source".to_string()
                } else {
                    "Processing...".to_string()
                };
                self.detector = Some(CommandDetector::new(self.program.clone(), self.args.clone()).with_model(model));
                self.job = Some(job);
            }
            Err(e) => {
                log::warn!("Cannot start inference: {:#}", e);
                self.status = format!("{:#}", e);
            }
        }
    }

    /// Process one image if a job is running. Returns whether more work remains.
    pub fn tick(&mut self, labels: &mut LabelRegistry) -> bool {
        let (Some(job), Some(detector)) = (self.job.as_mut(), self.detector.as_mut()) else {
            return false;
        };
        if !job.is_running() {
            return false;
        }
        job.tick(detector, labels);
        match job.state() {
            BatchState::Running => true,
            BatchState::Finished => {
                self.status = format!("Done, {} annotation files written", job.written());
                false
            }
            BatchState::Failed { image, message } => {
                self.status = format!("Failed on {}: {}", image.display(), message);
                false
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, options: SaveOptions) {
        ui.heading("Batch pre-annotation");
        ui.add_space(8.0);
        let running = self.is_running();

        egui::Grid::new("inference_form")
            .num_columns(3)
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                ui.label("Detector:");
                ui.add_enabled(!running, egui::TextEdit::singleline(&mut self.program));
                ui.end_row();

                ui.label("Model:");
                ui.add_enabled(!running, egui::TextEdit::singleline(&mut self.model));
                if ui.add_enabled(!running, egui::Button::new("Browse...")).clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_file() {
                        self.model = path.display().to_string();
                    }
                }
                ui.end_row();

                ui.label("Source:");
                ui.add_enabled(!running, egui::TextEdit::singleline(&mut self.source));
                ui.horizontal(|ui| {
                    if ui.add_enabled(!running, egui::Button::new("Image...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", media::INFERENCE_EXTENSIONS)
                            .pick_file()
                        {
                            self.source = path.display().to_string();
                        }
                    }
                    if ui.add_enabled(!running, egui::Button::new("Folder...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new().pick_folder() {
                            self.source = path.display().to_string();
                        }
                    }
                });
                ui.end_row();

                ui.label("conf:");
                ui.add_enabled(
                    !running,
                    egui::DragValue::new(&mut self.confidence)
                        .clamp_range(0.0..=1.0)
                        .speed(0.01)
                        .fixed_decimals(2),
                );
                ui.end_row();

                ui.label("iou:");
                ui.add_enabled(
                    !running,
                    egui::DragValue::new(&mut self.iou)
                        .clamp_range(0.0..=1.0)
                        .speed(0.01)
                        .fixed_decimals(2),
                );
                ui.end_row();

                ui.label("Output:");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.format, InferenceFormat::Voc, "VOC (xml)");
                    ui.radio_value(&mut self.format, InferenceFormat::Yolo, "YOLO (txt)");
                });
                ui.end_row();
            });

        ui.add_space(8.0);
        if ui.add_enabled(!running, egui::Button::new("Start")).clicked() {
            self.start(options);
        }

        if let Some(job) = &self.job {
            let progress = job.progress();
            ui.add(
                egui::ProgressBar::new(progress.fraction())
                    .text(format!("{}% ({}/{})", progress.percent(), progress.done, progress.total)),
            );
        }
        ui.label(&self.status);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Modal dialogs drawn as centered windows.
//!
//! Each function returns `Some(answer)` on the frame the operator answers
//! and `None` while the dialog is still open.

use crate::editor::interaction::LabelChoice;
use crate::error::AnnotationError;
use crate::models::labels::LabelRegistry;
use egui::{Align2, Color32, RichText};

fn modal(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
}

/// Label picker shown after a box is drawn.
#[derive(Debug, Default)]
pub struct LabelChooser {
    selected: Option<usize>,
    new_label: String,
}

impl LabelChooser {
    pub fn open(labels: &LabelRegistry) -> Self {
        Self {
            selected: labels.current_index(),
            new_label: String::new(),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, labels: &LabelRegistry) -> Option<LabelChoice> {
        let mut choice = None;
        modal("Choose label").show(ctx, |ui| {
            egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                for (i, label) in labels.labels().iter().enumerate() {
                    let response = ui.selectable_label(self.selected == Some(i), label);
                    if response.clicked() {
                        self.selected = Some(i);
                    }
                    if response.double_clicked() {
                        choice = Some(LabelChoice::Existing(label.clone()));
                    }
                }
            });
            ui.separator();
            ui.horizontal(|ui| {
                ui.label("New label:");
                let edit = ui.text_edit_singleline(&mut self.new_label);
                if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) && !self.new_label.trim().is_empty() {
                    choice = Some(LabelChoice::New(self.new_label.trim().to_string()));
                }
            });
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("OK").clicked() {
                    let typed = self.new_label.trim();
                    if !typed.is_empty() {
                        choice = Some(LabelChoice::New(typed.to_string()));
                    } else if let Some(label) = self.selected.and_then(|i| labels.get(i)) {
                        choice = Some(LabelChoice::Existing(label.to_string()));
                    }
                }
                if ui.button("Cancel").clicked() || ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    choice = Some(LabelChoice::Cancel);
                }
            });
        });
        choice
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    Discard,
    Cancel,
}

/// Save-or-discard gate before leaving an image with unsaved changes.
pub fn save_prompt(ctx: &egui::Context, file_name: &str) -> Option<SaveChoice> {
    let mut choice = None;
    modal("Unsaved changes").show(ctx, |ui| {
        ui.label(format!("Save the annotations of {} first?", file_name));
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                choice = Some(SaveChoice::Save);
            }
            if ui.button("Discard").clicked() {
                choice = Some(SaveChoice::Discard);
            }
            if ui.button("Cancel").clicked() {
                choice = Some(SaveChoice::Cancel);
            }
        });
    });
    choice
}

/// Yes/no confirmation.
pub fn confirm(ctx: &egui::Context, title: &str, question: &str) -> Option<bool> {
    let mut answer = None;
    modal(title).show(ctx, |ui| {
        ui.label(question);
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Yes").clicked() {
                answer = Some(true);
            }
            if ui.button("No").clicked() {
                answer = Some(false);
            }
        });
    });
    answer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A message the operator has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

impl Message {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

impl From<&AnnotationError> for Message {
    fn from(e: &AnnotationError) -> Self {
        match e {
            AnnotationError::MalformedSource { .. } => Message::warning(e.to_string()),
            _ if e.is_blocking() => Message::error(e.to_string()),
            _ => Message::warning(e.to_string()),
        }
    }
}

/// Returns `true` once the message is dismissed.
pub fn message(ctx: &egui::Context, msg: &Message) -> bool {
    let (title, color) = match msg.severity {
        Severity::Warning => ("Warning", Color32::YELLOW),
        Severity::Error => ("Error", Color32::LIGHT_RED),
    };
    let mut closed = false;
    modal(title).show(ctx, |ui| {
        ui.label(RichText::new(&msg.text).color(color));
        ui.add_space(8.0);
        if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            closed = true;
        }
    });
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoundsViolation;
    use crate::models::annotation::BBox;

    #[test]
    fn test_message_severity_from_error() {
        let blocking = AnnotationError::MissingLabel { label: "x".into() };
        assert_eq!(Message::from(&blocking).severity, Severity::Error);

        let bounds = AnnotationError::InvalidBounds(BoundsViolation {
            position: 0,
            id: None,
            label: "a".into(),
            bbox: BBox::new(0, 0, 0, 0),
            image_size: None,
        });
        assert_eq!(Message::from(&bounds).severity, Severity::Error);

        let malformed = AnnotationError::malformed("a.xml", "bad");
        assert_eq!(Message::from(&malformed).severity, Severity::Warning);

        let io = AnnotationError::io("a.json", std::io::Error::other("disk full"));
        assert_eq!(Message::from(&io).severity, Severity::Warning);
    }
}

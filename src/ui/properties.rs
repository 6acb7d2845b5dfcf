// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation properties panel.
//!
//! This module provides the right-hand panel: the current label choice,
//! the summary list of annotations and the detail pane of the selected one.

use crate::models::labels::LabelRegistry;
use crate::ui::sync::ViewSync;

/// Result of properties panel interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesAction {
    None,
    /// A list row was clicked; clicking the selected row again clears it.
    SelectRow(Option<usize>),
    DeleteSelected,
}

pub fn show(
    ui: &mut egui::Ui,
    labels: &mut LabelRegistry,
    sync: &ViewSync,
    selected_row: Option<usize>,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Label");
    let current_text = labels.current().unwrap_or("(none)").to_string();
    let mut chosen = labels.current_index();
    egui::ComboBox::from_id_source("current_label")
        .selected_text(current_text)
        .width(ui.available_width() - 8.0)
        .show_ui(ui, |ui| {
            for (i, label) in labels.labels().iter().enumerate() {
                ui.selectable_value(&mut chosen, Some(i), label);
            }
        });
    if let Some(i) = chosen {
        if Some(i) != labels.current_index() {
            labels.set_current(i);
        }
    }

    ui.separator();
    ui.heading(format!("Annotations ({})", sync.summary().len()));
    egui::ScrollArea::vertical()
        .id_source("annotation_list")
        .max_height(ui.available_height() * 0.6)
        .show(ui, |ui| {
            for (row, line) in sync.summary().iter().enumerate() {
                let is_selected = selected_row == Some(row);
                if ui.selectable_label(is_selected, line).clicked() {
                    action = PropertiesAction::SelectRow(if is_selected { None } else { Some(row) });
                }
            }
        });

    ui.separator();
    ui.heading("Details");
    match sync.detail() {
        Some(detail) => {
            egui::Grid::new("annotation_detail")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Label");
                    ui.label(&detail.label);
                    ui.end_row();
                    ui.label("Top-left");
                    ui.label(format!("({}, {})", detail.bbox.x1, detail.bbox.y1));
                    ui.end_row();
                    ui.label("Bottom-right");
                    ui.label(format!("({}, {})", detail.bbox.x2, detail.bbox.y2));
                    ui.end_row();
                    ui.label("Width");
                    ui.label(detail.width.to_string());
                    ui.end_row();
                    ui.label("Height");
                    ui.label(detail.height.to_string());
                    ui.end_row();
                    ui.label("Area");
                    ui.label(detail.area.to_string());
                    ui.end_row();
                });
            ui.add_space(6.0);
            if ui.button("🗑 Delete").clicked() {
                action = PropertiesAction::DeleteSelected;
            }
        }
        None => {
            ui.label(egui::RichText::new("No annotation selected").weak());
        }
    }

    action
}

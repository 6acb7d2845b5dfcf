// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! This module provides the toolbar for choosing between selecting and
//! drawing boxes, the label mode and annotation format, zoom, and the
//! per-image commands (save, confirm, navigate, delete).

use crate::io::serialization::AnnotationFormat;

/// Current drawing tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Rectangle,
}

/// Command requested from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Previous,
    Next,
    Save,
    Confirm,
    DeleteSelected,
    ClearAll,
    ZoomIn,
    ZoomOut,
    FitToWindow,
    ActualSize,
}

/// Mutable toolbar state owned by the app.
pub struct ToolbarState<'a> {
    pub tool: &'a mut Tool,
    pub format: &'a mut AnnotationFormat,
    pub default_label: &'a mut bool,
    pub has_image: bool,
}

/// Display the toolbar. Tool, format and label mode are edited in place.
pub fn show(ui: &mut egui::Ui, state: ToolbarState<'_>) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    let mut pick = |clicked: bool, a: ToolbarAction| {
        if clicked {
            action = a;
        }
    };

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.selectable_label(*state.tool == Tool::Select, "⬆ Select").clicked() {
            *state.tool = Tool::Select;
        }
        if ui
            .selectable_label(*state.tool == Tool::Rectangle, "▭ Rectangle (W)")
            .clicked()
        {
            *state.tool = Tool::Rectangle;
        }

        ui.separator();
        ui.checkbox(&mut *state.default_label, "Default label")
            .on_hover_text("Use the selected label for new boxes without asking");

        ui.separator();
        ui.label("Format:");
        for format in AnnotationFormat::ALL {
            ui.radio_value(&mut *state.format, format, format.name());
        }

        ui.separator();
        ui.add_enabled_ui(state.has_image, |ui| {
            pick(ui.button("◀ Prev").clicked(), ToolbarAction::Previous);
            pick(ui.button("Next ▶").clicked(), ToolbarAction::Next);
            pick(ui.button("💾 Save (Space)").clicked(), ToolbarAction::Save);
            pick(ui.button("✔ Confirm").clicked(), ToolbarAction::Confirm);
            pick(ui.button("Delete").clicked(), ToolbarAction::DeleteSelected);
            pick(ui.button("Clear all").clicked(), ToolbarAction::ClearAll);

            ui.separator();
            pick(ui.button("➕").on_hover_text("Zoom in").clicked(), ToolbarAction::ZoomIn);
            pick(ui.button("➖").on_hover_text("Zoom out").clicked(), ToolbarAction::ZoomOut);
            pick(ui.button("Fit").clicked(), ToolbarAction::FitToWindow);
            pick(ui.button("1:1").clicked(), ToolbarAction::ActualSize);
        });
    });

    ui.label(
        egui::RichText::new(match state.tool {
            Tool::Select => "Drag a box to move it, drag a handle to resize it",
            Tool::Rectangle => "Drag on the image to draw a box",
        })
        .italics()
        .weak(),
    );

    action
}

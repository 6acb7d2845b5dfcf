// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Folder file list. Unconfirmed images are tinted red, confirmed green.

use crate::io::ledger::ConfirmLedger;
use egui::Color32;
use std::path::PathBuf;

const UNCONFIRMED: Color32 = Color32::from_rgb(255, 153, 153);
const CONFIRMED: Color32 = Color32::from_rgb(153, 255, 153);

/// Returns the index of a clicked file. `reveal` scrolls the current file into view.
pub fn show(
    ui: &mut egui::Ui,
    files: &[PathBuf],
    current: Option<usize>,
    ledger: Option<&ConfirmLedger>,
    reveal: bool,
) -> Option<usize> {
    let mut clicked = None;
    let confirmed_total = ledger.map_or(0, ConfirmLedger::confirmed_count);
    ui.heading(format!("Files ({}/{} confirmed)", confirmed_total, files.len()));
    egui::ScrollArea::vertical()
        .id_source("file_list")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (i, path) in files.iter().enumerate() {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let confirmed = ledger.is_some_and(|l| l.is_confirmed(path));
                let fill = if confirmed { CONFIRMED } else { UNCONFIRMED };
                let text = egui::RichText::new(name)
                    .color(Color32::BLACK)
                    .background_color(fill);
                let response = ui.selectable_label(current == Some(i), text);
                if reveal && current == Some(i) {
                    response.scroll_to_me(Some(egui::Align::Center));
                }
                if response.clicked() && current != Some(i) {
                    clicked = Some(i);
                }
            }
        });
    clicked
}

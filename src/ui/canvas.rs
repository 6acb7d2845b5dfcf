// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and box annotation.
//!
//! This module paints the image, the annotation boxes and the rubber band,
//! and turns raw egui pointer input into canvas-relative events for the
//! interaction state machine. Positions in [`CanvasEvent`] are display
//! coordinates, i.e. relative to the canvas' top-left corner.

use crate::editor::handles::{CursorHint, Handle};
use crate::ui::sync::ViewSync;
use crate::util::geometry::Viewport;
use egui::{Align2, Color32, CursorIcon, FontId, Pos2, Rect, Sense, Stroke, Vec2};

const BOX_COLOR: Color32 = Color32::from_rgb(255, 40, 40);
const SELECTED_COLOR: Color32 = Color32::from_rgb(255, 220, 0);
const RUBBER_BAND_COLOR: Color32 = Color32::from_rgb(60, 160, 255);
const SAVED_BACKGROUND: Color32 = Color32::from_rgb(0, 200, 0);

impl From<CursorHint> for CursorIcon {
    fn from(hint: CursorHint) -> Self {
        match hint {
            CursorHint::Neutral => CursorIcon::Default,
            CursorHint::ResizeNwSe => CursorIcon::ResizeNwSe,
            CursorHint::ResizeNeSw => CursorIcon::ResizeNeSw,
            CursorHint::ResizeHorizontal => CursorIcon::ResizeHorizontal,
            CursorHint::ResizeVertical => CursorIcon::ResizeVertical,
            CursorHint::Draggable => CursorIcon::Grab,
        }
    }
}

/// Pointer input, in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    Press(Pos2),
    Drag(Pos2),
    Release(Pos2),
    /// Press and release without movement.
    Click(Pos2),
    Hover(Pos2),
    /// Mouse wheel; positive zooms in.
    Zoom(f32),
}

/// What the canvas needs to draw one frame.
pub struct CanvasView<'a> {
    pub texture: Option<&'a egui::TextureHandle>,
    pub image_size: Option<(u32, u32)>,
    pub viewport: &'a Viewport,
    pub sync: &'a ViewSync,
    pub rubber_band: Option<Rect>,
    pub handle_size: f32,
    /// Tint the background to acknowledge a save.
    pub saved: bool,
    pub cursor: CursorHint,
}

pub struct CanvasOutput {
    pub events: Vec<CanvasEvent>,
    /// Size of the drawable area, used for fit-to-window and recentering.
    pub size: Vec2,
}

/// Display the main canvas area and collect pointer events.
pub fn show(ui: &mut egui::Ui, view: &CanvasView<'_>) -> CanvasOutput {
    let mut events = Vec::new();
    let available = ui.available_size();
    let (response, painter) = ui.allocate_painter(available, Sense::click_and_drag());
    let origin = response.rect.min;
    let to_screen = |p: Pos2| p + origin.to_vec2();
    let to_display = |p: Pos2| p - origin.to_vec2();

    let background = if view.saved {
        SAVED_BACKGROUND
    } else {
        Color32::from_gray(40)
    };
    painter.rect_filled(response.rect, 0.0, background);

    let (Some(texture), Some(image_size)) = (view.texture, view.image_size) else {
        painter.text(
            response.rect.center(),
            Align2::CENTER_CENTER,
            "Open an image or a folder to begin annotating",
            FontId::proportional(16.0),
            Color32::from_gray(180),
        );
        return CanvasOutput {
            events,
            size: response.rect.size(),
        };
    };

    let image_rect = view.viewport.image_rect(image_size).translate(origin.to_vec2());
    painter.image(
        texture.id(),
        image_rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    for (_, visual, selected) in view.sync.visuals() {
        let rect = visual.rect.translate(origin.to_vec2());
        let color = if selected { SELECTED_COLOR } else { BOX_COLOR };
        painter.rect_stroke(rect, 0.0, Stroke::new(2.0, color));
        painter.text(
            to_screen(visual.label_anchor) - Vec2::new(0.0, 2.0),
            Align2::LEFT_BOTTOM,
            &visual.label,
            FontId::proportional(14.0),
            color,
        );
        if selected {
            draw_handles(&painter, rect, view.handle_size / 2.0, color);
        }
    }

    if let Some(band) = view.rubber_band {
        painter.rect_stroke(
            band.translate(origin.to_vec2()),
            0.0,
            Stroke::new(2.0, RUBBER_BAND_COLOR),
        );
    }

    // Pointer input
    let pointer = ui.ctx().input(|i| i.pointer.latest_pos());
    if response.drag_started() {
        let origin_pos = ui.ctx().input(|i| i.pointer.press_origin()).or(pointer);
        if let Some(p) = origin_pos {
            events.push(CanvasEvent::Press(to_display(p)));
        }
    }
    if response.dragged() {
        if let Some(p) = pointer {
            events.push(CanvasEvent::Drag(to_display(p)));
        }
    }
    if response.drag_stopped() {
        if let Some(p) = pointer {
            events.push(CanvasEvent::Release(to_display(p)));
        }
    } else if response.clicked() {
        if let Some(p) = response.interact_pointer_pos() {
            events.push(CanvasEvent::Click(to_display(p)));
        }
    }
    if let Some(p) = response.hover_pos() {
        if !response.dragged() {
            events.push(CanvasEvent::Hover(to_display(p)));
        }
        let scroll = ui.ctx().input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            events.push(CanvasEvent::Zoom(scroll.signum()));
        }
    }

    if response.hovered() {
        ui.ctx().set_cursor_icon(view.cursor.into());
    }

    CanvasOutput {
        events,
        size: response.rect.size(),
    }
}

/// Small filled squares on the eight grab points of a selected box.
fn draw_handles(painter: &egui::Painter, rect: Rect, half: f32, color: Color32) {
    for handle in Handle::ALL {
        let center = handle.anchor(rect);
        painter.rect_filled(
            Rect::from_center_size(center, Vec2::splat(half * 2.0)),
            0.0,
            color,
        );
    }
}

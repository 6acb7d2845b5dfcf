// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer interaction state machine for the annotation canvas.
//!
//! Press/drag/release sequences in display space are turned into box
//! creation, selection, moving and resizing. Every gesture ends back in
//! [`ModeKind::Select`]. A new box that still needs a label is parked as a
//! pending box until [`InteractionMachine::resolve_label`] is called; no
//! other gesture starts while a label is pending.

use super::handles::{self, CursorHint, Handle, HitKind};
use crate::error::Result;
use crate::models::annotation::{AnnotationId, BBox};
use crate::models::labels::LabelRegistry;
use crate::models::store::AnnotationSet;
use crate::util::geometry::Viewport;
use egui::{Pos2, Rect, Vec2};

pub const DEFAULT_HANDLE_SIZE: f32 = 8.0;
pub const DEFAULT_MIN_BOX_SIZE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Select,
    Draw {
        anchor: Pos2,
        current: Pos2,
    },
    Move {
        id: AnnotationId,
        /// Press point minus the box's top-left corner.
        grab_offset: Vec2,
        rect: Rect,
    },
    Resize {
        id: AnnotationId,
        handle: Handle,
        rect: Rect,
    },
}

/// Public view of the machine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Select,
    Draw,
    Move,
    Resize,
}

/// The operator's answer to the label chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelChoice {
    Existing(String),
    /// A label typed by the operator; registered if new.
    New(String),
    Cancel,
}

/// What a single event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing changed.
    Idle,
    /// The selection moved to this annotation, or was cleared.
    Selected(Option<AnnotationId>),
    /// A drag is in progress; only visual feedback changed.
    Preview,
    /// A new annotation was committed.
    Added(AnnotationId),
    /// An existing annotation's bounds were committed.
    Updated(AnnotationId),
    /// The gesture ended without touching the store.
    Discarded,
    /// A valid box was drawn and awaits a label choice.
    LabelRequested(BBox),
    /// A commit was rejected by the store; the store is unchanged.
    Rejected(String),
}

/// Modal input handler for the canvas.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    mode: Mode,
    handle_size: f32,
    min_box_size: f32,
    draw_requested: bool,
    use_default_label: bool,
    pending: Option<BBox>,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_SIZE, DEFAULT_MIN_BOX_SIZE)
    }
}

impl InteractionMachine {
    pub fn new(handle_size: f32, min_box_size: f32) -> Self {
        Self {
            mode: Mode::Select,
            handle_size,
            min_box_size,
            draw_requested: false,
            use_default_label: false,
            pending: None,
        }
    }

    pub fn mode(&self) -> ModeKind {
        match self.mode {
            Mode::Select => ModeKind::Select,
            Mode::Draw { .. } => ModeKind::Draw,
            Mode::Move { .. } => ModeKind::Move,
            Mode::Resize { .. } => ModeKind::Resize,
        }
    }

    /// Arm rectangle drawing for the next press on empty canvas.
    pub fn request_draw(&mut self, armed: bool) {
        self.draw_requested = armed;
    }

    pub fn draw_requested(&self) -> bool {
        self.draw_requested
    }

    pub fn set_use_default_label(&mut self, on: bool) {
        self.use_default_label = on;
    }

    pub fn use_default_label(&self) -> bool {
        self.use_default_label
    }

    pub fn pending_label(&self) -> Option<BBox> {
        self.pending
    }

    /// Rubber-band rectangle while drawing.
    pub fn rubber_band(&self) -> Option<Rect> {
        match self.mode {
            Mode::Draw { anchor, current } => Some(Rect::from_two_pos(anchor, current)),
            _ => None,
        }
    }

    /// Live display rectangle of the box being moved or resized.
    pub fn active_edit(&self) -> Option<(AnnotationId, Rect)> {
        match self.mode {
            Mode::Move { id, rect, .. } | Mode::Resize { id, rect, .. } => Some((id, rect)),
            _ => None,
        }
    }

    /// Abandon the current gesture without committing anything.
    pub fn cancel(&mut self) {
        if self.mode != Mode::Select {
            log::debug!("Cancelled {:?} gesture", self.mode());
        }
        self.mode = Mode::Select;
    }

    /// Reset for a freshly loaded image.
    pub fn reset(&mut self) {
        self.mode = Mode::Select;
        self.pending = None;
    }

    /// Pointer pressed at display position `p`.
    pub fn press(
        &mut self,
        p: Pos2,
        set: &AnnotationSet,
        viewport: &Viewport,
        image_size: (u32, u32),
    ) -> Outcome {
        if self.pending.is_some() || self.mode != Mode::Select {
            return Outcome::Idle;
        }

        if let Some(hit) = handles::hit_test(set, viewport, p, self.handle_size) {
            self.mode = match hit.kind {
                HitKind::Handle(handle) => {
                    log::debug!("Resize {} via '{}' handle", hit.id, handle.name());
                    Mode::Resize {
                        id: hit.id,
                        handle,
                        rect: hit.rect,
                    }
                }
                HitKind::Body => {
                    log::debug!("Move {}", hit.id);
                    Mode::Move {
                        id: hit.id,
                        grab_offset: p - hit.rect.min,
                        rect: hit.rect,
                    }
                }
            };
            return Outcome::Selected(Some(hit.id));
        }

        if self.draw_requested && viewport.image_rect(image_size).contains(p) {
            self.mode = Mode::Draw {
                anchor: p,
                current: p,
            };
            return Outcome::Preview;
        }

        Outcome::Selected(None)
    }

    /// Pointer dragged to display position `p` with the button held.
    pub fn drag(&mut self, p: Pos2) -> Outcome {
        match &mut self.mode {
            Mode::Select => Outcome::Idle,
            Mode::Draw { current, .. } => {
                *current = p;
                Outcome::Preview
            }
            Mode::Move {
                grab_offset, rect, ..
            } => {
                let size = rect.size();
                *rect = Rect::from_min_size(p - *grab_offset, size);
                Outcome::Preview
            }
            Mode::Resize { handle, rect, .. } => {
                *rect = handle.apply(*rect, p);
                Outcome::Preview
            }
        }
    }

    /// Pointer released at display position `p`.
    pub fn release(
        &mut self,
        p: Pos2,
        set: &mut AnnotationSet,
        viewport: &Viewport,
        labels: &mut LabelRegistry,
    ) -> Outcome {
        let mode = std::mem::replace(&mut self.mode, Mode::Select);
        match mode {
            Mode::Select => Outcome::Idle,
            Mode::Draw { anchor, .. } => {
                let band = Rect::from_two_pos(anchor, p);
                if band.width() <= self.min_box_size || band.height() <= self.min_box_size {
                    log::debug!("Discarded {:.0}x{:.0} box below threshold", band.width(), band.height());
                    return Outcome::Discarded;
                }
                self.draw_requested = false;
                let bbox = viewport.display_to_bbox(band);
                if !bbox.is_ordered() {
                    return Outcome::Discarded;
                }
                match self.default_label(labels) {
                    Some(label) => commit_new(set, label, bbox),
                    None => {
                        self.pending = Some(bbox);
                        Outcome::LabelRequested(bbox)
                    }
                }
            }
            Mode::Move { id, rect, .. } | Mode::Resize { id, rect, .. } => {
                let bbox = viewport.display_to_bbox(rect);
                match set.update_bbox(id, bbox) {
                    Ok(()) => {
                        log::info!("Annotation {} now {}", id, bbox);
                        Outcome::Updated(id)
                    }
                    Err(e) => {
                        log::warn!("Edit of annotation {} rejected: {}", id, e);
                        Outcome::Rejected(e.to_string())
                    }
                }
            }
        }
    }

    fn default_label(&self, labels: &LabelRegistry) -> Option<String> {
        if self.use_default_label {
            labels.current().map(str::to_string)
        } else {
            None
        }
    }

    /// Finish the draw gesture suspended on the label chooser.
    pub fn resolve_label(
        &mut self,
        choice: LabelChoice,
        set: &mut AnnotationSet,
        labels: &mut LabelRegistry,
    ) -> Outcome {
        let Some(bbox) = self.pending.take() else {
            return Outcome::Idle;
        };
        match choice {
            LabelChoice::Cancel => Outcome::Discarded,
            LabelChoice::Existing(label) | LabelChoice::New(label) => {
                let label = label.trim().to_string();
                if label.is_empty() {
                    return Outcome::Discarded;
                }
                labels.register(label.as_str());
                commit_new(set, label, bbox)
            }
        }
    }

    /// Cursor affordance for the pointer at `p`; only meaningful when idle.
    pub fn hover(&self, p: Pos2, set: &AnnotationSet, viewport: &Viewport) -> CursorHint {
        if self.mode != Mode::Select {
            return CursorHint::Neutral;
        }
        handles::cursor_for(handles::hit_test(set, viewport, p, self.handle_size).as_ref())
    }
}

fn commit_new(set: &mut AnnotationSet, label: String, bbox: BBox) -> Outcome {
    match add_logged(set, &label, bbox) {
        Ok(id) => Outcome::Added(id),
        Err(e) => Outcome::Rejected(e.to_string()),
    }
}

fn add_logged(set: &mut AnnotationSet, label: &str, bbox: BBox) -> Result<AnnotationId> {
    let id = set.add(label, bbox)?;
    log::info!("Added annotation {} '{}' {}, total: {}", id, label, bbox, set.len());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const IMAGE: (u32, u32) = (400, 300);

    fn setup() -> (InteractionMachine, AnnotationSet, Viewport, LabelRegistry) {
        let mut machine = InteractionMachine::default();
        machine.set_use_default_label(true);
        (
            machine,
            AnnotationSet::new(),
            Viewport::new(1.0, (0, 0)),
            LabelRegistry::from_labels(["person", "car"]),
        )
    }

    #[test]
    fn test_draw_and_commit_with_default_label() {
        let (mut m, mut set, vp, mut labels) = setup();
        m.request_draw(true);
        assert_eq!(m.press(pos2(10.0, 10.0), &set, &vp, IMAGE), Outcome::Preview);
        assert_eq!(m.mode(), ModeKind::Draw);
        m.drag(pos2(60.0, 30.0));
        m.drag(pos2(110.0, 60.0));
        let out = m.release(pos2(110.0, 60.0), &mut set, &vp, &mut labels);
        let Outcome::Added(id) = out else {
            panic!("expected Added, got {:?}", out);
        };
        let a = set.get(id).unwrap();
        assert_eq!(a.bbox, BBox::new(10, 10, 110, 60));
        assert_eq!(a.label, "person");
        assert_eq!(m.mode(), ModeKind::Select);
        assert!(!m.draw_requested());
    }

    #[test]
    fn test_degenerate_draw_discarded() {
        let (mut m, mut set, vp, mut labels) = setup();
        m.request_draw(true);
        m.press(pos2(10.0, 10.0), &set, &vp, IMAGE);
        m.drag(pos2(12.0, 11.0));
        let out = m.release(pos2(12.0, 11.0), &mut set, &vp, &mut labels);
        assert_eq!(out, Outcome::Discarded);
        assert!(set.is_empty());
        assert!(!set.is_dirty());
        assert_eq!(m.mode(), ModeKind::Select);
    }

    #[test]
    fn test_draw_backwards_is_normalized() {
        let (mut m, mut set, vp, mut labels) = setup();
        m.request_draw(true);
        m.press(pos2(110.0, 60.0), &set, &vp, IMAGE);
        let out = m.release(pos2(10.0, 10.0), &mut set, &vp, &mut labels);
        assert!(matches!(out, Outcome::Added(_)));
        assert_eq!(set.at(0).unwrap().bbox, BBox::new(10, 10, 110, 60));
    }

    #[test]
    fn test_draw_under_zoom_maps_to_image_space() {
        let (mut m, mut set, _, mut labels) = setup();
        let vp = Viewport::new(2.0, (20, 10));
        m.request_draw(true);
        m.press(pos2(40.0, 30.0), &set, &vp, IMAGE);
        m.release(pos2(240.0, 130.0), &mut set, &vp, &mut labels);
        assert_eq!(set.at(0).unwrap().bbox, BBox::new(10, 10, 110, 60));
    }

    #[test]
    fn test_press_without_draw_request_deselects() {
        let (mut m, set, vp, _) = setup();
        assert_eq!(m.press(pos2(10.0, 10.0), &set, &vp, IMAGE), Outcome::Selected(None));
        assert_eq!(m.mode(), ModeKind::Select);
    }

    #[test]
    fn test_press_outside_image_does_not_draw() {
        let (mut m, set, vp, _) = setup();
        m.request_draw(true);
        m.press(pos2(500.0, 10.0), &set, &vp, IMAGE);
        assert_eq!(m.mode(), ModeKind::Select);
    }

    #[test]
    fn test_resize_via_se_handle() {
        let (mut m, mut set, vp, mut labels) = setup();
        let id = set.add("person", BBox::new(0, 0, 100, 100)).unwrap();
        assert_eq!(m.press(pos2(100.0, 100.0), &set, &vp, IMAGE), Outcome::Selected(Some(id)));
        assert_eq!(m.mode(), ModeKind::Resize);
        m.drag(pos2(130.0, 110.0));
        m.drag(pos2(150.0, 120.0));
        assert_eq!(m.release(pos2(150.0, 120.0), &mut set, &vp, &mut labels), Outcome::Updated(id));
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(0, 0, 150, 120));
    }

    #[test]
    fn test_resize_across_opposite_edge_swaps() {
        let (mut m, mut set, vp, mut labels) = setup();
        let id = set.add("person", BBox::new(50, 50, 100, 100)).unwrap();
        m.press(pos2(100.0, 75.0), &set, &vp, IMAGE);
        m.drag(pos2(20.0, 75.0));
        m.release(pos2(20.0, 75.0), &mut set, &vp, &mut labels);
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(20, 50, 50, 100));
    }

    #[test]
    fn test_collapsed_resize_is_rejected_and_store_kept() {
        let (mut m, mut set, vp, mut labels) = setup();
        let id = set.add("person", BBox::new(50, 50, 100, 100)).unwrap();
        set.mark_clean();
        m.press(pos2(100.0, 75.0), &set, &vp, IMAGE);
        m.drag(pos2(50.0, 75.0));
        let out = m.release(pos2(50.0, 75.0), &mut set, &vp, &mut labels);
        assert!(matches!(out, Outcome::Rejected(_)));
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(50, 50, 100, 100));
        assert!(!set.is_dirty());
    }

    #[test]
    fn test_move_preserves_size() {
        let (mut m, mut set, vp, mut labels) = setup();
        let id = set.add("car", BBox::new(10, 10, 60, 40)).unwrap();
        assert_eq!(m.press(pos2(30.0, 20.0), &set, &vp, IMAGE), Outcome::Selected(Some(id)));
        assert_eq!(m.mode(), ModeKind::Move);
        m.drag(pos2(80.0, 70.0));
        let (_, live) = m.active_edit().unwrap();
        assert_eq!(live.min, pos2(60.0, 60.0));
        m.release(pos2(80.0, 70.0), &mut set, &vp, &mut labels);
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(60, 60, 110, 90));
    }

    #[test]
    fn test_label_chooser_suspends_and_registers_new_label() {
        let (mut m, mut set, vp, mut labels) = setup();
        m.set_use_default_label(false);
        m.request_draw(true);
        m.press(pos2(10.0, 10.0), &set, &vp, IMAGE);
        let out = m.release(pos2(50.0, 50.0), &mut set, &vp, &mut labels);
        assert_eq!(out, Outcome::LabelRequested(BBox::new(10, 10, 50, 50)));
        assert!(set.is_empty());

        // Input is blocked while the chooser is open.
        assert_eq!(m.press(pos2(20.0, 20.0), &set, &vp, IMAGE), Outcome::Idle);

        let out = m.resolve_label(LabelChoice::New("bike".into()), &mut set, &mut labels);
        assert!(matches!(out, Outcome::Added(_)));
        assert_eq!(set.at(0).unwrap().label, "bike");
        assert_eq!(labels.index_of("bike"), Some(2));
        assert!(m.pending_label().is_none());
    }

    #[test]
    fn test_label_chooser_cancel_discards() {
        let (mut m, mut set, vp, mut labels) = setup();
        m.set_use_default_label(false);
        m.request_draw(true);
        m.press(pos2(10.0, 10.0), &set, &vp, IMAGE);
        m.release(pos2(50.0, 50.0), &mut set, &vp, &mut labels);
        assert_eq!(
            m.resolve_label(LabelChoice::Cancel, &mut set, &mut labels),
            Outcome::Discarded
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_default_mode_without_labels_falls_back_to_chooser() {
        let mut m = InteractionMachine::default();
        m.set_use_default_label(true);
        let mut set = AnnotationSet::new();
        let mut labels = LabelRegistry::new();
        let vp = Viewport::default();
        m.request_draw(true);
        m.press(pos2(0.0, 0.0), &set, &vp, IMAGE);
        let out = m.release(pos2(30.0, 30.0), &mut set, &vp, &mut labels);
        assert!(matches!(out, Outcome::LabelRequested(_)));
    }

    #[test]
    fn test_hover_reports_affordances_only_when_idle() {
        let (mut m, mut set, vp, _) = setup();
        set.add("person", BBox::new(0, 0, 100, 100)).unwrap();
        assert_eq!(m.hover(pos2(50.0, 50.0), &set, &vp), CursorHint::Draggable);
        assert_eq!(m.hover(pos2(100.0, 100.0), &set, &vp), CursorHint::ResizeNwSe);
        m.press(pos2(50.0, 50.0), &set, &vp, IMAGE);
        assert_eq!(m.hover(pos2(50.0, 50.0), &set, &vp), CursorHint::Neutral);
    }
}

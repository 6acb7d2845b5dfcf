// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Resize handles and hit-testing against boxes on the canvas.

use crate::models::annotation::AnnotationId;
use crate::models::store::AnnotationSet;
use crate::util::geometry::Viewport;
use egui::{pos2, Pos2, Rect};

/// One of the eight grab points of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    NW,
    N,
    NE,
    W,
    E,
    SW,
    S,
    SE,
}

/// Corner handles win over edge handles when zones overlap on small boxes.
const PRIORITY: [Handle; 8] = [
    Handle::NW,
    Handle::NE,
    Handle::SW,
    Handle::SE,
    Handle::N,
    Handle::S,
    Handle::W,
    Handle::E,
];

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::NW,
        Handle::N,
        Handle::NE,
        Handle::W,
        Handle::E,
        Handle::SW,
        Handle::S,
        Handle::SE,
    ];

    /// Position of this handle on `rect`.
    pub fn anchor(self, rect: Rect) -> Pos2 {
        let cx = (rect.min.x + rect.max.x) / 2.0;
        let cy = (rect.min.y + rect.max.y) / 2.0;
        match self {
            Handle::NW => rect.min,
            Handle::N => pos2(cx, rect.min.y),
            Handle::NE => pos2(rect.max.x, rect.min.y),
            Handle::W => pos2(rect.min.x, cy),
            Handle::E => pos2(rect.max.x, cy),
            Handle::SW => pos2(rect.min.x, rect.max.y),
            Handle::S => pos2(cx, rect.max.y),
            Handle::SE => rect.max,
        }
    }

    /// Move the edges this handle controls to `p`, then re-order corners.
    pub fn apply(self, rect: Rect, p: Pos2) -> Rect {
        let (mut x1, mut y1, mut x2, mut y2) = (rect.min.x, rect.min.y, rect.max.x, rect.max.y);
        match self {
            Handle::NW => (x1, y1) = (p.x, p.y),
            Handle::NE => (x2, y1) = (p.x, p.y),
            Handle::SW => (x1, y2) = (p.x, p.y),
            Handle::SE => (x2, y2) = (p.x, p.y),
            Handle::N => y1 = p.y,
            Handle::S => y2 = p.y,
            Handle::W => x1 = p.x,
            Handle::E => x2 = p.x,
        }
        Rect::from_min_max(pos2(x1.min(x2), y1.min(y2)), pos2(x1.max(x2), y1.max(y2)))
    }

    pub fn cursor(self) -> CursorHint {
        match self {
            Handle::NW | Handle::SE => CursorHint::ResizeNwSe,
            Handle::NE | Handle::SW => CursorHint::ResizeNeSw,
            Handle::N | Handle::S => CursorHint::ResizeVertical,
            Handle::W | Handle::E => CursorHint::ResizeHorizontal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Handle::NW => "nw",
            Handle::N => "n",
            Handle::NE => "ne",
            Handle::W => "w",
            Handle::E => "e",
            Handle::SW => "sw",
            Handle::S => "s",
            Handle::SE => "se",
        }
    }
}

/// Pointer affordance reported while hovering in select mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Neutral,
    ResizeNwSe,
    ResizeNeSw,
    ResizeHorizontal,
    ResizeVertical,
    Draggable,
}

/// Handle of `rect` within `tolerance` of `p` on both axes, if any.
pub fn handle_at(rect: Rect, p: Pos2, tolerance: f32) -> Option<Handle> {
    PRIORITY.into_iter().find(|h| {
        let a = h.anchor(rect);
        (p.x - a.x).abs() <= tolerance && (p.y - a.y).abs() <= tolerance
    })
}

/// What a pointer position landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitKind {
    Handle(Handle),
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub id: AnnotationId,
    pub rect: Rect,
    pub kind: HitKind,
}

/// Hit-test boxes from the top of the z-order down; only the topmost box
/// under the pointer is eligible.
pub fn hit_test(set: &AnnotationSet, viewport: &Viewport, p: Pos2, tolerance: f32) -> Option<Hit> {
    set.iter().rev().find_map(|annotation| {
        let rect = viewport.bbox_to_display(&annotation.bbox);
        if !rect.expand(tolerance).contains(p) {
            return None;
        }
        let kind = match handle_at(rect, p, tolerance) {
            Some(handle) => HitKind::Handle(handle),
            None if rect.contains(p) => HitKind::Body,
            None => return None,
        };
        Some(Hit {
            id: annotation.id,
            rect,
            kind,
        })
    })
}

/// Cursor affordance for a pointer position.
pub fn cursor_for(hit: Option<&Hit>) -> CursorHint {
    match hit.map(|h| h.kind) {
        Some(HitKind::Handle(handle)) => handle.cursor(),
        Some(HitKind::Body) => CursorHint::Draggable,
        None => CursorHint::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::BBox;

    fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Rect {
        Rect::from_min_max(pos2(x1, y1), pos2(x2, y2))
    }

    #[test]
    fn test_handle_at_corners_and_edges() {
        let r = rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(handle_at(r, pos2(2.0, -3.0), 8.0), Some(Handle::NW));
        assert_eq!(handle_at(r, pos2(100.0, 100.0), 8.0), Some(Handle::SE));
        assert_eq!(handle_at(r, pos2(50.0, 97.0), 8.0), Some(Handle::S));
        assert_eq!(handle_at(r, pos2(104.0, 45.0), 8.0), Some(Handle::E));
        assert_eq!(handle_at(r, pos2(50.0, 50.0), 8.0), None);
    }

    #[test]
    fn test_apply_normalizes_crossed_edges() {
        let r = rect(10.0, 10.0, 50.0, 50.0);
        let out = Handle::W.apply(r, pos2(70.0, 0.0));
        assert_eq!(out, rect(50.0, 10.0, 70.0, 50.0));
        let out = Handle::N.apply(r, pos2(0.0, 30.0));
        assert_eq!(out, rect(10.0, 30.0, 50.0, 50.0));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut set = AnnotationSet::new();
        let _bottom = set.add("a", BBox::new(0, 0, 100, 100)).unwrap();
        let top = set.add("b", BBox::new(40, 40, 140, 140)).unwrap();
        let vp = Viewport::default();
        let hit = hit_test(&set, &vp, pos2(70.0, 70.0), 8.0).unwrap();
        assert_eq!(hit.id, top);
        assert_eq!(hit.kind, HitKind::Body);
    }

    #[test]
    fn test_hit_test_margin_outside_without_handle_misses() {
        let mut set = AnnotationSet::new();
        set.add("a", BBox::new(0, 0, 100, 100)).unwrap();
        let vp = Viewport::default();
        // Outside the box, within tolerance of the left edge, far from any handle.
        assert!(hit_test(&set, &vp, pos2(-4.0, 20.0), 8.0).is_none());
        assert!(hit_test(&set, &vp, pos2(300.0, 300.0), 8.0).is_none());
    }

    #[test]
    fn test_cursor_hints() {
        let mut set = AnnotationSet::new();
        set.add("a", BBox::new(0, 0, 100, 100)).unwrap();
        let vp = Viewport::default();
        let at = |x: f32, y: f32| cursor_for(hit_test(&set, &vp, pos2(x, y), 8.0).as_ref());
        assert_eq!(at(0.0, 0.0), CursorHint::ResizeNwSe);
        assert_eq!(at(100.0, 0.0), CursorHint::ResizeNeSw);
        assert_eq!(at(100.0, 50.0), CursorHint::ResizeHorizontal);
        assert_eq!(at(50.0, 100.0), CursorHint::ResizeVertical);
        assert_eq!(at(30.0, 60.0), CursorHint::Draggable);
        assert_eq!(at(400.0, 60.0), CursorHint::Neutral);
    }
}

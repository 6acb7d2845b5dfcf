// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keeps what is drawn in line with the annotation store.
//!
//! [`ViewSync`] owns the display-space projection of every annotation, the
//! one-line summaries shown in the list, the detail pane of the selected
//! annotation and the single highlight. The store itself knows nothing
//! about any of this; visuals are looked up by [`AnnotationId`].

use crate::models::annotation::{AnnotationId, BBox};
use crate::models::store::AnnotationSet;
use crate::util::geometry::Viewport;
use egui::{Pos2, Rect};
use std::collections::HashMap;

/// On-screen elements of one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub rect: Rect,
    /// Where the label text is drawn (bottom-left of the text).
    pub label_anchor: Pos2,
    pub label: String,
}

/// Contents of the detail pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub id: AnnotationId,
    pub label: String,
    pub bbox: BBox,
    pub width: i32,
    pub height: i32,
    pub area: i64,
}

impl Detail {
    fn of(id: AnnotationId, label: &str, bbox: BBox) -> Self {
        Self {
            id,
            label: label.to_string(),
            bbox,
            width: bbox.width(),
            height: bbox.height(),
            area: bbox.area(),
        }
    }
}

pub fn summary_line(position: usize, label: &str, bbox: &BBox) -> String {
    format!("{}: {} {}", position + 1, label, bbox)
}

fn visual_for(viewport: &Viewport, label: &str, bbox: &BBox) -> Visual {
    let rect = viewport.bbox_to_display(bbox);
    Visual {
        rect,
        label_anchor: rect.left_top(),
        label: label.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct ViewSync {
    visuals: HashMap<AnnotationId, Visual>,
    /// Draw order, bottom to top.
    order: Vec<AnnotationId>,
    summary: Vec<String>,
    highlighted: Option<AnnotationId>,
    detail: Option<Detail>,
}

impl ViewSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute everything, e.g. after a load, clear or zoom.
    pub fn rebuild(&mut self, set: &AnnotationSet, viewport: &Viewport) {
        self.visuals = set
            .iter()
            .map(|a| (a.id, visual_for(viewport, &a.label, &a.bbox)))
            .collect();
        self.order = set.iter().map(|a| a.id).collect();
        self.rebuild_summary(set);
        if self.highlighted.is_some_and(|id| set.get(id).is_none()) {
            self.highlighted = None;
        }
        self.refresh_detail(set);
    }

    /// Bring one annotation up to date after it was added, updated or removed.
    pub fn refresh(&mut self, set: &AnnotationSet, viewport: &Viewport, id: AnnotationId) {
        match set.get(id) {
            Some(a) => {
                self.visuals.insert(id, visual_for(viewport, &a.label, &a.bbox));
                if !self.order.contains(&id) {
                    self.order.push(id);
                }
            }
            None => {
                self.visuals.remove(&id);
                self.order.retain(|o| *o != id);
                if self.highlighted == Some(id) {
                    self.highlighted = None;
                }
            }
        }
        self.rebuild_summary(set);
        if self.highlighted == Some(id) || self.detail.as_ref().is_some_and(|d| d.id == id) {
            self.refresh_detail(set);
        }
    }

    /// Show an uncommitted display rectangle for `id` while it is dragged.
    pub fn preview(&mut self, id: AnnotationId, rect: Rect) {
        if let Some(visual) = self.visuals.get_mut(&id) {
            visual.rect = rect;
            visual.label_anchor = rect.left_top();
        }
    }

    fn rebuild_summary(&mut self, set: &AnnotationSet) {
        self.summary = set
            .iter()
            .enumerate()
            .map(|(i, a)| summary_line(i, &a.label, &a.bbox))
            .collect();
    }

    fn refresh_detail(&mut self, set: &AnnotationSet) {
        self.detail = self
            .highlighted
            .and_then(|id| set.get(id))
            .map(|a| Detail::of(a.id, &a.label, a.bbox));
    }

    /// Make `id` the only highlighted annotation, or clear with `None`.
    /// Returns whether anything changed.
    pub fn highlight(&mut self, set: &AnnotationSet, id: Option<AnnotationId>) -> bool {
        let id = id.filter(|id| set.get(*id).is_some());
        if self.highlighted == id {
            return false;
        }
        self.highlighted = id;
        self.refresh_detail(set);
        true
    }

    /// Apply a click in the summary list.
    ///
    /// Returns the newly selected annotation when the selection changed,
    /// `None` when the row is already the selected one. The list is redrawn
    /// from the highlight every frame, so echoing the current row back is a
    /// no-op rather than a second selection change.
    pub fn select_row(&mut self, set: &AnnotationSet, row: Option<usize>) -> Option<Option<AnnotationId>> {
        if row == self.selected_row(set) {
            return None;
        }
        let id = row.and_then(|r| set.at(r)).map(|a| a.id);
        self.highlight(set, id).then_some(self.highlighted)
    }

    pub fn highlighted(&self) -> Option<AnnotationId> {
        self.highlighted
    }

    pub fn is_highlighted(&self, id: AnnotationId) -> bool {
        self.highlighted == Some(id)
    }

    /// List row of the highlighted annotation.
    pub fn selected_row(&self, set: &AnnotationSet) -> Option<usize> {
        self.highlighted.and_then(|id| set.position(id))
    }

    #[cfg(test)]
    fn visual(&self, id: AnnotationId) -> Option<&Visual> {
        self.visuals.get(&id)
    }

    /// Visuals bottom to top, with their highlight state.
    pub fn visuals(&self) -> impl Iterator<Item = (AnnotationId, &Visual, bool)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.visuals.get(id).map(|v| (*id, v, self.is_highlighted(*id))))
    }

    pub fn summary(&self) -> &[String] {
        &self.summary
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }
}

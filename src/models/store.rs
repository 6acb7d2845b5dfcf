// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory annotation store for the currently loaded image.
//!
//! The store keeps annotations in creation order, hands out stable
//! identities that survive deletions, and tracks whether anything changed
//! since the last successful save.

use super::annotation::{Annotation, AnnotationId, BBox};
use crate::error::{AnnotationError, BoundsViolation, Result};

/// Ordered annotation list for one image, with dirty tracking.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    next_id: u64,
    dirty: bool,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clean set from decoded `(label, bbox)` pairs.
    ///
    /// Identities are assigned fresh in input order. Ordering is not
    /// checked here; loads go through [`AnnotationSet::validate_bounds`].
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, BBox)>,
    {
        let mut set = Self::new();
        for (label, bbox) in entries {
            let id = set.allocate_id();
            set.annotations.push(Annotation::new(id, label, bbox));
        }
        set
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a new annotation and return its identity.
    pub fn add(&mut self, label: impl Into<String>, bbox: BBox) -> Result<AnnotationId> {
        let label = label.into();
        if !bbox.is_ordered() {
            return Err(AnnotationError::InvalidBounds(BoundsViolation {
                position: self.annotations.len(),
                id: None,
                label,
                bbox,
                image_size: None,
            }));
        }
        let id = self.allocate_id();
        log::debug!("Adding annotation {} '{}' {}", id, label, bbox);
        self.annotations.push(Annotation::new(id, label, bbox));
        self.dirty = true;
        Ok(id)
    }

    /// Delete an annotation. Returns it if it existed.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let position = self.position(id)?;
        let removed = self.annotations.remove(position);
        self.dirty = true;
        log::debug!("Removed annotation {} '{}'", id, removed.label);
        Some(removed)
    }

    /// Replace the bounds of an existing annotation in place.
    pub fn update_bbox(&mut self, id: AnnotationId, bbox: BBox) -> Result<()> {
        let position = self.position(id).ok_or_else(|| {
            AnnotationError::InvalidBounds(BoundsViolation {
                position: self.annotations.len(),
                id: Some(id),
                label: String::new(),
                bbox,
                image_size: None,
            })
        })?;
        let annotation = &mut self.annotations[position];
        if !bbox.is_ordered() {
            return Err(AnnotationError::InvalidBounds(BoundsViolation {
                position,
                id: Some(id),
                label: annotation.label.clone(),
                bbox,
                image_size: None,
            }));
        }
        if annotation.bbox != bbox {
            annotation.bbox = bbox;
            self.dirty = true;
        }
        Ok(())
    }

    /// Remove every annotation. Confirmation is the caller's business.
    pub fn clear(&mut self) {
        if !self.annotations.is_empty() {
            self.annotations.clear();
            self.dirty = true;
        }
    }

    /// Check every annotation against `0 <= x1 < x2 <= width` and
    /// `0 <= y1 < y2 <= height`.
    pub fn validate_bounds(&self, image_size: (u32, u32)) -> Vec<BoundsViolation> {
        let (width, height) = image_size;
        self.annotations
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.bbox.fits_within(width, height))
            .map(|(position, a)| BoundsViolation {
                position,
                id: Some(a.id),
                label: a.label.clone(),
                bbox: a.bbox,
                image_size: Some(image_size),
            })
            .collect()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// List position of an annotation, used only for display order.
    pub fn position(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id == id)
    }

    pub fn at(&self, position: usize) -> Option<&Annotation> {
        self.annotations.get(position)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_ids_and_marks_dirty() {
        let mut set = AnnotationSet::new();
        assert!(!set.is_dirty());
        let a = set.add("cat", BBox::new(0, 0, 10, 10)).unwrap();
        let b = set.add("dog", BBox::new(5, 5, 20, 20)).unwrap();
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
        assert!(set.is_dirty());
    }

    #[test]
    fn test_add_rejects_unordered_box() {
        let mut set = AnnotationSet::new();
        let err = set.add("cat", BBox::new(10, 0, 10, 10)).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidBounds(_)));
        assert!(set.is_empty());
        assert!(!set.is_dirty());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut set = AnnotationSet::new();
        let a = set.add("a", BBox::new(0, 0, 10, 10)).unwrap();
        let b = set.add("b", BBox::new(0, 0, 10, 10)).unwrap();
        set.remove(a).unwrap();
        let c = set.add("c", BBox::new(0, 0, 10, 10)).unwrap();
        assert_ne!(c, b);
        assert_ne!(c, a);
        assert_eq!(set.position(b), Some(0));
        assert_eq!(set.position(c), Some(1));
    }

    #[test]
    fn test_update_bbox_rejects_degenerate_and_keeps_old() {
        let mut set = AnnotationSet::new();
        let id = set.add("a", BBox::new(0, 0, 10, 10)).unwrap();
        set.mark_clean();
        assert!(set.update_bbox(id, BBox::new(0, 0, 0, 10)).is_err());
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(0, 0, 10, 10));
        assert!(!set.is_dirty());

        set.update_bbox(id, BBox::new(1, 1, 12, 12)).unwrap();
        assert_eq!(set.get(id).unwrap().bbox, BBox::new(1, 1, 12, 12));
        assert!(set.is_dirty());
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let mut set = AnnotationSet::new();
        assert!(set.update_bbox(AnnotationId(42), BBox::new(0, 0, 1, 1)).is_err());
    }

    #[test]
    fn test_validate_bounds_reports_each_violation() {
        let mut set = AnnotationSet::new();
        set.add("in", BBox::new(0, 0, 200, 100)).unwrap();
        set.add("out", BBox::new(150, 50, 210, 90)).unwrap();
        set.add("neg", BBox::new(-2, 0, 10, 10)).unwrap();
        let violations = set.validate_bounds((200, 100));
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].position, 1);
        assert_eq!(violations[0].label, "out");
        assert_eq!(violations[1].position, 2);
    }

    #[test]
    fn test_clear_and_mark_clean() {
        let mut set = AnnotationSet::from_entries(vec![("a".to_string(), BBox::new(0, 0, 4, 4))]);
        assert!(!set.is_dirty());
        set.clear();
        assert!(set.is_empty());
        assert!(set.is_dirty());
        set.mark_clean();
        set.clear();
        assert!(!set.is_dirty());
    }
}

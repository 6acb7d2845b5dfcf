// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label registry.
//!
//! The ordered set of known class names. Order matters: YOLO class
//! indices are positions in this list.

use crate::error::{AnnotationError, Result};
use std::path::Path;

/// Ordered, duplicate-free list of class names plus the current choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRegistry {
    labels: Vec<String>,
    current: Option<usize>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for label in labels {
            registry.register(label);
        }
        registry.current = if registry.labels.is_empty() { None } else { Some(0) };
        registry
    }

    /// Read a one-label-per-line file. A missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let registry = Self::from_labels(parse_label_lines(&text));
                log::info!("Loaded {} labels from {}", registry.len(), path.display());
                Ok(registry)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Label file {} not found, starting empty", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(AnnotationError::io(path, e)),
        }
    }

    /// Add a label if it is new. Returns its index either way.
    pub fn register(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        let label = label.trim();
        if let Some(index) = self.index_of(label) {
            return index;
        }
        self.labels.push(label.to_string());
        log::info!("Registered new label '{}'", label);
        self.labels.len() - 1
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Class index for export; absent labels are an error, never appended.
    pub fn class_index(&self, label: &str) -> Result<usize> {
        self.index_of(label).ok_or_else(|| AnnotationError::MissingLabel {
            label: label.to_string(),
        })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The label currently chosen in the label combo.
    pub fn current(&self) -> Option<&str> {
        self.current.and_then(|i| self.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn set_current(&mut self, index: usize) {
        if index < self.labels.len() {
            self.current = Some(index);
        }
    }
}

/// Split a class-list file into trimmed, non-empty labels.
pub fn parse_label_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dedupes() {
        let mut reg = LabelRegistry::from_labels(["person", "car"]);
        assert_eq!(reg.register("car"), 1);
        assert_eq!(reg.register("bike"), 2);
        assert_eq!(reg.labels(), &["person", "car", "bike"]);
    }

    #[test]
    fn test_class_index_missing_label() {
        let reg = LabelRegistry::from_labels(["a"]);
        assert_eq!(reg.class_index("a").unwrap(), 0);
        assert!(matches!(
            reg.class_index("zzz"),
            Err(AnnotationError::MissingLabel { .. })
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_current_defaults_to_first() {
        let mut reg = LabelRegistry::from_labels(["a", "b"]);
        assert_eq!(reg.current(), Some("a"));
        reg.set_current(1);
        assert_eq!(reg.current(), Some("b"));
        reg.set_current(9);
        assert_eq!(reg.current(), Some("b"));
        assert_eq!(LabelRegistry::new().current(), None);
    }

    #[test]
    fn test_load_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predefined_classes.txt");
        std::fs::write(&path, "dog\n\ncat \r\ndog\n").unwrap();
        let reg = LabelRegistry::load(&path).unwrap();
        assert_eq!(reg.labels(), &["dog", "cat"]);

        let missing = LabelRegistry::load(&dir.path().join("nope.txt")).unwrap();
        assert!(missing.is_empty());
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration (`boxlabel.yaml`).
//!
//! Every field has a default, so a partial file or no file at all is fine.

use crate::io::serialization::AnnotationFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "boxlabel.yaml";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// External detection program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Program to run; batch inference is unavailable when empty.
    pub program: String,
    /// Extra arguments placed before `--source`.
    pub args: Vec<String>,
    pub confidence: f32,
    pub iou: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            confidence: 0.5,
            iou: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: LogLevel,
    /// Label file read once at startup.
    pub predefined_classes: PathBuf,
    /// Handle hit tolerance in display pixels.
    pub handle_size: f32,
    /// New boxes must be wider and taller than this, in display pixels.
    pub min_box_size: f32,
    pub zoom_step: f32,
    pub default_format: AnnotationFormat,
    pub default_label_mode: bool,
    pub write_dataset_yaml: bool,
    pub detector: DetectorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            predefined_classes: PathBuf::from("predefined_classes.txt"),
            handle_size: 8.0,
            min_box_size: 5.0,
            zoom_step: 0.1,
            default_format: AnnotationFormat::Json,
            default_label_mode: false,
            write_dataset_yaml: true,
            detector: DetectorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults. Parse errors fall back
    /// to defaults and are returned alongside so they can be logged once
    /// the logger is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<anyhow::Error>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "log_level: debug\ndefault_format: yolo\ndetector:\n  program: detect.py\n",
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.default_format, AnnotationFormat::Yolo);
        assert_eq!(config.detector.program, "detect.py");
        assert_eq!(config.detector.confidence, 0.5);
        assert_eq!(config.handle_size, 8.0);
        assert_eq!(config.min_box_size, 5.0);
    }

    #[test]
    fn test_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let (config, err) = AppConfig::load_or_default(&dir.path().join("absent.yaml"));
        assert_eq!(config, AppConfig::default());
        assert!(err.is_none());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "handle_size: [oops").unwrap();
        let (config, err) = AppConfig::load_or_default(&broken);
        assert_eq!(config, AppConfig::default());
        assert!(err.is_some());
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}

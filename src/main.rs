// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! boxlabel - bounding box annotation tool
//!
//! A cross-platform desktop application for drawing labeled bounding boxes
//! on images and saving them as JSON, PASCAL VOC or YOLO annotations.

mod app;
mod config;
mod detect;
mod editor;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::BoxLabelApp;
use config::{AppConfig, CONFIG_FILE};
use std::path::Path;

fn main() -> Result<()> {
    let (config, config_error) = AppConfig::load_or_default(Path::new(CONFIG_FILE));

    // Initialize logging; RUST_LOG overrides the configured level
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    if let Some(e) = config_error {
        log::warn!("Using default configuration: {:#}", e);
    }

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("boxlabel - Bounding Box Annotation"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "boxlabel",
        options,
        Box::new(|_cc| Ok(Box::new(BoxLabelApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}

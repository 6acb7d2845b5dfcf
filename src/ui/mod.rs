// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the boxlabel application.

pub mod canvas;
pub mod dialogs;
pub mod files;
pub mod inference;
pub mod properties;
pub mod sync;
pub mod toolbar;

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for images, annotation files and the confirmation ledger.

pub mod json;
pub mod ledger;
pub mod media;
pub mod serialization;
pub mod voc;
pub mod yolo;

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data model.

pub mod annotation;
pub mod labels;
pub mod project;
pub mod store;

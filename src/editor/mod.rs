// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Canvas editing: hit-testing and the pointer state machine.

pub mod handles;
pub mod interaction;

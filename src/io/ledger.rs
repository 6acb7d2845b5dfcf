// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-folder confirmation ledger (`confirm_example.txt`).
//!
//! One line per image: `<absolute image path> <0|1>`. `1` marks an image
//! whose annotations the operator has confirmed as final.

use crate::error::{AnnotationError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "confirm_example.txt";

#[derive(Debug, Clone)]
pub struct ConfirmLedger {
    path: PathBuf,
    entries: Vec<(PathBuf, bool)>,
}

fn parse_line(line: &str) -> Option<(PathBuf, bool)> {
    let line = line.trim_end();
    let (path, flag) = line.rsplit_once(' ')?;
    if path.is_empty() {
        return None;
    }
    Some((PathBuf::from(path), flag.trim() == "1"))
}

impl ConfirmLedger {
    /// Open the ledger in `folder` for `images`.
    ///
    /// Known flags are kept, new images start unconfirmed and images no
    /// longer present are dropped. The file is (re)written when it is
    /// missing or its image list changed.
    pub fn open(folder: &Path, images: &[PathBuf]) -> Result<Self> {
        let path = folder.join(LEDGER_FILE);
        let known: HashMap<PathBuf, bool> = match std::fs::read_to_string(&path) {
            Ok(text) => text.lines().filter_map(parse_line).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(AnnotationError::io(&path, e)),
        };

        let entries: Vec<(PathBuf, bool)> = images
            .iter()
            .map(|image| (image.clone(), known.get(image).copied().unwrap_or(false)))
            .collect();

        let stale = known.len() != entries.len() || entries.iter().any(|(p, _)| !known.contains_key(p));
        let ledger = Self { path, entries };
        if stale {
            ledger.write()?;
            log::info!("Initialized confirmation ledger {}", ledger.path.display());
        }
        Ok(ledger)
    }

    pub fn is_confirmed(&self, image: &Path) -> bool {
        self.entries.iter().any(|(p, flag)| *flag && p == image)
    }

    pub fn confirmed_count(&self) -> usize {
        self.entries.iter().filter(|(_, flag)| *flag).count()
    }

    /// Mark `image` confirmed and rewrite the file.
    pub fn confirm(&mut self, image: &Path) -> Result<()> {
        match self.entries.iter_mut().find(|(p, _)| p == image) {
            Some((_, flag)) => *flag = true,
            None => self.entries.push((image.to_path_buf(), true)),
        }
        self.write()?;
        log::info!("Confirmed {}", image.display());
        Ok(())
    }

    fn write(&self) -> Result<()> {
        let text: String = self
            .entries
            .iter()
            .map(|(p, flag)| format!("{} {}\n", p.display(), u8::from(*flag)))
            .collect();
        std::fs::write(&self.path, text).map_err(|e| AnnotationError::io(&self.path, e))
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovers app source files and tracks their mtimes (spec §4.8 "Load
//! plan", "App source"). A file's basename minus extension is its module
//! name; `dependencies` config entries refer to this name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct ModuleFile {
    pub module: String,
    pub path: PathBuf,
    pub mtime: SystemTime,
}

pub fn module_name_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Lists every regular, non-dotfile entry directly under `app_dir`. Flat by
/// design — app sources are a single directory, not a package tree.
pub fn scan(app_dir: &Path) -> std::io::Result<Vec<ModuleFile>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(app_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_dotfile = path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(true);
        if is_dotfile {
            continue;
        }
        let Some(module) = module_name_of(&path) else { continue };
        let mtime = entry.metadata()?.modified()?;
        out.push(ModuleFile { module, path, mtime });
    }
    Ok(out)
}

/// Diffs a fresh scan against the previously recorded mtimes: a module is
/// "due" if it's new or its mtime advanced (spec §4.8 "Load plan"). Returns
/// the due set and the mtime table to keep for next time.
pub fn due_modules(scanned: &[ModuleFile], known: &BTreeMap<String, SystemTime>) -> (BTreeSet<String>, BTreeMap<String, SystemTime>) {
    let mut due = BTreeSet::new();
    let mut next = known.clone();
    for file in scanned {
        let is_due = match known.get(&file.module) {
            Some(prev) => *prev < file.mtime,
            None => true,
        };
        if is_due {
            due.insert(file.module.clone());
        }
        next.insert(file.module.clone(), file.mtime);
    }
    (due, next)
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use std::fs;
use std::thread::sleep;
use std::time::Duration;

#[test]
fn scan_finds_files_and_skips_dotfiles() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("porch_light.rs"), "").unwrap();
    fs::write(dir.path().join(".hidden"), "").unwrap();

    let found = scan(dir.path()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].module, "porch_light");
}

#[test]
fn new_file_is_due_and_unchanged_file_is_not() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "").unwrap();
    let scanned = scan(dir.path()).unwrap();

    let (due, known) = due_modules(&scanned, &BTreeMap::new());
    assert!(due.contains("a"));

    let (due_again, _) = due_modules(&scanned, &known);
    assert!(due_again.is_empty());
}

#[test]
fn touched_file_is_due_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.rs");
    fs::write(&path, "").unwrap();
    let first_scan = scan(dir.path()).unwrap();
    let (_, known) = due_modules(&first_scan, &BTreeMap::new());

    sleep(Duration::from_millis(1100));
    fs::write(&path, "changed").unwrap();
    let second_scan = scan(dir.path()).unwrap();
    let (due, _) = due_modules(&second_scan, &known);
    assert!(due.contains("a"));
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests for the `blattwerk` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

fn blattwerk() -> Command {
    Command::cargo_bin("blattwerk").unwrap()
}

fn write_page(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |_, y| {
        if y % 20 < 3 { Rgb([10, 10, 10]) } else { Rgb([240, 238, 230]) }
    })
    .save(&path)
    .unwrap();
    path
}

#[test]
fn build_then_inspect() {
    let dir = TempDir::new().unwrap();
    let first = write_page(dir.path(), "one.png", 120, 160);
    let second = write_page(dir.path(), "two.jpg", 160, 120);
    let annotation = dir.path().join("annotation.json");
    std::fs::write(
        &annotation,
        serde_json::json!({
            "documentType": "Invoice",
            "summary": "Hosting for October",
            "suggestedFilename": "hosting-invoice",
            "extractedData": [{ "label": "Total", "value": "$42.00" }]
        })
        .to_string(),
    )
    .unwrap();

    blattwerk()
        .current_dir(dir.path())
        .arg("build")
        .arg(&first)
        .arg(&second)
        .args(["-q", "low", "-m", "contrast", "-a"])
        .arg(&annotation)
        .assert()
        .success()
        .stdout(predicate::str::contains("hosting-invoice.pdf"))
        .stdout(predicate::str::contains("2 pages"));

    let pdf = dir.path().join("hosting-invoice.pdf");
    assert!(pdf.exists());

    blattwerk()
        .arg("inspect")
        .arg(&pdf)
        .arg("--text")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pages:    2"))
        .stdout(predicate::str::contains("Title:    Invoice"))
        .stdout(predicate::str::contains("Keywords: Total"))
        .stdout(predicate::str::contains("[2] Page 2 of 2"));
}

#[test]
fn explicit_output_and_parallel() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path(), "page.png", 90, 120);
    let output = dir.path().join("out.pdf");

    blattwerk()
        .arg("build")
        .arg(&page)
        .arg(&page)
        .arg(&page)
        .args(["--parallel", "-m", "shadow", "-o"])
        .arg(&output)
        .assert()
        .success();

    blattwerk()
        .arg("inspect")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pages:    3"))
        .stdout(predicate::str::contains("Producer: Blattwerk"));
}

#[test]
fn broken_image_names_the_file() {
    let dir = TempDir::new().unwrap();
    let good = write_page(dir.path(), "good.png", 40, 40);
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not really a png").unwrap();

    blattwerk()
        .current_dir(dir.path())
        .arg("build")
        .arg(&good)
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.png"))
        .stderr(predicate::str::contains("position 1"));

    assert!(!dir.path().join("document.pdf").exists());
}

#[test]
fn unknown_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path(), "page.png", 10, 10);

    blattwerk()
        .arg("build")
        .arg(&page)
        .args(["-m", "sepia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown visual mode"));
}

#[test]
fn inspect_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let page = write_page(dir.path(), "page.png", 10, 10);

    blattwerk()
        .arg("inspect")
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to inspect"));
}

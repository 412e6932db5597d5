use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deck"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn count_files_with_prefix(dir: &Path, prefix: &str, extension: &str) -> usize {
    fs::read_dir(dir)
        .expect("Failed to read directory")
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.starts_with(prefix) && name.ends_with(extension)
        })
        .count()
}

const DECK: &str = r#"---
title: Deck Demo
---

# Deck Presentation

## A sample presentation

---

::: info
Containers render as alerts.
:::

---

# Code Example

```rust
fn main() {
    println!("Hello, world!");
}
```

---

# Tables

| Column 1 | Column 2 |
|----------|----------|
| Cell 1   | Cell 2   |

---

::: center
# Thanks
:::
"#;

#[test]
#[ignore] // Ignore by default as it requires a headless browser
fn test_full_pipeline() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_dir = temp_dir.path();

    let markdown_path = base_dir.join("demo.md");
    let pdf_path = base_dir.join("demo.pdf");
    let slides_dir = base_dir.join("slides");
    fs::write(&markdown_path, DECK).expect("Failed to write markdown file");

    // STEP 1: HTML
    let html_output = run_command(base_dir, &["build", "demo.md"]);
    assert!(
        html_output.status.success(),
        "build command failed: {:?}",
        String::from_utf8_lossy(&html_output.stderr)
    );
    let html_content =
        fs::read_to_string(base_dir.join("demo.html")).expect("Failed to read HTML file");
    assert_eq!(html_content.matches("<section id=").count(), 5);

    // STEP 2: PDF
    let pdf_output = run_command(
        base_dir,
        &["pdf", "demo.md", "-o", pdf_path.to_str().unwrap(), "--landscape"],
    );
    assert!(
        pdf_output.status.success(),
        "pdf command failed: {:?}",
        String::from_utf8_lossy(&pdf_output.stderr)
    );
    let pdf_bytes = fs::read(&pdf_path).expect("Failed to read PDF");
    assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a PDF");

    // STEP 3: images with a custom base name
    let images_output = run_command(
        base_dir,
        &[
            "images",
            "demo.md",
            "-o",
            slides_dir.to_str().unwrap(),
            "--base-name",
            "presentation",
            "--width",
            "1024",
            "--height",
            "576",
        ],
    );
    assert!(
        images_output.status.success(),
        "images command failed: {:?}",
        String::from_utf8_lossy(&images_output.stderr)
    );
    assert_eq!(count_files_with_prefix(&slides_dir, "presentation_", ".png"), 5);
    assert!(slides_dir.join("presentation_0001.png").exists());

    // Temporary HTML files are cleaned up
    let leftovers = count_files_with_prefix(base_dir, ".deck-", ".html");
    assert_eq!(leftovers, 0, "Temporary HTML was left behind");
}

#[test]
#[ignore] // Ignore as it requires headless browser
fn test_pdf_without_local_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_dir = temp_dir.path();
    fs::write(base_dir.join("single.md"), "# Single slide").expect("Failed to write markdown");

    let output = Command::new(env!("CARGO_BIN_EXE_deck"))
        .current_dir(base_dir)
        .args(["pdf", "single.md"])
        .env("DECK_ALLOW_LOCAL_FILES", "false")
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "pdf command failed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(base_dir.join("single.pdf").exists(), "PDF was not created");
}

#[test]
#[ignore] // Ignore as it requires headless browser
fn test_export_images_library() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_dir = temp_dir.path();

    let html_path = base_dir.join("three.html");
    let html_content = r#"<!DOCTYPE html>
<html>
<head><title>Three</title></head>
<body>
<section id="1"><h1>One</h1></section>
<section id="2"><h1>Two</h1></section>
<section id="3"><h1>Three</h1></section>
</body>
</html>"#;
    fs::write(&html_path, html_content).expect("Failed to write HTML file");

    let slides_dir = base_dir.join("out");
    let files = deck::export_images(
        &html_path,
        &slides_dir,
        &deck::ImageOptions {
            format: deck::ImageFormat::Jpeg,
            base_name: "shot".to_string(),
        },
        &deck::BrowserOptions::default(),
    )
    .expect("Failed to export images");

    assert_eq!(files.len(), 3);
    assert_eq!(files[2], slides_dir.join("shot_0003.jpeg"));
}

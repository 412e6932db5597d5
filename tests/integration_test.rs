use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deck"))
        .current_dir(dir)
        .args(args)
        .env_remove("DECK_HTML")
        .env_remove("DECK_RESOURCES")
        .env_remove("DECK_THEME")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_build_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();

    let markdown_path = temp_path.join("talk.md");
    let markdown_content = "# Test Slide\n\nThis is a test slide.\n\n---\n\n::: tip\nUse ==marks==.\n:::\n";
    fs::write(&markdown_path, markdown_content).expect("Failed to write markdown file");

    let css_path = temp_path.join("test.css");
    fs::write(&css_path, "body { font-family: Arial; }").expect("Failed to write CSS file");

    let output_path = temp_path.join("out").join("talk.html");

    let output = run_command(
        temp_path,
        &[
            "build",
            markdown_path.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
            "--css",
            "test.css",
        ],
    );

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(output_path.exists(), "Output file was not created");

    let html_content = fs::read_to_string(&output_path).expect("Failed to read output file");
    assert!(
        html_content.contains("<h1>Test Slide</h1>"),
        "Missing markdown content"
    );
    assert!(
        html_content.contains("<style>body { font-family: Arial; }</style>"),
        "Missing CSS"
    );
    assert!(
        html_content.contains("<section id=\"2\" data-slide=\"2\">"),
        "Missing second slide"
    );
    assert!(
        html_content.contains("<div class=\"alert-title\">Tip</div>"),
        "Missing alert container"
    );
    assert!(html_content.contains("<mark>marks</mark>"), "Missing mark");
}

#[test]
fn test_build_defaults_output_next_to_input() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();
    fs::write(temp_path.join("deck.md"), "# Only").expect("Failed to write markdown file");

    let output = run_command(temp_path, &["build", "deck.md"]);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(temp_path.join("deck.html").exists());
}

#[test]
fn test_build_link_mode() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();
    fs::write(temp_path.join("deck.md"), "# Linked").expect("Failed to write markdown file");
    fs::write(temp_path.join("deck.js"), "console.log(1);").expect("Failed to write JS file");

    let output = run_command(
        temp_path,
        &["build", "deck.md", "--js", "deck.js", "--resources", "link"],
    );
    assert!(output.status.success(), "Command failed: {:?}", output);

    let html_content =
        fs::read_to_string(temp_path.join("deck.html")).expect("Failed to read output file");
    assert!(html_content.contains("deck.js\"></script>"));
    assert!(!html_content.contains("console.log(1);"));
}

#[test]
fn test_build_reads_config_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();
    fs::write(temp_path.join("deck.md"), "::: note\nHello\n:::\n")
        .expect("Failed to write markdown file");
    fs::write(
        temp_path.join("deck.toml"),
        r#"
engine = "plain"
unused_key = "ignored"

[[plugins]]
use = "container"
name = "note"
render = "alert"
"#,
    )
    .expect("Failed to write config file");

    let output = run_command(temp_path, &["build", "deck.md"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let html_content =
        fs::read_to_string(temp_path.join("deck.html")).expect("Failed to read output file");
    assert!(html_content.contains("<div class=\"alert alert-note\">"));
    assert!(!html_content.contains("highlight.min.js"));
}

#[test]
fn test_build_missing_input_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_command(temp_dir.path(), &["build", "missing.md"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Path not found"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();
    fs::write(temp_path.join("deck.toml"), "html = \"maybe\"").expect("Failed to write config");

    let output = run_command(temp_path, &["config"]);

    assert!(!output.status.success());
}

#[test]
fn test_config_command_prints_resolved_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();
    fs::write(temp_path.join("custom.toml"), "timeout_ms = 1500\n").expect("Failed to write config");

    let output = run_command(temp_path, &["--config", "custom.toml", "config"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("timeout_ms = 1500"));
    assert!(stdout.contains("resources = \"embed\""));
}

#[test]
fn test_theme_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let css = run_command(temp_dir.path(), &["theme"]);
    assert!(css.status.success(), "Command failed: {:?}", css);
    assert!(String::from_utf8_lossy(&css.stdout).contains("section h1 {"));

    let toml = run_command(temp_dir.path(), &["theme", "--format", "toml"]);
    assert!(toml.status.success(), "Command failed: {:?}", toml);
    assert!(String::from_utf8_lossy(&toml.stdout).contains("[colors]"));
}

// ABOUTME: Browser export module for the deck-slides application
// ABOUTME: Prints slide documents to PDF and captures per-slide images with headless Chrome

use crate::config::{DeckConfig, PdfOptions};
use crate::errors::{DeckError, Result};
use crate::utils;
use clap::ValueEnum;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the headless browser is launched and how long it may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub browser_path: Option<String>,
    pub timeout_ms: u64,
    pub width: u32,
    pub height: u32,
    /// When false the document is written into `about:blank` instead of
    /// being opened from disk, so `file://` assets cannot load
    pub allow_local_files: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            browser_path: None,
            timeout_ms: 30000, // 30 seconds
            width: 1280,
            height: 720,
            allow_local_files: true,
        }
    }
}

impl BrowserOptions {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            browser_path: config.browser_path.clone(),
            timeout_ms: config.timeout_ms,
            allow_local_files: config.allow_local_files,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    fn capture_format(self) -> CaptureScreenshotFormatOption {
        match self {
            ImageFormat::Png => CaptureScreenshotFormatOption::Png,
            ImageFormat::Jpeg => CaptureScreenshotFormatOption::Jpeg,
        }
    }
}

/// Configuration for per-slide image export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    pub format: ImageFormat,
    pub base_name: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            base_name: "slide".to_string(),
        }
    }
}

/// File name of the n-th (1-based) exported slide image
pub fn slide_file_name(base_name: &str, number: usize, format: ImageFormat) -> String {
    format!("{}_{:04}.{}", base_name, number, format.extension())
}

fn launch_browser(options: &BrowserOptions) -> Result<Browser> {
    let mut launch_options_builder = LaunchOptionsBuilder::default();
    launch_options_builder.window_size(Some((options.width, options.height)));
    launch_options_builder.headless(true);
    if let Some(browser_path) = &options.browser_path {
        launch_options_builder.path(Some(PathBuf::from(browser_path)));
    }

    let launch_options = launch_options_builder
        .build()
        .map_err(|e| DeckError::browser(format!("Failed to build browser options: {:?}", e)))?;

    info!("Launching headless browser");
    Browser::new(launch_options).map_err(|e| {
        let message = format!("Failed to launch browser: {}", e);
        warn!("{}", message);
        DeckError::browser(message)
    })
}

/// Open the document in a fresh tab and wait until its body is there
fn open_document(browser: &Browser, html_path: &Path, options: &BrowserOptions) -> Result<Arc<Tab>> {
    utils::validate_file_exists(html_path)?;

    let tab = browser
        .new_tab()
        .map_err(|e| DeckError::browser(format!("Failed to create new tab: {}", e)))?;

    if options.allow_local_files {
        let html_path_abs = utils::get_absolute_path(html_path)?;
        let url = format!("file://{}", html_path_abs.to_string_lossy());
        info!("Opening page at URL: {}", url);
        tab.navigate_to(&url)
            .map_err(|e| DeckError::browser(format!("Failed to navigate to HTML: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| DeckError::browser(format!("Navigation failed: {}", e)))?;
    } else {
        info!("Local files disabled, writing document into about:blank");
        let html = fs::read_to_string(html_path).map_err(DeckError::FileReadError)?;
        tab.navigate_to("about:blank")
            .map_err(|e| DeckError::browser(format!("Failed to open blank page: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| DeckError::browser(format!("Navigation failed: {}", e)))?;
        let js = format!(
            "document.open(); document.write({}); document.close(); true",
            serde_json::to_string(&html)?
        );
        tab.evaluate(&js, false)
            .map_err(|e| DeckError::browser(format!("Failed to write document: {}", e)))?;
    }

    tab.wait_for_element_with_custom_timeout("body", Duration::from_millis(options.timeout_ms))
        .map_err(|e| DeckError::browser(format!("Failed to wait for body element: {}", e)))?;

    // Give linked stylesheets, fonts and client-side renderers time to settle
    std::thread::sleep(Duration::from_millis(500));

    Ok(tab)
}

fn count_slides(tab: &Tab) -> Result<usize> {
    let result = tab
        .evaluate("document.querySelectorAll('body > section').length", false)
        .map_err(|e| DeckError::browser(format!("Failed to count slides: {}", e)))?;
    Ok(result.value.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
}

/// Print a slide document to PDF
pub fn export_pdf(
    html_path: &Path,
    pdf_path: &Path,
    pdf: &PdfOptions,
    options: &BrowserOptions,
) -> Result<PathBuf> {
    info!("Exporting PDF from HTML: {:?}", html_path);
    utils::ensure_parent_directory_exists(pdf_path)?;

    let browser = launch_browser(options)?;
    let tab = open_document(&browser, html_path, options)?;

    let (width, height) = pdf.format.dimensions();
    let print_options = PrintToPdfOptions {
        landscape: Some(pdf.landscape),
        print_background: Some(pdf.print_background),
        paper_width: Some(width),
        paper_height: Some(height),
        ..Default::default()
    };

    let start_time = Instant::now();
    let data = tab
        .print_to_pdf(Some(print_options))
        .map_err(|e| DeckError::ExportError(format!("Failed to print PDF: {}", e)))?;
    fs::write(pdf_path, &data).map_err(DeckError::FileReadError)?;

    info!(
        "PDF written to {:?} in {:.2} seconds",
        pdf_path,
        start_time.elapsed().as_secs_f64()
    );
    Ok(pdf_path.to_path_buf())
}

/// Capture one image per slide, returning the written files in slide order
pub fn export_images(
    html_path: &Path,
    output_dir: &Path,
    images: &ImageOptions,
    options: &BrowserOptions,
) -> Result<Vec<PathBuf>> {
    info!("Exporting slide images from HTML: {:?}", html_path);
    utils::ensure_directory_exists(output_dir)?;
    utils::validate_directory_writable(output_dir)?;

    let browser = launch_browser(options)?;
    let tab = open_document(&browser, html_path, options)?;

    let slide_count = count_slides(&tab)?;
    if slide_count == 0 {
        warn!("No slides found in {:?}", html_path);
        return Ok(Vec::new());
    }
    info!("Loaded! Ready to render {} slides", slide_count);

    // Pin each slide to the viewport in turn
    let setup = format!(
        r#"(function () {{
            var style = document.createElement('style');
            style.textContent = 'body {{ margin: 0; }} body > section {{ display: none !important; margin: 0 !important; width: {w}px !important; height: {h}px !important; }} body > section.deck-capture {{ display: block !important; }}';
            document.head.appendChild(style);
            return true;
        }})()"#,
        w = options.width,
        h = options.height
    );
    tab.evaluate(&setup, false)
        .map_err(|e| DeckError::browser(format!("Failed to prepare slides: {}", e)))?;

    let start_time = Instant::now();
    let mut output_files = Vec::with_capacity(slide_count);

    for idx in 0..slide_count {
        let show = format!(
            r#"(function () {{
                var slides = document.querySelectorAll('body > section');
                for (var i = 0; i < slides.length; i++) {{
                    slides[i].classList.toggle('deck-capture', i === {idx});
                }}
                return true;
            }})()"#,
            idx = idx
        );
        if let Err(e) = tab.evaluate(&show, false) {
            warn!("Failed to show slide {}: {}", idx + 1, e);
            continue;
        }
        std::thread::sleep(Duration::from_millis(100));

        let output_file = output_dir.join(slide_file_name(&images.base_name, idx + 1, images.format));
        info!("Rendering {:?}", output_file);

        match tab.capture_screenshot(images.format.capture_format(), None, None, true) {
            Ok(data) => {
                fs::write(&output_file, &data).map_err(DeckError::FileReadError)?;
                output_files.push(output_file);
            }
            Err(e) => {
                // Keep going with the remaining slides
                warn!("Failed to capture screenshot for slide {}: {}", idx + 1, e);
            }
        }
    }

    info!(
        "Rendering complete. Captured {} slides in {:.2} seconds",
        output_files.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(output_files)
}

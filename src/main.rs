// ABOUTME: Main entry point for the deck-slides program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use clap::{Args, Parser, Subcommand, ValueEnum};
use deck::config::CONFIG_FILE_NAME;
use deck::{
    BrowserOptions, DeckConfig, DeckError, ImageFormat, ImageOptions, IncludeMode, PdfFormat,
    ResourceFile, ServeConfig,
};
use log::{info, warn, LevelFilter};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./deck.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an HTML slide deck from markdown
    Build(BuildArgs),

    /// Export a deck to PDF
    Pdf(PdfArgs),

    /// Export one image per slide
    Images(ImagesArgs),

    /// Serve a deck with live reload while editing
    Serve(ServeArgs),

    /// Print the resolved theme
    Theme(ThemeArgs),

    /// Print the resolved configuration as TOML
    Config,
}

#[derive(Args)]
struct DeckArgs {
    /// Path to the markdown file
    input: PathBuf,

    /// CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Vec<String>,

    /// JavaScript files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    js: Vec<String>,

    /// How CSS/JS end up in the document
    #[arg(long, value_enum)]
    resources: Option<IncludeMode>,

    /// Theme file (TOML)
    #[arg(long)]
    theme: Option<PathBuf>,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Path to output HTML file (defaults to the input with .html)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PdfArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Path to output PDF file (defaults to the input with .pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Paper size
    #[arg(long, value_enum)]
    format: Option<PdfFormat>,

    /// Print in landscape orientation
    #[arg(long)]
    landscape: bool,
}

#[derive(Args)]
struct ImagesArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Output directory for slide images
    #[arg(short, long, default_value = "slides")]
    output: PathBuf,

    /// Image format
    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    format: ImageFormat,

    /// File name prefix, files are named <base>_0001.<ext>
    #[arg(long, default_value = "slide")]
    base_name: String,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Path to the generated HTML file (defaults to the input with .html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTTP port (overrides dev_server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeFormat {
    Css,
    Toml,
}

#[derive(Args)]
struct ThemeArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ThemeFormat::Css)]
    format: ThemeFormat,
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }
    let _ = builder.try_init();
}

/// Paths given on the command line are relative to the working directory
fn cli_resource(path: &str) -> deck::Result<String> {
    if ResourceFile::new(path).is_remote || Path::new(path).is_absolute() {
        return Ok(path.to_string());
    }
    let cwd = env::current_dir().map_err(DeckError::FileReadError)?;
    Ok(cwd.join(path).to_string_lossy().to_string())
}

fn apply_deck_args(config: &mut DeckConfig, args: &DeckArgs) -> deck::Result<()> {
    for css in &args.css {
        config.css.push(cli_resource(css)?);
    }
    for js in &args.js {
        config.js.push(cli_resource(js)?);
    }
    if let Some(mode) = args.resources {
        config.resources = mode;
    }
    if let Some(theme) = &args.theme {
        config.theme = Some(env::current_dir().map_err(DeckError::FileReadError)?.join(theme));
    }
    Ok(())
}

/// Build the deck into a throwaway HTML file next to the markdown, so
/// relative references keep resolving
fn build_temp_html(input: &Path, config: &DeckConfig) -> deck::Result<PathBuf> {
    let dir = match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let html_path = dir.join(format!(".deck-{}.html", uuid::Uuid::new_v4()));
    let html_content = deck::generate_html(input, config)?;
    deck::write_html_to_file(&html_content, &html_path)?;
    Ok(html_path)
}

fn remove_temp_html(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove temporary file {:?}: {}", path, e);
    }
}

fn run(cli: Cli) -> deck::Result<()> {
    let mut config = DeckConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Build(args)) => {
            apply_deck_args(&mut config, &args.deck)?;
            let output = args
                .output
                .unwrap_or_else(|| args.deck.input.with_extension("html"));

            let html_content = deck::generate_html(&args.deck.input, &config)?;
            deck::write_html_to_file(&html_content, &output)?;

            println!("HTML generated successfully: {:?}", output);
            Ok(())
        }
        Some(Commands::Pdf(args)) => {
            apply_deck_args(&mut config, &args.deck)?;
            if let Some(format) = args.format {
                config.pdf.format = format;
            }
            if args.landscape {
                config.pdf.landscape = true;
            }
            let output = args
                .output
                .unwrap_or_else(|| args.deck.input.with_extension("pdf"));

            let html_path = build_temp_html(&args.deck.input, &config)?;
            let result = deck::export_pdf(
                &html_path,
                &output,
                &config.pdf,
                &BrowserOptions::from_config(&config),
            );
            remove_temp_html(&html_path);
            result?;

            println!("PDF generated successfully: {:?}", output);
            Ok(())
        }
        Some(Commands::Images(args)) => {
            apply_deck_args(&mut config, &args.deck)?;
            let browser = BrowserOptions {
                width: args.width,
                height: args.height,
                ..BrowserOptions::from_config(&config)
            };
            let images = ImageOptions {
                format: args.format,
                base_name: args.base_name,
            };

            let html_path = build_temp_html(&args.deck.input, &config)?;
            let result = deck::export_images(&html_path, &args.output, &images, &browser);
            remove_temp_html(&html_path);
            let files = result?;

            println!("Generated {} slide images in {:?}", files.len(), args.output);
            Ok(())
        }
        Some(Commands::Serve(args)) => {
            let html_output = args
                .output
                .clone()
                .unwrap_or_else(|| args.deck.input.with_extension("html"));
            let config_path = cli
                .config
                .clone()
                .or_else(|| Some(PathBuf::from(CONFIG_FILE_NAME)).filter(|path| path.exists()));
            info!("Starting dev server for {:?}", args.deck.input);

            deck::serve(
                ServeConfig {
                    markdown_path: args.deck.input.clone(),
                    html_output,
                    port: args.port,
                    config_path,
                },
                || {
                    let mut config = DeckConfig::load(cli.config.as_deref())?;
                    apply_deck_args(&mut config, &args.deck)?;
                    Ok(config)
                },
            )
        }
        Some(Commands::Theme(args)) => {
            let theme = config.load_theme()?;
            match args.format {
                ThemeFormat::Css => print!("{}", theme.to_css()),
                ThemeFormat::Toml => print!("{}", theme.to_toml()?),
            }
            Ok(())
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ABOUTME: Dev server module for previewing decks while editing
// ABOUTME: Serves the generated HTML, watches sources and live-reloads browsers over WebSocket

use log::{debug, error, info, warn};
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;
use parking_lot::Mutex;
use tiny_http::{Header, Response, Server, StatusCode};
use tungstenite::{Message, WebSocket};

use crate::config::DeckConfig;
use crate::engine::Engine;
use crate::errors::{DeckError, Result};
use crate::html;
use crate::plugins::plugin_from_spec;
use crate::utils;

/// Message sent to connected browsers after a rebuild
pub const RELOAD_MESSAGE: &str = "reload";

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Configuration for the dev server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Path to the markdown file to watch
    pub markdown_path: PathBuf,

    /// Output HTML file path; its directory is what gets served
    pub html_output: PathBuf,

    /// Overrides `dev_server.port`
    pub port: Option<u16>,

    /// Configuration file to reload on change
    pub config_path: Option<PathBuf>,
}

/// The deck engine with the dev server's own markdown plugins on top
pub fn dev_engine(deck: &DeckConfig) -> Result<Engine> {
    let mut engine = deck.engine()?;
    for spec in &deck.dev_server.markdown.plugins {
        debug!("Applying dev server plugin '{}'", spec.plugin);
        engine = engine.use_plugin(plugin_from_spec(spec)?)?;
    }
    Ok(engine)
}

/// Script injected into served pages: client options and live reload
pub fn client_script(deck: &DeckConfig, reload_port: Option<u16>) -> Result<String> {
    let mut script = format!(
        "window.__DECK_CLIENT__ = {};\n",
        serde_json::to_string(&deck.dev_server.client)?
    );
    if let Some(port) = reload_port {
        script.push_str(&format!(
            r#"(function () {{
  var ws = new WebSocket('ws://' + (location.hostname || 'localhost') + ':{}');
  ws.onmessage = function (e) {{ if (e.data === '{}') location.reload(); }};
}})();"#,
            port, RELOAD_MESSAGE
        ));
    }
    Ok(script)
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Map a request URL onto a file below `root`, refusing anything that
/// would escape it
pub fn resolve_request_path(root: &Path, index: &str, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let clean = path.trim_start_matches('/');
    if clean.is_empty() {
        return Some(root.join(index));
    }

    let relative = Path::new(clean);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Start a simple HTTP server for the output directory
fn start_server(html_path: &Path, port: u16) -> Result<()> {
    let server = Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| DeckError::WatchError(format!("Failed to start HTTP server: {}", e)))?;

    let root = match html_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let index = html_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    thread::spawn(move || {
        info!("HTTP server listening on http://localhost:{}", port);

        for request in server.incoming_requests() {
            let file_path = resolve_request_path(&root, &index, request.url());
            debug!("Request for {:?} -> {:?}", request.url(), file_path);

            let response = match file_path {
                Some(path) if path.is_file() => match fs::read(&path) {
                    Ok(content) => {
                        let mut response = Response::from_data(content);
                        if let Ok(header) =
                            Header::from_bytes(&b"Content-Type"[..], content_type(&path).as_bytes())
                        {
                            response = response.with_header(header);
                        }
                        response
                    }
                    Err(e) => {
                        error!("Failed to read file {:?}: {}", path, e);
                        Response::from_string(format!("Failed to read file: {}", e))
                            .with_status_code(StatusCode(500))
                    }
                },
                Some(_) => Response::from_string("404 Not Found")
                    .with_status_code(StatusCode(404)),
                None => Response::from_string("403 Forbidden")
                    .with_status_code(StatusCode(403)),
            };

            if let Err(e) = request.respond(response) {
                error!("Failed to send response: {}", e);
            }
        }
    });

    Ok(())
}

/// Accept live-reload WebSocket connections in the background
fn start_reload_server(port: u16) -> Result<Clients> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .map_err(|e| DeckError::WatchError(format!("Failed to bind reload port {}: {}", port, e)))?;
    let clients: Clients = Arc::new(Mutex::new(Vec::new()));
    let accepted = Arc::clone(&clients);

    thread::spawn(move || {
        info!("Live reload listening on ws://localhost:{}", port);
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Reload connection failed: {}", e);
                    continue;
                }
            };
            match tungstenite::accept(stream) {
                Ok(socket) => {
                    debug!("Live reload client connected");
                    accepted.lock().push(socket);
                }
                Err(e) => warn!("WebSocket handshake failed: {}", e),
            }
        }
    });

    Ok(clients)
}

/// Tell every connected browser to reload, forgetting the ones that left
fn broadcast_reload(clients: &Clients) {
    let mut clients = clients.lock();
    let before = clients.len();
    clients.retain_mut(|socket| socket.send(Message::Text(RELOAD_MESSAGE.to_string())).is_ok());
    debug!(
        "Reload sent to {} clients ({} dropped)",
        clients.len(),
        before - clients.len()
    );
}

/// Everything derived from the deck configuration for one generation of builds
struct DevBuild {
    deck: DeckConfig,
    engine: Engine,
    script: String,
}

impl DevBuild {
    fn new(deck: DeckConfig, reload_port: Option<u16>) -> Result<Self> {
        let engine = dev_engine(&deck)?;
        let script = client_script(&deck, reload_port)?;
        Ok(Self {
            deck,
            engine,
            script,
        })
    }

    fn regenerate(&self, config: &ServeConfig) -> Result<()> {
        regenerate(config, &self.deck, &self.engine, &self.script)
    }
}

/// Build the deck, serve it, and rebuild on every relevant change.
///
/// `load` produces the deck configuration; it runs again whenever the
/// configuration file changes, so plugin and engine edits apply without a
/// restart. Ports and the debounce interval are fixed at startup.
pub fn serve<L>(config: ServeConfig, load: L) -> Result<()>
where
    L: Fn() -> Result<DeckConfig>,
{
    utils::validate_file_exists(&config.markdown_path)?;
    utils::ensure_parent_directory_exists(&config.html_output)?;

    let deck = load()?;
    let port = config.port.unwrap_or(deck.dev_server.port);
    let reload_port = if deck.dev_server.live_reload {
        Some(match config.port {
            Some(port) if deck.dev_server.reload_port.is_none() => port.saturating_add(1),
            _ => deck.dev_server.reload_port(),
        })
    } else {
        None
    };
    let debounce = Duration::from_millis(deck.dev_server.debounce_ms);
    let mut build = DevBuild::new(deck, reload_port)?;

    // Initial build
    build.regenerate(&config)?;

    start_server(&config.html_output, port)?;
    println!("Serving deck on http://localhost:{}", port);
    let clients = match reload_port {
        Some(reload_port) => Some(start_reload_server(reload_port)?),
        None => None,
    };

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(debounce, None, tx)
        .map_err(|e| DeckError::WatchError(format!("Failed to create file watcher: {}", e)))?;

    let watch_path = match config.markdown_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let abs_watch_path = utils::get_absolute_path(watch_path)?;
    debug!("Watching absolute path: {:?}", abs_watch_path);

    debouncer
        .watcher()
        .watch(&abs_watch_path, RecursiveMode::Recursive)
        .map_err(|e| {
            DeckError::WatchError(format!(
                "Failed to start watching directory {:?}: {}",
                abs_watch_path, e
            ))
        })?;

    println!(
        "Watching for changes in {:?} (Press Ctrl+C to stop)",
        watch_path
    );

    let mut watched = WatchedFiles::new(&config, &build.deck);
    let mut last_processed = Instant::now();

    for result in rx {
        match result {
            Ok(events) => {
                let paths: Vec<&PathBuf> = events.iter().flat_map(|event| event.paths.iter()).collect();
                let config_changed = paths.iter().any(|path| watched.is_config(path));
                let relevant = config_changed || paths.iter().any(|path| watched.is_relevant(path));

                let now = Instant::now();
                if !relevant || now.duration_since(last_processed) <= debounce {
                    continue;
                }

                if config_changed {
                    info!("Configuration changed, reloading");
                    match load().and_then(|deck| DevBuild::new(deck, reload_port)) {
                        Ok(reloaded) => {
                            build = reloaded;
                            watched = WatchedFiles::new(&config, &build.deck);
                        }
                        Err(e) => {
                            error!("Keeping previous configuration: {}", e);
                        }
                    }
                }

                match build.regenerate(&config) {
                    Ok(()) => {
                        last_processed = now;
                        if let Some(clients) = &clients {
                            broadcast_reload(clients);
                        }
                    }
                    Err(e) => error!("Failed to rebuild deck: {}", e),
                }
            }
            Err(errors) => {
                for e in errors {
                    error!("Watch error: {:?}", e);
                }
            }
        }
    }

    Ok(())
}

/// Files whose changes trigger a rebuild
pub struct WatchedFiles {
    markdown: PathBuf,
    html_output: Option<PathBuf>,
    config: Option<PathBuf>,
    resources: Vec<PathBuf>,
}

impl WatchedFiles {
    pub fn new(config: &ServeConfig, deck: &DeckConfig) -> Self {
        let absolute = |path: &Path| utils::get_absolute_path(path).unwrap_or_else(|_| path.to_path_buf());

        let mut resources: Vec<PathBuf> = deck
            .css_resources()
            .into_iter()
            .chain(deck.js_resources())
            .filter(|resource| !resource.is_remote)
            .map(|resource| absolute(Path::new(&resource.path)))
            .collect();
        if let Some(theme) = &deck.theme {
            resources.push(absolute(&deck.resolve_path(theme)));
        }

        Self {
            markdown: absolute(&config.markdown_path),
            html_output: utils::get_absolute_path(&config.html_output).ok(),
            config: config.config_path.as_deref().map(absolute),
            resources,
        }
    }

    /// Whether the path is the configuration file the deck was loaded from
    pub fn is_config(&self, path: &Path) -> bool {
        self.config.is_some()
            && utils::get_absolute_path(path).ok().as_ref() == self.config.as_ref()
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let path_abs = match utils::get_absolute_path(path) {
            Ok(p) => p,
            Err(_) => return false,
        };

        // Our own output must not retrigger a build
        if self.html_output.as_ref() == Some(&path_abs) {
            return false;
        }
        if path_abs == self.markdown || self.resources.contains(&path_abs) {
            debug!("Detected change in {:?}", path);
            return true;
        }

        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                matches!(ext.as_str(), "md" | "css" | "js")
            }
            None => false,
        }
    }
}

fn regenerate(config: &ServeConfig, deck: &DeckConfig, engine: &Engine, script: &str) -> Result<()> {
    info!("Rebuilding deck...");
    let html_content =
        html::generate_html_with_engine(&config.markdown_path, deck, engine, Some(script))?;
    html::write_html_to_file(&html_content, &config.html_output)?;
    info!("HTML regenerated: {:?}", config.html_output);
    Ok(())
}

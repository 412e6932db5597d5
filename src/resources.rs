// ABOUTME: Resource handling for the deck-slides application
// ABOUTME: Links or embeds local and remote stylesheets and scripts

use crate::errors::{DeckError, Result};
use clap::ValueEnum;
use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Kind of tag a resource is included with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

/// How resources end up in the generated document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    /// Reference every resource by path or URL
    Link,
    /// Inline local files, link remote ones
    #[default]
    Embed,
    /// Inline everything, fetching remote resources
    Bundle,
}

/// A stylesheet or script, either a local path or a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub path: String,
    pub is_remote: bool,
}

impl ResourceFile {
    pub fn new(path: &str) -> Self {
        let is_remote = Url::parse(path)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        Self {
            path: path.to_string(),
            is_remote,
        }
    }

    /// Get the content of the resource, fetching remote ones
    pub fn content(&self) -> Result<String> {
        if self.is_remote {
            self.fetch_remote_content()
        } else {
            self.read_local_content()
        }
    }

    /// Fetch content from a remote URL, retrying with backoff
    fn fetch_remote_content(&self) -> Result<String> {
        info!("Fetching remote resource: {}", self.path);

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(DeckError::FetchError)?;

        let mut retry_delay = 1000;
        let mut last_error = None;

        for attempt in 1..=3 {
            match client.get(&self.path).send() {
                Ok(response) if response.status().is_success() => {
                    return response.text().map_err(DeckError::FetchError);
                }
                Ok(response) => {
                    last_error = Some(DeckError::ValidationError(format!(
                        "HTTP error: {}",
                        response.status()
                    )));
                }
                Err(e) => last_error = Some(DeckError::FetchError(e)),
            }

            if attempt < 3 {
                info!(
                    "Fetch attempt {} failed, retrying in {} ms",
                    attempt, retry_delay
                );
                std::thread::sleep(Duration::from_millis(retry_delay));
                retry_delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DeckError::ValidationError("Unknown error fetching resource".to_string())
        }))
    }

    fn read_local_content(&self) -> Result<String> {
        info!("Reading local resource: {}", self.path);
        let path = Path::new(&self.path);
        if !path.exists() {
            return Err(DeckError::PathNotFoundError(path.to_path_buf()));
        }
        fs::read_to_string(path).map_err(DeckError::FileReadError)
    }

    fn link_tag(&self, kind: ResourceKind) -> String {
        match kind {
            ResourceKind::Stylesheet => format!(r#"<link rel="stylesheet" href="{}">"#, self.path),
            ResourceKind::Script => format!(r#"<script src="{}"></script>"#, self.path),
        }
    }

    /// HTML tag for the resource under the given include mode. A remote
    /// resource that cannot be fetched for bundling falls back to a link.
    pub fn tag(&self, kind: ResourceKind, mode: IncludeMode) -> Result<String> {
        let inline = match mode {
            IncludeMode::Link => false,
            IncludeMode::Embed => !self.is_remote,
            IncludeMode::Bundle => true,
        };

        if !inline {
            if !self.is_remote {
                // Linking still requires the file to be there
                let path = Path::new(&self.path);
                if !path.exists() {
                    return Err(DeckError::PathNotFoundError(path.to_path_buf()));
                }
            }
            return Ok(self.link_tag(kind));
        }

        let content = match self.content() {
            Ok(content) => content,
            Err(e) if self.is_remote => {
                warn!("Could not bundle {}, linking instead: {}", self.path, e);
                return Ok(self.link_tag(kind));
            }
            Err(e) => return Err(e),
        };

        Ok(match kind {
            ResourceKind::Stylesheet => format!("<style>{}</style>", content),
            ResourceKind::Script => format!("<script>{}</script>", content),
        })
    }
}

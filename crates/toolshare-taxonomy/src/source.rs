//! Where taxonomy text comes from.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use toolshare_core::{Error, Result};

/// A taxonomy source: local file, remote URL, or text already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    File(PathBuf),
    Url(String),
    Inline(String),
}

impl ImportSource {
    /// `http://` and `https://` locations are URLs; anything else is a path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    /// Read the whole source as UTF-8 text.
    pub async fn fetch(&self, client: &reqwest::Client, timeout: Duration) -> Result<String> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                debug!(
                    subsystem = "taxonomy",
                    component = "import",
                    op = "fetch",
                    source = %path.display(),
                    bytes = bytes.len(),
                    "Read taxonomy file"
                );
                decode(bytes, &path.display().to_string())
            }
            Self::Url(url) => {
                let response = client.get(url).timeout(timeout).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Request(format!("GET {} returned {}", url, status)));
                }
                let bytes = response.bytes().await?;
                debug!(
                    subsystem = "taxonomy",
                    component = "import",
                    op = "fetch",
                    source = %url,
                    bytes = bytes.len(),
                    "Downloaded taxonomy"
                );
                decode(bytes.to_vec(), url)
            }
        }
    }
}

impl std::fmt::Display for ImportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::Inline(text) => write!(f, "<inline, {} bytes>", text.len()),
        }
    }
}

fn decode(bytes: Vec<u8>, origin: &str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| Error::Import(format!("{} is not valid UTF-8: {}", origin, e.utf8_error())))
}

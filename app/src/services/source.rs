//! Where a document comes from: a local file or an HTTP(S) URL.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    /// `http://` and `https://` are fetched, anything else is a path.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// Read the whole document into memory.
    pub async fn load(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = match self {
            Self::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(FETCH_TIMEOUT)
                    .build()
                    .context("failed to build HTTP client")?;
                let response = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("failed to fetch {url}"))?
                    .error_for_status()
                    .with_context(|| format!("server rejected {url}"))?;
                response
                    .bytes()
                    .await
                    .with_context(|| format!("failed to read body of {url}"))?
                    .to_vec()
            }
            Self::Path(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        };
        tracing::info!(source = %self, bytes = bytes.len(), "Loaded document");
        Ok(bytes)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

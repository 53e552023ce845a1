use crate::core::error::{Error, Result};
use crate::indexing::registry::normalize_id;
use async_trait::async_trait;
use url::Url;

/// How the current page was opened, read once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Served over a network scheme; sibling pages resolve against `base`
    Networked { base: Url },
    /// Opened straight from disk; sibling fetches are assumed to be blocked
    LocalFile,
}

impl Environment {
    pub fn detect(page_url: &Url) -> Self {
        if page_url.scheme() == "file" {
            Environment::LocalFile
        } else {
            Environment::Networked {
                base: page_url.clone(),
            }
        }
    }

    pub fn is_local_file(&self) -> bool {
        matches!(self, Environment::LocalFile)
    }
}

/// Retrieves the raw HTML of a sibling document by its relative id
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<String>;
}

/// Plain GET against `base.join(id)`; no per-request timeout
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, id: &str) -> Result<String> {
        let url = self.base.join(id)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{}: HTTP {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))
    }
}

/// The page the reader currently has open
#[derive(Debug, Clone)]
pub struct CurrentPage {
    pub url: Url,
    pub id: String,
    pub html: String,
}

impl CurrentPage {
    pub fn new(url: Url, html: String) -> Self {
        let id = page_id(&url);
        Self { url, id, html }
    }

    /// Read the page behind `url`, from disk for `file:` and over HTTP otherwise
    pub async fn open(url: Url) -> Result<Self> {
        let html = if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| Error::Config(format!("Not a local file URL: {}", url)))?;
            tokio::fs::read_to_string(&path).await?
        } else {
            HttpFetcher::new(url.clone()).fetch(url.as_str()).await?
        };
        Ok(Self::new(url, html))
    }

    pub fn environment(&self) -> Environment {
        Environment::detect(&self.url)
    }
}

/// Parse a CLI page argument: a URL, or a filesystem path turned into a `file:` URL
pub fn parse_page_url(raw: &str) -> Result<Url> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = std::fs::canonicalize(raw)?;
            Url::from_file_path(&path)
                .map_err(|_| Error::Config(format!("Cannot build file URL for {}", path.display())))
        }
        Err(e) => Err(e.into()),
    }
}

/// Registry id of a page URL: its last path segment
pub fn page_id(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    normalize_id(last)
}

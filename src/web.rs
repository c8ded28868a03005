//! Remote files fetched over HTTP.
//!
//! The readiness verifier only needs to know that a URL answers a `HEAD`
//! request with a 2xx status; the build downloads the file with `GET` into
//! the source's download root before copying it like any other file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use url::Url;

use crate::defaults::DEFAULT_HTTP_TIMEOUT;
use crate::error::{Error, Result};

/// Trait for remote file access - allows mocking in tests
pub trait RemoteFetcher: Send + Sync {
    /// Lightweight existence probe. `Ok(())` means the URL answered 2xx.
    fn probe(&self, url: &str) -> Result<()>;

    /// Fetch the URL's body.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// `RemoteFetcher` backed by a blocking `reqwest` client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aggregit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self> {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

fn network_error(url: &str, err: impl std::fmt::Display) -> Error {
    Error::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl RemoteFetcher for HttpFetcher {
    fn probe(&self, url: &str) -> Result<()> {
        debug!("HEAD {}", url);
        let response = self.client.head(url).send().map_err(|e| network_error(url, e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(network_error(url, format!("HTTP {}", status)))
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| network_error(url, e))?;
        let body = response.bytes().map_err(|e| network_error(url, e))?;
        Ok(body.to_vec())
    }
}

/// The file name a downloaded URL is stored under: its last non-empty path
/// segment, or `index` for a bare host.
pub fn file_name_for(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("index");
    Ok(name.to_string())
}

/// Download `url` into `download_root`, replacing any previous copy.
///
/// Returns the path of the written file.
pub fn download(fetcher: &dyn RemoteFetcher, url: &str, download_root: &Path) -> Result<PathBuf> {
    let body = fetcher.fetch(url)?;
    fs::create_dir_all(download_root).map_err(|e| Error::fs(download_root, e))?;
    let target = download_root.join(file_name_for(url)?);
    fs::write(&target, body).map_err(|e| Error::fs(&target, e))?;
    Ok(target)
}

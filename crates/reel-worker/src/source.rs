//! Source and music fetching.
//!
//! `http(s)` references are streamed to disk with reqwest; anything else is
//! treated as an object storage key.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use reel_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};

/// Whether `source` is fetched over HTTP rather than from object storage.
pub fn is_remote_url(source: &str) -> bool {
    url::Url::parse(source)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Downloads sources into a job's work directory.
#[derive(Clone)]
pub struct SourceFetcher {
    http: Client,
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(http: Client, store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self {
            http,
            store,
            timeout,
        }
    }

    /// Fetch `source` into `dest`, returning the number of bytes written.
    pub async fn fetch(&self, source: &str, dest: &Path) -> WorkerResult<u64> {
        let fetch = async {
            if is_remote_url(source) {
                self.fetch_http(source, dest).await
            } else {
                self.fetch_object(source, dest).await
            }
        };

        let written = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| {
                WorkerError::download_failed(format!(
                    "{} timed out after {}s",
                    source,
                    self.timeout.as_secs()
                ))
            })??;

        if written == 0 {
            return Err(WorkerError::download_failed(format!("{} is empty", source)));
        }
        debug!(source, bytes = written, dest = %dest.display(), "Fetched source");
        Ok(written)
    }

    async fn fetch_http(&self, url: &str, dest: &Path) -> WorkerResult<u64> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WorkerError::download_failed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(WorkerError::download_failed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WorkerError::download_failed(format!("{}: {}", url, e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn fetch_object(&self, key: &str, dest: &Path) -> WorkerResult<u64> {
        let bytes = self.store.get(key).await.map_err(|e| {
            if e.is_not_found() {
                WorkerError::download_failed(format!("no object at {}", key))
            } else {
                WorkerError::Storage(e)
            }
        })?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

//! Image acquisition: fetch the bytes behind an image URL.
//!
//! Fetching sits behind the [`ImageFetcher`] trait so the renderer can be
//! driven by an in-memory source in tests. The production implementation,
//! [`HttpImageFetcher`], issues one GET per image with a bounded timeout and
//! maps every failure onto a distinct [`ImageFailure`] so the placeholder
//! text tells the reader what went wrong.

use crate::error::ImageFailure;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Source of image bytes, keyed by URL.
pub trait ImageFetcher: Sync {
    /// Fetch the raw bytes behind `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ImageFailure>> + Send;
}

/// Fetches images over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("md2office/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> ImageFailure {
        if e.is_timeout() {
            ImageFailure::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            ImageFailure::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageFailure> {
        info!("Downloading image from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        if !response.status().is_success() {
            return Err(ImageFailure::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(url, e))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_failure() {
        // Port 9 (discard) on loopback is closed on any sane test machine.
        let fetcher = HttpImageFetcher::new(2).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/a.png").await.unwrap_err();
        assert!(matches!(err, ImageFailure::Fetch { .. }), "got: {err:?}");
        assert_eq!(err.url(), "http://127.0.0.1:9/a.png");
    }

    #[tokio::test]
    async fn malformed_url_is_a_fetch_failure() {
        let fetcher = HttpImageFetcher::new(2).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ImageFailure::Fetch { .. }));
    }
}

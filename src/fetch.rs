use crate::error::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Downloads images from caller-supplied URLs.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("imgclass/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }

    /// Fetches the body of `url`. Non-2xx responses and bodies over the
    /// size limit are download failures.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(self.too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }

    fn too_large(&self) -> Error {
        Error::DownloadFailed(format!("response body exceeds {} bytes", self.max_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn fetcher(max_bytes: usize) -> ImageFetcher {
        ImageFetcher::new(&FetchSettings {
            timeout: Duration::from_secs(5),
            max_bytes,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn downloads_body() {
        let base = test_support::spawn_image_host().await;

        let body = fetcher(1 << 20).fetch(&format!("{}/cat.png", base)).await.unwrap();
        assert_eq!(body, test_support::png_bytes(48, 48));
    }

    #[tokio::test]
    async fn not_found_is_a_download_failure() {
        let base = test_support::spawn_image_host().await;

        let err = fetcher(1 << 20)
            .fetch(&format!("{}/missing.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DownloadFailed(ref msg) if msg.contains("404")));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let base = test_support::spawn_image_host().await;

        let err = fetcher(1024).fetch(&format!("{}/big.bin", base)).await.unwrap_err();
        assert!(matches!(err, Error::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn slow_host_times_out() {
        let base = test_support::spawn_image_host().await;
        let fetcher = ImageFetcher::new(&FetchSettings {
            timeout: Duration::from_millis(200),
            max_bytes: 1 << 20,
        })
        .unwrap();

        let err = fetcher.fetch(&format!("{}/slow.png", base)).await.unwrap_err();
        assert!(matches!(err, Error::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn malformed_url_is_a_download_failure() {
        let err = fetcher(1024).fetch("not a url").await.unwrap_err();
        assert!(matches!(err, Error::DownloadFailed(_)));
    }
}

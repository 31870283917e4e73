use std::time::Duration;

use futures_util::StreamExt;
use url::Url;

use crate::types::map_reqwest_error;
use crate::{FailureKind, ScrapeError};

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
            user_agent: concat!("scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Turns a URL into page HTML. The search source does not care how.
#[async_trait::async_trait]
pub trait PageLoader: Send + Sync {
    /// Called once before the first `load` of a run.
    async fn open(&self) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn load(&self, url: &Url) -> Result<String, ScrapeError>;

    /// Called once after the last `load` of a run, even if `open` failed.
    async fn close(&self) {}
}

#[derive(Debug, Clone)]
pub struct HttpPageLoader {
    client: reqwest::Client,
    settings: LoaderSettings,
}

impl HttpPageLoader {
    pub fn new(settings: LoaderSettings) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| ScrapeError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[async_trait::async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &Url) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{status} for {url}"),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(ScrapeError::new(
                    FailureKind::Parse,
                    format!("page too large ({content_len} bytes)"),
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Err(ScrapeError::new(
                    FailureKind::Parse,
                    format!("page larger than {} bytes", self.settings.max_bytes),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

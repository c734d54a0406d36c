//! HTTP page fetching for listing pages
//!
//! Every request goes out with a randomly chosen browser identity, a fixed
//! referrer and a randomized pre-request delay. The fetcher never retries on
//! its own: the crawl controller decides what a failure means for the range.

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::config::FetchConfig;

/// Raw outcome of one page request
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
    pub latency: Duration,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Body,
    Other,
}

#[derive(Error, Debug)]
pub enum FetchError {
    /// Timeouts, connection resets, truncated bodies: worth a cooldown and retry
    #[error("network error ({kind:?}) fetching {url}: {message}")]
    Network {
        url: String,
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("invalid header value for {header}: {value}")]
    InvalidHeader { header: &'static str, value: String },
}

impl FetchError {
    pub fn network(url: &str, kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            NetworkErrorKind::Timeout
        } else if error.is_connect() {
            NetworkErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            NetworkErrorKind::Body
        } else {
            NetworkErrorKind::Other
        };
        Self::network(url, kind, error.to_string())
    }
}

/// Fetch one listing page. Implementations must not retry internally.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Pool of browser identities; one is drawn per request
#[derive(Debug, Clone)]
pub struct IdentityPool {
    user_agents: Vec<HeaderValue>,
}

impl IdentityPool {
    pub fn new(user_agents: &[String]) -> Result<Self, FetchError> {
        let user_agents = user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .map(|ua| {
                HeaderValue::from_str(ua).map_err(|_| FetchError::InvalidHeader {
                    header: "user-agent",
                    value: ua.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if user_agents.is_empty() {
            return Err(FetchError::ClientBuild("identity pool is empty".to_string()));
        }
        Ok(Self { user_agents })
    }

    pub fn pick(&self) -> &HeaderValue {
        &self.user_agents[fastrand::usize(..self.user_agents.len())]
    }

    pub fn len(&self) -> usize {
        self.user_agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_agents.is_empty()
    }
}

/// Uniform random delay window, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterWindow {
    min_ms: u64,
    max_ms: u64,
}

impl JitterWindow {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    pub fn sample(&self) -> Duration {
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }
}

/// reqwest-backed fetcher with identity rotation and request pacing
pub struct HttpPageFetcher {
    client: Client,
    identities: IdentityPool,
    jitter: JitterWindow,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept).map_err(|_| FetchError::InvalidHeader {
                header: "accept",
                value: config.accept.clone(),
            })?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer).map_err(|_| FetchError::InvalidHeader {
                header: "referer",
                value: config.referer.clone(),
            })?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            identities: IdentityPool::new(&config.user_agents)?,
            jitter: JitterWindow::new(config.jitter_min_ms, config.jitter_max_ms),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let delay = self.jitter.sample();
        debug!("Pacing {:?} before request to {}", delay, url);
        tokio::time::sleep(delay).await;

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.identities.pick().clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        Ok(FetchedPage {
            status,
            body,
            latency: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_samples_stay_inside_window() {
        let window = JitterWindow::new(2500, 5000);
        for _ in 0..200 {
            let delay = window.sample();
            assert!(delay >= Duration::from_millis(2500));
            assert!(delay <= Duration::from_millis(5000));
        }
        assert_eq!(JitterWindow::new(10, 10).sample(), Duration::from_millis(10));
    }

    #[test]
    fn identity_pool_draws_from_configured_agents() {
        let config = FetchConfig::default();
        let pool = IdentityPool::new(&config.user_agents).unwrap();
        assert_eq!(pool.len(), 4);
        for _ in 0..20 {
            let picked = pool.pick().to_str().unwrap();
            assert!(config.user_agents.iter().any(|ua| ua == picked));
        }
    }

    #[test]
    fn blank_identity_pool_is_rejected() {
        assert!(IdentityPool::new(&["  ".to_string()]).is_err());
    }

    #[test]
    fn fetcher_builds_from_default_config() {
        assert!(HttpPageFetcher::new(&FetchConfig::default()).is_ok());
    }

    #[test]
    fn only_status_200_is_success() {
        let page = |status| FetchedPage {
            status,
            body: String::new(),
            latency: Duration::ZERO,
        };
        assert!(page(200).is_success());
        assert!(!page(204).is_success());
        assert!(!page(403).is_success());
    }
}

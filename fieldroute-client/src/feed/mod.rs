//! HTTP-based `CandidateFeed` for the lead application's property API.
//!
//! This module provides [`HttpCandidateFeed`], an implementation of the
//! [`CandidateFeed`] trait that reads the candidate pool and drives the
//! application's batch geocoding endpoints over HTTP.
//!
//! # Architecture
//!
//! The feed exposes three endpoints under one base URL: the candidate
//! listing, the batch geocode call, and the geocoding coverage status.
//! The synchronous [`CandidateFeed`] trait is implemented by blocking on
//! async HTTP calls internally, keeping the core library embeddable in
//! synchronous contexts.
//!
//! # Example
//!
//! ```no_run
//! use fieldroute_client::{HttpCandidateFeed, HttpCandidateFeedConfig};
//! use fieldroute_core::CandidateFeed;
//! use std::time::Duration;
//!
//! let config = HttpCandidateFeedConfig::new("http://localhost:3000/api")
//!     .with_timeout(Duration::from_secs(60));
//! let feed = HttpCandidateFeed::with_config(config)?;
//!
//! let pool = feed.candidates()?;
//! println!("{} candidates", pool.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod wire;

use std::time::Duration;

use fieldroute_core::{Candidate, CandidateFeed, FeedError, GeocodeBatch, GeocodeStatus};

use crate::http::{BlockingHttp, ClientBuildError, DEFAULT_USER_AGENT};

use self::wire::{CandidateRecord, GeocodeBatchRequest};

/// Default request timeout in seconds.
///
/// Geocode batches do provider lookups server-side, so the feed default
/// is more generous than the solver's.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for [`HttpCandidateFeed`].
#[derive(Debug, Clone)]
pub struct HttpCandidateFeedConfig {
    /// Base URL for the lead application's API (e.g. `"http://localhost:3000/api"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpCandidateFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpCandidateFeedConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client for the lead application's property endpoints.
///
/// Implements the synchronous [`CandidateFeed`] trait by internally
/// blocking on asynchronous HTTP requests. The client owns a Tokio
/// runtime that is reused across calls; the runtime rules match
/// [`HttpRouteSolver`](crate::HttpRouteSolver).
#[derive(Debug)]
pub struct HttpCandidateFeed {
    http: BlockingHttp,
    config: HttpCandidateFeedConfig,
}

impl HttpCandidateFeed {
    /// Create a new feed client with default configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the application's API
    ///   (e.g. `"http://localhost:3000/api"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientBuildError> {
        Self::with_config(HttpCandidateFeedConfig::new(base_url))
    }

    /// Create a new feed client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpCandidateFeedConfig) -> Result<Self, ClientBuildError> {
        let http = BlockingHttp::new(&config.user_agent, config.timeout)?;
        Ok(Self { http, config })
    }

    /// Join `path` onto the configured base URL.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, FeedError> {
        let url = self.endpoint("candidates");

        let response = self
            .http
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let records: Vec<CandidateRecord> =
            response.json().await.map_err(|err| FeedError::Parse {
                message: err.to_string(),
            })?;

        Ok(records
            .into_iter()
            .map(CandidateRecord::into_candidate)
            .collect())
    }

    async fn post_geocode_batch(&self, limit: u32, offset: u32) -> Result<GeocodeBatch, FeedError> {
        let url = self.endpoint("geocode/batch");
        let body = GeocodeBatchRequest { limit, offset };

        let response = self
            .http
            .client()
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        response.json().await.map_err(|err| FeedError::Parse {
            message: err.to_string(),
        })
    }

    async fn fetch_geocode_status(&self) -> Result<GeocodeStatus, FeedError> {
        let url = self.endpoint("geocode/status");

        let response = self
            .http
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        response.json().await.map_err(|err| FeedError::Parse {
            message: err.to_string(),
        })
    }

    /// Convert a reqwest error to a `FeedError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> FeedError {
        if error.is_timeout() {
            return FeedError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return FeedError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        FeedError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl CandidateFeed for HttpCandidateFeed {
    /// Fetch the current candidate pool.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must
    /// be multi-threaded (`flavor = "multi_thread"`); from a
    /// `current_thread` runtime the client falls back to its own internal
    /// runtime. The same applies to the other trait methods.
    fn candidates(&self) -> Result<Vec<Candidate>, FeedError> {
        self.http.execute(self.fetch_candidates())
    }

    fn geocode_batch(&self, limit: u32, offset: u32) -> Result<GeocodeBatch, FeedError> {
        self.http.execute(self.post_geocode_batch(limit, offset))
    }

    fn geocode_status(&self) -> Result<GeocodeStatus, FeedError> {
        self.http.execute(self.fetch_geocode_status())
    }
}

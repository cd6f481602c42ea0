//! HTTP-based `RouteSolver` for the external route optimisation service.
//!
//! This module provides [`HttpRouteSolver`], an implementation of the
//! [`RouteSolver`] trait that submits planning requests to the remote
//! optimiser over HTTP.
//!
//! # Architecture
//!
//! The [`RouteSolver`] trait is synchronous to keep the core library
//! embeddable in synchronous contexts. This client bridges the async HTTP
//! calls to the sync interface by blocking on a Tokio runtime internally.
//!
//! # Example
//!
//! ```no_run
//! use fieldroute_client::HttpRouteSolver;
//! use fieldroute_core::{RouteSolver, SolverCandidate, SolverRequest};
//!
//! let solver = HttpRouteSolver::new("http://localhost:8080")?;
//! let request = SolverRequest {
//!     candidates: vec![SolverCandidate { id: 1, lat: 29.5, lng: -98.5 }],
//!     depot_id: 1,
//!     depot_lat: 29.5,
//!     depot_lon: -98.5,
//!     vehicle_count: 1,
//!     route_tag: "morning".into(),
//! };
//!
//! let response = solver.solve(&request)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use fieldroute_core::{RouteSolver, SolveRouteError, SolverRequest, SolverResponse};

use crate::http::{BlockingHttp, ClientBuildError, DEFAULT_USER_AGENT};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpRouteSolver`].
#[derive(Debug, Clone)]
pub struct HttpRouteSolverConfig {
    /// Base URL for the optimiser service (e.g. `"http://localhost:8080"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpRouteSolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpRouteSolverConfig {
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

/// HTTP client for the external route optimiser.
///
/// Implements the synchronous [`RouteSolver`] trait by internally blocking
/// on asynchronous HTTP requests. The client owns a Tokio runtime that is
/// reused across calls; see [`HttpRouteSolver::solve`] for the runtime
/// rules when calling from async contexts.
///
/// Responses are validated before they are returned: an answer that
/// reports failure, or that claims success while carrying no routes,
/// surfaces as [`SolveRouteError::Unsolvable`] rather than an empty
/// response.
#[derive(Debug)]
pub struct HttpRouteSolver {
    http: BlockingHttp,
    config: HttpRouteSolverConfig,
}

impl HttpRouteSolver {
    /// Create a new client with default configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the optimiser (e.g. `"http://localhost:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientBuildError> {
        Self::with_config(HttpRouteSolverConfig::new(base_url))
    }

    /// Create a new client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpRouteSolverConfig) -> Result<Self, ClientBuildError> {
        let http = BlockingHttp::new(&config.user_agent, config.timeout)?;
        Ok(Self { http, config })
    }

    /// Build the solve endpoint URL.
    fn solve_url(&self) -> String {
        format!("{}/solve", self.config.base_url.trim_end_matches('/'))
    }

    /// Submit the request and decode the optimiser's answer.
    async fn post_solve(
        &self,
        request: &SolverRequest,
    ) -> Result<SolverResponse, SolveRouteError> {
        let url = self.solve_url();

        let response = self
            .http
            .client()
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let body: SolverResponse =
            response
                .json()
                .await
                .map_err(|err| SolveRouteError::Parse {
                    message: err.to_string(),
                })?;

        body.checked()
    }

    /// Convert a reqwest error to a `SolveRouteError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> SolveRouteError {
        if error.is_timeout() {
            return SolveRouteError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return SolveRouteError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        SolveRouteError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl RouteSolver for HttpRouteSolver {
    /// Solve a routing request against the remote optimiser.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must
    /// be multi-threaded (`flavor = "multi_thread"`). If called from within
    /// a `current_thread` runtime, the method falls back to using its own
    /// internal runtime, which may block the caller's runtime and cause
    /// deadlocks if the caller's runtime is driving IO or timers needed by
    /// this request.
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse, SolveRouteError> {
        self.http.execute(self.post_solve(request))
    }
}

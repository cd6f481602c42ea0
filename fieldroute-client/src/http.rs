//! Shared plumbing for the HTTP adapters.
//!
//! The core traits are synchronous so the engine stays embeddable in
//! synchronous contexts. Each adapter therefore owns a reqwest client and
//! a Tokio runtime, and blocks on its async calls internally. The pairing
//! and the runtime-bridging rules live here so the solver and feed
//! adapters cannot drift apart.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Default user agent for requests from either adapter.
pub const DEFAULT_USER_AGENT: &str = "fieldroute-client/0.1";

/// Error type for HTTP adapter construction failures.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(std::io::Error),
}

/// A reqwest client paired with the runtime that drives its requests.
///
/// The runtime is reused across calls, avoiding the overhead of creating
/// a new runtime per request.
pub(crate) struct BlockingHttp {
    client: Client,
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingHttp")
            .field("client", &self.client)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl BlockingHttp {
    /// Build the client and its runtime from shared settings.
    pub(crate) fn new(user_agent: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ClientBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientBuildError::Runtime)?;
        Ok(Self { client, runtime })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Run `future` to completion from synchronous code.
    ///
    /// When called from within an existing multi-threaded Tokio runtime
    /// (detected via [`Handle::try_current()`] and
    /// [`RuntimeFlavor::MultiThread`]), the handle is reused with
    /// [`tokio::task::block_in_place`] to avoid nested runtime panics.
    /// From within a `current_thread` runtime, or outside any runtime,
    /// the stored runtime drives the future instead.
    pub(crate) fn execute<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            // No runtime detected, or current_thread runtime: use our own.
            _ => self.runtime.block_on(future),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_with_plain_settings() {
        let http = BlockingHttp::new("fieldroute-test/0.1", Duration::from_secs(5));
        assert!(http.is_ok());
    }

    #[rstest]
    fn executes_futures_outside_any_runtime() {
        let http =
            BlockingHttp::new("fieldroute-test/0.1", Duration::from_secs(5)).expect("build http");
        let value = http.execute(async { 41 + 1 });
        assert_eq!(value, 42);
    }

    #[rstest]
    fn executes_futures_inside_a_multi_thread_runtime() {
        let http =
            BlockingHttp::new("fieldroute-test/0.1", Duration::from_secs(5)).expect("build http");
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("build runtime");
        let value = runtime.block_on(async {
            tokio::task::spawn_blocking(move || http.execute(async { 7 * 6 }))
                .await
                .expect("join blocking task")
        });
        assert_eq!(value, 42);
    }
}

//! HTTP adapters between the Fieldroute engine and its surrounding services.
//!
//! Responsibilities:
//! - Implement the core [`RouteSolver`](fieldroute_core::RouteSolver) and
//!   [`CandidateFeed`](fieldroute_core::CandidateFeed) traits over HTTP.
//! - Encapsulate the lead application's and optimiser's wire formats and
//!   endpoint layout.
//! - Host the operational loops (batch geocoding) that pair with those
//!   transports.
//!
//! Boundaries:
//! - Do not encode planning rules (live in `fieldroute-core`).
//! - Keep blocking I/O off async executors; the adapters own their runtimes.
//!
//! Invariants:
//! - Thread-safe by default where feasible.
//! - No global mutable state.

mod http;

pub mod feed;
pub mod geocode;
pub mod solver;

pub use feed::{HttpCandidateFeed, HttpCandidateFeedConfig};
pub use geocode::{GeocodeReport, GeocodeRunner};
pub use http::{ClientBuildError, DEFAULT_USER_AGENT};
pub use solver::{HttpRouteSolver, HttpRouteSolverConfig};

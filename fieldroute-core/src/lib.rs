//! Core domain types for the fieldroute planning engine.
//!
//! The engine turns a pool of tax-delinquent property leads into
//! driveable field-visit routes: operators select candidates by hand or
//! by drawing a region, the selection becomes a bounded request for an
//! external route optimiser, and the solved routes are persisted and
//! worked stop by stop. Visited stops feed back into candidate
//! eligibility so the same door is not knocked twice.
//!
//! This crate holds the pure planning logic and the traits at the two
//! external seams, the optimiser ([`RouteSolver`]) and the surrounding
//! application's property records ([`CandidateFeed`]). Transport
//! adapters live in `fieldroute-client`.

#![forbid(unsafe_code)]

pub mod candidate;
pub mod feed;
pub mod geometry;
pub mod reconcile;
pub mod request;
pub mod selection;
pub mod session;
pub mod solver;
pub mod store;
pub mod tracking;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use candidate::Candidate;
pub use feed::{CancelFlag, CandidateFeed, FeedError, GeocodeBatch, GeocodeStatus};
pub use geometry::{EARTH_RADIUS_KM, GeometryError, Region, haversine_km, nearest_candidate};
pub use reconcile::{ineligible_candidates, route_visited_ids};
pub use request::{
    BuildRequestError, DepotChoice, MAX_REQUEST_CANDIDATES, RouteRequest, RouteRequestBuilder,
};
pub use selection::SelectionSet;
pub use session::{MutationError, PlanRouteError, PlanningSession};
pub use solver::{
    RouteSolver, SolveRouteError, SolverCandidate, SolverRequest, SolverResponse, SolverRoute,
    Waypoint,
};
pub use store::{Route, RouteId, RouteStatus, RouteStop, RouteStore, StopId, StoreError};
pub use tracking::{MutationInFlight, MutationState, MutationTarget, MutationTracker};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteRouteStore;

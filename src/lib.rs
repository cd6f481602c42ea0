//! Facade crate for the Fieldroute visit-planning engine.
//!
//! This crate re-exports the core planning types and exposes the optional
//! SQLite route store and HTTP lead-service clients behind feature flags.

#![forbid(unsafe_code)]

pub use fieldroute_core::{
    BuildRequestError, CancelFlag, Candidate, CandidateFeed, DepotChoice, FeedError, GeocodeBatch,
    GeocodeStatus, GeometryError, MAX_REQUEST_CANDIDATES, MutationError, MutationState,
    MutationTarget, PlanRouteError, PlanningSession, Region, Route, RouteRequest,
    RouteRequestBuilder, RouteSolver, RouteStatus, RouteStop, RouteStore, SelectionSet,
    SolveRouteError, SolverRequest, SolverResponse, StoreError, haversine_km,
    ineligible_candidates, nearest_candidate,
};

#[cfg(feature = "store-sqlite")]
pub use fieldroute_core::SqliteRouteStore;

#[cfg(feature = "client-http")]
pub use fieldroute_client::{
    ClientBuildError, GeocodeReport, GeocodeRunner, HttpCandidateFeed, HttpCandidateFeedConfig,
    HttpRouteSolver, HttpRouteSolverConfig,
};

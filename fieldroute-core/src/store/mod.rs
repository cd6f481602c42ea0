//! Persisted routes and the stores that hold them.
//!
//! A [`Route`] is the durable outcome of a successful solve: an agent,
//! a lifecycle status, and an ordered list of [`RouteStop`]s. The
//! [`RouteStore`] trait captures every mutation the workflow performs on
//! persisted routes; [`SqliteRouteStore`] implements it on SQLite when
//! the `store-sqlite` feature is enabled.
//!
//! Two invariants hold for every persisted route: exactly one stop is
//! the depot and it carries the lowest `order_index`, and `order_index`
//! values are unique and increasing within a route. Gaps are legal;
//! removing a stop never renumbers its neighbours.

use std::fmt;

use thiserror::Error;

#[cfg(feature = "store-sqlite")]
pub mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteRouteStore;

use crate::solver::SolverResponse;

/// Identifier of a persisted route.
pub type RouteId = i64;

/// Identifier of a persisted route stop.
pub type StopId = i64;

/// Lifecycle state of a persisted route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RouteStatus {
    /// The route is being worked; its visited stops make candidates
    /// ineligible for new requests.
    Active,
    /// The route was completed and no longer affects eligibility.
    Finished,
    /// The route was abandoned and no longer affects eligibility.
    Cancelled,
}

impl RouteStatus {
    /// Stable textual form used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse the stable textual form back into a status.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(Self::Active),
            "FINISHED" => Some(Self::Finished),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stop on a persisted route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteStop {
    /// Stop identifier, unique across all routes.
    pub id: StopId,
    /// Route this stop belongs to.
    pub route_id: RouteId,
    /// Candidate this stop visits.
    pub candidate_id: u64,
    /// Position within the route; display always sorts by this value.
    pub order_index: u32,
    /// Whether this stop is the route's depot.
    pub is_depot: bool,
    /// Whether an agent has marked this stop visited.
    pub visited: bool,
    /// Unix timestamp of the visit, when visited.
    pub visited_at: Option<i64>,
    /// Agent who recorded the visit, when visited.
    pub visited_by: Option<String>,
}

/// A persisted route with its stops.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Route identifier.
    pub id: RouteId,
    /// Agent the route was planned for.
    pub agent: String,
    /// Lifecycle state.
    pub status: RouteStatus,
    /// Tag the route was planned under; groups routes per market.
    pub route_tag: String,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of the last mutation.
    pub updated_at: i64,
    /// Unix timestamp of leaving the active state, when it has.
    pub finished_at: Option<i64>,
    /// Stops sorted by `order_index`.
    pub stops: Vec<RouteStop>,
}

impl Route {
    /// Stops in visiting order.
    ///
    /// Stores return stops already sorted; this re-sorts so a locally
    /// mutated copy still displays correctly.
    #[must_use]
    pub fn ordered_stops(&self) -> Vec<&RouteStop> {
        let mut stops: Vec<&RouteStop> = self.stops.iter().collect();
        stops.sort_by_key(|stop| stop.order_index);
        stops
    }

    /// The route's depot stop, if present.
    #[must_use]
    pub fn depot(&self) -> Option<&RouteStop> {
        self.stops.iter().find(|stop| stop.is_depot)
    }

    /// Find a stop by its id.
    #[must_use]
    pub fn stop(&self, stop_id: StopId) -> Option<&RouteStop> {
        self.stops.iter().find(|stop| stop.id == stop_id)
    }

    /// Find the stop visiting `candidate_id`, if any.
    #[must_use]
    pub fn stop_for_candidate(&self, candidate_id: u64) -> Option<&RouteStop> {
        self.stops
            .iter()
            .find(|stop| stop.candidate_id == candidate_id)
    }

    /// Number of unvisited non-depot stops.
    #[must_use]
    pub fn remaining_stops(&self) -> usize {
        self.stops
            .iter()
            .filter(|stop| !stop.is_depot && !stop.visited)
            .count()
    }
}

/// Errors raised by route stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No route exists with the given id.
    #[error("route {route_id} not found")]
    RouteNotFound {
        /// Route id that was looked up.
        route_id: RouteId,
    },
    /// No stop exists with the given id on the given route.
    #[error("stop {stop_id} not found on route {route_id}")]
    StopNotFound {
        /// Route id that was looked up.
        route_id: RouteId,
        /// Stop id that was looked up.
        stop_id: StopId,
    },
    /// The route has no stop visiting the given candidate.
    #[error("candidate {candidate_id} has no stop on route {route_id}")]
    CandidateNotOnRoute {
        /// Route id that was looked up.
        route_id: RouteId,
        /// Candidate id that was looked up.
        candidate_id: u64,
    },
    /// The backing store failed.
    #[error("persistence backend failed: {message}")]
    Backend {
        /// Backend failure description.
        message: String,
    },
    /// SQLite reported an error.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Persistence operations for planned routes.
///
/// Implementations must apply each mutation atomically: a failed call
/// leaves the store exactly as it was. `list_active` returns routes with
/// their stops sorted by `order_index`.
pub trait RouteStore {
    /// Persist every route in a checked solver response.
    ///
    /// Stops take their `order_index` from the waypoint order and the
    /// depot flag from the waypoint. Created routes start
    /// [`RouteStatus::Active`] and are returned with their assigned ids.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when persistence fails; no route is
    /// created in that case.
    fn create_routes(
        &mut self,
        response: &SolverResponse,
        agent: &str,
        route_tag: &str,
    ) -> Result<Vec<Route>, StoreError>;

    /// Fetch every active route, optionally narrowed to a tag.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the backing store fails.
    fn list_active(&self, route_tag: Option<&str>) -> Result<Vec<Route>, StoreError>;

    /// Remove one stop from a route.
    ///
    /// Remaining stops keep their `order_index`; the resulting gap is
    /// legal and display order is unaffected. The route itself survives
    /// even when its last stop is removed.
    ///
    /// # Errors
    /// Returns [`StoreError::StopNotFound`] when the stop does not exist
    /// on the route.
    fn remove_stop(&mut self, route_id: RouteId, stop_id: StopId) -> Result<(), StoreError>;

    /// Move the stop visiting `candidate_id` to `new_index`.
    ///
    /// `new_index` is zero-based among the route's non-depot stops and
    /// is clamped to the end of the route. The move rewrites the order
    /// of every non-depot stop in one atomic step; on failure the
    /// previous order stands.
    ///
    /// # Errors
    /// Returns [`StoreError::RouteNotFound`] for an unknown route and
    /// [`StoreError::CandidateNotOnRoute`] when no stop on the route
    /// visits the candidate.
    fn reorder_stop(
        &mut self,
        route_id: RouteId,
        candidate_id: u64,
        new_index: u32,
    ) -> Result<(), StoreError>;

    /// Record or retract a field visit on a stop.
    ///
    /// Marking visited stamps the current time and the acting agent;
    /// unmarking clears both, which restores the candidate's eligibility
    /// the next time ineligibility is derived.
    ///
    /// # Errors
    /// Returns [`StoreError::StopNotFound`] when the stop does not exist
    /// on the route.
    fn mark_stop_visited(
        &mut self,
        route_id: RouteId,
        stop_id: StopId,
        agent: &str,
        visited: bool,
    ) -> Result<(), StoreError>;

    /// Move a route to a new lifecycle state.
    ///
    /// Leaving [`RouteStatus::Active`] stamps `finished_at`; returning
    /// to it clears the stamp.
    ///
    /// # Errors
    /// Returns [`StoreError::RouteNotFound`] for an unknown route.
    fn set_route_status(&mut self, route_id: RouteId, status: RouteStatus)
    -> Result<(), StoreError>;

    /// Delete a route and all of its stops.
    ///
    /// # Errors
    /// Returns [`StoreError::RouteNotFound`] for an unknown route.
    fn delete_route(&mut self, route_id: RouteId) -> Result<(), StoreError>;
}

/// Compute the order rewrite for moving one stop.
///
/// This is the single implementation of reorder semantics; every store
/// and the in-memory session view apply the assignments it returns.
/// `new_index` is zero-based among non-depot stops and clamps to the end.
/// Non-depot stops come back renumbered sequentially after the depot, so
/// any gaps left by earlier removals disappear on reorder.
///
/// # Errors
/// Returns [`StoreError::CandidateNotOnRoute`] when no non-depot stop
/// visits `candidate_id`.
pub fn compute_reorder(
    route_id: RouteId,
    stops: &[RouteStop],
    candidate_id: u64,
    new_index: u32,
) -> Result<Vec<(StopId, u32)>, StoreError> {
    let mut ordered: Vec<&RouteStop> = stops.iter().filter(|stop| !stop.is_depot).collect();
    ordered.sort_by_key(|stop| stop.order_index);

    let position = ordered
        .iter()
        .position(|stop| stop.candidate_id == candidate_id)
        .ok_or(StoreError::CandidateNotOnRoute {
            route_id,
            candidate_id,
        })?;
    let moved = ordered.remove(position);
    let target = (new_index as usize).min(ordered.len());
    ordered.insert(target, moved);

    let first_index = stops
        .iter()
        .filter(|stop| stop.is_depot)
        .map(|stop| stop.order_index + 1)
        .max()
        .unwrap_or(0);
    Ok(ordered
        .iter()
        .enumerate()
        .map(|(offset, stop)| (stop.id, first_index + offset as u32))
        .collect())
}

/// Current time as unix seconds.
pub(crate) fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

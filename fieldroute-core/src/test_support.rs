//! Test doubles and fixtures for exercising planning flows.
//!
//! Enabled for downstream crates through the `test-support` feature, so
//! transport adapters and the CLI can drive full planning scenarios
//! without a database, a solver deployment, or a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use geo::Coord;

use crate::candidate::Candidate;
use crate::feed::{CancelFlag, CandidateFeed, FeedError, GeocodeBatch, GeocodeStatus};
use crate::solver::{
    RouteSolver, SolveRouteError, SolverRequest, SolverResponse, SolverRoute, Waypoint,
};
use crate::store::{
    Route, RouteId, RouteStatus, RouteStop, RouteStore, StopId, StoreError, compute_reorder,
    now_unix,
};

/// An unvisited candidate at the given position.
#[must_use]
pub fn candidate(id: u64, x: f64, y: f64) -> Candidate {
    Candidate::located(id, Coord { x, y })
}

/// A candidate whose own record is already flagged visited.
#[must_use]
pub fn visited_candidate(id: u64, x: f64, y: f64) -> Candidate {
    let mut candidate = candidate(id, x, y);
    candidate.visited = true;
    candidate
}

/// A successful solver response with one route per id slice.
///
/// The first id in each slice becomes the depot; the rest follow in
/// order. Positions are synthetic but stable per id.
#[must_use]
pub fn solved_response(routes: &[&[u64]]) -> SolverResponse {
    let routes: Vec<SolverRoute> = routes
        .iter()
        .map(|ids| {
            let waypoints = ids
                .iter()
                .enumerate()
                .map(|(order, id)| Waypoint {
                    id: *id,
                    lat: 29.5 + 0.001 * *id as f64,
                    lng: -98.5,
                    order: order as u32,
                    is_depot: order == 0,
                })
                .collect();
            SolverRoute {
                waypoints,
                distance_km: 2.0 * ids.len() as f64,
            }
        })
        .collect();
    let total_distance_km = routes.iter().map(|route| route.distance_km).sum();
    SolverResponse {
        success: true,
        routes,
        total_distance_km,
    }
}

/// In-memory [`RouteStore`] with injectable failures.
///
/// Mutations are applied to plain vectors; `queue_failure` makes the
/// next mutating call fail before touching anything, which is how
/// rollback paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryRouteStore {
    routes: Vec<Route>,
    next_route_id: RouteId,
    next_stop_id: StopId,
    queued_failure: Option<StoreError>,
}

impl MemoryRouteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_route_id: 1,
            next_stop_id: 1,
            ..Self::default()
        }
    }

    /// Make the next mutating call fail with `error`.
    ///
    /// Read calls are unaffected; the queued failure fires once.
    pub fn queue_failure(&mut self, error: StoreError) {
        self.queued_failure = Some(error);
    }

    fn take_failure(&mut self) -> Result<(), StoreError> {
        match self.queued_failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn route_mut(&mut self, route_id: RouteId) -> Result<&mut Route, StoreError> {
        self.routes
            .iter_mut()
            .find(|route| route.id == route_id)
            .ok_or(StoreError::RouteNotFound { route_id })
    }
}

impl RouteStore for MemoryRouteStore {
    fn create_routes(
        &mut self,
        response: &SolverResponse,
        agent: &str,
        route_tag: &str,
    ) -> Result<Vec<Route>, StoreError> {
        self.take_failure()?;
        let now = now_unix();
        let mut created = Vec::with_capacity(response.routes.len());
        for solver_route in &response.routes {
            let route_id = self.next_route_id;
            self.next_route_id += 1;

            let mut waypoints: Vec<_> = solver_route.waypoints.iter().collect();
            waypoints.sort_by_key(|waypoint| waypoint.order);
            let mut stops = Vec::with_capacity(waypoints.len());
            for waypoint in waypoints {
                stops.push(RouteStop {
                    id: self.next_stop_id,
                    route_id,
                    candidate_id: waypoint.id,
                    order_index: waypoint.order,
                    is_depot: waypoint.is_depot,
                    visited: false,
                    visited_at: None,
                    visited_by: None,
                });
                self.next_stop_id += 1;
            }
            created.push(Route {
                id: route_id,
                agent: agent.to_owned(),
                status: RouteStatus::Active,
                route_tag: route_tag.to_owned(),
                created_at: now,
                updated_at: now,
                finished_at: None,
                stops,
            });
        }
        self.routes.extend(created.iter().cloned());
        Ok(created)
    }

    fn list_active(&self, route_tag: Option<&str>) -> Result<Vec<Route>, StoreError> {
        Ok(self
            .routes
            .iter()
            .filter(|route| route.status == RouteStatus::Active)
            .filter(|route| route_tag.is_none_or(|tag| route.route_tag == tag))
            .map(|route| {
                let mut route = route.clone();
                route.stops.sort_by_key(|stop| stop.order_index);
                route
            })
            .collect())
    }

    fn remove_stop(&mut self, route_id: RouteId, stop_id: StopId) -> Result<(), StoreError> {
        self.take_failure()?;
        let route = self.route_mut(route_id)?;
        let position = route
            .stops
            .iter()
            .position(|stop| stop.id == stop_id)
            .ok_or(StoreError::StopNotFound { route_id, stop_id })?;
        route.stops.remove(position);
        route.updated_at = now_unix();
        Ok(())
    }

    fn reorder_stop(
        &mut self,
        route_id: RouteId,
        candidate_id: u64,
        new_index: u32,
    ) -> Result<(), StoreError> {
        self.take_failure()?;
        let route = self.route_mut(route_id)?;
        let assignments = compute_reorder(route_id, &route.stops, candidate_id, new_index)?;
        for (stop_id, order_index) in assignments {
            if let Some(stop) = route.stops.iter_mut().find(|stop| stop.id == stop_id) {
                stop.order_index = order_index;
            }
        }
        route.stops.sort_by_key(|stop| stop.order_index);
        route.updated_at = now_unix();
        Ok(())
    }

    fn mark_stop_visited(
        &mut self,
        route_id: RouteId,
        stop_id: StopId,
        agent: &str,
        visited: bool,
    ) -> Result<(), StoreError> {
        self.take_failure()?;
        let route = self.route_mut(route_id)?;
        let stop = route
            .stops
            .iter_mut()
            .find(|stop| stop.id == stop_id)
            .ok_or(StoreError::StopNotFound { route_id, stop_id })?;
        stop.visited = visited;
        stop.visited_at = visited.then(now_unix);
        stop.visited_by = visited.then(|| agent.to_owned());
        route.updated_at = now_unix();
        Ok(())
    }

    fn set_route_status(
        &mut self,
        route_id: RouteId,
        status: RouteStatus,
    ) -> Result<(), StoreError> {
        self.take_failure()?;
        let now = now_unix();
        let route = self.route_mut(route_id)?;
        route.status = status;
        route.updated_at = now;
        route.finished_at = match status {
            RouteStatus::Active => None,
            RouteStatus::Finished | RouteStatus::Cancelled => Some(now),
        };
        Ok(())
    }

    fn delete_route(&mut self, route_id: RouteId) -> Result<(), StoreError> {
        self.take_failure()?;
        let position = self
            .routes
            .iter()
            .position(|route| route.id == route_id)
            .ok_or(StoreError::RouteNotFound { route_id })?;
        self.routes.remove(position);
        Ok(())
    }
}

/// [`RouteSolver`] that replays a scripted outcome and records requests.
#[derive(Debug)]
pub struct ScriptedSolver {
    script: Result<SolverResponse, SolveRouteError>,
    calls: Mutex<Vec<SolverRequest>>,
}

impl ScriptedSolver {
    /// Answer every solve with `response`.
    #[must_use]
    pub fn with_response(response: SolverResponse) -> Self {
        Self {
            script: Ok(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every solve with `error`.
    #[must_use]
    pub fn failing(error: SolveRouteError) -> Self {
        Self {
            script: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SolverRequest> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl RouteSolver for ScriptedSolver {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse, SolveRouteError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        self.script.clone()
    }
}

/// [`CandidateFeed`] that serves fixtures and scripted geocode batches.
///
/// Batches are served in push order; once the script runs out, further
/// batch calls return all-zero counters, which geocode runners read as
/// the end of the data. `cancel_after` raises a [`CancelFlag`] while the
/// Nth batch is being served, mimicking an operator pressing cancel
/// while a batch is in flight.
#[derive(Debug)]
pub struct ScriptedFeed {
    candidates: Vec<Candidate>,
    status: GeocodeStatus,
    batches: Mutex<VecDeque<Result<GeocodeBatch, FeedError>>>,
    cancel_after: Option<(u32, CancelFlag)>,
    served: Mutex<u32>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedFeed {
    /// Serve `candidates`, deriving the geocode status from them.
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let total = candidates.len() as u64;
        let with_coordinates = candidates
            .iter()
            .filter(|candidate| candidate.has_location())
            .count() as u64;
        let percentage_complete = if total == 0 {
            100.0
        } else {
            with_coordinates as f64 / total as f64 * 100.0
        };
        Self {
            candidates,
            status: GeocodeStatus {
                total,
                with_coordinates,
                without_coordinates: total - with_coordinates,
                percentage_complete,
            },
            batches: Mutex::new(VecDeque::new()),
            cancel_after: None,
            served: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the derived geocode status.
    #[must_use]
    pub fn with_status(mut self, status: GeocodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Append a successful batch to the script.
    #[must_use]
    pub fn push_batch(self, batch: GeocodeBatch) -> Self {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(Ok(batch));
        }
        self
    }

    /// Append a failing batch to the script.
    #[must_use]
    pub fn push_error(self, error: FeedError) -> Self {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(Err(error));
        }
        self
    }

    /// Raise `flag` while serving batch number `batches` (1-based).
    #[must_use]
    pub fn cancel_after(mut self, batches: u32, flag: &CancelFlag) -> Self {
        self.cancel_after = Some((batches, flag.clone()));
        self
    }

    /// The `(limit, offset)` pairs of every batch call so far.
    #[must_use]
    pub fn batch_calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl CandidateFeed for ScriptedFeed {
    fn candidates(&self) -> Result<Vec<Candidate>, FeedError> {
        Ok(self.candidates.clone())
    }

    fn geocode_batch(&self, limit: u32, offset: u32) -> Result<GeocodeBatch, FeedError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((limit, offset));
        }
        let count = self.served.lock().map_or(0, |mut served| {
            *served += 1;
            *served
        });
        if let Some((after, flag)) = &self.cancel_after {
            if count == *after {
                flag.cancel();
            }
        }
        self.batches
            .lock()
            .ok()
            .and_then(|mut batches| batches.pop_front())
            .unwrap_or(Ok(GeocodeBatch::default()))
    }

    fn geocode_status(&self) -> Result<GeocodeStatus, FeedError> {
        Ok(self.status)
    }
}

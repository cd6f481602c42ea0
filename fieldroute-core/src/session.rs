//! Operator planning session.
//!
//! A [`PlanningSession`] is what the map screen talks to: it owns the
//! selection, a view of the active routes, and the store they live in.
//! Mutations are optimistic. The session applies each edit to its view
//! first, persists it, and restores the view if the store refuses, so
//! the screen never shows an order the store rejected as permanent.
//! After every confirmed mutation the view is reloaded from the store.

use std::collections::HashSet;

use thiserror::Error;

use crate::candidate::Candidate;
use crate::reconcile::ineligible_candidates;
use crate::request::{RouteRequest, RouteRequestBuilder};
use crate::selection::SelectionSet;
use crate::solver::{RouteSolver, SolveRouteError};
use crate::store::{
    Route, RouteId, RouteStatus, RouteStore, StopId, StoreError, compute_reorder, now_unix,
};
use crate::tracking::{MutationInFlight, MutationState, MutationTarget, MutationTracker};

/// Errors raised by route mutations made through a session.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The target already has a mutation in flight.
    #[error(transparent)]
    InFlight(#[from] MutationInFlight),
    /// The store refused the mutation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while planning a new route.
#[derive(Debug, Error)]
pub enum PlanRouteError {
    /// The optimiser failed or produced nothing usable.
    #[error(transparent)]
    Solve(#[from] SolveRouteError),
    /// The solved routes could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One operator's planning state over a route store.
///
/// The session optionally narrows to a route tag; its route view,
/// ineligibility derivation, and newly planned routes then all share
/// that tag.
///
/// # Examples
/// ```
/// use fieldroute_core::PlanningSession;
/// use fieldroute_core::store::SqliteRouteStore;
///
/// let store = SqliteRouteStore::open_in_memory().expect("store should open");
/// let session = PlanningSession::new(store).expect("view should load");
/// assert!(session.routes().is_empty());
/// ```
#[derive(Debug)]
pub struct PlanningSession<S> {
    store: S,
    selection: SelectionSet,
    routes: Vec<Route>,
    tracker: MutationTracker,
    route_tag: Option<String>,
}

impl<S: RouteStore> PlanningSession<S> {
    /// Open a session over every active route in the store.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the initial route view cannot be
    /// loaded.
    pub fn new(store: S) -> Result<Self, StoreError> {
        Self::open(store, None)
    }

    /// Open a session narrowed to one route tag.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the initial route view cannot be
    /// loaded.
    pub fn with_route_tag(store: S, tag: impl Into<String>) -> Result<Self, StoreError> {
        Self::open(store, Some(tag.into()))
    }

    fn open(store: S, route_tag: Option<String>) -> Result<Self, StoreError> {
        let mut session = Self {
            store,
            selection: SelectionSet::new(),
            routes: Vec::new(),
            tracker: MutationTracker::new(),
            route_tag,
        };
        session.refresh()?;
        Ok(session)
    }

    /// The operator's current selection.
    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Mutable access to the selection for toggles and area replaces.
    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// The current view of active routes, stops sorted for display.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find a route in the view by id.
    #[must_use]
    pub fn route(&self, route_id: RouteId) -> Option<&Route> {
        self.routes.iter().find(|route| route.id == route_id)
    }

    /// Tag this session is narrowed to, if any.
    #[must_use]
    pub fn route_tag(&self) -> Option<&str> {
        self.route_tag.as_deref()
    }

    /// Where `target` sits in the mutation lifecycle.
    #[must_use]
    pub fn mutation_state(&self, target: MutationTarget) -> MutationState {
        self.tracker.state(target)
    }

    /// Reload the route view from the store.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the store cannot be read; the
    /// previous view is left in place.
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.routes = self.store.list_active(self.route_tag.as_deref())?;
        Ok(())
    }

    /// Derive the candidates currently ineligible for new requests.
    ///
    /// Recomputed from the live route view on every call; nothing is
    /// cached.
    #[must_use]
    pub fn ineligible(&self, pool: &[Candidate]) -> HashSet<u64> {
        ineligible_candidates(pool, &self.routes)
    }

    /// Start a request builder wired to this session.
    ///
    /// The builder sees the session's selection and ineligibility view
    /// and inherits the session tag.
    #[must_use]
    pub fn request_builder<'a>(&'a self, pool: &'a [Candidate]) -> RouteRequestBuilder<'a> {
        let mut builder = RouteRequestBuilder::new(pool, &self.selection, self.ineligible(pool));
        if let Some(tag) = &self.route_tag {
            builder = builder.with_route_tag(tag.as_str());
        }
        builder
    }

    /// Solve a request and persist the resulting routes.
    ///
    /// The selection is cleared only after the solve succeeds and the
    /// routes are stored; any failure leaves it intact so the operator
    /// can retry or adjust.
    ///
    /// # Errors
    /// Returns [`PlanRouteError::Solve`] when the optimiser fails or
    /// answers without a usable route, and [`PlanRouteError::Store`]
    /// when persisting the solution fails.
    pub fn plan_route(
        &mut self,
        solver: &dyn RouteSolver,
        request: &RouteRequest,
        agent: &str,
    ) -> Result<Vec<Route>, PlanRouteError> {
        let response = solver.solve(&request.to_solver_request())?.checked()?;
        let created = self
            .store
            .create_routes(&response, agent, &request.route_tag)?;
        self.selection.clear();
        self.refresh()?;
        Ok(created)
    }

    /// Record or retract a field visit on a stop.
    ///
    /// # Errors
    /// Returns [`MutationError::InFlight`] when the stop already has a
    /// mutation pending, or the store's error when persistence fails; in
    /// both cases the view is unchanged.
    pub fn mark_stop_visited(
        &mut self,
        route_id: RouteId,
        stop_id: StopId,
        agent: &str,
        visited: bool,
    ) -> Result<(), MutationError> {
        let visited_at = visited.then(now_unix);
        let visited_by = visited.then(|| agent.to_owned());
        self.mutate(
            MutationTarget::Stop(stop_id),
            |routes| {
                let stop = routes
                    .iter_mut()
                    .filter(|route| route.id == route_id)
                    .flat_map(|route| route.stops.iter_mut())
                    .find(|stop| stop.id == stop_id);
                if let Some(stop) = stop {
                    stop.visited = visited;
                    stop.visited_at = visited_at;
                    stop.visited_by = visited_by;
                }
            },
            |store| store.mark_stop_visited(route_id, stop_id, agent, visited),
        )
    }

    /// Remove a stop from a route, leaving the rest of the order alone.
    ///
    /// # Errors
    /// Returns [`MutationError::InFlight`] when the stop already has a
    /// mutation pending, or the store's error when persistence fails.
    pub fn remove_stop(&mut self, route_id: RouteId, stop_id: StopId) -> Result<(), MutationError> {
        self.mutate(
            MutationTarget::Stop(stop_id),
            |routes| {
                if let Some(route) = routes.iter_mut().find(|route| route.id == route_id) {
                    route.stops.retain(|stop| stop.id != stop_id);
                }
            },
            |store| store.remove_stop(route_id, stop_id),
        )
    }

    /// Move the stop visiting `candidate_id` to `new_index`.
    ///
    /// The view order changes immediately; if the store then refuses,
    /// the view is restored to exactly its pre-attempt order.
    ///
    /// # Errors
    /// Returns [`MutationError::InFlight`] when the stop already has a
    /// mutation pending, [`StoreError::RouteNotFound`] or
    /// [`StoreError::CandidateNotOnRoute`] for unknown targets, or the
    /// store's error when persistence fails.
    pub fn reorder_stop(
        &mut self,
        route_id: RouteId,
        candidate_id: u64,
        new_index: u32,
    ) -> Result<(), MutationError> {
        let Some(route) = self.route(route_id) else {
            return Err(MutationError::Store(StoreError::RouteNotFound { route_id }));
        };
        let Some(stop) = route.stop_for_candidate(candidate_id) else {
            return Err(MutationError::Store(StoreError::CandidateNotOnRoute {
                route_id,
                candidate_id,
            }));
        };
        let stop_id = stop.id;
        self.mutate(
            MutationTarget::Stop(stop_id),
            |routes| {
                let Some(route) = routes.iter_mut().find(|route| route.id == route_id) else {
                    return;
                };
                let Ok(assignments) =
                    compute_reorder(route_id, &route.stops, candidate_id, new_index)
                else {
                    return;
                };
                for (stop_id, order_index) in assignments {
                    if let Some(stop) = route.stops.iter_mut().find(|stop| stop.id == stop_id) {
                        stop.order_index = order_index;
                    }
                }
                route.stops.sort_by_key(|stop| stop.order_index);
            },
            |store| store.reorder_stop(route_id, candidate_id, new_index),
        )
    }

    /// Move a route to a new lifecycle state.
    ///
    /// Routes leaving [`RouteStatus::Active`] drop out of the view and
    /// stop affecting eligibility.
    ///
    /// # Errors
    /// Returns [`MutationError::InFlight`] when the route already has a
    /// mutation pending, or the store's error when persistence fails.
    pub fn set_route_status(
        &mut self,
        route_id: RouteId,
        status: RouteStatus,
    ) -> Result<(), MutationError> {
        self.mutate(
            MutationTarget::Route(route_id),
            |routes| {
                if status != RouteStatus::Active {
                    routes.retain(|route| route.id != route_id);
                }
            },
            |store| store.set_route_status(route_id, status),
        )
    }

    /// Delete a route and its stops.
    ///
    /// Visited stops on the route disappear with it, so the candidates
    /// they suppressed become eligible again on the next derivation.
    ///
    /// # Errors
    /// Returns [`MutationError::InFlight`] when the route already has a
    /// mutation pending, or the store's error when persistence fails.
    pub fn delete_route(&mut self, route_id: RouteId) -> Result<(), MutationError> {
        self.mutate(
            MutationTarget::Route(route_id),
            |routes| routes.retain(|route| route.id != route_id),
            |store| store.delete_route(route_id),
        )
    }

    /// Optimistic mutation plumbing shared by every route edit.
    ///
    /// Applies `apply` to the view, then `persist` to the store. On
    /// success the target commits and the view reloads; on failure the
    /// view snapshot is restored and the target rolls back.
    fn mutate<A, P>(
        &mut self,
        target: MutationTarget,
        apply: A,
        persist: P,
    ) -> Result<(), MutationError>
    where
        A: FnOnce(&mut Vec<Route>),
        P: FnOnce(&mut S) -> Result<(), StoreError>,
    {
        self.tracker.begin(target)?;
        let snapshot = self.routes.clone();
        apply(&mut self.routes);
        match persist(&mut self.store) {
            Ok(()) => {
                self.tracker.commit(target);
                self.refresh()?;
                Ok(())
            }
            Err(err) => {
                self.routes = snapshot;
                self.tracker.roll_back(target);
                Err(err.into())
            }
        }
    }
}

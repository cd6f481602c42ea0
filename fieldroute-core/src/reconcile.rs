//! Reconciliation of the two "already visited" signals.
//!
//! A candidate can be flagged visited on its own record, and a stop
//! visiting it can be marked visited on an active route. Either signal
//! makes the candidate ineligible for new route requests. The set is
//! derived from current data on every call rather than cached, so
//! deleting a route or unmarking a stop restores eligibility immediately
//! with no invalidation to forget.

use std::collections::HashSet;

use crate::candidate::Candidate;
use crate::store::Route;

/// Candidate ids with a visited stop on any of the given routes.
///
/// Depot stops count too: a depot marked visited was still visited.
#[must_use]
pub fn route_visited_ids(routes: &[Route]) -> HashSet<u64> {
    routes
        .iter()
        .flat_map(|route| route.stops.iter())
        .filter(|stop| stop.visited)
        .map(|stop| stop.candidate_id)
        .collect()
}

/// Derive the candidates ineligible for new route requests.
///
/// The union of candidates whose own record is flagged visited and
/// candidates with a visited stop on any route in `active_routes`.
/// Callers pass the current active routes; finished, cancelled, and
/// deleted routes never reach this function and so cannot suppress a
/// candidate.
///
/// # Examples
/// ```
/// use fieldroute_core::{Candidate, ineligible_candidates};
///
/// let mut flagged = Candidate::ungeocoded(5);
/// flagged.visited = true;
/// let pool = vec![flagged, Candidate::ungeocoded(6)];
///
/// let ineligible = ineligible_candidates(&pool, &[]);
/// assert!(ineligible.contains(&5));
/// assert!(!ineligible.contains(&6));
/// ```
#[must_use]
pub fn ineligible_candidates(pool: &[Candidate], active_routes: &[Route]) -> HashSet<u64> {
    let mut ineligible: HashSet<u64> = pool
        .iter()
        .filter(|candidate| candidate.visited)
        .map(|candidate| candidate.id)
        .collect();
    ineligible.extend(route_visited_ids(active_routes));
    ineligible
}

//! Assembly of bounded, depot-first route requests.
//!
//! [`RouteRequestBuilder`] turns the candidate pool, the operator's
//! selection or drawn area, and the current ineligibility view into a
//! [`RouteRequest`] the optimiser will accept. Every rule that bounds a
//! request lives here: candidates without coordinates never pass, visited
//! candidates never pass unless they are the depot, and the 25-candidate
//! cap is enforced in exactly one place.

use std::collections::HashSet;

use geo::Coord;
use thiserror::Error;

use crate::candidate::Candidate;
use crate::geometry::nearest_candidate;
use crate::selection::SelectionSet;
use crate::solver::{SolverCandidate, SolverRequest};

/// Upper bound on candidates per request, including the depot.
///
/// The optimiser rejects larger requests, so the builder never produces
/// one.
pub const MAX_REQUEST_CANDIDATES: usize = 25;

/// Errors raised while assembling a route request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildRequestError {
    /// Filtering left nothing to route.
    #[error("no routable candidates remain after filtering")]
    EmptyCandidatePool,
    /// A manual selection holds more candidates than a request may carry.
    ///
    /// Only manual selections fail this way; area selections are
    /// truncated instead, because the operator never counted the matches
    /// by hand.
    #[error("{selected} candidates selected but a request holds at most {max} besides the depot")]
    CandidateLimitExceeded {
        /// Number of non-depot candidates that survived filtering.
        selected: usize,
        /// Maximum non-depot candidates per request.
        max: usize,
    },
    /// No depot candidate could be resolved.
    #[error("no depot could be resolved: {message}")]
    DepotUnresolved {
        /// Why resolution failed.
        message: String,
    },
}

/// How the route's starting point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DepotChoice {
    /// Use the first routable candidate from the active selection.
    #[default]
    Default,
    /// Use this candidate, whether or not it is selected or eligible.
    Candidate(u64),
    /// Resolve the geocoded candidate nearest to a dropped map pin.
    Pin(Coord<f64>),
}

/// A bounded, depot-first request ready for the optimiser.
///
/// Instances only come out of [`RouteRequestBuilder::build`], so holding
/// one means the invariants already hold: every candidate is geocoded,
/// the depot is the first entry, and the list never exceeds
/// [`MAX_REQUEST_CANDIDATES`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteRequest {
    /// Candidate acting as the start and end of the tour.
    pub depot_id: u64,
    /// Depot position; WGS84 with `x = longitude` and `y = latitude`.
    pub depot_location: Coord<f64>,
    /// Routed candidates with the depot first.
    pub candidates: Vec<Candidate>,
    /// Number of vehicles to route; always one today.
    pub vehicle_count: u32,
    /// Tag stamped onto routes built from this request.
    pub route_tag: String,
}

impl RouteRequest {
    /// Convert to the optimiser's wire shape.
    #[must_use]
    pub fn to_solver_request(&self) -> SolverRequest {
        // Built requests only contain geocoded candidates.
        let candidates = self
            .candidates
            .iter()
            .filter_map(|candidate| {
                candidate.location.map(|location| SolverCandidate {
                    id: candidate.id,
                    lat: location.y,
                    lng: location.x,
                })
            })
            .collect();
        SolverRequest {
            candidates,
            depot_id: self.depot_id,
            depot_lat: self.depot_location.y,
            depot_lon: self.depot_location.x,
            vehicle_count: self.vehicle_count,
            route_tag: self.route_tag.clone(),
        }
    }
}

/// Builder that filters, caps, and orders candidates into a
/// [`RouteRequest`].
///
/// # Examples
/// ```
/// use std::collections::HashSet;
///
/// use fieldroute_core::{Candidate, RouteRequestBuilder, SelectionSet};
/// use geo::Coord;
///
/// let pool = vec![
///     Candidate::located(1, Coord { x: -98.50, y: 29.50 }),
///     Candidate::located(2, Coord { x: -98.49, y: 29.51 }),
/// ];
/// let selection: SelectionSet = [1, 2].into_iter().collect();
/// let request = RouteRequestBuilder::new(&pool, &selection, HashSet::new())
///     .with_route_tag("southside")
///     .build()
///     .unwrap();
/// assert_eq!(request.depot_id, 1);
/// assert_eq!(request.candidates.len(), 2);
/// ```
#[derive(Debug)]
pub struct RouteRequestBuilder<'a> {
    pool: &'a [Candidate],
    selection: &'a SelectionSet,
    ineligible: HashSet<u64>,
    area: Option<Vec<u64>>,
    depot: DepotChoice,
    route_tag: String,
}

impl<'a> RouteRequestBuilder<'a> {
    /// Start a builder over the candidate pool.
    ///
    /// `ineligible` is the reconciled set of candidates that must not be
    /// routed again; the depot is exempt from it.
    #[must_use]
    pub fn new(pool: &'a [Candidate], selection: &'a SelectionSet, ineligible: HashSet<u64>) -> Self {
        Self {
            pool,
            selection,
            ineligible,
            area: None,
            depot: DepotChoice::Default,
            route_tag: String::new(),
        }
    }

    /// Route the candidates matched by a drawn area instead of the
    /// manual selection.
    ///
    /// Area matches replace the selection entirely; they do not merge
    /// with it.
    #[must_use]
    pub fn with_area_result(mut self, ids: Vec<u64>) -> Self {
        self.area = Some(ids);
        self
    }

    /// Choose how the depot is resolved.
    #[must_use]
    pub fn with_depot(mut self, depot: DepotChoice) -> Self {
        self.depot = depot;
        self
    }

    /// Tag the routes built from this request.
    #[must_use]
    pub fn with_route_tag(mut self, tag: impl Into<String>) -> Self {
        self.route_tag = tag.into();
        self
    }

    /// Assemble the request.
    ///
    /// Filtering happens in a fixed order: candidates without
    /// coordinates are dropped first, then candidates in the ineligible
    /// set, with the depot exempt from the ineligibility rule. The depot
    /// is always injected as the first entry even when the selection or
    /// area did not include it.
    ///
    /// # Errors
    /// - [`BuildRequestError::DepotUnresolved`] when an explicit depot is
    ///   unknown or has no coordinates, or a pin finds no geocoded
    ///   candidate.
    /// - [`BuildRequestError::EmptyCandidatePool`] when filtering leaves
    ///   no stop to visit.
    /// - [`BuildRequestError::CandidateLimitExceeded`] when a manual
    ///   selection exceeds the cap; area matches are truncated instead.
    pub fn build(self) -> Result<RouteRequest, BuildRequestError> {
        let area_ids: Option<HashSet<u64>> = self
            .area
            .as_ref()
            .map(|ids| ids.iter().copied().collect());
        let picked = |candidate: &Candidate| match &area_ids {
            Some(ids) => ids.contains(&candidate.id),
            None => self.selection.contains(candidate.id),
        };

        let depot = self.resolve_depot(&picked)?;
        let depot_location = depot
            .location
            .ok_or_else(|| BuildRequestError::DepotUnresolved {
                message: format!("candidate {} has no coordinates", depot.id),
            })?;
        let routable = |candidate: &Candidate| {
            candidate.id != depot.id
                && picked(candidate)
                && candidate.has_location()
                && !self.ineligible.contains(&candidate.id)
        };
        let stops: Vec<&Candidate> = self
            .pool
            .iter()
            .filter(|candidate| routable(candidate))
            .collect();
        if stops.is_empty() {
            return Err(BuildRequestError::EmptyCandidatePool);
        }
        let stops = cap_candidates(stops, self.area.is_none())?;

        let mut candidates = Vec::with_capacity(stops.len() + 1);
        candidates.push(depot.clone());
        candidates.extend(stops.into_iter().cloned());
        Ok(RouteRequest {
            depot_id: depot.id,
            depot_location,
            candidates,
            vehicle_count: 1,
            route_tag: self.route_tag,
        })
    }

    fn resolve_depot(
        &self,
        picked: &dyn Fn(&Candidate) -> bool,
    ) -> Result<&'a Candidate, BuildRequestError> {
        match self.depot {
            DepotChoice::Candidate(id) => {
                let candidate = self
                    .pool
                    .iter()
                    .find(|candidate| candidate.id == id)
                    .ok_or_else(|| BuildRequestError::DepotUnresolved {
                        message: format!("candidate {id} is not in the pool"),
                    })?;
                if candidate.has_location() {
                    Ok(candidate)
                } else {
                    Err(BuildRequestError::DepotUnresolved {
                        message: format!("candidate {id} has no coordinates"),
                    })
                }
            }
            DepotChoice::Pin(pin) => nearest_candidate(pin, self.pool).ok_or_else(|| {
                BuildRequestError::DepotUnresolved {
                    message: "no geocoded candidate near the pin".into(),
                }
            }),
            DepotChoice::Default => self
                .pool
                .iter()
                .find(|candidate| {
                    picked(candidate)
                        && candidate.has_location()
                        && !self.ineligible.contains(&candidate.id)
                })
                .ok_or(BuildRequestError::EmptyCandidatePool),
        }
    }
}

/// Single enforcement point for [`MAX_REQUEST_CANDIDATES`].
///
/// `manual` selections beyond the cap are the operator's mistake and
/// fail loudly; area matches are truncated in pool order because the
/// operator never counted them.
fn cap_candidates(
    mut stops: Vec<&Candidate>,
    manual: bool,
) -> Result<Vec<&Candidate>, BuildRequestError> {
    let max_stops = MAX_REQUEST_CANDIDATES - 1;
    if stops.len() > max_stops {
        if manual {
            return Err(BuildRequestError::CandidateLimitExceeded {
                selected: stops.len(),
                max: max_stops,
            });
        }
        stops.truncate(max_stops);
    }
    Ok(stops)
}

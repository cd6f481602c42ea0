//! Boundary to the external route optimisation service.
//!
//! The optimiser is a remote service owned by another team; this module
//! pins down the request and response shapes it speaks and the
//! [`RouteSolver`] trait the rest of the engine calls through. Transport
//! lives elsewhere, so planning logic can be exercised against scripted
//! solvers in tests.

use thiserror::Error;

/// Errors surfaced when asking the optimiser for a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveRouteError {
    /// The service answered but produced no usable route.
    #[error("no usable route: {message}")]
    Unsolvable {
        /// Explanation of why no route was produced.
        message: String,
    },
    /// The service could not be reached.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Endpoint the request targeted.
        url: String,
        /// Transport-level failure description.
        message: String,
    },
    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint the request targeted.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("solver at {url} returned status {status}: {message}")]
    Http {
        /// Endpoint the request targeted.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode solver response: {message}")]
    Parse {
        /// Decoding failure description.
        message: String,
    },
}

/// One candidate as the optimiser expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverCandidate {
    /// Candidate id, echoed back in waypoints.
    pub id: u64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Request payload for the optimiser.
///
/// Field names follow the service's JSON contract, which spells the
/// depot longitude `depotLon` while waypoints use `lng`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SolverRequest {
    /// Every routed candidate, depot first.
    pub candidates: Vec<SolverCandidate>,
    /// Candidate acting as the start and end of the tour.
    pub depot_id: u64,
    /// Depot latitude in degrees.
    pub depot_lat: f64,
    /// Depot longitude in degrees.
    pub depot_lon: f64,
    /// Number of vehicles to route; always one today.
    pub vehicle_count: u32,
    /// Tag stamped onto the routes built from this request.
    pub route_tag: String,
}

/// One ordered waypoint in a solved route.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Waypoint {
    /// Candidate id this waypoint visits.
    pub id: u64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Position within the route; the depot is order zero.
    pub order: u32,
    /// Whether this waypoint is the depot rather than a stop.
    pub is_depot: bool,
}

/// One route in the optimiser's answer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SolverRoute {
    /// Waypoints in visiting order, depot first.
    pub waypoints: Vec<Waypoint>,
    /// Driving distance for this route in kilometres.
    #[cfg_attr(feature = "serde", serde(default))]
    pub distance_km: f64,
}

impl SolverRoute {
    /// Number of stops to visit, excluding the depot.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.waypoints
            .iter()
            .filter(|waypoint| !waypoint.is_depot)
            .count()
    }
}

/// Response payload from the optimiser.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SolverResponse {
    /// Whether the service considers the solve successful.
    pub success: bool,
    /// Solved routes; empty when the solve failed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub routes: Vec<SolverRoute>,
    /// Total driving distance across all routes in kilometres.
    #[cfg_attr(feature = "serde", serde(default))]
    pub total_distance_km: f64,
}

impl SolverResponse {
    /// Number of stops across all routes, excluding depots.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.routes.iter().map(SolverRoute::stop_count).sum()
    }

    /// Reject answers that carry no usable route.
    ///
    /// A response with `success = false`, or one that claims success but
    /// contains no routes, becomes [`SolveRouteError::Unsolvable`] here
    /// so callers never persist an empty result.
    ///
    /// # Errors
    /// Returns [`SolveRouteError::Unsolvable`] when the response holds no
    /// usable route.
    pub fn checked(self) -> Result<Self, SolveRouteError> {
        if !self.success {
            return Err(SolveRouteError::Unsolvable {
                message: "solver reported failure".into(),
            });
        }
        if self.routes.is_empty() {
            return Err(SolveRouteError::Unsolvable {
                message: "solver returned no routes".into(),
            });
        }
        Ok(self)
    }
}

/// Strategy interface for route optimisation.
///
/// Implementations call the remote optimiser or stand in for it in
/// tests. Solving is synchronous from the caller's point of view;
/// transport adapters own whatever async machinery they need.
///
/// # Examples
/// ```
/// use fieldroute_core::{RouteSolver, SolveRouteError, SolverRequest, SolverResponse};
///
/// struct Unavailable;
///
/// impl RouteSolver for Unavailable {
///     fn solve(&self, _request: &SolverRequest) -> Result<SolverResponse, SolveRouteError> {
///         Err(SolveRouteError::Network {
///             url: "http://solver.invalid".into(),
///             message: "connection refused".into(),
///         })
///     }
/// }
/// ```
pub trait RouteSolver: Send + Sync {
    /// Solve a routing request.
    ///
    /// # Errors
    /// Returns a [`SolveRouteError`] when the optimiser cannot be
    /// reached, rejects the request, or answers with something that
    /// cannot be decoded.
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse, SolveRouteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint(id: u64, order: u32, is_depot: bool) -> Waypoint {
        Waypoint {
            id,
            lat: 29.5,
            lng: -98.5,
            order,
            is_depot,
        }
    }

    #[test]
    fn stop_count_excludes_depot() {
        let route = SolverRoute {
            waypoints: vec![
                waypoint(1, 0, true),
                waypoint(2, 1, false),
                waypoint(3, 2, false),
            ],
            distance_km: 12.5,
        };
        assert_eq!(route.stop_count(), 2);
    }

    #[test]
    fn checked_rejects_reported_failure() {
        let response = SolverResponse {
            success: false,
            routes: vec![],
            total_distance_km: 0.0,
        };
        assert!(matches!(
            response.checked(),
            Err(SolveRouteError::Unsolvable { .. })
        ));
    }

    #[test]
    fn checked_rejects_success_without_routes() {
        let response = SolverResponse {
            success: true,
            routes: vec![],
            total_distance_km: 0.0,
        };
        assert!(matches!(
            response.checked(),
            Err(SolveRouteError::Unsolvable { .. })
        ));
    }

    #[test]
    fn checked_passes_usable_responses_through() {
        let response = SolverResponse {
            success: true,
            routes: vec![SolverRoute {
                waypoints: vec![waypoint(1, 0, true), waypoint(2, 1, false)],
                distance_km: 3.0,
            }],
            total_distance_km: 3.0,
        };
        let checked = response.clone().checked().unwrap();
        assert_eq!(checked, response);
        assert_eq!(checked.stop_count(), 1);
    }

    #[cfg(feature = "serde")]
    mod wire {
        use super::*;

        #[test]
        fn request_serialises_with_contract_field_names() {
            let request = SolverRequest {
                candidates: vec![SolverCandidate {
                    id: 4,
                    lat: 29.5,
                    lng: -98.5,
                }],
                depot_id: 4,
                depot_lat: 29.5,
                depot_lon: -98.5,
                vehicle_count: 1,
                route_tag: "southside".into(),
            };
            let json = serde_json::to_value(&request).unwrap();
            assert_eq!(json["depotId"], 4);
            assert_eq!(json["depotLat"], 29.5);
            assert_eq!(json["depotLon"], -98.5);
            assert_eq!(json["vehicleCount"], 1);
            assert_eq!(json["routeTag"], "southside");
            assert_eq!(json["candidates"][0]["lng"], -98.5);
        }

        #[test]
        fn response_deserialises_from_contract_payload() {
            let payload = r#"{
                "success": true,
                "routes": [{
                    "waypoints": [
                        {"id": 4, "lat": 29.5, "lng": -98.5, "order": 0, "isDepot": true},
                        {"id": 9, "lat": 29.51, "lng": -98.49, "order": 1, "isDepot": false}
                    ],
                    "distanceKm": 2.4
                }],
                "totalDistanceKm": 2.4
            }"#;
            let response: SolverResponse = serde_json::from_str(payload).unwrap();
            assert!(response.success);
            assert_eq!(response.stop_count(), 1);
            assert!((response.total_distance_km - 2.4).abs() < f64::EPSILON);
        }

        #[test]
        fn response_tolerates_missing_routes_on_failure() {
            let response: SolverResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
            assert!(!response.success);
            assert!(response.routes.is_empty());
        }
    }
}

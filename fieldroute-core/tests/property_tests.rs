//! Property-based tests for geometry and request assembly.
//!
//! These use `proptest` to assert invariants that must hold for all
//! inputs, complementing the example-based unit tests.
//!
//! # Invariants tested
//!
//! - **Distance sanity:** haversine distance is symmetric, non-negative,
//!   and zero between identical points.
//! - **Cap compliance:** no built request ever exceeds the candidate
//!   cap, whatever the pool and selection look like.
//! - **Area leniency:** area-driven requests truncate rather than fail.
//! - **Degeneracy:** polygons with fewer than three vertices contain
//!   nothing.
//! - **Reorder permutation:** reordering rewrites positions but never
//!   gains, loses, or duplicates a stop.

use std::collections::HashSet;

use fieldroute_core::store::compute_reorder;
use fieldroute_core::{
    BuildRequestError, Candidate, MAX_REQUEST_CANDIDATES, Region, RouteRequestBuilder, RouteStop,
    SelectionSet, haversine_km,
};
use geo::Coord;
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = Coord<f64>> {
    (-180.0_f64..180.0, -85.0_f64..85.0).prop_map(|(x, y)| Coord { x, y })
}

fn pool() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((any::<bool>(), coord(), any::<bool>()), 1..60).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (located, location, visited))| {
                Candidate::new(index as u64 + 1, located.then_some(location), visited)
            })
            .collect()
    })
}

fn stops_with_depot(stop_count: usize) -> Vec<RouteStop> {
    let mut stops = vec![RouteStop {
        id: 100,
        route_id: 1,
        candidate_id: 100,
        order_index: 0,
        is_depot: true,
        visited: false,
        visited_at: None,
        visited_by: None,
    }];
    for offset in 0..stop_count {
        stops.push(RouteStop {
            id: 101 + offset as i64,
            route_id: 1,
            candidate_id: 101 + offset as u64,
            order_index: 1 + offset as u32,
            is_depot: false,
            visited: false,
            visited_at: None,
            visited_by: None,
        });
    }
    stops
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: haversine distance is symmetric and non-negative.
    #[test]
    fn haversine_is_symmetric_and_non_negative(a in coord(), b in coord()) {
        let forward = haversine_km(a, b);
        let backward = haversine_km(b, a);
        prop_assert!(forward >= 0.0);
        prop_assert!((forward - backward).abs() < 1e-9);
    }

    /// Property: the distance from a point to itself is zero.
    #[test]
    fn haversine_of_identical_points_is_zero(a in coord()) {
        prop_assert!(haversine_km(a, a).abs() < 1e-9);
    }

    /// Property: whatever the pool and selection, a built request holds
    /// at most the cap, starts with its depot, contains only geocoded
    /// candidates, and never repeats an id.
    #[test]
    fn built_requests_respect_their_invariants(
        pool in pool(),
        selected in prop::collection::hash_set(1_u64..=60, 0..60),
    ) {
        let selection: SelectionSet = selected.into_iter().collect();
        let result = RouteRequestBuilder::new(&pool, &selection, HashSet::new()).build();
        if let Ok(request) = result {
            prop_assert!(request.candidates.len() <= MAX_REQUEST_CANDIDATES);
            prop_assert_eq!(request.candidates[0].id, request.depot_id);
            prop_assert!(request.candidates.iter().all(Candidate::has_location));
            let ids: HashSet<u64> = request.candidates.iter().map(|c| c.id).collect();
            prop_assert_eq!(ids.len(), request.candidates.len());
        }
    }

    /// Property: area-driven requests are truncated to the cap, never
    /// rejected for being too large.
    #[test]
    fn area_requests_truncate_instead_of_failing(
        pool in pool(),
        area in prop::collection::vec(1_u64..=60, 0..60),
    ) {
        let selection = SelectionSet::new();
        let result = RouteRequestBuilder::new(&pool, &selection, HashSet::new())
            .with_area_result(area)
            .build();
        match result {
            Ok(request) => prop_assert!(request.candidates.len() <= MAX_REQUEST_CANDIDATES),
            Err(err) => prop_assert_eq!(err, BuildRequestError::EmptyCandidatePool),
        }
    }

    /// Property: a polygon with fewer than three vertices contains no
    /// point at all.
    #[test]
    fn degenerate_polygons_contain_nothing(
        point in coord(),
        vertices in prop::collection::vec(coord(), 0..3),
    ) {
        let region = Region::Polygon { vertices };
        prop_assert!(!region.contains(point));
        prop_assert!(region.validate().is_err());
    }

    /// Property: a bounding box spanned by two points contains both of
    /// them and their midpoint, edges included.
    #[test]
    fn bounding_boxes_include_their_bounds(a in coord(), b in coord()) {
        let region = Region::BoundingBox {
            north: a.y.max(b.y),
            south: a.y.min(b.y),
            east: a.x.max(b.x),
            west: a.x.min(b.x),
        };
        prop_assert!(region.contains(a));
        prop_assert!(region.contains(b));
        let middle = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        prop_assert!(region.contains(middle));
    }

    /// Property: reordering any stop to any index keeps exactly the same
    /// set of non-depot stops and assigns consecutive positions after
    /// the depot.
    #[test]
    fn reorder_is_a_permutation(
        stop_count in 1_usize..10,
        moved in 0_usize..10,
        new_index in 0_u32..12,
    ) {
        let stops = stops_with_depot(stop_count);
        let candidate_id = 101 + (moved % stop_count) as u64;

        let assignments = compute_reorder(1, &stops, candidate_id, new_index)
            .expect("candidate is on the route");

        let mut ids: Vec<i64> = assignments.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        let mut expected_ids: Vec<i64> = stops
            .iter()
            .filter(|stop| !stop.is_depot)
            .map(|stop| stop.id)
            .collect();
        expected_ids.sort_unstable();
        prop_assert_eq!(ids, expected_ids);

        let mut orders: Vec<u32> = assignments.iter().map(|(_, order)| *order).collect();
        orders.sort_unstable();
        let expected_orders: Vec<u32> = (1..=stop_count as u32).collect();
        prop_assert_eq!(orders, expected_orders);
    }
}

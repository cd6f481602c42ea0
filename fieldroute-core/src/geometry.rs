//! Regions and great-circle helpers for candidate filtering.
//!
//! Operators draw an area on the map to select every candidate inside it;
//! [`Region`] models the three supported shapes and answers point
//! containment. [`haversine_km`] and [`nearest_candidate`] back the
//! depot-pin workflow, where a dropped pin resolves to the closest
//! geocoded candidate.
//!
//! All coordinates are WGS84 with `x = longitude` and `y = latitude`.
//! Regions that cross the antimeridian are not modelled; callers split
//! such areas into two requests.

use geo::{Coord, Intersects, Rect};
use thiserror::Error;

use crate::candidate::Candidate;

/// Mean Earth radius in kilometres, as used by the distance helpers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors raised when a region cannot bound any area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A polygon needs at least three vertices to enclose anything.
    #[error("polygon with {vertices} vertices cannot enclose an area")]
    DegeneratePolygon {
        /// Number of vertices supplied.
        vertices: usize,
    },
}

/// An operator-drawn geographic area used to select candidates in bulk.
///
/// # Examples
/// ```
/// use fieldroute_core::Region;
/// use geo::Coord;
///
/// let region = Region::BoundingBox {
///     north: 29.6,
///     south: 29.4,
///     east: -98.3,
///     west: -98.6,
/// };
/// assert!(region.contains(Coord { x: -98.5, y: 29.5 }));
/// assert!(!region.contains(Coord { x: -97.0, y: 29.5 }));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// Axis-aligned latitude/longitude box. Bounds are inclusive, so a
    /// candidate sitting exactly on an edge is inside.
    BoundingBox {
        /// Northern latitude bound in degrees.
        north: f64,
        /// Southern latitude bound in degrees.
        south: f64,
        /// Eastern longitude bound in degrees.
        east: f64,
        /// Western longitude bound in degrees.
        west: f64,
    },
    /// Every point within `radius_km` of `center`, measured along the
    /// great circle. The boundary itself is inside.
    Circle {
        /// Centre of the circle.
        center: Coord<f64>,
        /// Radius in kilometres.
        radius_km: f64,
    },
    /// A closed polygon; the last vertex is implicitly joined to the
    /// first. Containment uses the even-odd rule, so self-intersecting
    /// outlines behave the way map drawing tools show them.
    Polygon {
        /// Polygon outline in drawing order.
        vertices: Vec<Coord<f64>>,
    },
}

impl Region {
    /// Check that the region can enclose an area.
    ///
    /// A polygon with fewer than three vertices contains nothing and is
    /// rejected here so the operator learns about the bad outline before
    /// a filter quietly returns an empty result.
    ///
    /// # Errors
    /// Returns [`GeometryError::DegeneratePolygon`] for a polygon with
    /// fewer than three vertices.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Self::Polygon { vertices } if vertices.len() < 3 => {
                Err(GeometryError::DegeneratePolygon {
                    vertices: vertices.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Whether `point` lies inside the region.
    ///
    /// Degenerate polygons contain nothing; use [`Region::validate`] to
    /// surface them as errors instead.
    #[must_use]
    pub fn contains(&self, point: Coord<f64>) -> bool {
        match self {
            Self::BoundingBox {
                north,
                south,
                east,
                west,
            } => {
                let bbox = Rect::new(
                    Coord {
                        x: *west,
                        y: *south,
                    },
                    Coord {
                        x: *east,
                        y: *north,
                    },
                );
                bbox.intersects(&point)
            }
            Self::Circle { center, radius_km } => haversine_km(*center, point) <= *radius_km,
            Self::Polygon { vertices } => polygon_contains(vertices, point),
        }
    }

    /// Collect the ids of every geocoded candidate inside the region.
    ///
    /// Candidates without a position are skipped; ids are returned in
    /// pool order.
    ///
    /// # Errors
    /// Returns [`GeometryError::DegeneratePolygon`] without filtering
    /// anything when the region fails [`Region::validate`].
    ///
    /// # Examples
    /// ```
    /// use fieldroute_core::{Candidate, Region};
    /// use geo::Coord;
    ///
    /// let pool = vec![
    ///     Candidate::located(1, Coord { x: -98.5, y: 29.5 }),
    ///     Candidate::located(2, Coord { x: -97.0, y: 29.5 }),
    /// ];
    /// let region = Region::Circle {
    ///     center: Coord { x: -98.5, y: 29.5 },
    ///     radius_km: 5.0,
    /// };
    /// assert_eq!(region.filter(&pool).unwrap(), vec![1]);
    /// ```
    pub fn filter(&self, pool: &[Candidate]) -> Result<Vec<u64>, GeometryError> {
        self.validate()?;
        Ok(pool
            .iter()
            .filter(|candidate| {
                candidate
                    .location
                    .is_some_and(|location| self.contains(location))
            })
            .map(|candidate| candidate.id)
            .collect())
    }
}

/// Great-circle distance between two WGS84 points in kilometres.
///
/// Uses the haversine formula with a mean Earth radius of
/// [`EARTH_RADIUS_KM`]; accurate to well under a percent at field-visit
/// scales.
///
/// # Examples
/// ```
/// use fieldroute_core::haversine_km;
/// use geo::Coord;
///
/// let a = Coord { x: -98.5, y: 29.5 };
/// assert_eq!(haversine_km(a, a), 0.0);
/// ```
#[must_use]
pub fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let lat_a = a.y.to_radians();
    let lat_b = b.y.to_radians();
    let d_lat = (b.y - a.y).to_radians();
    let d_lng = (b.x - a.x).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Find the geocoded candidate closest to `point`.
///
/// Scans the pool linearly; with at most a few thousand candidates per
/// market an index buys nothing. Ties keep the earliest candidate in pool
/// order so repeated calls resolve the same pin identically. Returns
/// `None` when no candidate has a position.
#[must_use]
pub fn nearest_candidate(point: Coord<f64>, pool: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in pool {
        let Some(location) = candidate.location else {
            continue;
        };
        let distance = haversine_km(point, location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Even-odd ray cast along increasing `x`.
fn polygon_contains(vertices: &[Coord<f64>], point: Coord<f64>) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut previous = vertices.len() - 1;
    for current in 0..vertices.len() {
        let a = vertices[current];
        let b = vertices[previous];
        let crosses = (a.y > point.y) != (b.y > point.y);
        if crosses {
            let x_at_crossing = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_at_crossing {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

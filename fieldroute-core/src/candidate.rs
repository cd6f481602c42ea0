use geo::Coord;

/// A property eligible for inclusion in a planned route.
///
/// Candidates are a read-only projection of the surrounding application's
/// property records: the record id, the geocoded position when one exists,
/// and the record's own visited flag. Coordinates are WGS84 with
/// `x = longitude` and `y = latitude`.
///
/// A candidate without a position can never enter a route request; the
/// request builder drops it before anything else happens.
///
/// # Examples
/// ```
/// use fieldroute_core::Candidate;
/// use geo::Coord;
///
/// let candidate = Candidate::located(7, Coord { x: -98.5, y: 29.5 });
/// assert!(candidate.has_location());
/// assert!(!candidate.visited);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    /// Identifier of the underlying property record.
    pub id: u64,
    /// Geocoded position, when the record has one.
    pub location: Option<Coord<f64>>,
    /// The record's own visited flag, independent of any route stop.
    #[cfg_attr(feature = "serde", serde(default))]
    pub visited: bool,
}

impl Candidate {
    /// Create a candidate from its raw parts.
    #[must_use]
    pub fn new(id: u64, location: Option<Coord<f64>>, visited: bool) -> Self {
        Self {
            id,
            location,
            visited,
        }
    }

    /// Create an unvisited candidate at a known position.
    ///
    /// # Examples
    /// ```
    /// use fieldroute_core::Candidate;
    /// use geo::Coord;
    ///
    /// let candidate = Candidate::located(3, Coord { x: -98.49, y: 29.42 });
    /// assert_eq!(candidate.id, 3);
    /// ```
    #[must_use]
    pub fn located(id: u64, location: Coord<f64>) -> Self {
        Self::new(id, Some(location), false)
    }

    /// Create an unvisited candidate that has not been geocoded yet.
    #[must_use]
    pub fn ungeocoded(id: u64) -> Self {
        Self::new(id, None, false)
    }

    /// Whether the candidate has a geocoded position.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}

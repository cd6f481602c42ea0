//! Lead-application wire records for the candidate feed.
//!
//! Deserialisation types for the property endpoints. The application
//! spells coordinates out in full (`latitude`, `longitude`) where the
//! optimiser contract abbreviates them; conversion to the engine's
//! [`Candidate`] shape happens here so nothing downstream sees the
//! application's field names.

use fieldroute_core::Candidate;
use geo::Coord;
use serde::{Deserialize, Serialize};

/// One property record as the application serves it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CandidateRecord {
    /// Stable record id.
    pub id: u64,
    /// Latitude in degrees; absent until the record is geocoded.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees; absent until the record is geocoded.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// The application's own visited flag for the record.
    #[serde(default)]
    pub visited: bool,
}

impl CandidateRecord {
    /// Convert into the engine's candidate type.
    ///
    /// A record missing either coordinate comes through ungeocoded; the
    /// request builder drops such candidates until a geocode run fills
    /// them in.
    #[must_use]
    pub fn into_candidate(self) -> Candidate {
        let location = match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => Some(Coord {
                x: longitude,
                y: latitude,
            }),
            _ => None,
        };
        Candidate::new(self.id, location, self.visited)
    }
}

/// Body for the batch geocode endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeocodeBatchRequest {
    /// Maximum number of records to geocode in this call.
    pub limit: u32,
    /// Position in the full record list to start from.
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialise_geocoded_record() {
        let json = r#"{
            "id": 42,
            "latitude": 29.4241,
            "longitude": -98.4936,
            "visited": true
        }"#;

        let record: CandidateRecord = serde_json::from_str(json).expect("should deserialise");

        assert_eq!(record.id, 42);
        assert_eq!(record.latitude, Some(29.4241));
        assert!(record.visited);
    }

    #[test]
    fn deserialise_record_without_coordinates() {
        let json = r#"{"id": 7}"#;

        let record: CandidateRecord = serde_json::from_str(json).expect("should deserialise");

        assert_eq!(record.id, 7);
        assert!(record.latitude.is_none());
        assert!(record.longitude.is_none());
        assert!(!record.visited);
    }

    #[test]
    fn geocoded_record_becomes_located_candidate() {
        let record = CandidateRecord {
            id: 3,
            latitude: Some(29.5),
            longitude: Some(-98.5),
            visited: false,
        };

        let candidate = record.into_candidate();

        assert_eq!(candidate.id, 3);
        assert_eq!(candidate.location, Some(Coord { x: -98.5, y: 29.5 }));
    }

    #[test]
    fn half_geocoded_record_stays_ungeocoded() {
        let record = CandidateRecord {
            id: 3,
            latitude: Some(29.5),
            longitude: None,
            visited: false,
        };

        let candidate = record.into_candidate();

        assert!(!candidate.has_location());
    }

    #[test]
    fn geocode_request_serialises_plain_fields() {
        let body = GeocodeBatchRequest {
            limit: 25,
            offset: 75,
        };

        let json = serde_json::to_value(body).expect("should serialise");

        assert_eq!(json["limit"], 25);
        assert_eq!(json["offset"], 75);
    }
}

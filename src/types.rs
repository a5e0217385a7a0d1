use serde::{Deserialize, Serialize};

/// A normalized artist name as received from a client request.
///
/// The lower-cased, trimmed form is what keys the cache and drives the
/// name-match gate; the original casing is preserved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistQuery(String);

impl ArtistQuery {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cache_key(&self) -> String {
        format!("artist:{}", self.0.to_lowercase())
    }
}

/// Administrative area types carried by music-metadata areas.
///
/// `Other` and `Null` are distinct: `Other` is a recognized-but-unranked
/// type string (still carries *some* classification), while `Null` is the
/// absence of a type field entirely. The two rank differently — see
/// `area_rank::area_specificity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AreaType {
    Country,
    Subdivision,
    County,
    City,
    Municipality,
    District,
    Town,
    Village,
    Island,
    Other,
    Null,
}

impl AreaType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Country" => AreaType::Country,
            "Subdivision" => AreaType::Subdivision,
            "County" => AreaType::County,
            "City" => AreaType::City,
            "Municipality" => AreaType::Municipality,
            "District" => AreaType::District,
            "Town" => AreaType::Town,
            "Village" => AreaType::Village,
            "Island" => AreaType::Island,
            _ => AreaType::Other,
        }
    }
}

/// A music-metadata area: a place in the administrative hierarchy, with a
/// chain of backward "part of" relationships terminating at a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub name: String,
    pub id: String,
    pub area_type: AreaType,
}

/// Country/subdivision names derived by walking an area's "part of" chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaContext {
    pub country: Option<String>,
    pub subdivision: Option<String>,
}

/// A candidate artist returned by the music-metadata search endpoint.
#[derive(Debug, Clone)]
pub struct ArtistCandidate {
    pub name: String,
    pub sort_name: Option<String>,
    pub score: u8,
    pub mbid: String,
    pub begin_area: Option<Area>,
    pub area: Option<Area>,
}

/// The tagged outcome of a music-metadata search, matching the variant the
/// orchestrator needs to distinguish: no hits at all, hits that all failed
/// the verification gate, or a surviving candidate (possibly with neither
/// area populated, flagged as an exact match).
#[derive(Debug, Clone)]
pub enum MusicBrainzLookup {
    NoCandidates,
    AllRejected,
    Candidate {
        candidate: ArtistCandidate,
        exact_match: bool,
    },
}

/// A resolved geocoder hit.
#[derive(Debug, Clone)]
pub struct GeoResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    pub address_type: Option<String>,
}

impl GeoResult {
    pub fn coords(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// The cached, wire-level resolution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub location_name: String,
    pub location_coord: Option<[f64; 2]>,
}

pub const UNKNOWN_LOCATION_NAME: &str = "Unknown";

impl ResolvedLocation {
    pub fn unknown() -> Self {
        Self {
            location_name: UNKNOWN_LOCATION_NAME.to_string(),
            location_coord: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.location_name == UNKNOWN_LOCATION_NAME && self.location_coord.is_none()
    }

    /// A cache entry is serviceable if it has coordinates or is the Unknown
    /// sentinel. A non-Unknown entry with a null coordinate is partial and
    /// is eligible for retry.
    pub fn is_serviceable(&self) -> bool {
        self.location_coord.is_some() || self.is_unknown()
    }

    pub fn is_partial(&self) -> bool {
        self.location_coord.is_none() && !self.is_unknown()
    }
}

/// One line of the NDJSON response stream.
#[derive(Debug, Clone, Serialize)]
pub struct ArtistLocationLine {
    pub artist: String,
    pub location_name: String,
    pub location_coord: Option<[f64; 2]>,
}

impl ArtistLocationLine {
    pub fn new(artist: &str, resolved: ResolvedLocation) -> Self {
        Self {
            artist: artist.to_string(),
            location_name: resolved.location_name,
            location_coord: resolved.location_coord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_lowercases() {
        let q = ArtistQuery::new("  Taylor Swift ");
        assert_eq!(q.as_str(), "Taylor Swift");
        assert_eq!(q.cache_key(), "artist:taylor swift");
    }

    #[test]
    fn unknown_is_serviceable_but_not_partial() {
        let loc = ResolvedLocation::unknown();
        assert!(loc.is_serviceable());
        assert!(!loc.is_partial());
    }

    #[test]
    fn missing_coord_with_name_is_partial() {
        let loc = ResolvedLocation {
            location_name: "Perth, Australia".to_string(),
            location_coord: None,
        };
        assert!(loc.is_partial());
        assert!(!loc.is_serviceable());
    }
}

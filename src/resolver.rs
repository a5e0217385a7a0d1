//! Resolver orchestrator: the multi-source fallback chain and the
//! capital-snap policy for administrative regions.

use crate::area_rank::{choose_best_area, is_city_level, is_city_level_geocode};
use crate::clients::geocode::GeocoderCascade;
use crate::clients::musicbrainz::MusicBrainzClient;
use crate::clients::sparql::SparqlClient;
use crate::clients::wikipedia::WikipediaClient;
use crate::error::Result;
use crate::types::{Area, AreaType, GeoResult, MusicBrainzLookup, ResolvedLocation};
use tracing::instrument;

pub struct Resolver {
    pub musicbrainz: MusicBrainzClient,
    pub wikipedia: WikipediaClient,
    pub sparql: SparqlClient,
    pub geocoder: GeocoderCascade,
}

impl Resolver {
    #[instrument(skip(self))]
    pub async fn resolve(&self, name: &str) -> Result<ResolvedLocation> {
        let lookup = self.musicbrainz.fetch_from_musicbrainz(name).await?;

        // Step 1: candidates existed but every one was rejected by the
        // score/name-match gate — trusting encyclopedic fallbacks here
        // tends to surface famous homonyms, so stop now.
        if matches!(lookup, MusicBrainzLookup::AllRejected) {
            return Ok(ResolvedLocation::unknown());
        }

        let (candidate, exact_match) = match lookup {
            MusicBrainzLookup::Candidate { candidate, exact_match } => (Some(candidate), exact_match),
            MusicBrainzLookup::NoCandidates => (None, false),
            MusicBrainzLookup::AllRejected => unreachable!("handled above"),
        };

        // Step 2: pick the more specific of begin-area / area, if any.
        let best_area: Option<Area> = candidate
            .as_ref()
            .and_then(|c| choose_best_area(c.begin_area.as_ref(), c.area.as_ref()))
            .cloned();

        // Step 3: an already city-level area goes straight to geocoding.
        if let Some(area) = &best_area {
            if is_city_level(area.area_type) {
                return self.geocode_musicbrainz_result(area).await;
            }
        }

        // Step 4: try relationship traversal (handles aliases like "Keli
        // Holiday" -> "Adam Hyde").
        if let Some(candidate) = &candidate {
            if let Some(related) = self
                .musicbrainz
                .fetch_location_via_relationships(&candidate.mbid)
                .await?
            {
                if let Some(related_area) = choose_best_area(related.begin_area.as_ref(), related.area.as_ref()) {
                    if is_city_level(related_area.area_type) {
                        return self.geocode_musicbrainz_result(related_area).await;
                    }
                }
            }
        }

        // Step 5: an exact-match candidate with no area at all terminates
        // here, same homonym-avoidance rationale as step 1.
        if exact_match && best_area.is_none() {
            return Ok(ResolvedLocation::unknown());
        }

        // Step 6: SPARQL person birthplace, then band formation.
        let sparql_hit = match self.sparql.person_birthplace(name).await? {
            Some(place) => Some(place),
            None => self.sparql.band_formation(name).await?,
        };
        if let Some(place) = sparql_hit {
            return Ok(self.geocode_to_resolved(&place).await?);
        }

        // Step 7: encyclopedia scraper with progressively broader queries.
        let wiki_queries = [
            format!("{name} musician"),
            format!("{name} band"),
            name.to_string(),
        ];
        let mut wiki_location: Option<String> = None;
        for query in &wiki_queries {
            if let Some(location) = self.wikipedia.fetch_from_wikipedia(query).await? {
                wiki_location = Some(location);
                break;
            }
        }

        if let Some(location) = wiki_location {
            let direct = self.geocoder.geocode_location(&location).await?;
            let direct_is_city_level = direct.as_ref().map(is_city_level_geocode).unwrap_or(false);

            if !direct_is_city_level {
                if let Some(snapped) = self.capital_snap(&location).await? {
                    return Ok(ResolvedLocation {
                        location_name: snapped.display_name,
                        location_coord: Some(snapped.coords()),
                    });
                }
            }

            return Ok(match direct {
                Some(geo) => ResolvedLocation {
                    location_name: geo.display_name,
                    location_coord: Some(geo.coords()),
                },
                None => ResolvedLocation {
                    location_name: location,
                    location_coord: None,
                },
            });
        }

        // Step 8: fall back to whatever area-level info music-metadata gave
        // us, even if it wasn't city-level.
        if let Some(area) = &best_area {
            return self.geocode_musicbrainz_result(area).await;
        }

        // Step 9.
        Ok(ResolvedLocation::unknown())
    }

    /// Splits a location string on commas, takes the first segment as a
    /// putative subdivision, and asks SPARQL for its capital. Geocodes
    /// `"<capital>, <original>"` when a capital is found.
    async fn capital_snap(&self, location: &str) -> Result<Option<GeoResult>> {
        let Some(first_segment) = location.split(',').next() else {
            return Ok(None);
        };
        let first_segment = first_segment.trim();
        if first_segment.is_empty() {
            return Ok(None);
        }

        let Some(capital) = self.sparql.subdivision_capital(first_segment).await? else {
            return Ok(None);
        };

        self.geocoder
            .geocode_location(&format!("{capital}, {location}"))
            .await
    }

    async fn geocode_to_resolved(&self, location: &str) -> Result<ResolvedLocation> {
        Ok(match self.geocoder.geocode_location(location).await? {
            Some(geo) => ResolvedLocation {
                location_name: geo.display_name,
                location_coord: Some(geo.coords()),
            },
            None => ResolvedLocation {
                location_name: location.to_string(),
                location_coord: None,
            },
        })
    }

    /// Geocodes a music-metadata area, preferring a subdivision's capital
    /// city over its geographic centre, and otherwise cascading from most
    /// to least specific candidate strings.
    async fn geocode_musicbrainz_result(&self, area: &Area) -> Result<ResolvedLocation> {
        let context = self.musicbrainz.resolve_area_context(&area.id).await?;

        if area.area_type == AreaType::Subdivision {
            if let Some(capital) = self.sparql.subdivision_capital(&area.name).await? {
                let candidate = match &context.country {
                    Some(country) => format!("{capital}, {country}"),
                    None => capital,
                };
                return self.geocode_to_resolved(&candidate).await;
            }
        }

        let mut candidates = Vec::new();
        if let (Some(sub), Some(country)) = (&context.subdivision, &context.country) {
            candidates.push(format!("{}, {}, {}", area.name, sub, country));
        }
        if let Some(sub) = &context.subdivision {
            candidates.push(format!("{}, {}", area.name, sub));
        }
        if let Some(country) = &context.country {
            candidates.push(format!("{}, {}", area.name, country));
        }
        candidates.push(area.name.clone());

        for candidate in &candidates {
            if let Some(geo) = self.geocoder.geocode_location(candidate).await? {
                return Ok(ResolvedLocation {
                    location_name: geo.display_name,
                    location_coord: Some(geo.coords()),
                });
            }
        }

        Ok(ResolvedLocation {
            location_name: candidates.first().cloned().unwrap_or_else(|| area.name.clone()),
            location_coord: None,
        })
    }
}

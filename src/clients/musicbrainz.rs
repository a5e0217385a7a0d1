//! Music-metadata client: artist search, area lookup, relationship
//! traversal against a MusicBrainz-compatible web service.

use crate::error::Result;
use crate::http_fetch::fetch_with_retry;
use crate::name_match::verify_artist_match;
use crate::types::{Area, AreaContext, AreaType, ArtistCandidate, MusicBrainzLookup};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{instrument, warn};

const BASE_URL: &str = "https://musicbrainz.org/ws/2";
const IS_PERSON_RELATION_TYPE_ID: &str = "dd9886f2-1dfe-4270-97db-283f6839a666";
const MAX_AREA_DEPTH: u8 = 5;

pub struct MusicBrainzClient {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u32,
    pace: Duration,
    last_call: Mutex<Option<Instant>>,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(user_agent: String, max_retries: u32, pace: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent,
            max_retries,
            pace,
            last_call: Mutex::new(None),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points this client at a different host, for tests that stand up a
    /// `wiremock` server in place of the real MusicBrainz web service.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Blocks until at least `self.pace` has elapsed since the previous
    /// call into this client, honoring MusicBrainz's documented ~1 req/s
    /// limit across search, area, and artist-relationship lookups alike.
    async fn wait_for_pace(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(prev) = *last_call {
            let elapsed = prev.elapsed();
            if elapsed < self.pace {
                tokio::time::sleep(self.pace - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    #[instrument(skip(self))]
    pub async fn fetch_from_musicbrainz(&self, name: &str) -> Result<MusicBrainzLookup> {
        self.wait_for_pace().await;

        let query = format!("artist:\"{}\"", name.replace('"', "\\\""));
        let user_agent = self.user_agent.clone();
        let client = &self.client;
        let response = fetch_with_retry(
            || {
                client
                    .get(format!("{}/artist", self.base_url))
                    .header("User-Agent", user_agent.clone())
                    .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "5")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else {
            return Ok(MusicBrainzLookup::NoCandidates);
        };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "MusicBrainz artist search returned an error status, treating as a miss");
            return Ok(MusicBrainzLookup::NoCandidates);
        }

        let parsed: MbSearchResponse = response.json().await?;
        if parsed.artists.is_empty() {
            return Ok(MusicBrainzLookup::NoCandidates);
        }

        let mut any_rejected = false;
        for candidate in parsed.artists {
            let score = candidate.score.unwrap_or(0);
            let name_for_match = candidate
                .sort_name
                .clone()
                .unwrap_or_else(|| candidate.name.clone());

            if score < 70 || !verify_artist_match(name, &name_for_match) {
                any_rejected = true;
                continue;
            }

            let begin_area = candidate.begin_area.map(Area::from);
            let area = candidate.area.map(Area::from);
            let exact_match = begin_area.is_none() && area.is_none() && verify_artist_match(name, &candidate.name);

            return Ok(MusicBrainzLookup::Candidate {
                candidate: ArtistCandidate {
                    name: candidate.name,
                    sort_name: candidate.sort_name,
                    score,
                    mbid: candidate.id,
                    begin_area,
                    area,
                },
                exact_match,
            });
        }

        if any_rejected {
            Ok(MusicBrainzLookup::AllRejected)
        } else {
            Ok(MusicBrainzLookup::NoCandidates)
        }
    }

    /// Walks an area's backward "part of" relationships to derive the
    /// enclosing country and, when present, subdivision. Depth-limited to
    /// defend against non-DAG upstream data.
    #[instrument(skip(self))]
    pub async fn resolve_area_context(&self, area_id: &str) -> Result<AreaContext> {
        self.resolve_area_context_inner(area_id, 0).await
    }

    async fn resolve_area_context_inner(&self, area_id: &str, depth: u8) -> Result<AreaContext> {
        if depth > MAX_AREA_DEPTH {
            return Ok(AreaContext::default());
        }

        self.wait_for_pace().await;
        let user_agent = self.user_agent.clone();
        let client = &self.client;
        let response = fetch_with_retry(
            || {
                client
                    .get(format!("{}/area/{area_id}", self.base_url))
                    .header("User-Agent", user_agent.clone())
                    .query(&[("inc", "area-rels"), ("fmt", "json")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else {
            return Ok(AreaContext::default());
        };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), area_id, "MusicBrainz area lookup returned an error status, treating as a miss");
            return Ok(AreaContext::default());
        }

        let area: MbAreaDetail = response.json().await?;

        if let Some(country) = country_name_from_codes(&area.iso_3166_1_codes, &area.iso_3166_2_codes) {
            return Ok(AreaContext {
                country: Some(country),
                subdivision: None,
            });
        }

        let backward_parents: Vec<&MbRelation> = area
            .relations
            .iter()
            .flatten()
            .filter(|r| r.direction.as_deref() == Some("backward") && r.area.is_some())
            .collect();

        for relation in &backward_parents {
            let Some(parent) = &relation.area else { continue };
            if let Some(country) = country_name_from_codes(&parent.iso_3166_1_codes, &parent.iso_3166_2_codes) {
                let subdivision = if parent.area_type.as_deref() == Some("Subdivision") {
                    Some(parent.name.clone())
                } else {
                    None
                };
                return Ok(AreaContext {
                    country: Some(country),
                    subdivision,
                });
            }
        }

        if let Some(relation) = backward_parents.first() {
            if let Some(parent) = &relation.area {
                return Box::pin(self.resolve_area_context_inner(&parent.id, depth + 1)).await;
            }
        }

        Ok(AreaContext::default())
    }

    /// Follows an "is person" relationship (the link from a performance
    /// name / alias to the underlying person) and returns that person's
    /// raw area fields, or `None` if no such relationship exists.
    #[instrument(skip(self))]
    pub async fn fetch_location_via_relationships(&self, mbid: &str) -> Result<Option<ArtistCandidate>> {
        self.wait_for_pace().await;
        let user_agent = self.user_agent.clone();
        let client = &self.client;
        let response = fetch_with_retry(
            || {
                client
                    .get(format!("{}/artist/{mbid}", self.base_url))
                    .header("User-Agent", user_agent.clone())
                    .query(&[("inc", "artist-rels"), ("fmt", "json")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), mbid, "MusicBrainz artist-relationship lookup returned an error status, treating as a miss");
            return Ok(None);
        }

        let artist: MbArtistDetail = response.json().await?;
        let person_relation = artist
            .relations
            .iter()
            .flatten()
            .find(|r| r.type_id.as_deref() == Some(IS_PERSON_RELATION_TYPE_ID));

        let Some(relation) = person_relation else { return Ok(None) };
        let Some(person_ref) = &relation.artist else { return Ok(None) };

        self.wait_for_pace().await;
        let response = fetch_with_retry(
            || {
                client
                    .get(format!("{}/artist/{}", self.base_url, person_ref.id))
                    .header("User-Agent", self.user_agent.clone())
                    .query(&[("fmt", "json")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), mbid = person_ref.id.as_str(), "MusicBrainz related-artist lookup returned an error status, treating as a miss");
            return Ok(None);
        }

        let person: MbArtistDetail = response.json().await?;
        Ok(Some(ArtistCandidate {
            name: person.name.clone(),
            sort_name: person.sort_name.clone(),
            score: 100,
            mbid: person.id.clone(),
            begin_area: person.begin_area.map(Area::from),
            area: person.area.map(Area::from),
        }))
    }
}

fn country_name_from_codes(iso_3166_1: &Option<Vec<String>>, iso_3166_2: &Option<Vec<String>>) -> Option<String> {
    if let Some(codes) = iso_3166_1 {
        if let Some(code) = codes.first() {
            return Some(country_name_for_code(code));
        }
    }
    // ISO 3166-2 codes (subdivision codes like "US-CA") carry a country
    // code as their first two characters; used only as a last resort.
    if let Some(codes) = iso_3166_2 {
        if let Some(code) = codes.first() {
            if code.len() >= 2 {
                return Some(country_name_for_code(&code[..2]));
            }
        }
    }
    None
}

/// Renders an ISO 3166-1 alpha-2 code to an English display name via the
/// locale display-name facility. Falls back to the bare code when the
/// table has no entry, rather than failing the whole resolution.
fn country_name_for_code(code: &str) -> String {
    crate::locale::country_name(code).unwrap_or_else(|| code.to_string())
}

#[derive(Debug, Deserialize)]
struct MbSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Deserialize)]
struct MbArtist {
    id: String,
    name: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
    score: Option<u8>,
    area: Option<MbAreaRef>,
    #[serde(rename = "begin-area")]
    begin_area: Option<MbAreaRef>,
}

#[derive(Debug, Deserialize, Clone)]
struct MbAreaRef {
    id: String,
    name: String,
    #[serde(rename = "type")]
    area_type: Option<String>,
}

impl From<MbAreaRef> for Area {
    fn from(raw: MbAreaRef) -> Self {
        Area {
            name: raw.name,
            id: raw.id,
            // A `type` field that's present but unrecognized is `Other`
            // (specificity 1); a `type` field that's absent entirely is
            // `Null` (specificity -1) — the two are not the same thing.
            area_type: raw.area_type.map(|t| AreaType::parse(&t)).unwrap_or(AreaType::Null),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MbAreaDetail {
    #[serde(default, rename = "iso-3166-1-codes")]
    iso_3166_1_codes: Option<Vec<String>>,
    #[serde(default, rename = "iso-3166-2-codes")]
    iso_3166_2_codes: Option<Vec<String>>,
    #[serde(default)]
    relations: Option<Vec<MbRelation>>,
}

#[derive(Debug, Deserialize)]
struct MbRelation {
    #[serde(rename = "type-id")]
    type_id: Option<String>,
    direction: Option<String>,
    area: Option<MbAreaRelTarget>,
    artist: Option<MbAreaRefMinimal>,
}

#[derive(Debug, Deserialize)]
struct MbAreaRelTarget {
    id: String,
    name: String,
    #[serde(rename = "type")]
    area_type: Option<String>,
    #[serde(default, rename = "iso-3166-1-codes")]
    iso_3166_1_codes: Option<Vec<String>>,
    #[serde(default, rename = "iso-3166-2-codes")]
    iso_3166_2_codes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct MbAreaRefMinimal {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MbArtistDetail {
    id: String,
    name: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
    area: Option<MbAreaRef>,
    #[serde(rename = "begin-area")]
    begin_area: Option<MbAreaRef>,
    #[serde(default)]
    relations: Option<Vec<MbRelation>>,
}

//! Two-provider geocoder cascade: Nominatim first, then Photon, then a
//! country-only retry of both when the query is a comma-separated string.

use crate::error::Result;
use crate::http_fetch::fetch_with_retry;
use crate::text_clean::normalize_display_name;
use crate::types::GeoResult;
use serde::Deserialize;
use tracing::{instrument, warn};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const PHOTON_URL: &str = "https://photon.komoot.io/api";

pub struct GeocoderCascade {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u32,
    nominatim_url: String,
    photon_url: String,
}

impl GeocoderCascade {
    pub fn new(user_agent: String, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent,
            max_retries,
            nominatim_url: NOMINATIM_URL.to_string(),
            photon_url: PHOTON_URL.to_string(),
        }
    }

    /// Points both providers at a different host, for tests that stand up
    /// a `wiremock` server in place of the real Nominatim/Photon endpoints.
    #[cfg(test)]
    pub fn with_base_urls(mut self, nominatim_url: impl Into<String>, photon_url: impl Into<String>) -> Self {
        self.nominatim_url = nominatim_url.into();
        self.photon_url = photon_url.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn geocode_location(&self, location_name: &str) -> Result<Option<GeoResult>> {
        if let Some(result) = self.nominatim(location_name).await? {
            return Ok(Some(result));
        }
        if let Some(result) = self.photon(location_name).await? {
            return Ok(Some(result));
        }

        if let Some(country) = location_name.rsplit(',').next() {
            let country = country.trim();
            if country != location_name.trim() && !country.is_empty() {
                if let Some(result) = self.nominatim(country).await? {
                    return Ok(Some(result));
                }
                if let Some(result) = self.photon(country).await? {
                    return Ok(Some(result));
                }
            }
        }

        Ok(None)
    }

    async fn nominatim(&self, query: &str) -> Result<Option<GeoResult>> {
        let client = &self.client;
        let user_agent = self.user_agent.clone();
        let response = fetch_with_retry(
            || {
                client
                    .get(self.nominatim_url.as_str())
                    .header("User-Agent", user_agent.clone())
                    .query(&[("q", query), ("format", "json"), ("limit", "1")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Nominatim returned an error status, treating as a miss");
            return Ok(None);
        }

        let hits: Vec<NominatimHit> = response.json().await?;
        let Some(hit) = hits.into_iter().next() else { return Ok(None) };

        let lat: f64 = hit.lat.parse().map_err(|_| crate::error::ResolverError::Cache(
            "non-numeric latitude from Nominatim".to_string(),
        ))?;
        let lon: f64 = hit.lon.parse().map_err(|_| crate::error::ResolverError::Cache(
            "non-numeric longitude from Nominatim".to_string(),
        ))?;

        Ok(Some(GeoResult {
            lat,
            lon,
            display_name: normalize_display_name(&hit.display_name),
            address_type: hit.addresstype.or(hit.kind),
        }))
    }

    async fn photon(&self, query: &str) -> Result<Option<GeoResult>> {
        let client = &self.client;
        let user_agent = self.user_agent.clone();
        let response = fetch_with_retry(
            || {
                client
                    .get(self.photon_url.as_str())
                    .header("User-Agent", user_agent.clone())
                    .query(&[("q", query), ("limit", "1")])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Photon returned an error status, treating as a miss");
            return Ok(None);
        }

        let collection: PhotonFeatureCollection = response.json().await?;
        let Some(feature) = collection.features.into_iter().next() else { return Ok(None) };

        // Photon coordinates are [lon, lat]; must be swapped.
        let [lon, lat] = feature.geometry.coordinates;

        Ok(Some(GeoResult {
            lat,
            lon,
            display_name: query.to_string(),
            address_type: feature.properties.and_then(|p| p.osm_value.or(p.osm_key)),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    display_name: String,
    addresstype: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeatureCollection {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    properties: Option<PhotonProperties>,
}

#[derive(Debug, Deserialize)]
struct PhotonGeometry {
    coordinates: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct PhotonProperties {
    osm_key: Option<String>,
    osm_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn photon_coords_are_lon_lat_and_get_swapped() {
        let feature = PhotonFeature {
            geometry: PhotonGeometry { coordinates: [151.2093, -33.8688] },
            properties: None,
        };
        let [lon, lat] = feature.geometry.coordinates;
        assert_eq!((lat, lon), (-33.8688, 151.2093));
    }

    #[tokio::test]
    async fn nominatim_hit_is_parsed_and_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Perth, Australia"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "lat": "-31.9523",
                    "lon": "115.8613",
                    "display_name": "Perth, Western Australia, Australia",
                    "addresstype": "city"
                }
            ])))
            .mount(&server)
            .await;

        let cascade = GeocoderCascade::new("test".to_string(), 0)
            .with_base_urls(format!("{}/search", server.uri()), format!("{}/photon", server.uri()));

        let result = cascade.geocode_location("Perth, Australia").await.unwrap().unwrap();
        assert_eq!(result.display_name, "Perth, Australia");
        assert_eq!(result.lat, -31.9523);
        assert_eq!(result.lon, 115.8613);
        assert_eq!(result.address_type.as_deref(), Some("city"));
    }

    #[tokio::test]
    async fn falls_back_to_photon_when_nominatim_has_no_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "features": [{
                    "geometry": { "coordinates": [115.8613, -31.9523] },
                    "properties": { "osm_key": "place", "osm_value": "city" }
                }]
            })))
            .mount(&server)
            .await;

        let cascade = GeocoderCascade::new("test".to_string(), 0)
            .with_base_urls(format!("{}/search", server.uri()), format!("{}/photon", server.uri()));

        let result = cascade.geocode_location("Perth").await.unwrap().unwrap();
        assert_eq!((result.lat, result.lon), (-31.9523, 115.8613));
        assert_eq!(result.address_type.as_deref(), Some("city"));
    }

    #[tokio::test]
    async fn non_success_status_is_treated_as_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photon"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cascade = GeocoderCascade::new("test".to_string(), 0)
            .with_base_urls(format!("{}/search", server.uri()), format!("{}/photon", server.uri()));

        let result = cascade.geocode_location("Nowhere").await.unwrap();
        assert!(result.is_none());
    }
}

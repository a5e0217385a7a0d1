//! SPARQL client: person birthplace, band formation location, and
//! subdivision capital lookups against a Wikidata-compatible endpoint.

use crate::error::Result;
use crate::http_fetch::fetch_with_retry;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{instrument, warn};

const ENDPOINT: &str = "https://query.wikidata.org/sparql";

pub struct SparqlClient {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u32,
    endpoint: String,
}

impl SparqlClient {
    pub fn new(user_agent: String, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent,
            max_retries,
            endpoint: ENDPOINT.to_string(),
        }
    }

    /// Points this client at a different endpoint, for tests that stand up
    /// a `wiremock` server in place of the real Wikidata query service.
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn run_query(&self, query: &str) -> Result<Option<String>> {
        let client = &self.client;
        let user_agent = self.user_agent.clone();
        let response = fetch_with_retry(
            || {
                client
                    .get(self.endpoint.as_str())
                    .header("Accept", "application/sparql-results+json")
                    .header("User-Agent", user_agent.clone())
                    .query(&[("query", query)])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "SPARQL endpoint returned an error status, treating as a miss");
            return Ok(None);
        }

        let parsed: SparqlResponse = response.json().await?;
        Ok(parsed
            .results
            .bindings
            .first()
            .and_then(|b| b.get("placeLabel"))
            .map(|v| v.value.clone()))
    }

    fn escape(name: &str) -> String {
        name.replace('\\', "\\\\").replace('"', "\\\"")
    }

    /// Asks for the birthplace or formation location of a human entity
    /// (P31 = Q5) with the given English label.
    #[instrument(skip(self))]
    pub async fn person_birthplace(&self, name: &str) -> Result<Option<String>> {
        let label = Self::escape(name);
        let query = format!(
            r#"SELECT ?placeLabel WHERE {{
              ?person wdt:P31 wd:Q5;
                      rdfs:label "{label}"@en.
              {{ ?person wdt:P19 ?place. }} UNION {{ ?person wdt:P740 ?place. }}
              SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
            }} LIMIT 1"#
        );
        self.run_query(&query).await
    }

    /// Asks for the formation location of a musical-group entity (P31 =
    /// Q215380) with the given English label. Used when the person query
    /// returns nothing.
    #[instrument(skip(self))]
    pub async fn band_formation(&self, name: &str) -> Result<Option<String>> {
        let label = Self::escape(name);
        let query = format!(
            r#"SELECT ?placeLabel WHERE {{
              ?band wdt:P31 wd:Q215380;
                    wdt:P740 ?place;
                    rdfs:label "{label}"@en.
              SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
            }} LIMIT 1"#
        );
        self.run_query(&query).await
    }

    /// Asks for the capital city (P36) of a named subdivision.
    #[instrument(skip(self))]
    pub async fn subdivision_capital(&self, subdivision_name: &str) -> Result<Option<String>> {
        let label = Self::escape(subdivision_name);
        let query = format!(
            r#"SELECT ?placeLabel WHERE {{
              ?subdivision wdt:P36 ?place;
                           rdfs:label "{label}"@en.
              SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
            }} LIMIT 1"#
        );
        self.run_query(&query).await
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

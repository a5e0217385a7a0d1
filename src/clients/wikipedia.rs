//! Encyclopedia client: searches articles, extracts origin/birthplace
//! infobox fields from section-0 wikitext.

use crate::error::Result;
use crate::http_fetch::fetch_with_retry;
use crate::text_clean::clean_wikipedia_location;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{instrument, warn};

const BASE_URL: &str = "https://en.wikipedia.org/w/api.php";

const INFOBOX_FIELDS: &[&str] = &["origin", "birth_place", "birthplace"];

pub struct WikipediaClient {
    client: reqwest::Client,
    user_agent: String,
    max_retries: u32,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(user_agent: String, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent,
            max_retries,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points this client at a different host, for tests that stand up a
    /// `wiremock` server in place of the real Wikipedia API.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn fetch_from_wikipedia(&self, query: &str) -> Result<Option<String>> {
        let Some(title) = self.search_first_title(query).await? else {
            return Ok(None);
        };

        let Some(wikitext) = self.fetch_section_zero(&title).await? else {
            return Ok(None);
        };

        Ok(extract_infobox_field(&wikitext).map(|raw| clean_wikipedia_location(&raw)))
    }

    async fn search_first_title(&self, query: &str) -> Result<Option<String>> {
        let client = &self.client;
        let user_agent = self.user_agent.clone();
        let response = fetch_with_retry(
            || {
                client
                    .get(self.base_url.as_str())
                    .header("User-Agent", user_agent.clone())
                    .query(&[
                        ("action", "query"),
                        ("list", "search"),
                        ("srsearch", query),
                        ("format", "json"),
                        ("srlimit", "1"),
                    ])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Wikipedia search returned an error status, treating as a miss");
            return Ok(None);
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.query.search.into_iter().next().map(|r| r.title))
    }

    async fn fetch_section_zero(&self, title: &str) -> Result<Option<String>> {
        let client = &self.client;
        let user_agent = self.user_agent.clone();
        let response = fetch_with_retry(
            || {
                client
                    .get(self.base_url.as_str())
                    .header("User-Agent", user_agent.clone())
                    .query(&[
                        ("action", "parse"),
                        ("page", title),
                        ("section", "0"),
                        ("prop", "wikitext"),
                        ("format", "json"),
                    ])
            },
            self.max_retries,
        )
        .await?;

        let Some(response) = response else { return Ok(None) };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), title, "Wikipedia section fetch returned an error status, treating as a miss");
            return Ok(None);
        }

        let parsed: ParseResponse = response.json().await?;
        Ok(parsed.parse.map(|p| p.wikitext.content))
    }
}

/// Matches `| origin = …`, `| birth_place = …`, `| birthplace = …` in that
/// order; the first match wins. The value is terminated by a newline or the
/// start of the next infobox field (`|`).
fn extract_infobox_field(wikitext: &str) -> Option<String> {
    for field in INFOBOX_FIELDS {
        if let Some(value) = field_re(field).captures(wikitext).and_then(|c| c.get(1)) {
            let trimmed = value.as_str().trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn field_re(field: &str) -> Regex {
    static CACHE: OnceLock<std::sync::Mutex<std::collections::HashMap<String, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut guard = cache.lock().unwrap();
    guard
        .entry(field.to_string())
        .or_insert_with(|| {
            Regex::new(&format!(r"(?m)^\s*\|\s*{}\s*=\s*([^\n|]*)", regex::escape(field))).unwrap()
        })
        .clone()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParseResult>,
}

#[derive(Debug, Deserialize)]
struct ParseResult {
    wikitext: WikitextContent,
}

#[derive(Debug, Deserialize)]
struct WikitextContent {
    #[serde(rename = "*")]
    content: String,
}

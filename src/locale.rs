//! English country display names for ISO 3166-1 alpha-2 codes — the
//! equivalent of the browser's `Intl.DisplayNames` locale facility the
//! upstream music-metadata service expects its consumers to have.

/// Renders an ISO 3166-1 alpha-2 code (case-insensitive) to its English
/// short name, or `None` if the code is not recognized.
pub fn country_name(code: &str) -> Option<String> {
    rust_iso3166::from_alpha2(&code.to_uppercase()).map(|c| c.name.to_string())
}

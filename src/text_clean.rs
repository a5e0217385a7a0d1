use regex::Regex;
use std::sync::OnceLock;

fn piped_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]|]+)\|[^\]]+\]\]").unwrap())
}

fn plain_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]|]+)\]\]").unwrap())
}

fn template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{[^}]*\}\}").unwrap())
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Strips wikitext markup from an infobox location value. Piped links
/// `[[target|display]]` collapse to `target` (the canonical name), not the
/// display text, since the target is usually the form a geocoder wants.
pub fn clean_wikipedia_location(raw: &str) -> String {
    let no_piped = piped_link_re().replace_all(raw, "$1");
    let no_links = plain_link_re().replace_all(&no_piped, "$1");
    let no_templates = template_re().replace_all(&no_links, "");
    let no_tags = html_tag_re().replace_all(&no_templates, "");
    let no_nbsp = no_tags.replace("&nbsp;", " ");
    let collapsed = whitespace_re().replace_all(&no_nbsp, " ");
    collapsed.trim().to_string()
}

/// Normalizes a comma-separated geocoder display string to `"<first>,
/// <last>"`, dropping intermediate administrative layers. If fewer than two
/// segments are present, the first is returned as-is.
pub fn normalize_display_name(display_name: &str) -> String {
    let segments: Vec<&str> = display_name.split(',').map(|s| s.trim()).collect();
    match segments.len() {
        0 => String::new(),
        1 => segments[0].to_string(),
        _ => format!("{}, {}", segments[0], segments[segments.len() - 1]),
    }
}

/// Case-insensitive, whitespace-trimmed equality.
pub fn is_exact_match(query: &str, candidate: &str) -> bool {
    query.trim().eq_ignore_ascii_case(candidate.trim())
}

/// A query token is "present" in the candidate name if either the whole
/// token or the token minus its last two characters appears in it as a
/// substring — tolerating plural/possessive variants ("Beatles" ~ "Beatle").
fn token_present(token: &str, candidate_lower: &str) -> bool {
    if candidate_lower.contains(token) {
        return true;
    }
    if token.chars().count() > 2 {
        let truncated: String = token.chars().take(token.chars().count() - 2).collect();
        if !truncated.is_empty() && candidate_lower.contains(&truncated) {
            return true;
        }
    }
    false
}

/// Strict for single-word queries (exact match); lenient for multi-word
/// queries, where at most 40% of the query's tokens may be absent from the
/// candidate name.
pub fn verify_artist_match(query: &str, candidate: &str) -> bool {
    let q = query.trim();
    let tokens: Vec<&str> = q.split_whitespace().collect();

    if tokens.len() <= 1 {
        return is_exact_match(q, candidate);
    }

    let candidate_lower = candidate.trim().to_lowercase();
    let total = tokens.len();
    let missing = tokens
        .iter()
        .filter(|t| !token_present(&t.to_lowercase(), &candidate_lower))
        .count();

    (missing as f64) / (total as f64) <= 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_requires_exact_match() {
        assert!(verify_artist_match("GREG", "GREG"));
        assert!(!verify_artist_match("GREG", "Greg Brown"));
    }

    #[test]
    fn exact_match_is_case_insensitive_and_trims() {
        assert!(is_exact_match("  Adele ", "adele"));
        assert!(!is_exact_match("Adele", "Adelle"));
    }

    #[test]
    fn multi_word_tolerates_possessive_and_reordered_suffix() {
        assert!(verify_artist_match("The Beatles", "Beatles, The"));
    }

    #[test]
    fn multi_word_rejects_unrelated_homonym() {
        // "Keli Holiday" vs "Billie Holiday": only "Holiday" present, 1/2
        // tokens missing = 50% > 40% threshold -> rejected.
        assert!(!verify_artist_match("Keli Holiday", "Billie Holiday"));
    }

    #[test]
    fn multi_word_all_tokens_present_matches() {
        assert!(verify_artist_match("Tame Impala", "Tame Impala"));
    }
}

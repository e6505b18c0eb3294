use crate::error::{EngineError, Result};

pub const MAX_QUERY_CHARS: usize = 100;
pub const MIN_QUERY_CHARS: usize = 2;

/// Sanitizes a raw user query into the form used for fetching and cache keys.
///
/// Over-long input is rejected before anything else. Otherwise the text is
/// trimmed, lower-cased and stripped of everything but letters, digits,
/// spaces and hyphens; the result must still be at least two characters.
pub fn normalize_query(raw: &str) -> Result<String> {
    if raw.chars().count() > MAX_QUERY_CHARS {
        return Err(EngineError::validation(format!(
            "query too long (max {} characters)",
            MAX_QUERY_CHARS
        )));
    }

    let kept: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let normalized = kept.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.chars().count() < MIN_QUERY_CHARS {
        return Err(EngineError::validation(format!(
            "query must contain at least {} letters or digits",
            MIN_QUERY_CHARS
        )));
    }
    Ok(normalized)
}

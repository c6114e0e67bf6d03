use serde::{Deserialize, Serialize};

/// Default minimum query length before the backend is worth calling.
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;

/// A single non-actionable message for the host UI.
///
/// Shared by the input guard ("enter a query", "keep typing") and the
/// pending outcome of the search flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub subtitle: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

/// Trim surrounding whitespace from raw query input.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_string()
}

/// Validate a normalized query before any coordination work happens.
///
/// Returns the query unchanged when it is long enough to act on, or the
/// guidance notice the host should display instead. The backend is never
/// called for a rejected query.
pub fn guard(query: String, min_len: usize) -> Result<String, Notice> {
    if query.is_empty() {
        return Err(Notice::new("Enter a query", "Start typing to search"));
    }
    if query.chars().count() < min_len {
        return Err(Notice::new(
            "Keep typing",
            format!("At least {min_len} characters needed"),
        ));
    }
    Ok(query)
}

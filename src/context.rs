use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Resolve the directory that scopes all coordination state for one
/// integration instance.
///
/// Resolution order: an explicit override (used for isolated test runs),
/// then the host cache directory, then `fallback_root` (the OS temp
/// directory when absent) composed with the integration id. The directory
/// is created if missing; creation races between concurrent invocations
/// never fail the caller, and a creation error only degrades later cache
/// and coalesce operations.
pub fn resolve_context(
    integration_id: &str,
    override_dir: Option<&Path>,
    fallback_root: Option<&Path>,
) -> PathBuf {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => match dirs::cache_dir() {
            Some(cache_root) => cache_root.join(slug(integration_id)),
            None => fallback_root
                .map(Path::to_path_buf)
                .unwrap_or_else(std::env::temp_dir)
                .join(slug(integration_id)),
        },
    };
    if let Err(err) = fs::create_dir_all(&dir) {
        warn!(dir = %dir.display(), %err, "context_create_failed");
    }
    dir
}

/// Reduce an integration identifier to a filesystem-safe slug.
fn slug(integration_id: &str) -> String {
    let cleaned: String = integration_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

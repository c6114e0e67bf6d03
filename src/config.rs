//! Per-integration configuration.
//!
//! Every value is optional and read from the integration's environment
//! namespace: `gh-repos` resolves `GH_REPOS_TTL_SECONDS`,
//! `GH_REPOS_SETTLE_SECONDS`, and so on. Malformed values clamp to the
//! defaults with a warning rather than failing, so a bad host
//! configuration can never break the display pipeline.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::guard::DEFAULT_MIN_QUERY_LEN;

pub const DEFAULT_TTL_SECONDS: u64 = 300;
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(400);
pub const DEFAULT_RERUN: Duration = Duration::from_millis(500);

/// Resolved knobs for one relay invocation.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Cache freshness window; zero disables caching.
    pub ttl_seconds: u64,
    /// Coalesce settle window; zero disables debouncing.
    pub settle: Duration,
    /// Re-invoke hint attached to pending outcomes.
    pub rerun: Duration,
    /// Explicit coordination-state root, mainly for isolated test runs.
    pub state_dir_override: Option<PathBuf>,
    pub min_query_len: usize,
    pub pending_title: String,
    pub pending_subtitle: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            settle: DEFAULT_SETTLE,
            rerun: DEFAULT_RERUN,
            state_dir_override: None,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            pending_title: "Searching".to_string(),
            pending_subtitle: "Results will appear shortly".to_string(),
        }
    }
}

impl RelayConfig {
    /// Resolve configuration from the integration's environment
    /// namespace, falling back to defaults field by field.
    pub fn from_env(integration_id: &str) -> Self {
        let prefix = env_prefix(integration_id);
        let defaults = Self::default();
        let mut cfg = Self {
            ttl_seconds: env_u64(&prefix, "TTL_SECONDS", defaults.ttl_seconds),
            settle: env_seconds(&prefix, "SETTLE_SECONDS", defaults.settle),
            rerun: env_seconds(&prefix, "RERUN_SECONDS", defaults.rerun),
            min_query_len: env_u64(&prefix, "MIN_QUERY_LEN", defaults.min_query_len as u64)
                as usize,
            ..defaults
        };
        if let Ok(dir) = std::env::var(format!("{prefix}_STATE_DIR"))
            && !dir.trim().is_empty()
        {
            cfg.state_dir_override = Some(PathBuf::from(dir));
        }
        cfg
    }
}

/// Uppercased environment namespace for an integration id:
/// `gh-repos` becomes `GH_REPOS`.
pub fn env_prefix(integration_id: &str) -> String {
    integration_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn env_u64(prefix: &str, key: &str, default: u64) -> u64 {
    let name = format!("{prefix}_{key}");
    match std::env::var(&name) {
        Err(_) => default,
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = %name, value = %raw, "config_value_malformed");
                default
            }
        },
    }
}

fn env_seconds(prefix: &str, key: &str, default: Duration) -> Duration {
    let name = format!("{prefix}_{key}");
    match std::env::var(&name) {
        Err(_) => default,
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Duration::from_secs_f64(value),
            _ => {
                warn!(var = %name, value = %raw, "config_value_malformed");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own integration id so the env namespaces never
    // collide when the harness runs tests in parallel.

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = RelayConfig::from_env("cfg-test-unset");
        assert_eq!(cfg.ttl_seconds, DEFAULT_TTL_SECONDS);
        assert_eq!(cfg.settle, DEFAULT_SETTLE);
        assert_eq!(cfg.rerun, DEFAULT_RERUN);
        assert_eq!(cfg.min_query_len, DEFAULT_MIN_QUERY_LEN);
        assert!(cfg.state_dir_override.is_none());
    }

    #[test]
    fn values_resolve_from_the_namespace() {
        unsafe {
            std::env::set_var("CFG_TEST_FULL_TTL_SECONDS", "60");
            std::env::set_var("CFG_TEST_FULL_SETTLE_SECONDS", "0.25");
            std::env::set_var("CFG_TEST_FULL_RERUN_SECONDS", "1.5");
            std::env::set_var("CFG_TEST_FULL_MIN_QUERY_LEN", "3");
            std::env::set_var("CFG_TEST_FULL_STATE_DIR", "/tmp/cfg-test-full");
        }
        let cfg = RelayConfig::from_env("cfg-test-full");
        assert_eq!(cfg.ttl_seconds, 60);
        assert_eq!(cfg.settle, Duration::from_millis(250));
        assert_eq!(cfg.rerun, Duration::from_millis(1_500));
        assert_eq!(cfg.min_query_len, 3);
        assert_eq!(
            cfg.state_dir_override.as_deref(),
            Some(std::path::Path::new("/tmp/cfg-test-full"))
        );
    }

    #[test]
    fn malformed_values_clamp_to_defaults() {
        unsafe {
            std::env::set_var("CFG_TEST_BAD_TTL_SECONDS", "soon");
            std::env::set_var("CFG_TEST_BAD_SETTLE_SECONDS", "-2");
            std::env::set_var("CFG_TEST_BAD_RERUN_SECONDS", "NaN");
        }
        let cfg = RelayConfig::from_env("cfg-test-bad");
        assert_eq!(cfg.ttl_seconds, DEFAULT_TTL_SECONDS);
        assert_eq!(cfg.settle, DEFAULT_SETTLE);
        assert_eq!(cfg.rerun, DEFAULT_RERUN);
    }

    #[test]
    fn zero_values_are_honored_not_clamped() {
        unsafe {
            std::env::set_var("CFG_TEST_ZERO_TTL_SECONDS", "0");
            std::env::set_var("CFG_TEST_ZERO_SETTLE_SECONDS", "0");
        }
        let cfg = RelayConfig::from_env("cfg-test-zero");
        assert_eq!(cfg.ttl_seconds, 0);
        assert!(cfg.settle.is_zero());
    }

    #[test]
    fn env_prefix_uppercases_and_replaces_punctuation() {
        assert_eq!(env_prefix("gh-repos"), "GH_REPOS");
        assert_eq!(env_prefix("crates.io"), "CRATES_IO");
        assert_eq!(env_prefix("plain"), "PLAIN");
    }
}

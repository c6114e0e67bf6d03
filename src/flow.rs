//! Search flow orchestration.
//!
//! Composes the context resolver, cache store, and coalesce coordinator
//! around an integration's backend. Every invocation resolves to exactly
//! one outcome; no path raises an error to the caller, because a broken
//! storage layer must degrade to calling the backend, never to a crash in
//! the host's display pipeline.

use tracing::{debug, info, warn};

use crate::cache::{CacheStatus, CacheStore};
use crate::clock::Clock;
use crate::coalesce::{Coordinator, Verdict};
use crate::config::RelayConfig;
use crate::context::resolve_context;
use crate::guard::Notice;

/// The two operations every integration supplies.
///
/// `fetch` calls the slow or rate-limited backend and owns its own
/// timeout and retry behavior; the error string it returns is treated as
/// opaque. `format_error` turns that string into the payload the host
/// should display; it must be deterministic and secret-free, because its
/// input is cached and re-formatted for the length of the TTL window.
pub trait SearchBackend {
    fn fetch(&self, query: &str) -> Result<String, String>;
    fn format_error(&self, message: &str) -> String;
}

/// One invocation's result. Exactly one of these per run.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Result rows produced by the backend, passed through verbatim.
    Success { payload: String },
    /// Error payload produced by the integration's formatter.
    Error { payload: String },
    /// This invocation was debounced away; the host should re-invoke
    /// after `rerun_seconds`.
    Pending {
        notice: Notice,
        rerun_seconds: f64,
    },
}

/// Run one orchestrated invocation for an already-guarded query.
pub fn run_flow(
    query: &str,
    integration_id: &str,
    config: &RelayConfig,
    backend: &dyn SearchBackend,
    clock: &dyn Clock,
) -> FlowOutcome {
    let context_dir = resolve_context(
        integration_id,
        config.state_dir_override.as_deref(),
        None,
    );
    let cache = CacheStore::new(&context_dir, clock);

    // Fast path: repeated identical queries inside the TTL window.
    if let Some(entry) = cache.get(query, config.ttl_seconds) {
        debug!(query, status = ?entry.status, "cache_hit");
        return match entry.status {
            CacheStatus::Ok => FlowOutcome::Success {
                payload: entry.payload,
            },
            CacheStatus::Err => FlowOutcome::Error {
                payload: backend.format_error(&entry.payload),
            },
        };
    }

    // The coordinator records this query unconditionally; with a zero
    // settle window it returns Final without waiting (synchronous mode).
    let coordinator = Coordinator::new(&context_dir, clock);
    if coordinator.record_and_settle(query, config.settle) == Verdict::Superseded {
        return FlowOutcome::Pending {
            notice: Notice::new(
                config.pending_title.clone(),
                config.pending_subtitle.clone(),
            ),
            rerun_seconds: config.rerun.as_secs_f64(),
        };
    }

    info!(query, integration_id, "backend_fetch");
    match backend.fetch(query) {
        Ok(payload) => {
            if config.ttl_seconds > 0 {
                cache.put(query, CacheStatus::Ok, &payload);
            }
            FlowOutcome::Success { payload }
        }
        Err(message) => {
            warn!(query, error = %message, "backend_fetch_failed");
            // Failures are cached like successes so a flapping backend
            // cannot cause a tight retry loop inside one TTL window.
            if config.ttl_seconds > 0 {
                cache.put(query, CacheStatus::Err, &message);
            }
            FlowOutcome::Error {
                payload: backend.format_error(&message),
            }
        }
    }
}

//! Debounce-and-cache coordination core for keystroke-driven search
//! commands.
//!
//! An interactive host UI re-invokes a memoryless command on every
//! keystroke; the command eventually has to call a rate-limited or slow
//! remote backend. Calling that backend once per keystroke wastes quota
//! and feels laggy, so this crate coordinates overlapping invocations
//! through shared files and decides, per invocation, whether to serve a
//! cached payload, call the backend, or report a pending state so the
//! host re-invokes later.
//!
//! - **[`guard`]**: query normalization and the enter-a-query /
//!   keep-typing guard.
//! - **[`context`]**: per-integration state directory resolution.
//! - **[`coalesce`]**: the cross-process debounce protocol.
//! - **[`cache`]**: the query-keyed TTL cache.
//! - **[`flow`]**: the orchestrator composing the above around an
//!   injected [`flow::SearchBackend`].
//! - **[`config`]**: env-namespaced configuration with clamped defaults.
//! - **[`input`]**: raw-query acquisition and logging setup for
//!   integration binaries.
//! - **[`clock`]**: the injectable time/sleep seam.

pub mod cache;
pub mod clock;
pub mod coalesce;
pub mod config;
pub mod context;
pub mod flow;
pub mod guard;
pub mod input;

use std::io::BufRead;

use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::flow::{FlowOutcome, SearchBackend, run_flow};
use crate::guard::{Notice, guard, normalize};

/// Entry-layer response: either the orchestrator ran and produced one of
/// its three outcomes, or the input guard stopped the invocation first.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayResponse {
    Outcome(FlowOutcome),
    Guidance(Notice),
}

/// Run one full relay invocation for `integration_id`.
///
/// Resolves configuration from the integration's environment namespace,
/// acquires the raw query (direct argument, then `<PREFIX>_QUERY`, then
/// one read of `reader`), applies the guard, and hands valid queries to
/// the flow orchestrator.
pub fn run_relay(
    integration_id: &str,
    arg: Option<String>,
    reader: &mut dyn BufRead,
    backend: &dyn SearchBackend,
) -> RelayResponse {
    let config = RelayConfig::from_env(integration_id);
    run_relay_with(integration_id, arg, reader, backend, &config, &SystemClock)
}

/// [`run_relay`] with explicit configuration and clock: the seam used by
/// tests and by integrations that resolve configuration themselves.
pub fn run_relay_with(
    integration_id: &str,
    arg: Option<String>,
    reader: &mut dyn BufRead,
    backend: &dyn SearchBackend,
    config: &RelayConfig,
    clock: &dyn Clock,
) -> RelayResponse {
    let fallback_env = format!("{}_QUERY", config::env_prefix(integration_id));
    let raw = input::resolve_raw_query(arg, &fallback_env, reader);
    match guard(normalize(&raw), config.min_query_len) {
        Err(notice) => RelayResponse::Guidance(notice),
        Ok(query) => {
            RelayResponse::Outcome(run_flow(&query, integration_id, config, backend, clock))
        }
    }
}

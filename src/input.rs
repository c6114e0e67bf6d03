//! Raw query acquisition and process-level plumbing shared by
//! integration binaries.

use std::io::BufRead;

use clap::Parser;
use tracing::warn;

/// Argument surface for a relay-backed integration binary.
///
/// Hosts commonly split the query into words before handing it over, so
/// trailing arguments are rejoined with single spaces.
#[derive(Parser, Debug)]
#[command(about = "Keystroke-driven search relay")]
pub struct RelayArgs {
    /// Raw query text
    #[arg(trailing_var_arg = true)]
    pub query: Vec<String>,
}

impl RelayArgs {
    /// The raw query, or `None` when no argument was supplied.
    pub fn raw_query(&self) -> Option<String> {
        if self.query.is_empty() {
            None
        } else {
            Some(self.query.join(" "))
        }
    }
}

/// Resolve raw query text from its ordered sources: the direct argument,
/// then the named environment fallback, then one blocking line read from
/// `reader` (stdin in production). The reader is consumed at most once,
/// and only when no argument was supplied at all.
pub fn resolve_raw_query(
    arg: Option<String>,
    fallback_env: &str,
    reader: &mut dyn BufRead,
) -> String {
    let had_arg = arg.is_some();
    if let Some(arg) = arg
        && !arg.trim().is_empty()
    {
        return arg;
    }
    if let Ok(value) = std::env::var(fallback_env)
        && !value.trim().is_empty()
    {
        return value;
    }
    if had_arg {
        // An (empty) argument was supplied; do not block on the stream.
        return String::new();
    }
    let mut line = String::new();
    if let Err(err) = reader.read_line(&mut line) {
        warn!(%err, "query_stream_read_failed");
    }
    line
}

/// Install the stderr tracing subscriber.
///
/// Host UIs consume stdout as the result channel, so all diagnostics stay
/// on stderr. Level selection follows `RUST_LOG`; safe to call more than
/// once (later calls are no-ops).
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

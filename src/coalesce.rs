//! Cross-process debounce over a shared file.
//!
//! Every invocation is an independent process with no shared memory and no
//! way to cancel a sibling, so the only coordination primitive is a file
//! both can see. Each invocation records its query as the most recently
//! observed one, then polls that record for the settle window: if a newer
//! query shows up the invocation is superseded and skips the backend call.
//! The protocol is advisory; a pathological scheduling delay can let two
//! invocations both decide they are final, which costs one extra backend
//! call and nothing else.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;

const STATE_FILE: &str = "latest_query.json";

/// Poll increment while waiting out the settle window.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The most recently observed query for one integration context.
/// Overwritten by every invocation; last writer wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueryState {
    query_text: String,
    observed_at_ms: u64,
}

/// Outcome of one coordinator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No newer query arrived during the settle window; safe to fetch.
    Final,
    /// A newer query replaced this one before the window elapsed.
    Superseded,
}

/// Decides whether this invocation's query is still the latest one.
///
/// Supersession is pure text equality on the recorded query: two separate
/// typing bursts producing the same text are indistinguishable from one
/// burst, which is fine for a single-user interactive command.
pub struct Coordinator<'c> {
    state_path: PathBuf,
    clock: &'c dyn Clock,
}

impl<'c> Coordinator<'c> {
    pub fn new(context_dir: &Path, clock: &'c dyn Clock) -> Self {
        Self {
            state_path: context_dir.join(STATE_FILE),
            clock,
        }
    }

    /// Record this invocation's query, then wait out the settle window.
    ///
    /// A zero window disables debouncing and returns [`Verdict::Final`]
    /// immediately. Otherwise the shared record is re-read in short
    /// bounded increments; any read showing different query text ends the
    /// wait early with [`Verdict::Superseded`]. Storage failures degrade:
    /// an unreadable record is treated as not superseded, an unwritable
    /// one only costs siblings the chance to supersede us.
    pub fn record_and_settle(&self, query: &str, settle: Duration) -> Verdict {
        self.record(query);
        if settle.is_zero() {
            return Verdict::Final;
        }

        let mut waited = Duration::ZERO;
        while waited < settle {
            let step = POLL_INTERVAL.min(settle - waited);
            self.clock.sleep(step);
            waited += step;
            if let Some(state) = self.read()
                && state.query_text != query
            {
                debug!(query, newer = %state.query_text, "coalesce_superseded");
                return Verdict::Superseded;
            }
        }
        debug!(query, settle_ms = settle.as_millis() as u64, "coalesce_final");
        Verdict::Final
    }

    fn record(&self, query: &str) {
        let state = QueryState {
            query_text: query.to_string(),
            observed_at_ms: self.clock.now_ms(),
        };
        if let Err(err) = write_state(&self.state_path, &state) {
            warn!(path = %self.state_path.display(), %err, "query_state_write_failed");
        }
    }

    fn read(&self) -> Option<QueryState> {
        let bytes = fs::read(&self.state_path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

fn write_state(path: &Path, state: &QueryState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(state)?;
    // Write-then-rename keeps readers from ever seeing a partial record.
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Fake clock that counts sleeps and can overwrite the shared record
    /// after a chosen number of them, standing in for a sibling
    /// invocation arriving mid-window.
    struct ScriptedClock {
        now: Cell<u64>,
        sleeps: Cell<u32>,
        interfere_after: Option<u32>,
        state_path: PathBuf,
        newer_query: String,
    }

    impl ScriptedClock {
        fn quiet() -> Self {
            Self {
                now: Cell::new(0),
                sleeps: Cell::new(0),
                interfere_after: None,
                state_path: PathBuf::new(),
                newer_query: String::new(),
            }
        }

        fn interfering(state_path: PathBuf, newer_query: &str, after_sleeps: u32) -> Self {
            Self {
                now: Cell::new(0),
                sleeps: Cell::new(0),
                interfere_after: Some(after_sleeps),
                state_path,
                newer_query: newer_query.to_string(),
            }
        }
    }

    impl Clock for ScriptedClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }

        fn sleep(&self, d: Duration) {
            self.now.set(self.now.get() + d.as_millis() as u64);
            self.sleeps.set(self.sleeps.get() + 1);
            if let Some(after) = self.interfere_after
                && self.sleeps.get() == after
            {
                if self.newer_query.is_empty() {
                    let _ = fs::remove_file(&self.state_path);
                } else {
                    let state = QueryState {
                        query_text: self.newer_query.clone(),
                        observed_at_ms: self.now.get(),
                    };
                    write_state(&self.state_path, &state).unwrap();
                }
            }
        }
    }

    #[test]
    fn zero_settle_is_final_without_sleeping() {
        let tmp = TempDir::new().unwrap();
        let clock = ScriptedClock::quiet();
        let coordinator = Coordinator::new(tmp.path(), &clock);

        let verdict = coordinator.record_and_settle("abc", Duration::ZERO);
        assert_eq!(verdict, Verdict::Final);
        assert_eq!(clock.sleeps.get(), 0);
        // The query was still recorded for siblings to observe.
        assert_eq!(coordinator.read().unwrap().query_text, "abc");
    }

    #[test]
    fn quiet_window_elapses_to_final() {
        let tmp = TempDir::new().unwrap();
        let clock = ScriptedClock::quiet();
        let coordinator = Coordinator::new(tmp.path(), &clock);

        let verdict = coordinator.record_and_settle("abc", Duration::from_millis(400));
        assert_eq!(verdict, Verdict::Final);
        assert_eq!(clock.now.get(), 400);
        assert_eq!(clock.sleeps.get(), 8);
    }

    #[test]
    fn newer_query_supersedes_before_the_window_elapses() {
        let tmp = TempDir::new().unwrap();
        let state_path = tmp.path().join(STATE_FILE);
        let clock = ScriptedClock::interfering(state_path, "gop", 2);
        let coordinator = Coordinator::new(tmp.path(), &clock);

        let verdict = coordinator.record_and_settle("go", Duration::from_secs(2));
        assert_eq!(verdict, Verdict::Superseded);
        // Detected right after the interfering write, well short of the
        // 40 sleeps a full window would take.
        assert_eq!(clock.sleeps.get(), 2);
    }

    #[test]
    fn identical_overwrite_does_not_supersede() {
        let tmp = TempDir::new().unwrap();
        let state_path = tmp.path().join(STATE_FILE);
        let clock = ScriptedClock::interfering(state_path, "go", 2);
        let coordinator = Coordinator::new(tmp.path(), &clock);

        let verdict = coordinator.record_and_settle("go", Duration::from_millis(300));
        assert_eq!(verdict, Verdict::Final);
    }

    #[test]
    fn unreadable_record_mid_window_is_treated_as_not_superseded() {
        let tmp = TempDir::new().unwrap();
        let state_path = tmp.path().join(STATE_FILE);
        // Empty newer query makes the clock delete the record instead.
        let clock = ScriptedClock::interfering(state_path, "", 2);
        let coordinator = Coordinator::new(tmp.path(), &clock);

        let verdict = coordinator.record_and_settle("abc", Duration::from_millis(300));
        assert_eq!(verdict, Verdict::Final);
    }

    #[test]
    fn record_overwrites_the_previous_query() {
        let tmp = TempDir::new().unwrap();
        let clock = ScriptedClock::quiet();
        let coordinator = Coordinator::new(tmp.path(), &clock);

        coordinator.record("first");
        coordinator.record("second");
        assert_eq!(coordinator.read().unwrap().query_text, "second");
    }
}

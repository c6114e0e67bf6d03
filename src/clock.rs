use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source for TTL math and settle-window waiting.
///
/// Injected wherever the crate reads time or sleeps so tests can use a
/// fake clock instead of wall-clock delays.
pub trait Clock {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> u64;

    /// Block the current invocation for `d`.
    fn sleep(&self, d: Duration);
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_reports_current_epoch_millis() {
        let clock = SystemClock;
        let now = clock.now_ms();
        // Well after 2020-01-01 and monotonically sane across two reads.
        assert!(now > 1_577_836_800_000);
        assert!(clock.now_ms() >= now);
    }
}

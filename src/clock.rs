//! Process-wide monotonic timestamps.
//!
//! Wall clocks can step backwards (NTP adjustments, VM migration). Audit
//! ordering and `updated_at` must not, so every timestamp handed out here is
//! strictly greater than the previous one at microsecond resolution.

use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Duration, DurationRound, Utc};

/// Issues strictly increasing UTC timestamps.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, truncated to microseconds so it survives an RFC 3339
    /// round-trip through the database unchanged.
    pub fn now(&self) -> DateTime<Utc> {
        let wall = truncate_micros(Utc::now());
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = match *last {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::microseconds(1)).unwrap_or(ts)
}

/// The shared clock used by services.
pub fn global() -> &'static MonotonicClock {
    static CLOCK: OnceLock<MonotonicClock> = OnceLock::new();
    CLOCK.get_or_init(MonotonicClock::new)
}

/// Shorthand for `global().now()`.
pub fn now() -> DateTime<Utc> {
    global().now()
}

//! Time and duration utilities.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::{Duration, Instant};

/// Current UTC time as RFC 3339 with second precision (`2024-05-01T12:00:00Z`).
pub fn rfc3339_now() -> String {
    rfc3339(Utc::now())
}

/// Format a UTC timestamp as RFC 3339 with second precision.
pub fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a duration in human-readable form.
pub fn pretty_duration(duration: Duration) -> String {
    let millis = duration.as_millis();

    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Measure execution time of a function.
pub fn measure<F, R>(f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339_format() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 8, 5, 3).unwrap();
        assert_eq!(rfc3339(ts), "2024-02-29T08:05:03Z");
    }

    #[test]
    fn test_pretty_duration() {
        assert_eq!(pretty_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(pretty_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(pretty_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_measure_returns_result() {
        let (value, elapsed) = measure(|| 6 * 7);
        assert_eq!(value, 42);
        assert!(elapsed < Duration::from_secs(5));
    }
}

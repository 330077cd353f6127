//! Derived per-device metrics.
//!
//! Everything here is a pure function over a [`DeviceSnapshot`]'s sample
//! slices. Callers take the snapshot first and compute afterwards, so no
//! registry lock is ever held while these run.
//!
//! [`DeviceSnapshot`]: crate::registry::DeviceSnapshot

use chrono::{DateTime, TimeDelta, Utc};

use crate::duration::format_duration;

const NANOS_PER_MINUTE: i64 = 60 * 1_000_000_000;

/// Uptime percentage: heartbeat count divided by the minutes between the
/// earliest and latest heartbeat, times 100.
///
/// Not clamped. A device that heartbeats more than once a minute scores
/// above 100 (five heartbeats over four minutes is `125.0`). No heartbeats
/// scores `0.0`; a single heartbeat, or any set spanning less than a minute,
/// scores `100.0`.
///
/// Heartbeats may be given in any order.
pub fn uptime(heartbeats: &[DateTime<Utc>]) -> f64 {
    let (first, last) = match heartbeats {
        [] => return 0.0,
        [_] => return 100.0,
        [head, rest @ ..] => rest.iter().fold((*head, *head), |(lo, hi), ts| {
            (lo.min(*ts), hi.max(*ts))
        }),
    };

    let minutes = span_minutes(last - first);
    if minutes < 1.0 {
        return 100.0;
    }

    (heartbeats.len() as f64 / minutes) * 100.0
}

/// Average upload duration rendered with [`format_duration`].
///
/// The mean is truncated toward zero to whole nanoseconds. An empty slice
/// renders as `"0s"`.
pub fn average_upload_duration(durations: &[i64]) -> String {
    format_duration(average_nanos(durations))
}

/// Truncating integer mean of nanosecond samples, `0` when empty.
pub fn average_nanos(durations: &[i64]) -> i64 {
    if durations.is_empty() {
        return 0;
    }
    // i128 keeps the sum exact; the mean of i64 values always fits back in i64
    let sum: i128 = durations.iter().map(|&d| d as i128).sum();
    (sum / durations.len() as i128) as i64
}

fn span_minutes(span: TimeDelta) -> f64 {
    match span.num_nanoseconds() {
        Some(nanos) => {
            let whole = nanos / NANOS_PER_MINUTE;
            let rem = nanos % NANOS_PER_MINUTE;
            whole as f64 + rem as f64 / NANOS_PER_MINUTE as f64
        }
        // only reachable for spans of roughly 292 years or more
        None => span.num_milliseconds() as f64 / 60_000.0,
    }
}

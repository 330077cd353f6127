//! Compact human-readable rendering of nanosecond durations.
//!
//! Output follows the conventional `1h2m3.5s` style: the largest units come
//! first, sub-second values use a single unit (`ns`, `µs` or `ms`), and
//! fractional digits are trimmed to the minimum needed (`7.5s`, `6s`).

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Format a signed nanosecond count, e.g. `7_500_000_000` -> `"7.5s"`.
pub fn format_duration(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }

    let sign = if nanos < 0 { "-" } else { "" };
    // unsigned_abs keeps i64::MIN representable
    let magnitude = nanos.unsigned_abs();

    if magnitude < NANOS_PER_SEC {
        let (digits, unit) = if magnitude < NANOS_PER_MICRO {
            (0, "ns")
        } else if magnitude < NANOS_PER_MILLI {
            (3, "µs")
        } else {
            (6, "ms")
        };
        let (whole, frac) = split_fraction(magnitude, digits);
        return format!("{sign}{whole}{frac}{unit}");
    }

    let (total_secs, frac) = split_fraction(magnitude, 9);
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;

    if total_mins == 0 {
        return format!("{sign}{secs}{frac}s");
    }

    let mins = total_mins % 60;
    let hours = total_mins / 60;
    if hours == 0 {
        format!("{sign}{mins}m{secs}{frac}s")
    } else {
        format!("{sign}{hours}h{mins}m{secs}{frac}s")
    }
}

/// Split `value` into its integer part and a `.ddd` suffix holding the
/// lowest `digits` decimal places, trailing zeros removed. The suffix is
/// empty when those places are all zero.
fn split_fraction(value: u64, digits: u32) -> (u64, String) {
    if digits == 0 {
        return (value, String::new());
    }
    let scale = 10u64.pow(digits);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return (whole, String::new());
    }
    let padded = format!("{:0width$}", frac, width = digits as usize);
    (whole, format!(".{}", padded.trim_end_matches('0')))
}

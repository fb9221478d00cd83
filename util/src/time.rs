//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole control cycles needed to cover `duration_s`.
///
/// Partial cycles round up so that a wait never finishes early. Negative or
/// non-finite durations give zero cycles.
pub fn seconds_to_cycles(duration_s: f64, cycle_period_s: f64) -> u32 {
    if !duration_s.is_finite() || duration_s <= 0.0 || cycle_period_s <= 0.0 {
        return 0;
    }

    // Remove float noise so that e.g. 0.5 / 0.02 doesn't become 26 cycles
    let cycles = duration_s / cycle_period_s;
    let rounded = cycles.round();
    if (cycles - rounded).abs() < 1e-9 {
        rounded as u32
    }
    else {
        cycles.ceil() as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_to_cycles() {
        assert_eq!(seconds_to_cycles(0.5, 0.02), 25);
        assert_eq!(seconds_to_cycles(0.51, 0.02), 26);
        assert_eq!(seconds_to_cycles(1.0, 0.1), 10);
        assert_eq!(seconds_to_cycles(0.0, 0.02), 0);
        assert_eq!(seconds_to_cycles(-1.0, 0.02), 0);
        assert_eq!(seconds_to_cycles(f64::NAN, 0.02), 0);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}

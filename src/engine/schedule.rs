use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Next wall-clock time at `minute` past the hour (in `tz`) strictly after
/// `now`.
pub fn compute_next_pulse(now: DateTime<Utc>, tz: Tz, minute: u32) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    let candidate = local
        .date_naive()
        .and_hms_opt(local.hour(), minute.min(59), 0)
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        // Local hour skipped by a DST jump
        .unwrap_or_else(|| truncate_to_hour(now) + Duration::minutes(minute as i64));

    if candidate <= now {
        candidate + Duration::hours(1)
    } else {
        candidate
    }
}

/// Time left until `at`, zero if already past.
pub fn until(at: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (at - now).to_std().unwrap_or_default()
}

fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::minutes(t.minute() as i64)
        - Duration::seconds(t.second() as i64)
        - Duration::nanoseconds(t.nanosecond() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn later_in_same_hour() {
        let next = compute_next_pulse(utc("2024-01-15T10:00:30Z"), Tz::UTC, 1);
        assert_eq!(next, utc("2024-01-15T10:01:00Z"));
    }

    #[test]
    fn exact_pulse_moves_to_next_hour() {
        let next = compute_next_pulse(utc("2024-01-15T10:01:00Z"), Tz::UTC, 1);
        assert_eq!(next, utc("2024-01-15T11:01:00Z"));
    }

    #[test]
    fn rolls_over_midnight() {
        let next = compute_next_pulse(utc("2024-01-15T23:30:00Z"), Tz::UTC, 1);
        assert_eq!(next, utc("2024-01-16T00:01:00Z"));
    }

    #[test]
    fn half_hour_offset_zone() {
        // Kolkata is UTC+05:30, so local :01 is UTC :31
        let next = compute_next_pulse(utc("2024-01-15T10:00:00Z"), chrono_tz::Asia::Kolkata, 1);
        assert_eq!(next, utc("2024-01-15T10:31:00Z"));
    }

    #[test]
    fn until_never_negative() {
        let now = utc("2024-01-15T10:00:00Z");
        assert_eq!(until(now - Duration::seconds(5), now), std::time::Duration::ZERO);
        assert_eq!(until(now + Duration::seconds(5), now).as_secs(), 5);
    }
}

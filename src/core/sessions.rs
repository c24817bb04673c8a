use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::{Config, SessionTime};
use crate::models::CandleSeries;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// One concrete occurrence of a session window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRange {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExtremes {
    pub name: String,
    pub high: f64,
    pub low: f64,
}

pub struct SessionManager {
    tz: Tz,
    sessions: Vec<SessionTime>,
}

impl SessionManager {
    pub fn new(cfg: &Config) -> Self {
        Self::with_sessions(cfg.timezone, cfg.sessions.clone())
    }

    pub fn with_sessions(tz: Tz, sessions: Vec<SessionTime>) -> Self {
        Self { tz, sessions }
    }

    /// Session windows anchored at local midnight of `date`.
    pub fn ranges_for(&self, date: NaiveDate) -> Vec<SessionRange> {
        let midnight = match date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| self.tz.from_local_datetime(&naive).earliest())
        {
            Some(m) => m.with_timezone(&Utc),
            None => return Vec::new(),
        };

        self.sessions
            .iter()
            .map(|s| SessionRange {
                name: s.name.clone(),
                start: midnight + offset(s.start),
                end: midnight + offset(s.end),
            })
            .collect()
    }

    /// Latest occurrence of every session that has started by `at`.
    pub fn latest_ranges(&self, at: DateTime<Utc>) -> Vec<SessionRange> {
        let today = at.with_timezone(&self.tz).date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        let earlier = self.ranges_for(yesterday);

        self.ranges_for(today)
            .into_iter()
            .zip(earlier)
            .map(|(current, previous)| if current.start < at { current } else { previous })
            .collect()
    }

    /// Name of the session containing `utc_now`, if any.
    pub fn current_session(&self, utc_now: DateTime<Utc>) -> Option<&str> {
        let local = utc_now.with_timezone(&self.tz);
        let current_time = local.hour() * 60 + local.minute();

        self.sessions
            .iter()
            .find(|times| {
                let start_min = times.start.0 * 60 + times.start.1;
                let end_min = times.end.0 * 60 + times.end.1;
                if end_min <= MINUTES_PER_DAY {
                    current_time >= start_min && current_time < end_min
                } else {
                    // Wraps midnight (e.g. US session 19:00 - 02:00)
                    current_time >= start_min || current_time < end_min - MINUTES_PER_DAY
                }
            })
            .map(|s| s.name.as_str())
    }

    /// High/low over hourly candles opened inside `range`.
    pub fn hilo(candles: &CandleSeries, range: &SessionRange) -> Option<SessionExtremes> {
        let inside = candles.opened_between(range.start, range.end);
        if inside.is_empty() {
            return None;
        }
        Some(SessionExtremes {
            name: range.name.clone(),
            high: inside.highs_max(),
            low: inside.lows_min(),
        })
    }

    /// Extremes of the most recent Asia/Europe/US windows covered by `candles`.
    pub fn latest_extremes(&self, candles: &CandleSeries, at: DateTime<Utc>) -> Vec<SessionExtremes> {
        self.latest_ranges(at)
            .iter()
            .filter_map(|r| Self::hilo(candles, r))
            .collect()
    }
}

fn offset((hour, minute): (u32, u32)) -> Duration {
    Duration::hours(hour as i64) + Duration::minutes(minute as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sessions;
    use crate::models::Candle;

    fn utc_manager() -> SessionManager {
        SessionManager::with_sessions(Tz::UTC, default_sessions())
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn hourly(start: &str, data: &[(f64, f64)]) -> CandleSeries {
        let base = utc(start);
        let candles = data
            .iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let t_open = base + Duration::hours(i as i64);
                Candle {
                    t_open,
                    t_close: t_open + Duration::hours(1),
                    open: low,
                    high,
                    low,
                    close: high,
                    volume: 10.0,
                }
            })
            .collect();
        CandleSeries::new(candles)
    }

    #[test]
    fn us_session_crosses_midnight() {
        let sm = utc_manager();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let ranges = sm.ranges_for(date);
        let us = ranges.iter().find(|r| r.name == "US").unwrap();
        assert_eq!(us.start, utc("2024-01-15T19:00:00Z"));
        assert_eq!(us.end, utc("2024-01-16T02:00:00Z"));
    }

    #[test]
    fn local_timezone_shifts_windows() {
        let sm = SessionManager::with_sessions(chrono_tz::Asia::Tokyo, default_sessions());
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let asia = sm.ranges_for(date).into_iter().find(|r| r.name == "Asia").unwrap();
        // 06:00 JST = 21:00 UTC on the previous day
        assert_eq!(asia.start, utc("2024-01-14T21:00:00Z"));
    }

    #[test]
    fn current_session_lookup() {
        let sm = utc_manager();
        assert_eq!(sm.current_session(utc("2024-01-15T07:00:00Z")), Some("Asia"));
        assert_eq!(sm.current_session(utc("2024-01-15T16:30:00Z")), Some("Europe"));
        assert_eq!(sm.current_session(utc("2024-01-15T23:00:00Z")), Some("US"));
        assert_eq!(sm.current_session(utc("2024-01-16T01:00:00Z")), Some("US"));
        assert_eq!(sm.current_session(utc("2024-01-16T03:00:00Z")), None);
    }

    #[test]
    fn hilo_uses_half_open_window() {
        // 14:00, 15:00, 16:00 bars; Europe is [15:00, 19:00)
        let candles = hourly("2024-01-15T14:00:00Z", &[(120.0, 90.0), (105.0, 101.0), (108.0, 103.0)]);
        let europe = utc_manager()
            .ranges_for(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .into_iter()
            .find(|r| r.name == "Europe")
            .unwrap();
        let ex = SessionManager::hilo(&candles, &europe).unwrap();
        assert!((ex.high - 108.0).abs() < 1e-9);
        assert!((ex.low - 101.0).abs() < 1e-9);
    }

    #[test]
    fn latest_extremes_fall_back_to_previous_day() {
        let sm = utc_manager();
        // Bars from 2024-01-15 06:00 to 2024-01-16 08:00
        let data: Vec<(f64, f64)> = (0..27).map(|i| (100.0 + i as f64, 90.0 + i as f64)).collect();
        let candles = hourly("2024-01-15T06:00:00Z", &data);
        let at = utc("2024-01-16T09:00:00Z");

        let ranges = sm.latest_ranges(at);
        let asia = ranges.iter().find(|r| r.name == "Asia").unwrap();
        let us = ranges.iter().find(|r| r.name == "US").unwrap();
        assert_eq!(asia.start, utc("2024-01-16T06:00:00Z"));
        assert_eq!(us.start, utc("2024-01-15T19:00:00Z"));

        let extremes = sm.latest_extremes(&candles, at);
        assert_eq!(extremes.len(), 3);
        // Asia today: bars 06:00..08:00 of the 16th are indices 24..26
        let asia_ex = extremes.iter().find(|e| e.name == "Asia").unwrap();
        assert!((asia_ex.high - 126.0).abs() < 1e-9);
        assert!((asia_ex.low - 114.0).abs() < 1e-9);
    }
}

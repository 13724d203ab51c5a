//! Polling schedule: frequent checks during the day, a few fixed hours at
//! night.
//!
//! The scheduler is pure. It is generic over the time zone so the daemon can
//! feed it `Local` wall-clock time while tests pin a `FixedOffset`.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Timelike};
use mw_core::config::WatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Daytime,
    Night,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Daytime => write!(f, "daytime"),
            Mode::Night => write!(f, "night"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    daytime_interval: Duration,
    night_start: f64,
    night_end: f64,
    /// Sorted, deduplicated.
    night_checks: Vec<u32>,
}

impl Scheduler {
    pub fn new(daytime_interval_mins: u32, night_start: f64, night_end: f64, night_checks: &[u32]) -> Self {
        let mut checks = night_checks.to_vec();
        checks.sort_unstable();
        checks.dedup();
        Self {
            daytime_interval: Duration::minutes(i64::from(daytime_interval_mins)),
            night_start,
            night_end,
            night_checks: checks,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            config.daytime_interval_mins,
            config.night_start,
            config.night_end,
            &config.night_checks,
        )
    }

    /// Night when `now` lies in `[night_start, night_end)`.
    pub fn current_mode<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Mode {
        let hour = fractional_hour(now);
        if hour >= self.night_start && hour < self.night_end {
            Mode::Night
        } else {
            Mode::Daytime
        }
    }

    /// When the next cycle should run.
    ///
    /// During the day this is `now + interval`. At night it is the first
    /// night-check hour after the current hour, else the end of the night
    /// window on the same day.
    pub fn next_check_time<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let daytime_next = now.clone() + self.daytime_interval;
        if self.current_mode(now) == Mode::Daytime {
            return daytime_next;
        }

        let minutes = match self.night_checks.iter().find(|&&h| h > now.hour()) {
            Some(&hour) => i64::from(hour) * 60,
            None => hours_to_minutes(self.night_end),
        };
        // A nonexistent local time (DST gap) degrades to the daytime cadence.
        at_minutes_of_day(now, minutes).unwrap_or(daytime_next)
    }

    /// Time to sleep before the next cycle; never negative.
    pub fn sleep_duration<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> std::time::Duration {
        (self.next_check_time(now) - now.clone())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

fn fractional_hour<Tz: TimeZone>(t: &DateTime<Tz>) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0 + f64::from(t.second()) / 3600.0
}

fn hours_to_minutes(hours: f64) -> i64 {
    (hours * 60.0).round() as i64
}

/// `now`'s calendar day at `minutes` past local midnight. Values of 24h or
/// more roll into the following day.
fn at_minutes_of_day<Tz: TimeZone>(now: &DateTime<Tz>, minutes: i64) -> Option<DateTime<Tz>> {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
    let naive = midnight + Duration::minutes(minutes);
    now.timezone().from_local_datetime(&naive).earliest()
}

/// Compact human form of a duration: `2h 5m`, `14m`, `40s`.
pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{secs}s")
    }
}

/// `in 14m` for a future instant, `now` for a past one.
pub fn format_until<Tz: TimeZone>(target: &DateTime<Tz>, now: &DateTime<Tz>) -> String {
    match (target.clone() - now.clone()).to_std() {
        Ok(d) if d.as_secs() > 0 => format!("in {}", format_duration(d)),
        _ => "now".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 10, h, m, 0)
            .unwrap()
    }

    fn default_scheduler() -> Scheduler {
        Scheduler::new(15, 0.0, 8.5, &[2, 6])
    }

    #[test]
    fn night_boundary_is_half_open() {
        let s = default_scheduler();
        assert_eq!(s.current_mode(&at(0, 0)), Mode::Night);
        assert_eq!(s.current_mode(&at(8, 29)), Mode::Night);
        assert_eq!(s.current_mode(&at(8, 30)), Mode::Daytime);
        assert_eq!(s.current_mode(&at(23, 59)), Mode::Daytime);
    }

    #[test]
    fn next_check_at_night_uses_fixed_hours() {
        let s = default_scheduler();
        assert_eq!(s.next_check_time(&at(1, 0)), at(2, 0));
        assert_eq!(s.next_check_time(&at(2, 0)), at(6, 0));
        assert_eq!(s.next_check_time(&at(3, 0)), at(6, 0));
    }

    #[test]
    fn next_check_after_last_night_hour_is_night_end() {
        let s = default_scheduler();
        assert_eq!(s.next_check_time(&at(7, 0)), at(8, 30));
        assert_eq!(s.next_check_time(&at(8, 15)), at(8, 30));
    }

    #[test]
    fn next_check_in_daytime_adds_interval() {
        let s = default_scheduler();
        assert_eq!(s.next_check_time(&at(9, 0)), at(9, 15));
        assert_eq!(s.next_check_time(&at(23, 50)) - at(23, 50), Duration::minutes(15));
    }

    #[test]
    fn sleep_duration_matches_next_check() {
        let s = default_scheduler();
        assert_eq!(s.sleep_duration(&at(3, 0)), std::time::Duration::from_secs(3 * 3600));
        assert_eq!(s.sleep_duration(&at(9, 0)), std::time::Duration::from_secs(15 * 60));
    }

    #[test]
    fn night_checks_are_sorted() {
        let s = Scheduler::new(15, 0.0, 8.5, &[6, 2, 6]);
        assert_eq!(s.next_check_time(&at(1, 0)), at(2, 0));
    }

    #[test]
    fn night_without_check_hours_waits_for_day() {
        let s = Scheduler::new(10, 0.0, 7.0, &[]);
        assert_eq!(s.next_check_time(&at(0, 30)), at(7, 0));
    }

    #[test]
    fn duration_formatting() {
        use std::time::Duration as Std;
        assert_eq!(format_duration(Std::from_secs(40)), "40s");
        assert_eq!(format_duration(Std::from_secs(14 * 60)), "14m");
        assert_eq!(format_duration(Std::from_secs(2 * 3600 + 5 * 60)), "2h 5m");
        assert_eq!(format_duration(Std::from_secs(2 * 86_400 + 3600)), "2d 1h");
        assert_eq!(format_until(&at(9, 15), &at(9, 0)), "in 15m");
        assert_eq!(format_until(&at(9, 0), &at(9, 15)), "now");
    }
}

//! Fixed-time daily schedule
//!
//! Times are wall-clock UTC. The defaults (07:00, 15:00, 23:00) are
//! 16:00, 00:00 and 08:00 in Japan.

use crate::{Result, WardenError};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Parse one `HH:MM` time of day
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        WardenError::Config(format!("Invalid schedule time '{}': {}", value, e))
    })
}

/// The times of day at which a full apply runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    /// Sorted, without duplicates
    times: Vec<NaiveTime>,
}

impl DailySchedule {
    pub fn new(mut times: Vec<NaiveTime>) -> Self {
        times.sort();
        times.dedup();
        Self { times }
    }

    /// Parse `HH:MM` strings
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        let times = values
            .iter()
            .map(|v| parse_time(v.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(times))
    }

    /// A schedule that never fires
    pub fn disabled() -> Self {
        Self { times: Vec::new() }
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First scheduled instant strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        if let Some(time) = self.times.iter().find(|&&t| today.and_time(t).and_utc() > now) {
            return Some(today.and_time(*time).and_utc());
        }

        let first = self.times.first()?;
        let tomorrow = today.succ_opt()?;
        Some(tomorrow.and_time(*first).and_utc())
    }

    /// Tick following one that fired at `fired`
    ///
    /// Slots already behind `now`, e.g. after the host slept, are skipped
    /// rather than fired back to back.
    pub fn following(&self, fired: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_after(fired.max(now))
    }

    /// Time left until the next tick
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let next = self.next_after(now)?;
        (next - now)
            .max(Duration::zero())
            .to_std()
            .ok()
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        let times = [(7, 0), (15, 0), (23, 0)]
            .into_iter()
            .filter_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
            .collect();
        Self::new(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_default_times() {
        let schedule = DailySchedule::default();
        let rendered: Vec<String> = schedule
            .times()
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        assert_eq!(rendered, vec!["07:00", "15:00", "23:00"]);
    }

    #[test]
    fn test_next_same_day() {
        let schedule = DailySchedule::default();
        assert_eq!(schedule.next_after(at(10, 30, 0)), Some(at(15, 0, 0)));
        assert_eq!(schedule.next_after(at(0, 0, 0)), Some(at(7, 0, 0)));
    }

    #[test]
    fn test_exact_tick_moves_to_next() {
        let schedule = DailySchedule::default();
        assert_eq!(schedule.next_after(at(15, 0, 0)), Some(at(23, 0, 0)));
    }

    #[test]
    fn test_wraps_to_tomorrow() {
        let schedule = DailySchedule::default();
        let expected = Utc.with_ymd_and_hms(2026, 3, 15, 7, 0, 0).unwrap();
        assert_eq!(schedule.next_after(at(23, 30, 0)), Some(expected));
    }

    #[test]
    fn test_following_skips_missed_slots() {
        let schedule = DailySchedule::default();
        let fired = Utc.with_ymd_and_hms(2026, 3, 12, 7, 0, 0).unwrap();

        assert_eq!(schedule.following(fired, at(10, 30, 0)), Some(at(15, 0, 0)));
        assert_eq!(schedule.following(at(7, 0, 0), at(7, 0, 1)), Some(at(15, 0, 0)));
    }

    #[test]
    fn test_until_next() {
        let schedule = DailySchedule::default();
        assert_eq!(
            schedule.until_next(at(14, 59, 30)),
            Some(std::time::Duration::from_secs(30))
        );
    }

    #[test]
    fn test_parse_sorts_and_dedups() {
        let schedule = DailySchedule::parse(&["23:00", "07:00", "07:00"]).unwrap();
        assert_eq!(schedule.times().len(), 2);
        assert_eq!(schedule.times()[0], NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DailySchedule::parse(&["noon"]).is_err());
        assert!(parse_time("24:00").is_err());
    }

    #[test]
    fn test_disabled_never_fires() {
        let schedule = DailySchedule::disabled();
        assert!(schedule.next_after(at(12, 0, 0)).is_none());
        assert!(schedule.until_next(at(12, 0, 0)).is_none());
    }
}

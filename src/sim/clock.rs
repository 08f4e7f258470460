use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};

/// Shared simulated wall clock, advanced by a fixed step once per tick.
///
/// The clock remembers where it started so `rewind` can return to it, and it
/// reports whether an advance crossed into a new calendar day.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use microgrid_sim::sim::clock::SimClock;
///
/// let start = Utc.with_ymd_and_hms(2024, 6, 21, 23, 45, 0).unwrap();
/// let mut clock = SimClock::new(start, 15);
///
/// assert!(clock.advance());               // crossed midnight
/// assert_eq!(clock.hour_of_day(), 0.0);
/// assert!(!clock.advance());
/// assert_eq!(clock.hour_of_day(), 0.25);
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Timestamp the clock was created with
    start: DateTime<Utc>,
    /// Current simulated timestamp
    now: DateTime<Utc>,
    /// Simulated minutes per tick
    step_minutes: u32,
}

impl SimClock {
    /// Creates a clock at `start` that advances `step_minutes` per tick.
    ///
    /// # Panics
    ///
    /// Panics if `step_minutes` is zero.
    pub fn new(start: DateTime<Utc>, step_minutes: u32) -> Self {
        assert!(step_minutes > 0, "step_minutes must be > 0");
        Self {
            start,
            now: start,
            step_minutes,
        }
    }

    /// Advances by one step.
    ///
    /// # Returns
    ///
    /// `true` when the new timestamp falls on a later calendar day.
    pub fn advance(&mut self) -> bool {
        let before = self.date();
        self.now += TimeDelta::minutes(i64::from(self.step_minutes));
        self.date() != before
    }

    /// Returns to the starting timestamp.
    pub fn rewind(&mut self) {
        self.now = self.start;
    }

    /// Current simulated timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Calendar date of the current timestamp.
    pub fn date(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Fractional hour of day in `[0, 24)`.
    pub fn hour_of_day(&self) -> f64 {
        f64::from(self.now.hour()) + f64::from(self.now.minute()) / 60.0
    }

    /// Simulated minutes per tick.
    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_advance_by_step() {
        let mut clock = SimClock::new(start(), 15);
        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), start() + TimeDelta::minutes(30));
        assert_eq!(clock.hour_of_day(), 0.5);
    }

    #[test]
    fn test_full_day_crosses_once() {
        let mut clock = SimClock::new(start(), 15);
        let crossings = (0..96).filter(|_| clock.advance()).count();
        assert_eq!(crossings, 1);
        assert_eq!(clock.date(), start().date_naive().succ_opt().unwrap());
    }

    #[test]
    fn test_rewind() {
        let mut clock = SimClock::new(start(), 15);
        for _ in 0..10 {
            clock.advance();
        }
        clock.rewind();
        assert_eq!(clock.now(), start());
    }

    #[test]
    #[should_panic]
    fn test_zero_step_panics() {
        SimClock::new(start(), 0);
    }
}

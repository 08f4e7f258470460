use std::str::FromStr;

/// Grid outage flag with a countdown in simulated minutes.
///
/// The countdown is consumed at the start of each tick; the tick on which it
/// reaches zero already runs in normal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutageState {
    active: bool,
    remaining_min: u32,
}

/// Outage to trigger just before a given tick runs (headless runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledOutage {
    /// 1-based tick the outage is triggered before.
    pub before_tick: u64,
    /// Duration in simulated minutes.
    pub duration_min: u32,
}

impl FromStr for ScheduledOutage {
    type Err = String;

    /// Parses `TICK:MINUTES`, e.g. `40:60`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tick, minutes) = s
            .split_once(':')
            .ok_or_else(|| format!("expected TICK:MINUTES, got \"{s}\""))?;
        let before_tick = tick
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("bad tick \"{tick}\": {e}"))?;
        let duration_min = minutes
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad minutes \"{minutes}\": {e}"))?;
        if before_tick == 0 || duration_min == 0 {
            return Err("tick and minutes must both be > 0".to_string());
        }
        Ok(Self {
            before_tick,
            duration_min,
        })
    }
}

/// Outcome of consuming one tick of outage time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageTransition {
    /// No outage was active.
    Idle,
    /// Still active after the countdown.
    Continuing,
    /// The countdown reached zero on this tick.
    Ended,
}

impl OutageState {
    /// Starts (or restarts) an outage lasting `duration_min` minutes.
    ///
    /// A zero duration clears the outage.
    pub fn trigger(&mut self, duration_min: u32) {
        self.active = duration_min > 0;
        self.remaining_min = duration_min;
    }

    /// Clears any outage immediately.
    pub fn clear(&mut self) {
        self.active = false;
        self.remaining_min = 0;
    }

    /// Consumes `step_min` minutes of the countdown.
    pub fn elapse(&mut self, step_min: u32) -> OutageTransition {
        if !self.active {
            return OutageTransition::Idle;
        }
        self.remaining_min = self.remaining_min.saturating_sub(step_min);
        if self.remaining_min == 0 {
            self.active = false;
            OutageTransition::Ended
        } else {
            OutageTransition::Continuing
        }
    }

    /// Returns `true` while the grid is unavailable.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Minutes left on the countdown.
    pub fn remaining_min(&self) -> u32 {
        self.remaining_min
    }
}

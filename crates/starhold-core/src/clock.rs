//! Room clock for the Starhold tick loop.
//!
//! The clock is the single source of truth for simulation time within a
//! room. Everything periodic in the engine (army growth, supply
//! transfers, broadcast cadence, reconciliation) derives from the tick
//! counter; no subsystem keeps its own timer.
//!
//! All arithmetic is checked. A tick counter that cannot advance is a
//! hard error, not a silent wrap.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic tick counter for one room.
///
/// Starts at tick 0; the loop advances it at the top of every cycle, so
/// the first processed tick is 1. Interval checks use [`RoomClock::is_due`]
/// over the current counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomClock {
    /// Current tick number (0 before the first cycle).
    tick: u64,
}

impl RoomClock {
    /// Create a clock at tick 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Restore a clock at an explicit tick (state restoration, tests).
    #[must_use]
    pub const fn at(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether a periodic task with the given interval fires this tick.
    ///
    /// An interval of 0 never fires (the task is disabled). Tick 0 is
    /// never due; the loop only evaluates ticks from 1 upward.
    #[must_use]
    pub fn is_due(&self, interval_ticks: u64) -> bool {
        if self.tick == 0 {
            return false;
        }
        self.tick
            .checked_rem(interval_ticks)
            .is_some_and(|rem| rem == 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero_and_advances() {
        let mut clock = RoomClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn interval_fires_on_multiples_only() {
        let mut clock = RoomClock::new();
        assert!(!clock.is_due(5));

        let mut due_ticks = Vec::new();
        for _ in 0..12 {
            let tick = clock.advance().unwrap();
            if clock.is_due(5) {
                due_ticks.push(tick);
            }
        }
        assert_eq!(due_ticks, vec![5, 10]);
    }

    #[test]
    fn zero_interval_never_fires() {
        let mut clock = RoomClock::new();
        for _ in 0..10 {
            let _ = clock.advance().unwrap();
            assert!(!clock.is_due(0));
        }
    }

    #[test]
    fn interval_of_one_fires_every_tick() {
        let mut clock = RoomClock::new();
        for _ in 0..4 {
            let _ = clock.advance().unwrap();
            assert!(clock.is_due(1));
        }
    }

    #[test]
    fn restored_clock_keeps_cadence() {
        let clock = RoomClock::at(40);
        assert_eq!(clock.tick(), 40);
        assert!(clock.is_due(20));
        assert!(!clock.is_due(30));
    }

    #[test]
    fn overflow_is_reported() {
        let mut clock = RoomClock::at(u64::MAX);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
    }
}

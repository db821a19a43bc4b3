//! Countdown clock with increment, driven by the host's frame loop.

use std::time::Duration;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::board::Side;

/// One-shot warning threshold for a side running low on time.
pub const LOW_TIME_WARNING: Duration = Duration::from_secs(30);

/// What happened inside a [`Clock::tick`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The displayed (whole-second) time changed.
    Updated { white: Duration, black: Duration },
    /// The active side dropped below [`LOW_TIME_WARNING`]. Fires once per
    /// side.
    LowTime { side: Side, remaining: Duration },
    /// The active side's flag fell. Terminal; the clock stops.
    Expired { side: Side },
}

/// A two-sided countdown clock. Only the active side's timer counts down;
/// the side that completes a move receives the increment before the active
/// side flips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    remaining: [Duration; 2],
    increment: Duration,
    active: Side,
    running: bool,
    low_warned: [bool; 2],
}

impl Clock {
    pub fn new(initial: Duration, increment: Duration) -> Self {
        Self {
            remaining: [initial; 2],
            increment,
            active: Side::White,
            running: true,
            low_warned: [false; 2],
        }
    }

    pub fn remaining(&self, side: Side) -> Duration {
        self.remaining[side.index()]
    }

    pub fn increment(&self) -> Duration {
        self.increment
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        // A flagged clock stays stopped.
        if !self.remaining[self.active.index()].is_zero() {
            self.running = true;
        }
    }

    /// Grants the mover its increment and flips the active side.
    pub fn switch_side(&mut self) {
        let index = self.active.index();
        self.remaining[index] = self.remaining[index].saturating_add(self.increment);
        self.active = self.active.flip();
    }

    /// Advances the active side's countdown by `dt`.
    pub fn tick(&mut self, dt: Duration) -> ArrayVec<ClockTick, 3> {
        let mut events = ArrayVec::new();
        if !self.running {
            return events;
        }

        let index = self.active.index();
        let before = self.remaining[index];
        let after = before.saturating_sub(dt);
        self.remaining[index] = after;

        if after.as_secs() != before.as_secs() {
            events.push(ClockTick::Updated {
                white: self.remaining[Side::White.index()],
                black: self.remaining[Side::Black.index()],
            });
        }

        if !self.low_warned[index] && !after.is_zero() && after <= LOW_TIME_WARNING {
            self.low_warned[index] = true;
            events.push(ClockTick::LowTime {
                side: self.active,
                remaining: after,
            });
        }

        if after.is_zero() {
            self.running = false;
            events.push(ClockTick::Expired { side: self.active });
        }

        events
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn only_active_side_counts_down() {
        let mut clock = Clock::new(secs(60), secs(2));

        clock.tick(secs(5));
        assert_eq!(clock.remaining(Side::White), secs(55));
        assert_eq!(clock.remaining(Side::Black), secs(60));
    }

    #[test]
    fn switch_side_grants_increment_to_the_mover() {
        let mut clock = Clock::new(secs(60), secs(2));

        clock.tick(secs(5));
        clock.switch_side();

        assert_eq!(clock.remaining(Side::White), secs(57));
        assert_eq!(clock.active_side(), Side::Black);

        clock.tick(secs(1));
        assert_eq!(clock.remaining(Side::White), secs(57));
        assert_eq!(clock.remaining(Side::Black), secs(59));
    }

    #[test]
    fn updates_fire_on_whole_second_boundaries() {
        let mut clock = Clock::new(Duration::from_millis(60_500), secs(0));

        // 400ms: still inside the same display second.
        assert!(clock.tick(Duration::from_millis(400)).is_empty());

        // Crossing 60s -> 59s.
        let events = clock.tick(Duration::from_millis(700));
        assert_eq!(
            events.as_slice(),
            &[ClockTick::Updated {
                white: Duration::from_millis(59_400),
                black: Duration::from_millis(60_500),
            }]
        );
    }

    #[test]
    fn low_time_warning_fires_once_per_side() {
        let mut clock = Clock::new(secs(31), secs(0));

        let events = clock.tick(secs(2));
        assert!(events
            .iter()
            .any(|e| matches!(e, ClockTick::LowTime { side: Side::White, .. })));

        // Already warned; only the display update fires now.
        let events = clock.tick(secs(1));
        assert!(events
            .iter()
            .all(|e| matches!(e, ClockTick::Updated { .. })));
    }

    #[test]
    fn expiry_stops_the_clock() {
        let mut clock = Clock::new(secs(3), secs(0));

        let events = clock.tick(secs(5));
        assert!(events
            .iter()
            .any(|e| matches!(e, ClockTick::Expired { side: Side::White })));
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(Side::White), Duration::ZERO);

        // Further ticks are inert, and a flagged clock cannot resume.
        assert!(clock.tick(secs(1)).is_empty());
        clock.resume();
        assert!(!clock.is_running());
    }
}

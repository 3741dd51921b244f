//! Cancellable deferred state transitions
//!
//! A timer is a plain record checked once per tick against the clock. There
//! is no background task: cancelling just flags the record, and a flagged
//! record never fires.

use super::AgentState;

/// Slack when comparing clock time against a due time, relative to the
/// position on the timeline. Durations and tick deltas are `f32`, so a timer
/// due after three 0.1 s ticks lands a few ulps past the third tick.
const DUE_TOLERANCE: f64 = 2.0 * f32::EPSILON as f64;

/// A scheduled transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleTimer {
    /// Clock time at which the transition becomes due
    pub due_time: f64,
    /// State to switch to when due
    pub target_state: AgentState,
    /// Set when the owning state exits before the timer is due
    pub cancelled: bool,
}

impl IdleTimer {
    /// Whether the timer should fire at `now`.
    #[must_use]
    pub fn is_due(&self, now: f64) -> bool {
        let slack = DUE_TOLERANCE * self.due_time.abs().max(1.0);
        !self.cancelled && now + slack >= self.due_time
    }
}

/// Holds at most one outstanding timer per agent.
#[derive(Debug, Clone, Default)]
pub struct TimerSlot {
    timer: Option<IdleTimer>,
}

impl TimerSlot {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `target_state` for `now + duration`, replacing any prior timer.
    pub fn start(&mut self, now: f64, duration: f32, target_state: AgentState) {
        let timer = IdleTimer {
            due_time: now + f64::from(duration),
            target_state,
            cancelled: false,
        };

        if let Some(previous) = self.timer.replace(timer) {
            if !previous.cancelled {
                log::trace!(
                    "Replacing outstanding timer for {} due at {:.3}",
                    previous.target_state,
                    previous.due_time
                );
            }
        }
    }

    /// Cancel the outstanding timer. Returns whether one was live.
    pub fn cancel(&mut self) -> bool {
        match self.timer.as_mut() {
            Some(timer) if !timer.cancelled => {
                timer.cancelled = true;
                true
            }
            _ => false,
        }
    }

    /// Consume the timer if it is due, returning its target state.
    ///
    /// Cancelled records are dropped on the first poll after cancellation.
    pub fn poll(&mut self, now: f64) -> Option<AgentState> {
        let timer = self.timer?;
        if timer.cancelled {
            self.timer = None;
            return None;
        }
        if timer.is_due(now) {
            self.timer = None;
            return Some(timer.target_state);
        }
        None
    }

    /// Whether a live (not cancelled) timer is outstanding
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer.is_some_and(|t| !t.cancelled)
    }

    /// Due time of the live timer
    #[must_use]
    pub fn due_time(&self) -> Option<f64> {
        self.timer.filter(|t| !t.cancelled).map(|t| t.due_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Clock, TickClock};

    #[test]
    fn test_fires_when_due_and_not_before() {
        let mut slot = TimerSlot::new();
        slot.start(0.0, 5.0, AgentState::Patrolling);

        assert_eq!(slot.poll(4.5), None);
        assert!(slot.is_pending());
        assert_eq!(slot.poll(5.0), Some(AgentState::Patrolling));
        assert!(!slot.is_pending());

        // Fired timers do not fire twice
        assert_eq!(slot.poll(6.0), None);
    }

    #[test]
    fn test_cancelled_never_fires() {
        let mut slot = TimerSlot::new();
        slot.start(0.0, 1.0, AgentState::Patrolling);

        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert_eq!(slot.poll(10.0), None);
        assert_eq!(slot.due_time(), None);
    }

    #[test]
    fn test_restart_replaces_prior_timer() {
        let mut slot = TimerSlot::new();
        slot.start(0.0, 5.0, AgentState::Patrolling);
        slot.start(3.0, 5.0, AgentState::Patrolling);

        assert_eq!(slot.due_time(), Some(8.0));
        assert_eq!(slot.poll(5.0), None);
        assert_eq!(slot.poll(8.0), Some(AgentState::Patrolling));
    }

    #[test]
    fn test_due_on_tick_matching_duration() {
        // 10 Hz clock, timer started on the first tick
        let mut clock = TickClock::new();
        clock.advance(0.1);

        let mut slot = TimerSlot::new();
        slot.start(clock.now(), 0.3, AgentState::Patrolling);

        clock.advance(0.1);
        assert_eq!(slot.poll(clock.now()), None);
        clock.advance(0.1);
        assert_eq!(slot.poll(clock.now()), None);
        clock.advance(0.1);
        assert_eq!(slot.poll(clock.now()), Some(AgentState::Patrolling));
    }

    #[test]
    fn test_not_due_a_tick_early() {
        let mut slot = TimerSlot::new();
        slot.start(100.0, 0.3, AgentState::Patrolling);
        assert_eq!(slot.poll(100.2), None);
        assert!(slot.is_pending());
    }

    #[test]
    fn test_zero_duration_is_due_immediately() {
        let mut slot = TimerSlot::new();
        slot.start(2.0, 0.0, AgentState::Patrolling);
        assert_eq!(slot.poll(2.0), Some(AgentState::Patrolling));
    }
}

//! Tick clock

/// Monotonic time source read once per tick.
pub trait Clock {
    /// Seconds since the clock started
    fn now(&self) -> f64;
}

/// Fixed-step clock advanced explicitly by the tick driver.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    elapsed: f64,
    delta: f32,
    ticks: u64,
}

impl TickClock {
    /// Clock at t = 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds. Negative steps are ignored.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.elapsed += f64::from(dt);
        self.delta = dt;
        self.ticks += 1;
    }

    /// Length of the last step in seconds
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    /// Number of steps taken
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

impl Clock for TickClock {
    fn now(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut clock = TickClock::new();
        clock.advance(0.5);
        clock.advance(0.25);

        assert_eq!(clock.now(), 0.75);
        assert_eq!(clock.delta_seconds(), 0.25);
        assert_eq!(clock.tick_count(), 2);
    }

    #[test]
    fn test_is_monotonic() {
        let mut clock = TickClock::new();
        clock.advance(1.0);
        clock.advance(-3.0);
        assert_eq!(clock.now(), 1.0);
    }
}

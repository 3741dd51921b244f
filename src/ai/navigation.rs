//! Navigation collaborator
//!
//! The state machine never plans paths itself. It hands destinations to a
//! [`Navigator`] and reads back two signals: whether a path is still being
//! planned and how far the agent is from the current destination.
//!
//! [`DirectNavigator`] is a minimal kinematic stand-in that walks in a
//! straight line, used by the ECS host and the demo.

use glam::Vec3;

use super::AiError;
use super::smoothing::SmoothVelocity;

/// Path-following backend driven by the state machine.
pub trait Navigator {
    /// Request a new destination.
    ///
    /// # Errors
    ///
    /// `NavigatorRejected` if the point is unreachable.
    fn set_destination(&mut self, point: Vec3) -> Result<(), AiError>;

    /// Stop where the agent currently stands.
    fn stop(&mut self);

    /// Whether a requested path is still being computed.
    fn is_path_pending(&self) -> bool;

    /// Distance left to the current destination.
    fn remaining_distance(&self) -> f32;
}

/// Straight-line mover with a planning delay and optional walkable bounds.
#[derive(Debug, Clone)]
pub struct DirectNavigator {
    position: Vec3,
    destination: Vec3,
    max_speed: f32,
    acceleration_time: f32,
    /// Ticks a fresh destination stays pending
    planning_ticks: u32,
    pending_ticks: u32,
    /// Inclusive walkable box (min, max)
    bounds: Option<(Vec3, Vec3)>,
    speed: SmoothVelocity,
    velocity: Vec3,
}

impl DirectNavigator {
    /// Create a navigator standing at `position`
    #[must_use]
    pub fn new(position: Vec3, max_speed: f32) -> Self {
        Self {
            position,
            destination: position,
            max_speed,
            acceleration_time: 0.2,
            planning_ticks: 0,
            pending_ticks: 0,
            bounds: None,
            speed: SmoothVelocity::new(),
            velocity: Vec3::ZERO,
        }
    }

    /// Set how many ticks a new destination stays pending
    #[must_use]
    pub fn with_planning_ticks(mut self, ticks: u32) -> Self {
        self.planning_ticks = ticks;
        self
    }

    /// Set the time to reach full speed
    #[must_use]
    pub fn with_acceleration_time(mut self, seconds: f32) -> Self {
        self.acceleration_time = seconds;
        self
    }

    /// Reject destinations outside the box
    #[must_use]
    pub fn with_bounds(mut self, min: Vec3, max: Vec3) -> Self {
        self.bounds = Some((min.min(max), min.max(max)));
        self
    }

    /// Advance along the current destination and return the new position.
    pub fn step(&mut self, dt: f32) -> Vec3 {
        if self.pending_ticks > 0 {
            self.pending_ticks -= 1;
            self.velocity = Vec3::ZERO;
            return self.position;
        }

        let to_destination = self.destination - self.position;
        let distance = to_destination.length();
        if distance <= 1e-4 {
            self.position = self.destination;
            self.speed.reset(0.0);
            self.velocity = Vec3::ZERO;
            return self.position;
        }

        let direction = to_destination / distance;
        let speed = self.speed.damp(self.max_speed, self.acceleration_time, dt);
        let travel = (speed * dt).min(distance);

        self.position += direction * travel;
        self.velocity = direction * speed;
        self.position
    }

    /// Current position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current destination
    #[must_use]
    pub fn destination(&self) -> Vec3 {
        self.destination
    }

    /// Velocity applied on the last step
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn is_walkable(&self, point: Vec3) -> bool {
        match self.bounds {
            Some((min, max)) => point.cmpge(min).all() && point.cmple(max).all(),
            None => true,
        }
    }
}

impl Navigator for DirectNavigator {
    fn set_destination(&mut self, point: Vec3) -> Result<(), AiError> {
        if !point.is_finite() {
            return Err(AiError::NavigatorRejected(format!("{point} is not finite")));
        }
        if !self.is_walkable(point) {
            return Err(AiError::NavigatorRejected(format!(
                "{point} is outside walkable bounds"
            )));
        }

        self.destination = point;
        self.pending_ticks = self.planning_ticks;
        Ok(())
    }

    fn stop(&mut self) {
        self.destination = self.position;
        self.pending_ticks = 0;
        self.speed.reset(0.0);
        self.velocity = Vec3::ZERO;
    }

    fn is_path_pending(&self) -> bool {
        self.pending_ticks > 0
    }

    fn remaining_distance(&self) -> f32 {
        self.position.distance(self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walks_to_destination() {
        let mut nav = DirectNavigator::new(Vec3::ZERO, 5.0);
        nav.set_destination(Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((nav.remaining_distance() - 5.0).abs() < 1e-4);

        for _ in 0..300 {
            nav.step(1.0 / 60.0);
        }

        assert!(nav.remaining_distance() < 1e-3);
        assert_eq!(nav.velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_never_overshoots() {
        let mut nav = DirectNavigator::new(Vec3::ZERO, 100.0).with_acceleration_time(0.01);
        nav.set_destination(Vec3::X).unwrap();

        for _ in 0..10 {
            let position = nav.step(0.5);
            assert!(position.x <= 1.0);
        }
    }

    #[test]
    fn test_planning_delay() {
        let mut nav = DirectNavigator::new(Vec3::ZERO, 5.0).with_planning_ticks(2);
        nav.set_destination(Vec3::new(10.0, 0.0, 0.0)).unwrap();

        assert!(nav.is_path_pending());
        nav.step(0.1);
        assert!(nav.is_path_pending());
        nav.step(0.1);
        assert!(!nav.is_path_pending());
        assert_eq!(nav.position(), Vec3::ZERO);

        nav.step(0.1);
        assert!(nav.position().x > 0.0);
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let mut nav = DirectNavigator::new(Vec3::ZERO, 5.0)
            .with_bounds(Vec3::splat(-10.0), Vec3::splat(10.0));

        let err = nav.set_destination(Vec3::new(50.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, AiError::NavigatorRejected(_)));
        assert!(nav.set_destination(Vec3::new(f32::INFINITY, 0.0, 0.0)).is_err());

        // Destination unchanged after a rejection
        assert_eq!(nav.destination(), Vec3::ZERO);
    }

    #[test]
    fn test_stop_holds_position() {
        let mut nav = DirectNavigator::new(Vec3::ZERO, 5.0);
        nav.set_destination(Vec3::new(10.0, 0.0, 0.0)).unwrap();
        for _ in 0..10 {
            nav.step(0.1);
        }

        nav.stop();
        let held = nav.position();
        nav.step(0.1);

        assert_eq!(nav.position(), held);
        assert_eq!(nav.remaining_distance(), 0.0);
    }
}

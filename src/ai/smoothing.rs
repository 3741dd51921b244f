//! Low-order damping filters for movement and look direction
//!
//! Critically damped spring approximation (Game Programming Gems 4, ch. 1.10).
//! Each filter keeps its own velocity between calls.

/// Damp `current` toward `target` without overshooting.
///
/// `velocity` is carried between calls. A non-positive `dt` leaves the value
/// untouched.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    // Clamp when the step crosses the target
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }

    output
}

/// Shortest signed difference between two angles, in degrees.
#[must_use]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 { delta - 360.0 } else { delta }
}

/// Scalar speed damper.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothVelocity {
    current: f32,
    velocity: f32,
}

impl SmoothVelocity {
    /// Create a damper at rest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Step toward `target`
    pub fn damp(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        self.current = smooth_damp(self.current, target, &mut self.velocity, smooth_time, dt);
        self.current
    }

    /// Current value
    #[must_use]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Snap to a value and drop accumulated velocity
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.velocity = 0.0;
    }
}

/// Angle damper that turns the short way around.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothAngle {
    current: f32,
    velocity: f32,
}

impl SmoothAngle {
    /// Start at `angle_deg`
    #[must_use]
    pub fn new(angle_deg: f32) -> Self {
        Self {
            current: angle_deg,
            velocity: 0.0,
        }
    }

    /// Step toward `target_deg`
    pub fn damp(&mut self, target_deg: f32, smooth_time: f32, dt: f32) -> f32 {
        let unwrapped = self.current + delta_angle(self.current, target_deg);
        self.current = smooth_damp(self.current, unwrapped, &mut self.velocity, smooth_time, dt);
        self.current
    }

    /// Current angle in degrees (not normalized)
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.current
    }

    /// Overwrite the current angle
    pub fn set_angle(&mut self, angle_deg: f32) {
        self.current = angle_deg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let mut velocity = 0.0;
        let mut value = 0.0;

        for _ in 0..200 {
            value = smooth_damp(value, 10.0, &mut velocity, 0.3, 1.0 / 60.0);
            assert!(value <= 10.0);
        }

        assert!((value - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut velocity = 1.0;
        assert_eq!(smooth_damp(3.0, 10.0, &mut velocity, 0.3, 0.0), 3.0);
        assert_eq!(velocity, 1.0);
    }

    #[test]
    fn test_delta_angle_wraps() {
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_angle_turns_short_way() {
        let mut angle = SmoothAngle::new(350.0);
        let first = angle.damp(10.0, 0.2, 1.0 / 60.0);

        // Moves up through 360 rather than down through 180
        assert!(first > 350.0);
    }

    #[test]
    fn test_speed_damper_ramps() {
        let mut speed = SmoothVelocity::new();
        let a = speed.damp(5.0, 0.2, 0.05);
        let b = speed.damp(5.0, 0.2, 0.05);

        assert!(a > 0.0 && b > a && b < 5.0);

        speed.reset(0.0);
        assert_eq!(speed.value(), 0.0);
    }
}

//! Cyclic patrol route

use glam::Vec3;

use super::AiError;

/// Ordered waypoints plus a cursor that wraps around.
///
/// The cursor names the waypoint the agent currently holds: at spawn the
/// agent is posted at waypoint 0. Each arrival moves the cursor to the next
/// waypoint and returns it as the new destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolRoute {
    waypoints: Vec<Vec3>,
    current: usize,
}

impl PatrolRoute {
    /// Create a route with the cursor at 0.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the route is empty or a waypoint is
    /// not finite.
    pub fn new(waypoints: Vec<Vec3>) -> Result<Self, AiError> {
        if waypoints.is_empty() {
            return Err(AiError::InvalidConfiguration(
                "patrol route needs at least one waypoint".into(),
            ));
        }
        if let Some(bad) = waypoints.iter().find(|w| !w.is_finite()) {
            return Err(AiError::InvalidConfiguration(format!(
                "patrol waypoint {bad} is not finite"
            )));
        }
        Ok(Self {
            waypoints,
            current: 0,
        })
    }

    /// Number of waypoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false: routes hold at least one waypoint
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Cursor position, always `< len()`
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Waypoint the cursor would move to next
    #[must_use]
    pub fn peek_next(&self) -> Vec3 {
        self.waypoints[(self.current + 1) % self.waypoints.len()]
    }

    /// Move the cursor forward one waypoint and return it.
    pub fn advance(&mut self) -> Vec3 {
        self.current = (self.current + 1) % self.waypoints.len();
        self.waypoints[self.current]
    }
}

//! Agent configuration record
//!
//! Supplied at construction and validated immediately. Files can be written in
//! RON or JSON:
//!
//! ```ron
//! (
//!     sensor: (
//!         radius: 30.0,
//!         cone: Split(horizontal_half_angle_deg: 60.0, vertical_half_angle_deg: 50.0),
//!         target_layers: 1,
//!         obstacle_layers: 2,
//!     ),
//!     waypoints: [(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)],
//!     idle_duration: Some(5.0),
//! )
//! ```

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::AiError;
use super::perception::SensorConfig;

/// What a switch to the state the agent is already in does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReentryPolicy {
    /// Run exit then entry again (restarts the idle timer)
    #[default]
    Rerun,
    /// Treat the switch as a no-op
    Ignore,
}

/// Host-side movement tuning, consumed by the ECS driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Top walking speed in units per second
    pub move_speed: f32,
    /// Time to reach top speed
    pub acceleration_time: f32,
    /// Smoothing time for turning toward a heading
    pub turn_smooth_time: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.5,
            acceleration_time: 0.2,
            turn_smooth_time: 0.1,
        }
    }
}

/// Full per-agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Perception parameters
    pub sensor: SensorConfig,
    /// Patrol waypoints, visited in order
    pub waypoints: Vec<Vec3>,
    /// Seconds spent idle before patrolling; `None` never leaves Idle on its own
    pub idle_duration: Option<f32>,
    /// Remaining distance at which a destination counts as reached
    pub arrival_threshold: f32,
    /// Same-state switch behavior
    pub reentry: ReentryPolicy,
    /// Movement filters
    pub motion: MotionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            waypoints: Vec::new(),
            idle_duration: Some(5.0),
            arrival_threshold: 0.5,
            reentry: ReentryPolicy::default(),
            motion: MotionConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Default configuration patrolling the given waypoints
    #[must_use]
    pub fn with_waypoints(waypoints: Vec<Vec3>) -> Self {
        Self {
            waypoints,
            ..Default::default()
        }
    }

    /// Whether the agent can leave Idle for Patrolling on its own
    #[must_use]
    pub fn patrols(&self) -> bool {
        self.idle_duration.is_some()
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first offending field.
    pub fn validate(&self) -> Result<(), AiError> {
        self.sensor.validate()?;

        if let Some(duration) = self.idle_duration {
            if !(duration.is_finite() && duration >= 0.0) {
                return Err(AiError::InvalidConfiguration(format!(
                    "idle duration must be >= 0, got {duration}"
                )));
            }
        }

        if !(self.arrival_threshold.is_finite() && self.arrival_threshold >= 0.0) {
            return Err(AiError::InvalidConfiguration(format!(
                "arrival threshold must be >= 0, got {}",
                self.arrival_threshold
            )));
        }

        if self.patrols() && self.waypoints.is_empty() {
            return Err(AiError::InvalidConfiguration(
                "empty patrol route while patrolling is reachable".into(),
            ));
        }

        let motion = &self.motion;
        if !(motion.move_speed.is_finite() && motion.move_speed >= 0.0) {
            return Err(AiError::InvalidConfiguration(format!(
                "move speed must be >= 0, got {}",
                motion.move_speed
            )));
        }

        Ok(())
    }

    /// Parse and validate a RON document.
    ///
    /// # Errors
    ///
    /// `ConfigParse` on malformed input, `InvalidConfiguration` on bad values.
    pub fn from_ron_str(source: &str) -> Result<Self, AiError> {
        let config: Self = ron::from_str(source).map_err(|e| AiError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON file.
    ///
    /// # Errors
    ///
    /// `ConfigIo` if the file cannot be read, otherwise as [`Self::from_ron_str`].
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, AiError> {
        let content = fs::read_to_string(path).map_err(|e| AiError::ConfigIo(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    ///
    /// `ConfigIo`, `ConfigParse` or `InvalidConfiguration`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, AiError> {
        let content = fs::read_to_string(path).map_err(|e| AiError::ConfigIo(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| AiError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::perception::ViewCone;

    #[test]
    fn test_default_requires_waypoints() {
        assert!(AgentConfig::default().validate().is_err());
        assert!(AgentConfig::with_waypoints(vec![Vec3::ZERO]).validate().is_ok());
    }

    #[test]
    fn test_sentry_may_have_empty_route() {
        let config = AgentConfig {
            idle_duration: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.patrols());
    }

    #[test]
    fn test_rejects_bad_values() {
        let negative_idle = AgentConfig {
            idle_duration: Some(-1.0),
            ..AgentConfig::with_waypoints(vec![Vec3::ZERO])
        };
        assert!(negative_idle.validate().is_err());

        let nan_threshold = AgentConfig {
            arrival_threshold: f32::NAN,
            ..AgentConfig::with_waypoints(vec![Vec3::ZERO])
        };
        assert!(nan_threshold.validate().is_err());
    }

    #[test]
    fn test_parse_ron() {
        let source = r#"(
            sensor: (
                radius: 12.0,
                cone: Single(half_angle_deg: 45.0),
                target_layers: 1,
                obstacle_layers: 2,
            ),
            waypoints: [(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)],
            idle_duration: Some(2.5),
            reentry: Ignore,
        )"#;

        let config = AgentConfig::from_ron_str(source).unwrap();

        assert_eq!(config.sensor.radius, 12.0);
        assert_eq!(config.sensor.cone, ViewCone::Single { half_angle_deg: 45.0 });
        assert_eq!(config.waypoints.len(), 2);
        assert_eq!(config.idle_duration, Some(2.5));
        assert_eq!(config.reentry, ReentryPolicy::Ignore);
        // Unspecified fields fall back to defaults
        assert_eq!(config.arrival_threshold, 0.5);
    }

    #[test]
    fn test_parse_ron_validates() {
        let source = r#"(
            sensor: (
                radius: -1.0,
                cone: Single(half_angle_deg: 45.0),
                target_layers: 1,
                obstacle_layers: 2,
            ),
            idle_duration: None,
        )"#;

        let err = AgentConfig::from_ron_str(source).unwrap_err();
        assert!(matches!(err, AiError::InvalidConfiguration(_)));

        let err = AgentConfig::from_ron_str("(sensor: oops)").unwrap_err();
        assert!(matches!(err, AiError::ConfigParse(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = AgentConfig::with_waypoints(vec![Vec3::new(1.0, 0.0, 2.0)]);
        let json = serde_json::to_string(&config).unwrap();
        let loaded: AgentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = AgentConfig::load_ron("/nonexistent/agent.ron").unwrap_err();
        assert!(matches!(err, AiError::ConfigIo(_)));
    }
}

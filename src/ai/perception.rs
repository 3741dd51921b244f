//! Field-of-view perception with occlusion raycasting
//!
//! The sensor answers one question per tick: is a target visible from this
//! pose? A candidate is accepted when it is inside the overlap radius, inside
//! the view cone, and nothing obstacle-classified lies on the segment between
//! the observer and the candidate.
//!
//! # Example
//!
//! ```ignore
//! let sensor = PerceptionSystem::new(SensorConfig::default())?;
//! let pose = Pose::from_rotation(Vec3::ZERO, Quat::IDENTITY);
//!
//! let result = sensor.detect(&pose, &physics)?;
//! if result.visible {
//!     log::info!("target at {:?}", result.last_known_position);
//! }
//! ```

use glam::{Quat, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::AiError;

// ============================================================================
// Classification
// ============================================================================

/// Bitmask of collision layers used to classify entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches nothing
    pub const NONE: Self = Self(0);
    /// Matches every layer
    pub const ALL: Self = Self(u32::MAX);
    /// Default layer for sensed targets
    pub const TARGETS: Self = Self::layer(0);
    /// Default layer for line-of-sight blockers
    pub const OBSTACLES: Self = Self::layer(1);

    /// Mask with a single layer set. `index` wraps at 32.
    #[must_use]
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index % 32))
    }

    /// Combine two masks
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the masks share any layer
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

// ============================================================================
// Observer Pose
// ============================================================================

/// Observer position plus an orthonormal basis.
///
/// Local axes follow the +Z forward, +X right, +Y up convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Pose {
    const ORTHONORMAL_TOLERANCE: f32 = 1e-3;

    /// Build a pose from explicit basis vectors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the basis is not unit-length and
    /// mutually orthogonal, or the position is not finite.
    pub fn from_basis(position: Vec3, forward: Vec3, right: Vec3, up: Vec3) -> Result<Self, AiError> {
        if !position.is_finite() {
            return Err(AiError::InvalidConfiguration(format!(
                "observer position {position} is not finite"
            )));
        }

        let tol = Self::ORTHONORMAL_TOLERANCE;
        let unit = [forward, right, up]
            .iter()
            .all(|axis| (axis.length() - 1.0).abs() <= tol);
        let orthogonal = forward.dot(right).abs() <= tol
            && forward.dot(up).abs() <= tol
            && right.dot(up).abs() <= tol;

        if !unit || !orthogonal {
            return Err(AiError::InvalidConfiguration(format!(
                "pose basis is not orthonormal (forward {forward}, right {right}, up {up})"
            )));
        }

        Ok(Self {
            position,
            forward,
            right,
            up,
        })
    }

    /// Build a pose from a rotation applied to the local axes.
    #[must_use]
    pub fn from_rotation(position: Vec3, rotation: Quat) -> Self {
        let rotation = rotation.normalize();
        Self {
            position,
            forward: rotation * Vec3::Z,
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
        }
    }

    /// Observer position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Forward axis
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Right axis
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Up axis
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }
}

// ============================================================================
// Spatial Query Collaborator
// ============================================================================

/// A target-classified entity returned by an overlap query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Entity owning the collider
    pub entity: Entity,
    /// World-space center of the entity
    pub center: Vec3,
}

/// Overlap query result. Most queries return a handful of targets.
pub type Candidates = SmallVec<[Candidate; 8]>;

/// World queries the sensor depends on.
///
/// Implemented by [`crate::physics::PhysicsWorld`]; tests provide scripted
/// doubles.
pub trait SpatialQuery {
    /// All entities on `filter` layers overlapping the sphere.
    ///
    /// # Errors
    ///
    /// `SensorUnavailable` when the query backend cannot answer.
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: LayerMask) -> Result<Candidates, AiError>;

    /// Whether a ray hits anything on `filter` layers within `max_distance`.
    ///
    /// # Errors
    ///
    /// `SensorUnavailable` when the query backend cannot answer.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, filter: LayerMask) -> Result<bool, AiError>;
}

// ============================================================================
// Sensor Configuration
// ============================================================================

/// Shape of the angular gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewCone {
    /// Separate horizontal (forward/right plane) and vertical (forward/up
    /// plane) half-angles.
    Split {
        horizontal_half_angle_deg: f32,
        vertical_half_angle_deg: f32,
    },
    /// One combined half-angle around forward.
    Single { half_angle_deg: f32 },
}

impl ViewCone {
    fn validate(&self) -> Result<(), AiError> {
        let check = |name: &str, angle: f32| {
            if (0.0..=180.0).contains(&angle) {
                Ok(())
            } else {
                Err(AiError::InvalidConfiguration(format!(
                    "{name} must be within [0, 180], got {angle}"
                )))
            }
        };

        match *self {
            Self::Split {
                horizontal_half_angle_deg,
                vertical_half_angle_deg,
            } => {
                check("horizontal half-angle", horizontal_half_angle_deg)?;
                check("vertical half-angle", vertical_half_angle_deg)
            }
            Self::Single { half_angle_deg } => check("half-angle", half_angle_deg),
        }
    }

    /// Strict angular test of a unit direction against the cone.
    #[must_use]
    pub fn contains(&self, pose: &Pose, to_target: Vec3) -> bool {
        match *self {
            Self::Split {
                horizontal_half_angle_deg,
                vertical_half_angle_deg,
            } => {
                let horizontal = to_target - pose.up * to_target.dot(pose.up);
                let vertical = to_target - pose.right * to_target.dot(pose.right);

                angle_deg(pose.forward, horizontal) < horizontal_half_angle_deg
                    && angle_deg(pose.forward, vertical) < vertical_half_angle_deg
            }
            Self::Single { half_angle_deg } => angle_deg(pose.forward, to_target) < half_angle_deg,
        }
    }
}

/// Immutable sensor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Overlap query radius
    pub radius: f32,
    /// Angular gate
    pub cone: ViewCone,
    /// Layers of entities that can be sensed
    pub target_layers: LayerMask,
    /// Layers that block line of sight
    pub obstacle_layers: LayerMask,
}

impl SensorConfig {
    /// Check radius and angles.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first offending field.
    pub fn validate(&self) -> Result<(), AiError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(AiError::InvalidConfiguration(format!(
                "sensor radius must be > 0, got {}",
                self.radius
            )));
        }
        self.cone.validate()
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            radius: 30.0,
            cone: ViewCone::Split {
                horizontal_half_angle_deg: 60.0,
                vertical_half_angle_deg: 50.0,
            },
            target_layers: LayerMask::TARGETS,
            obstacle_layers: LayerMask::OBSTACLES,
        }
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Outcome of a single detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    /// Whether a target is in sight
    pub visible: bool,
    /// Center of the sighted target
    pub last_known_position: Option<Vec3>,
    /// The sighted entity
    pub target: Option<Entity>,
}

impl DetectionResult {
    /// Nothing in sight
    pub const NOT_VISIBLE: Self = Self {
        visible: false,
        last_known_position: None,
        target: None,
    };

    fn seen(candidate: &Candidate) -> Self {
        Self {
            visible: true,
            last_known_position: Some(candidate.center),
            target: Some(candidate.entity),
        }
    }
}

/// Angle between two vectors in degrees.
///
/// A degenerate (near-zero) vector lies in neither half of the cone and is
/// reported as 90 degrees.
#[must_use]
pub fn angle_deg(from: Vec3, to: Vec3) -> f32 {
    let denom = (from.length_squared() * to.length_squared()).sqrt();
    if denom <= 1e-6 {
        return 90.0;
    }
    (from.dot(to) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Stateless sensor owning its configuration.
#[derive(Debug, Clone)]
pub struct PerceptionSystem {
    config: SensorConfig,
}

impl PerceptionSystem {
    /// Create a sensor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the config fails validation.
    pub fn new(config: SensorConfig) -> Result<Self, AiError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Sensor parameters
    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Look for a visible target.
    ///
    /// Candidates are tested in query order and the first one that passes
    /// both the angular gate and the occlusion ray is returned.
    ///
    /// # Errors
    ///
    /// Propagates `SensorUnavailable` from the spatial collaborator.
    pub fn detect(&self, pose: &Pose, spatial: &dyn SpatialQuery) -> Result<DetectionResult, AiError> {
        let origin = pose.position();
        let candidates = spatial.overlap_sphere(origin, self.config.radius, self.config.target_layers)?;

        for candidate in &candidates {
            let offset = candidate.center - origin;
            let distance = offset.length();

            // Co-located with the observer: nothing can sit in between
            if distance <= f32::EPSILON {
                return Ok(DetectionResult::seen(candidate));
            }

            let to_target = offset / distance;
            if !self.config.cone.contains(pose, to_target) {
                continue;
            }

            let occluded = spatial.raycast(origin, to_target, distance, self.config.obstacle_layers)?;
            if !occluded {
                return Ok(DetectionResult::seen(candidate));
            }
        }

        Ok(DetectionResult::NOT_VISIBLE)
    }
}

// ============================================================================
// Tests
// ============================================================================

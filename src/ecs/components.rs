//! Common ECS components

use glam::{Quat, Vec3};

use crate::ai::{Pose, SmoothAngle};

/// Position and orientation. Local forward is +Z, right +X, up +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform at `position` turned `yaw_deg` about +Y
    pub fn from_position_yaw(position: Vec3, yaw_deg: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw_deg.to_radians()),
        }
    }

    /// Get the forward direction (positive Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y in local space)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Observer pose for perception
    pub fn pose(&self) -> Pose {
        Pose::from_rotation(self.position, self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Yaw in degrees that turns +Z toward `direction` on the XZ plane.
pub fn yaw_towards(direction: Vec3) -> Option<f32> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() <= 1e-8 {
        return None;
    }
    Some(flat.x.atan2(flat.z).to_degrees())
}

/// Smoothed yaw for an agent.
#[derive(Debug, Clone, Copy)]
pub struct Heading {
    yaw: SmoothAngle,
    /// Seconds to settle on a new heading
    pub smooth_time: f32,
}

impl Heading {
    /// Start at `yaw_deg`
    pub fn new(yaw_deg: f32, smooth_time: f32) -> Self {
        Self {
            yaw: SmoothAngle::new(yaw_deg),
            smooth_time,
        }
    }

    /// Turn toward `direction` and return the resulting rotation.
    /// A vertical or zero direction keeps the current yaw.
    pub fn turn_towards(&mut self, direction: Vec3, dt: f32) -> Quat {
        if let Some(target) = yaw_towards(direction) {
            self.yaw.damp(target, self.smooth_time, dt);
        }
        self.rotation()
    }

    /// Current yaw in degrees
    pub fn yaw_deg(&self) -> f32 {
        self.yaw.angle()
    }

    /// Rotation for the current yaw
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw.angle().to_radians())
    }
}

/// Marks an entity that agents can sense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// Collider radius
    pub radius: f32,
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

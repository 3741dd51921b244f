//! Perception-driven agent controllers
//!
//! This crate provides:
//! - Field-of-view and occlusion sensing over pluggable spatial queries
//! - A patrol/idle/chase/dead state machine with a cancellable idle timer
//! - Entity Component System (ECS) hosting with hecs
//! - Collider queries with rapier3d

pub mod ai;
pub mod core;
pub mod ecs;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{
        AgentConfig, AgentContext, AgentState, AgentStateMachine, AiError, DetectionResult,
        DirectNavigator, LayerMask, Navigator, PerceptionSystem, Pose, SensorConfig, SpatialQuery,
        TickReport, ViewCone,
    };
    pub use crate::core::{AgentEvent, Clock, EventQueue, SimConfig, Simulation, TickClock};
    pub use crate::ecs::{Heading, Name, Target, Transform, World};
    pub use crate::physics::PhysicsWorld;
    pub use glam::{Quat, Vec3};
    pub use hecs::Entity;
}

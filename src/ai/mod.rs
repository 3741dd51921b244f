//! AI module
//!
//! Agent perception, the patrol/idle/chase state machine, and the ECS
//! systems that drive them.

mod config;
mod error;
mod fsm;
mod navigation;
mod patrol;
mod perception;
mod smoothing;
mod systems;
mod timer;

pub use config::{AgentConfig, MotionConfig, ReentryPolicy};
pub use error::AiError;
pub use fsm::{AgentContext, AgentState, AgentStateMachine, StateChange, TickReport, Transition};
pub use navigation::{DirectNavigator, Navigator};
pub use patrol::PatrolRoute;
pub use perception::{
    Candidate, Candidates, DetectionResult, LayerMask, PerceptionSystem, Pose, SensorConfig,
    SpatialQuery, ViewCone, angle_deg,
};
pub use smoothing::{SmoothAngle, SmoothVelocity};
pub use systems::{force_agent_state, tick_agents};
pub use timer::{IdleTimer, TimerSlot};

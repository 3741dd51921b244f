//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod world;

pub use components::{Heading, Name, Target, Transform, yaw_towards};
pub use world::World;

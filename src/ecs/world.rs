//! World wrapper around hecs

use glam::Vec3;
use hecs::Entity;

use super::components::{Heading, Name, Target, Transform, yaw_towards};
use crate::ai::{AgentConfig, AgentState, AgentStateMachine, AiError, DirectNavigator};

/// Game world holding agents and targets
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an agent with a controller, navigator and heading built from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `config` fails validation; nothing
    /// is spawned in that case.
    pub fn spawn_agent(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        config: &AgentConfig,
    ) -> Result<Entity, AiError> {
        let brain = AgentStateMachine::new(config.clone())?;
        let motion = config.motion;
        let navigator = DirectNavigator::new(transform.position, motion.move_speed)
            .with_acceleration_time(motion.acceleration_time);
        let yaw = yaw_towards(transform.forward()).unwrap_or(0.0);
        let heading = Heading::new(yaw, motion.turn_smooth_time);

        let name = name.into();
        let entity = self
            .inner
            .spawn((Name::new(name.clone()), transform, brain, navigator, heading));
        log::info!("Spawned agent '{name}' at {}", transform.position);
        Ok(entity)
    }

    /// Spawn a sensable target
    pub fn spawn_target(&mut self, name: impl Into<String>, position: Vec3, radius: f32) -> Entity {
        self.inner.spawn((
            Name::new(name),
            Transform::from_position(position),
            Target { radius },
        ))
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// State of an agent, `None` for non-agents
    pub fn agent_state(&self, entity: Entity) -> Option<AgentState> {
        self.get::<AgentStateMachine>(entity)
            .ok()
            .map(|brain| brain.current_state())
    }

    /// Last sighting recorded by an agent
    pub fn last_known_target(&self, entity: Entity) -> Option<Vec3> {
        self.get::<AgentStateMachine>(entity)
            .ok()
            .and_then(|brain| brain.last_known_target_position())
    }

    /// Position of any entity with a transform
    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.get::<Transform>(entity).ok().map(|t| t.position)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

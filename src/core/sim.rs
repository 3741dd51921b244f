//! Fixed-step simulation driver
//!
//! [`Simulation`] owns the ECS world, the physics queries, the clock and the
//! event queue, and advances all agents one tick per [`Simulation::step`].

use glam::Vec3;
use hecs::Entity;

use crate::ai::{self, AgentConfig, AgentState, AiError, LayerMask, StateChange};
use crate::core::{Clock, EventQueue, TickClock};
use crate::ecs::{Transform, World};
use crate::physics::{ColliderHandle, PhysicsWorld};

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Name used in log output
    pub name: String,
    /// Ticks per simulated second
    pub tick_rate: u32,
    /// Stop [`Simulation::run`] after this many ticks (`None` runs until stopped)
    pub max_ticks: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: String::from("Simulation"),
            tick_rate: 60,
            max_ticks: None,
        }
    }
}

impl SimConfig {
    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set ticks per second
    pub fn with_tick_rate(mut self, rate: u32) -> Self {
        self.tick_rate = rate;
        self
    }

    /// Limit the number of ticks `run` executes
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }
}

/// World, queries, clock and events for a headless agent simulation
pub struct Simulation {
    /// Configuration
    pub config: SimConfig,
    /// ECS world
    pub world: World,
    /// Collider queries used for perception
    pub physics: PhysicsWorld,
    /// Simulation clock
    pub clock: TickClock,
    /// Events from the last tick
    pub events: EventQueue,
    should_stop: bool,
}

impl Simulation {
    /// Create an empty simulation
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            world: World::new(),
            physics: PhysicsWorld::new(),
            clock: TickClock::new(),
            events: EventQueue::new(),
            should_stop: false,
        }
    }

    /// Length of one tick in seconds
    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.config.tick_rate.max(1) as f32
    }

    /// Spawn an agent.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `config` fails validation.
    pub fn spawn_agent(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        config: &AgentConfig,
    ) -> Result<Entity, AiError> {
        self.world.spawn_agent(name, transform, config)
    }

    /// Spawn a target and register its collider on the target layer
    pub fn spawn_target(&mut self, name: impl Into<String>, position: Vec3, radius: f32) -> Entity {
        let entity = self.world.spawn_target(name, position, radius);
        self.physics
            .add_target(entity, position, radius, LayerMask::TARGETS);
        entity
    }

    /// Add a static box on the obstacle layer
    pub fn add_obstacle(&mut self, center: Vec3, half_extents: Vec3) -> ColliderHandle {
        self.physics
            .add_obstacle_box(center, half_extents, LayerMask::OBSTACLES)
    }

    /// Move a target. Returns `false` if `entity` is not a target.
    pub fn move_target(&mut self, entity: Entity, position: Vec3) -> bool {
        if !self.physics.set_target_position(entity, position) {
            return false;
        }
        if let Ok(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.position = position;
        }
        true
    }

    /// Force an agent into `state` between ticks
    pub fn force_state(&mut self, entity: Entity, state: AgentState) -> Option<StateChange> {
        self.physics.sync();
        ai::force_agent_state(
            &mut self.world,
            entity,
            state,
            &self.physics,
            &self.clock,
            &mut self.events,
        )
    }

    /// Kill an agent; it stops where it stands and never acts again
    pub fn kill_agent(&mut self, entity: Entity) -> Option<StateChange> {
        self.force_state(entity, AgentState::Dead)
    }

    /// Remove an entity and its collider. Returns `false` if it did not exist.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.physics.remove_target(entity);
        self.world.despawn(entity).is_ok()
    }

    /// Advance one tick. Events emitted during it are readable afterwards.
    pub fn step(&mut self) {
        self.physics.sync();
        self.clock.advance(self.fixed_delta());
        ai::tick_agents(&mut self.world, &self.physics, &self.clock, &mut self.events);
        self.events.swap();
    }

    /// Ask [`run`](Self::run) to return after the current tick
    pub fn stop(&mut self) {
        self.should_stop = true;
    }

    /// Whether the tick limit was reached or a stop was requested
    pub fn is_finished(&self) -> bool {
        self.should_stop
            || self
                .config
                .max_ticks
                .is_some_and(|max| self.clock.tick_count() >= max)
    }

    /// Step until finished, calling `hook` after every tick.
    ///
    /// Returns the number of ticks executed.
    pub fn run(&mut self, mut hook: impl FnMut(&mut Simulation)) -> u64 {
        log::info!(
            "Starting simulation '{}' at {} Hz",
            self.config.name,
            self.config.tick_rate
        );

        self.should_stop = false;
        let start = self.clock.tick_count();
        while !self.is_finished() {
            self.step();
            hook(self);
        }

        let ticks = self.clock.tick_count() - start;
        log::info!(
            "Simulation '{}' finished after {ticks} ticks ({:.2}s)",
            self.config.name,
            self.clock.now()
        );
        ticks
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentEvent;

    fn guard_config() -> AgentConfig {
        let mut config = AgentConfig::with_waypoints(vec![
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
        ]);
        config.idle_duration = Some(0.5);
        config
    }

    #[test]
    fn test_config_builder() {
        let config = SimConfig::default()
            .with_name("test")
            .with_tick_rate(30)
            .with_max_ticks(90);

        assert_eq!(config.name, "test");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.max_ticks, Some(90));
        assert!((Simulation::new(config).fixed_delta() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_run_stops_at_max_ticks() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_rate(10).with_max_ticks(25));
        let mut hooks = 0;

        let ticks = sim.run(|_| hooks += 1);

        assert_eq!(ticks, 25);
        assert_eq!(hooks, 25);
        assert!((sim.clock.now() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_hook_can_stop() {
        let mut sim = Simulation::default();
        let ticks = sim.run(|sim| {
            if sim.clock.tick_count() == 3 {
                sim.stop();
            }
        });
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_idle_then_patrol() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_rate(10));
        let guard = sim.spawn_agent("guard", Transform::new(), &guard_config()).unwrap();

        for _ in 0..4 {
            sim.step();
            assert_eq!(sim.world.agent_state(guard), Some(AgentState::Idle));
        }

        // Timer scheduled at t = 0.1 comes due at t = 0.6
        for _ in 0..2 {
            sim.step();
        }
        assert_eq!(sim.world.agent_state(guard), Some(AgentState::Patrolling));
    }

    #[test]
    fn test_idle_leaves_on_due_tick() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_rate(10));
        let config = AgentConfig {
            idle_duration: Some(0.3),
            ..guard_config()
        };
        let guard = sim.spawn_agent("guard", Transform::new(), &config).unwrap();

        // Idle is entered on the first tick, so 0.3 s later is the fourth
        let mut idle_ticks = 0;
        loop {
            sim.step();
            if sim.world.agent_state(guard) != Some(AgentState::Idle) {
                break;
            }
            idle_ticks += 1;
            assert!(idle_ticks < 10);
        }

        assert_eq!(idle_ticks, 3);
        assert_eq!(sim.world.agent_state(guard), Some(AgentState::Patrolling));
    }

    #[test]
    fn test_walk_into_view_and_lose_behind_wall() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_rate(10));
        let guard = sim.spawn_agent("guard", Transform::new(), &guard_config()).unwrap();
        let player = sim.spawn_target("player", Vec3::new(0.0, 0.0, -20.0), 0.5);

        sim.step();
        assert_eq!(sim.world.agent_state(guard), Some(AgentState::Idle));

        assert!(sim.move_target(player, Vec3::new(0.0, 0.0, 12.0)));
        sim.step();
        assert_eq!(sim.world.agent_state(guard), Some(AgentState::Chasing));
        assert!(sim.events.iter().any(|e| matches!(
            e,
            AgentEvent::TargetSpotted { target: Some(t), .. } if *t == player
        )));

        // A wall between guard and player hides it
        sim.add_obstacle(Vec3::new(0.0, 0.0, 6.0), Vec3::new(3.0, 3.0, 0.5));
        sim.step();
        assert!(sim
            .events
            .iter()
            .any(|e| matches!(e, AgentEvent::TargetLost { .. })));
        assert_eq!(sim.world.last_known_target(guard), Some(Vec3::new(0.0, 0.0, 12.0)));
    }

    #[test]
    fn test_kill_agent() {
        let mut sim = Simulation::default();
        let guard = sim.spawn_agent("guard", Transform::new(), &guard_config()).unwrap();
        sim.step();

        assert!(sim.kill_agent(guard).is_some());
        sim.step();
        assert!(sim.events.iter().any(|e| matches!(
            e,
            AgentEvent::StateChanged { to: AgentState::Dead, .. }
        )));

        // Dead is terminal
        assert_eq!(sim.force_state(guard, AgentState::Idle), None);
        assert_eq!(sim.world.agent_state(guard), Some(AgentState::Dead));
    }

    #[test]
    fn test_despawn() {
        let mut sim = Simulation::default();
        let player = sim.spawn_target("player", Vec3::Z, 0.5);

        assert!(sim.despawn(player));
        assert!(!sim.despawn(player));
        assert!(!sim.move_target(player, Vec3::ZERO));
        assert_eq!(sim.physics.target_count(), 0);
    }
}

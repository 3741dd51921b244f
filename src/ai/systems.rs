//! ECS systems driving agent controllers
//!
//! Agents are entities carrying a [`Transform`], an [`AgentStateMachine`],
//! a [`DirectNavigator`] and a [`Heading`]. One call to [`tick_agents`]
//! advances all of them by one clock step.

use hecs::Entity;

use super::fsm::{AgentContext, AgentState, AgentStateMachine, StateChange, TickReport};
use super::navigation::{DirectNavigator, Navigator};
use super::perception::SpatialQuery;
use crate::core::{AgentEvent, EventQueue, TickClock};
use crate::ecs::{Heading, Transform, World};

/// Below this speed agents keep their heading
const MIN_TURN_SPEED_SQ: f32 = 1e-4;

/// Tick every agent in `world`, move it, turn it and queue its events.
pub fn tick_agents(world: &mut World, spatial: &dyn SpatialQuery, clock: &TickClock, events: &mut EventQueue) {
    let dt = clock.delta_seconds();

    for (entity, (transform, brain, navigator, heading)) in world.query_mut::<(
        &mut Transform,
        &mut AgentStateMachine,
        &mut DirectNavigator,
        &mut Heading,
    )>() {
        let report = {
            let mut ctx = AgentContext::new(clock, transform.pose(), spatial, &mut *navigator);
            brain.tick(&mut ctx)
        };

        publish(entity, brain, &report, events);

        if report.state.is_terminal() {
            continue;
        }

        transform.position = navigator.step(dt);

        let facing = match report.look_at {
            Some(point) => Some(point - transform.position),
            None => {
                let velocity = navigator.velocity();
                (velocity.length_squared() > MIN_TURN_SPEED_SQ).then_some(velocity)
            }
        };
        if let Some(direction) = facing {
            transform.rotation = heading.turn_towards(direction, dt);
        }
    }
}

/// Force an agent into `next` outside its own tick (death, scripted
/// alerts). Returns `None` for non-agents or when the switch is refused.
pub fn force_agent_state(
    world: &mut World,
    entity: Entity,
    next: AgentState,
    spatial: &dyn SpatialQuery,
    clock: &TickClock,
    events: &mut EventQueue,
) -> Option<StateChange> {
    let (transform, brain, navigator) = world
        .inner
        .query_one_mut::<(&Transform, &mut AgentStateMachine, &mut DirectNavigator)>(entity)
        .ok()?;

    let change = {
        let mut ctx = AgentContext::new(clock, transform.pose(), spatial, &mut *navigator);
        brain.force_transition(next, &mut ctx)?
    };

    if change.to.is_terminal() {
        navigator.stop();
    }

    events.push(AgentEvent::StateChanged {
        entity,
        from: change.from,
        to: change.to,
    });
    Some(change)
}

fn publish(entity: Entity, brain: &AgentStateMachine, report: &TickReport, events: &mut EventQueue) {
    for change in &report.transitions {
        events.push(AgentEvent::StateChanged {
            entity,
            from: change.from,
            to: change.to,
        });
    }

    if report.sight_changed {
        match report.detection.last_known_position {
            Some(position) if report.detection.visible => events.push(AgentEvent::TargetSpotted {
                entity,
                target: report.detection.target,
                position,
            }),
            _ => events.push(AgentEvent::TargetLost {
                entity,
                last_known: brain.last_known_target_position(),
            }),
        }
    }

    if let Some(destination) = report.rejected_destination {
        events.push(AgentEvent::NavigationRejected { entity, destination });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::ai::{AgentConfig, LayerMask};
    use crate::physics::PhysicsWorld;

    const DT: f32 = 0.1;

    struct Scene {
        world: World,
        physics: PhysicsWorld,
        clock: TickClock,
        events: EventQueue,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                world: World::new(),
                physics: PhysicsWorld::new(),
                clock: TickClock::new(),
                events: EventQueue::new(),
            }
        }

        fn step(&mut self) -> Vec<AgentEvent> {
            self.physics.sync();
            self.clock.advance(DT);
            tick_agents(&mut self.world, &self.physics, &self.clock, &mut self.events);
            self.events.swap();
            self.events.drain().collect()
        }
    }

    fn patrol_config() -> AgentConfig {
        let mut config = AgentConfig::with_waypoints(vec![
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(-5.0, 0.0, -5.0),
        ]);
        config.idle_duration = Some(0.0);
        config
    }

    #[test]
    fn test_agent_starts_patrolling_and_moves() {
        let mut scene = Scene::new();
        let agent = scene
            .world
            .spawn_agent("guard", Transform::new(), &patrol_config())
            .unwrap();

        let events = scene.step();
        assert!(events.contains(&AgentEvent::StateChanged {
            entity: agent,
            from: AgentState::Idle,
            to: AgentState::Patrolling,
        }));

        for _ in 0..10 {
            scene.step();
        }
        let position = scene.world.position(agent).unwrap();
        assert!(position.length() > 0.5);
        assert_eq!(scene.world.agent_state(agent), Some(AgentState::Patrolling));
    }

    #[test]
    fn test_spotting_target_emits_events() {
        let mut scene = Scene::new();
        let agent = scene
            .world
            .spawn_agent("guard", Transform::new(), &patrol_config())
            .unwrap();
        let player = scene.world.spawn_target("player", Vec3::new(0.0, 0.0, 10.0), 0.5);
        scene
            .physics
            .add_target(player, Vec3::new(0.0, 0.0, 10.0), 0.5, LayerMask::TARGETS);

        let events = scene.step();

        assert!(events.contains(&AgentEvent::TargetSpotted {
            entity: agent,
            target: Some(player),
            position: Vec3::new(0.0, 0.0, 10.0),
        }));
        assert!(events.contains(&AgentEvent::StateChanged {
            entity: agent,
            from: AgentState::Idle,
            to: AgentState::Chasing,
        }));
        assert_eq!(scene.world.last_known_target(agent), Some(Vec3::new(0.0, 0.0, 10.0)));

        // Hiding the target reports a loss at the last sighting
        scene.physics.remove_target(player);
        let events = scene.step();
        assert!(events.contains(&AgentEvent::TargetLost {
            entity: agent,
            last_known: Some(Vec3::new(0.0, 0.0, 10.0)),
        }));
    }

    #[test]
    fn test_chaser_turns_toward_target() {
        let mut scene = Scene::new();
        let config = AgentConfig {
            idle_duration: None,
            ..Default::default()
        };
        let agent = scene.world.spawn_agent("guard", Transform::new(), &config).unwrap();
        let player = scene.world.spawn_target("player", Vec3::new(8.0, 0.0, 8.0), 0.5);
        scene
            .physics
            .add_target(player, Vec3::new(8.0, 0.0, 8.0), 0.5, LayerMask::TARGETS);

        for _ in 0..20 {
            scene.step();
        }

        let heading = scene.world.get::<Heading>(agent).unwrap().yaw_deg();
        assert!((heading - 45.0).abs() < 5.0);
    }

    #[test]
    fn test_forced_death_stops_agent() {
        let mut scene = Scene::new();
        let agent = scene
            .world
            .spawn_agent("guard", Transform::new(), &patrol_config())
            .unwrap();
        for _ in 0..5 {
            scene.step();
        }

        let change = force_agent_state(
            &mut scene.world,
            agent,
            AgentState::Dead,
            &scene.physics,
            &scene.clock,
            &mut scene.events,
        );
        assert_eq!(change.map(|c| c.to), Some(AgentState::Dead));

        let before = scene.world.position(agent).unwrap();
        for _ in 0..5 {
            scene.step();
        }
        assert_eq!(scene.world.position(agent), Some(before));
        assert_eq!(scene.world.agent_state(agent), Some(AgentState::Dead));
    }

    #[test]
    fn test_force_on_non_agent() {
        let mut scene = Scene::new();
        let player = scene.world.spawn_target("player", Vec3::ZERO, 0.5);

        let change = force_agent_state(
            &mut scene.world,
            player,
            AgentState::Chasing,
            &scene.physics,
            &scene.clock,
            &mut scene.events,
        );
        assert_eq!(change, None);
    }
}

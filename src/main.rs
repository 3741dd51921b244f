//! Headless demo: two guards patrol a courtyard while an intruder walks past

use sentry::prelude::*;

/// Intruder path, one segment per leg
const INTRUDER_PATH: [Vec3; 4] = [
    Vec3::new(-18.0, 0.0, 14.0),
    Vec3::new(18.0, 0.0, 14.0),
    Vec3::new(18.0, 0.0, -14.0),
    Vec3::new(-18.0, 0.0, -14.0),
];

/// Intruder walking speed in m/s
const INTRUDER_SPEED: f32 = 2.5;

/// Walks a target along a closed path
struct Intruder {
    entity: Entity,
    position: Vec3,
    leg: usize,
}

impl Intruder {
    fn update(&mut self, sim: &mut Simulation) {
        let dt = sim.clock.delta_seconds();
        let goal = INTRUDER_PATH[(self.leg + 1) % INTRUDER_PATH.len()];
        let to_goal = goal - self.position;
        let step = INTRUDER_SPEED * dt;

        if to_goal.length() <= step {
            self.position = goal;
            self.leg = (self.leg + 1) % INTRUDER_PATH.len();
        } else {
            self.position += to_goal.normalize() * step;
        }
        sim.move_target(self.entity, self.position);
    }
}

fn agent_config() -> Result<AgentConfig, AiError> {
    match std::env::args().nth(1) {
        Some(path) if path.ends_with(".json") => AgentConfig::load_json(path),
        Some(path) => AgentConfig::load_ron(path),
        None => Ok(AgentConfig {
            idle_duration: Some(2.0),
            ..AgentConfig::default()
        }),
    }
}

fn build_scene(sim: &mut Simulation, config: &AgentConfig) -> Result<Intruder, AiError> {
    // Courtyard walls
    sim.add_obstacle(Vec3::new(0.0, 1.5, 6.0), Vec3::new(6.0, 1.5, 0.5));
    sim.add_obstacle(Vec3::new(-8.0, 1.5, -4.0), Vec3::new(0.5, 1.5, 5.0));
    sim.add_obstacle(Vec3::new(10.0, 1.5, -2.0), Vec3::new(2.0, 1.5, 2.0));

    let north = AgentConfig {
        waypoints: if config.waypoints.is_empty() {
            vec![
                Vec3::new(-12.0, 0.0, 0.0),
                Vec3::new(12.0, 0.0, 0.0),
                Vec3::new(12.0, 0.0, 10.0),
            ]
        } else {
            config.waypoints.clone()
        },
        ..config.clone()
    };
    sim.spawn_agent(
        "north guard",
        Transform::from_position(Vec3::new(-12.0, 0.0, 0.0)),
        &north,
    )?;

    let south = AgentConfig {
        waypoints: vec![Vec3::new(0.0, 0.0, -10.0), Vec3::new(-14.0, 0.0, -10.0)],
        ..config.clone()
    };
    sim.spawn_agent(
        "south guard",
        Transform::from_position_yaw(Vec3::new(0.0, 0.0, -10.0), 180.0),
        &south,
    )?;

    // Watches the gate and never patrols
    let sentry = AgentConfig {
        waypoints: Vec::new(),
        idle_duration: None,
        ..config.clone()
    };
    sim.spawn_agent(
        "gate sentry",
        Transform::from_position_yaw(Vec3::new(16.0, 0.0, 0.0), -90.0),
        &sentry,
    )?;

    let start = INTRUDER_PATH[0];
    let entity = sim.spawn_target("intruder", start, 0.5);
    Ok(Intruder {
        entity,
        position: start,
        leg: 0,
    })
}

fn name_of(sim: &Simulation, entity: Entity) -> String {
    sim.world
        .get::<Name>(entity)
        .map(|name| name.0.clone())
        .unwrap_or_else(|_| format!("{entity:?}"))
}

fn report(sim: &Simulation) {
    for event in sim.events.iter() {
        let who = name_of(sim, event.entity());
        match event {
            AgentEvent::StateChanged { from, to, .. } => {
                log::info!("[{:6.2}s] {who}: {from} -> {to}", sim.clock.now());
            }
            AgentEvent::TargetSpotted { position, .. } => {
                log::info!("[{:6.2}s] {who} spotted the intruder at {position}", sim.clock.now());
            }
            AgentEvent::TargetLost { last_known, .. } => {
                log::info!(
                    "[{:6.2}s] {who} lost sight, last seen at {last_known:?}",
                    sim.clock.now()
                );
            }
            AgentEvent::NavigationRejected { destination, .. } => {
                log::warn!("[{:6.2}s] {who} cannot reach {destination}", sim.clock.now());
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();

    let config = match agent_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load agent config: {e}");
            return;
        }
    };

    let mut sim = Simulation::new(
        SimConfig::default()
            .with_name("Courtyard")
            .with_tick_rate(30)
            .with_max_ticks(30 * 60),
    );

    let mut intruder = match build_scene(&mut sim, &config) {
        Ok(intruder) => intruder,
        Err(e) => {
            log::error!("Failed to build scene: {e}");
            return;
        }
    };

    sim.run(|sim| {
        report(sim);
        intruder.update(sim);
    });

    for (entity, brain) in sim.world.query::<&AgentStateMachine>().iter() {
        log::info!(
            "{} finished {}, last sighting {:?}",
            name_of(&sim, entity),
            brain.current_state(),
            brain.last_known_target_position()
        );
    }
}

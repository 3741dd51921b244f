//! Finite State Machine for agent behavior
//!
//! One [`AgentStateMachine`] per agent. Each tick it perceives, runs the
//! active state's update, and then fires a due idle timer. Collaborators are
//! borrowed for the duration of a tick through [`AgentContext`].
//!
//! # States
//!
//! | State      | Entry              | Update                          | Exit            |
//! |------------|--------------------|---------------------------------|-----------------|
//! | Idle       | start idle timer   | target seen → Chasing           | cancel timer    |
//! | Patrolling | -                  | target seen → Chasing, else walk| stop navigator  |
//! | Chasing    | -                  | follow sighting; lost + arrived → Idle | -        |
//! | Dead       | -                  | -                               | -               |
//!
//! Dead is terminal.
//!
//! # Example
//!
//! ```ignore
//! let mut brain = AgentStateMachine::new(config)?;
//!
//! // Once per simulation tick
//! let mut ctx = AgentContext::new(&clock, pose, &physics, &mut navigator);
//! let report = brain.tick(&mut ctx);
//! if let Some(point) = report.look_at {
//!     heading.face(point);
//! }
//! ```

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::config::{AgentConfig, ReentryPolicy};
use super::navigation::Navigator;
use super::patrol::PatrolRoute;
use super::perception::{DetectionResult, PerceptionSystem, Pose, SpatialQuery};
use super::timer::TimerSlot;
use super::AiError;
use crate::core::Clock;

// ============================================================================
// State
// ============================================================================

/// Behavior state of an agent. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Standing still, waiting for the idle timer
    #[default]
    Idle,
    /// Walking the patrol route
    Patrolling,
    /// Pursuing the last sighting
    Chasing,
    /// Terminal, no further behavior
    Dead,
}

impl AgentState {
    /// State name for debugging and logging.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Patrolling => "Patrolling",
            Self::Chasing => "Chasing",
            Self::Dead => "Dead",
        }
    }

    /// Whether no transition can leave this state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Dead
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Decision returned from a state's update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stay in the current state.
    None,
    /// Switch to another state.
    To(AgentState),
}

/// A state change applied during a tick or a forced transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: AgentState,
    pub to: AgentState,
}

// ============================================================================
// Context and Report
// ============================================================================

/// Collaborators borrowed for one tick.
pub struct AgentContext<'a> {
    /// Clock time of this tick, in seconds
    pub now: f64,
    /// Observer pose for perception
    pub pose: Pose,
    /// Overlap and raycast queries
    pub spatial: &'a dyn SpatialQuery,
    /// Movement backend
    pub navigator: &'a mut dyn Navigator,
}

impl<'a> AgentContext<'a> {
    /// Build a context reading the current time from `clock`
    pub fn new(
        clock: &dyn Clock,
        pose: Pose,
        spatial: &'a dyn SpatialQuery,
        navigator: &'a mut dyn Navigator,
    ) -> Self {
        Self {
            now: clock.now(),
            pose,
            spatial,
            navigator,
        }
    }
}

impl fmt::Debug for AgentContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("now", &self.now)
            .field("pose", &self.pose)
            .finish_non_exhaustive()
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// State after the tick
    pub state: AgentState,
    /// This tick's detection ("not visible" when the sensor was unavailable)
    pub detection: DetectionResult,
    /// Switches applied this tick, in order
    pub transitions: SmallVec<[StateChange; 2]>,
    /// Point the agent should face
    pub look_at: Option<Vec3>,
    /// Line of sight was gained or lost this tick
    pub sight_changed: bool,
    /// Destination the navigator refused this tick
    pub rejected_destination: Option<Vec3>,
}

impl TickReport {
    fn new(state: AgentState) -> Self {
        Self {
            state,
            detection: DetectionResult::NOT_VISIBLE,
            transitions: SmallVec::new(),
            look_at: None,
            sight_changed: false,
            rejected_destination: None,
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Patrol/idle/chase controller for a single agent.
#[derive(Debug, Clone)]
pub struct AgentStateMachine {
    perception: PerceptionSystem,
    route: Option<PatrolRoute>,
    idle_duration: Option<f32>,
    arrival_threshold: f32,
    reentry: ReentryPolicy,

    state: AgentState,
    /// Whether the initial state's entry action has run
    entered: bool,
    idle_timer: TimerSlot,
    last_known_target: Option<Vec3>,
    /// Destination issued while chasing
    chase_destination: Option<Vec3>,
    /// Sighting the navigator refused while chasing
    unreachable_sighting: Option<Vec3>,
    target_in_sight: bool,
    sensor_degraded: bool,
}

impl AgentStateMachine {
    /// Create a machine in Idle with the patrol cursor at 0.
    ///
    /// The Idle entry action runs on the first tick.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the config fails validation.
    pub fn new(config: AgentConfig) -> Result<Self, AiError> {
        config.validate()?;

        let perception = PerceptionSystem::new(config.sensor)?;
        let route = if config.waypoints.is_empty() {
            None
        } else {
            Some(PatrolRoute::new(config.waypoints)?)
        };

        Ok(Self {
            perception,
            route,
            idle_duration: config.idle_duration,
            arrival_threshold: config.arrival_threshold,
            reentry: config.reentry,
            state: AgentState::Idle,
            entered: false,
            idle_timer: TimerSlot::new(),
            last_known_target: None,
            chase_destination: None,
            unreachable_sighting: None,
            target_in_sight: false,
            sensor_degraded: false,
        })
    }

    /// Active state
    #[must_use]
    pub fn current_state(&self) -> AgentState {
        self.state
    }

    /// Where the target was last seen
    #[must_use]
    pub fn last_known_target_position(&self) -> Option<Vec3> {
        self.last_known_target
    }

    /// Patrol route, if configured
    #[must_use]
    pub fn route(&self) -> Option<&PatrolRoute> {
        self.route.as_ref()
    }

    /// Due time of the outstanding idle timer
    #[must_use]
    pub fn idle_timer_due(&self) -> Option<f64> {
        self.idle_timer.due_time()
    }

    /// Whether the target was visible on the last tick
    #[must_use]
    pub fn target_in_sight(&self) -> bool {
        self.target_in_sight
    }

    /// Advance one simulation tick.
    pub fn tick(&mut self, ctx: &mut AgentContext<'_>) -> TickReport {
        if !self.entered {
            self.enter(self.state, ctx);
            self.entered = true;
        }

        let mut report = TickReport::new(self.state);

        if self.state.is_terminal() {
            return report;
        }

        let detection = self.perceive(ctx);
        report.sight_changed = detection.visible != self.target_in_sight;
        self.target_in_sight = detection.visible;
        report.detection = detection;

        let transition = match self.state {
            AgentState::Idle => self.update_idle(&detection),
            AgentState::Patrolling => self.update_patrolling(&detection, ctx, &mut report),
            AgentState::Chasing => self.update_chasing(&detection, ctx, &mut report),
            AgentState::Dead => Transition::None,
        };

        if let Transition::To(next) = transition {
            if let Some(change) = self.switch_state(next, ctx) {
                report.transitions.push(change);
            }
        }

        // Deferred transitions fire after the state update
        if let Some(next) = self.idle_timer.poll(ctx.now) {
            log::trace!("Idle timer fired at {:.3}", ctx.now);
            if let Some(change) = self.switch_state(next, ctx) {
                report.transitions.push(change);
            }
        }

        report.state = self.state;
        report
    }

    /// Switch state from outside the tick loop (scripted events such as death).
    ///
    /// Returns the change applied, or `None` when refused or ignored.
    pub fn force_transition(&mut self, next: AgentState, ctx: &mut AgentContext<'_>) -> Option<StateChange> {
        if !self.entered {
            // Initial state never started, so there is nothing to exit
            if !self.can_enter(next) {
                return None;
            }
            let from = self.state;
            self.enter(next, ctx);
            self.state = next;
            self.entered = true;
            log::debug!("Forced {from} -> {next} before first tick");
            return Some(StateChange { from, to: next });
        }

        self.switch_state(next, ctx)
    }

    /// Exit the current state, enter `next`, then commit.
    fn switch_state(&mut self, next: AgentState, ctx: &mut AgentContext<'_>) -> Option<StateChange> {
        let from = self.state;

        if from.is_terminal() {
            log::warn!("Ignoring switch {from} -> {next}: {from} is terminal");
            return None;
        }
        if from == next && self.reentry == ReentryPolicy::Ignore {
            return None;
        }
        if !self.can_enter(next) {
            return None;
        }

        self.exit(from, ctx);
        self.enter(next, ctx);
        self.state = next;

        log::debug!("{from} -> {next}");
        Some(StateChange { from, to: next })
    }

    fn can_enter(&self, next: AgentState) -> bool {
        if next == AgentState::Patrolling && self.route.is_none() {
            log::warn!("Refusing to patrol without waypoints");
            return false;
        }
        true
    }

    fn enter(&mut self, state: AgentState, ctx: &mut AgentContext<'_>) {
        match state {
            AgentState::Idle => {
                if let Some(duration) = self.idle_duration {
                    self.idle_timer.start(ctx.now, duration, AgentState::Patrolling);
                }
            }
            AgentState::Chasing => {
                self.chase_destination = None;
                self.unreachable_sighting = None;
            }
            AgentState::Patrolling | AgentState::Dead => {}
        }
    }

    fn exit(&mut self, state: AgentState, ctx: &mut AgentContext<'_>) {
        match state {
            AgentState::Idle => {
                if self.idle_timer.cancel() {
                    log::trace!("Cancelled idle timer");
                }
            }
            AgentState::Patrolling => ctx.navigator.stop(),
            AgentState::Chasing | AgentState::Dead => {}
        }
    }

    /// Run the sensor, degrading failures to "not visible".
    fn perceive(&mut self, ctx: &AgentContext<'_>) -> DetectionResult {
        match self.perception.detect(&ctx.pose, ctx.spatial) {
            Ok(detection) => {
                if self.sensor_degraded {
                    log::info!("Sensor recovered");
                    self.sensor_degraded = false;
                }
                if let Some(position) = detection.last_known_position {
                    self.last_known_target = Some(position);
                }
                detection
            }
            Err(err) => {
                if !self.sensor_degraded {
                    log::warn!("{err}; assuming no target");
                    self.sensor_degraded = true;
                }
                DetectionResult::NOT_VISIBLE
            }
        }
    }

    fn update_idle(&mut self, detection: &DetectionResult) -> Transition {
        if detection.visible {
            Transition::To(AgentState::Chasing)
        } else {
            Transition::None
        }
    }

    fn update_patrolling(
        &mut self,
        detection: &DetectionResult,
        ctx: &mut AgentContext<'_>,
        report: &mut TickReport,
    ) -> Transition {
        if detection.visible {
            return Transition::To(AgentState::Chasing);
        }
        self.move_to_next_point(ctx, report);
        Transition::None
    }

    /// Issue the next waypoint once the current destination is reached.
    ///
    /// The cursor starts on waypoint 0, which counts as already reached, so
    /// the first destination issued is waypoint 1. Spawn agents at waypoint 0
    /// for the first lap to cover the whole route.
    fn move_to_next_point(&mut self, ctx: &mut AgentContext<'_>, report: &mut TickReport) {
        if !self.has_arrived(ctx) {
            return;
        }
        let Some(route) = self.route.as_mut() else {
            return;
        };

        let next = route.peek_next();
        match ctx.navigator.set_destination(next) {
            Ok(()) => {
                route.advance();
                log::debug!("Patrolling to waypoint {} at {next}", route.current_index());
            }
            Err(err) => {
                log::warn!("{err}; holding position");
                report.rejected_destination = Some(next);
            }
        }
    }

    fn update_chasing(
        &mut self,
        detection: &DetectionResult,
        ctx: &mut AgentContext<'_>,
        report: &mut TickReport,
    ) -> Transition {
        let Some(target) = self.last_known_target else {
            // Forced into Chasing with nothing ever seen
            return if self.has_arrived(ctx) {
                Transition::To(AgentState::Idle)
            } else {
                Transition::None
            };
        };

        if detection.visible {
            report.look_at = Some(target);
            self.chase_toward(target, ctx, report);
            return Transition::None;
        }

        // Either heading for the sighting or unable to; both end once the
        // navigator has nothing left to walk
        let settled = self.chase_destination == Some(target)
            || self.unreachable_sighting == Some(target);
        if settled && self.has_arrived(ctx) {
            return Transition::To(AgentState::Idle);
        }

        self.chase_toward(target, ctx, report);
        Transition::None
    }

    fn chase_toward(&mut self, target: Vec3, ctx: &mut AgentContext<'_>, report: &mut TickReport) {
        if self.chase_destination == Some(target) {
            return;
        }
        match ctx.navigator.set_destination(target) {
            Ok(()) => {
                self.chase_destination = Some(target);
                self.unreachable_sighting = None;
            }
            Err(err) => {
                log::warn!("{err}; holding position");
                self.unreachable_sighting = Some(target);
                report.rejected_destination = Some(target);
            }
        }
    }

    fn has_arrived(&self, ctx: &AgentContext<'_>) -> bool {
        !ctx.navigator.is_path_pending() && ctx.navigator.remaining_distance() <= self.arrival_threshold
    }
}

// ============================================================================
// Tests
// ============================================================================

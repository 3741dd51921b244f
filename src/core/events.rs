//! Agent event queue
//!
//! Double-buffered: events pushed during a tick become readable after the
//! swap that ends it, so consumers always see a complete tick.
//!
//! # Example
//!
//! ```ignore
//! sim.step();
//! for event in sim.events.iter() {
//!     if let AgentEvent::StateChanged { entity, to, .. } = event {
//!         log::info!("{entity:?} is now {to}");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

use crate::ai::AgentState;

// ============================================================================
// Event Types
// ============================================================================

/// Something observable that happened to an agent.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AgentEvent {
    /// The agent switched state.
    StateChanged {
        entity: Entity,
        from: AgentState,
        to: AgentState,
    },

    /// A target came into sight.
    TargetSpotted {
        entity: Entity,
        /// Sighted entity
        target: Option<Entity>,
        position: Vec3,
    },

    /// Line of sight to the target was lost.
    TargetLost {
        entity: Entity,
        /// Where the target was last seen
        last_known: Option<Vec3>,
    },

    /// The navigator refused a destination; the agent holds position.
    NavigationRejected { entity: Entity, destination: Vec3 },
}

impl AgentEvent {
    /// Agent the event is about
    #[must_use]
    pub fn entity(&self) -> Entity {
        match self {
            Self::StateChanged { entity, .. }
            | Self::TargetSpotted { entity, .. }
            | Self::TargetLost { entity, .. }
            | Self::NavigationRejected { entity, .. } => *entity,
        }
    }
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<AgentEvent>,
    /// Events from the previous tick
    processing: VecDeque<AgentEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Queue an event; it becomes readable after the next swap.
    #[inline]
    pub fn push(&mut self, event: AgentEvent) {
        self.pending.push_back(event);
    }

    /// Make this tick's events readable and start a fresh pending buffer.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AgentEvent> {
        self.processing.iter()
    }

    /// Take ownership of the previous tick's events.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = AgentEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Events written this tick, not yet readable
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything, both buffers.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

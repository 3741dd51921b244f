//! Core simulation module
//!
//! Contains the tick clock, the agent event queue and the fixed-step driver

mod events;
mod sim;
mod time;

pub use events::{AgentEvent, EventQueue};
pub use sim::{SimConfig, Simulation};
pub use time::{Clock, TickClock};

//! Deterministic runner simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Session-seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod runner;
pub mod state;
pub mod tick;

pub use runner::{RunSummary, Runner, run_replay};
pub use state::{FailCause, Obstacle, PlayerBody, RunEvent, RunPhase, RunnerState, ground_top};
pub use tick::{TickInput, tick};

//! Spec Runner - a spec-driven endless runner with reproducible sessions
//!
//! Core modules:
//! - `rng`: Seeded linear congruential generator
//! - `spec`: Game spec documents (validation, A/B variants, loading)
//! - `params`: Runtime parameters and the live parameter store
//! - `replay`: Input recording, playback and transport encoding
//! - `telemetry`: Session statistics
//! - `sim`: Headless deterministic runner simulation
//! - `session`: Session bootstrap from query parameters
//! - `persistence`: Key/value storage and the last replay
//! - `highscores`: Best score
//! - `settings`: Audio preference
//! - `platform`: Browser glue (timers, listeners, fetch)

pub mod highscores;
pub mod params;
pub mod persistence;
pub mod platform;
pub mod replay;
pub mod rng;
pub mod session;
pub mod settings;
pub mod sim;
pub mod spec;
pub mod telemetry;

pub use params::{LiveSimulation, ParamPatch, ParamStore, ParamsError, RuntimeParameters};
pub use replay::{ActionCode, EdgeKind, Replay, ReplayError, ReplayEvent};
pub use rng::Lcg32;
pub use settings::AudioPrefs;
pub use spec::{GameSpec, ValidationResult};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (120 Hz)
    pub const SIM_DT_MS: f64 = 1000.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Logical play area (matches the canvas the runner was tuned on)
    pub const VIEW_WIDTH: f32 = 800.0;
    pub const VIEW_HEIGHT: f32 = 600.0;
    pub const GROUND_HEIGHT: f32 = 80.0;

    /// Player box
    pub const PLAYER_X: f32 = 90.0;
    pub const PLAYER_SIZE: f32 = 32.0;

    /// Obstacle size range (inclusive, drawn from the session RNG)
    pub const OBSTACLE_MIN_SIZE: i64 = 24;
    pub const OBSTACLE_MAX_SIZE: i64 = 56;
    /// Obstacles spawn this far past the right edge
    pub const OBSTACLE_SPAWN_MARGIN: f32 = 20.0;
    /// Obstacles are culled once they pass this x
    pub const OBSTACLE_CULL_X: f32 = -50.0;

    /// Spawn interval used when a spec has no obstacle block
    pub const DEFAULT_SPAWN_INTERVAL_MS: f64 = 1250.0;
    /// Lose sentinel, never spec-controlled
    pub const LOSE_BELOW_Y: f64 = -100.0;

    /// Extra time the replay watchdog allows past the last event
    pub const REPLAY_GRACE_MS: u64 = 5000;

    /// Telemetry frame-rate window
    pub const FPS_WINDOW: usize = 60;
    /// Telemetry payload version
    pub const TELEMETRY_VERSION: &str = "1.0.0";
}

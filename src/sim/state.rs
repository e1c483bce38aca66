//! Runner state and core simulation types
//!
//! Everything that affects the outcome of a run lives here so that a seed,
//! a parameter set and an input timeline fully determine it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::params::RuntimeParameters;
use crate::rng::Lcg32;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Running,
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailCause {
    /// Touched an obstacle
    Collision,
    /// Left the play area (above the lose line or below the screen)
    OutOfBounds,
}

/// Things presentation code reacts to (sounds, HUD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    Jumped,
    ObstacleSpawned { id: u32 },
    Crashed(FailCause),
}

/// The player's box (position is the center)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBody {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub grounded: bool,
}

impl PlayerBody {
    pub fn on_ground() -> Self {
        Self {
            pos: Vec2::new(PLAYER_X, ground_top() - PLAYER_SIZE / 2.0),
            vel: Vec2::ZERO,
            size: PLAYER_SIZE,
            grounded: true,
        }
    }
}

/// A square obstacle sitting on the ground
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub pos: Vec2,
    pub size: f32,
}

impl Obstacle {
    /// Axis-aligned overlap with the player
    pub fn overlaps(&self, player: &PlayerBody) -> bool {
        let reach = (self.size + player.size) / 2.0;
        let d = (self.pos - player.pos).abs();
        d.x < reach && d.y < reach
    }
}

/// Y of the ground's top edge (screen coordinates, y grows downward)
#[inline]
pub fn ground_top() -> f32 {
    VIEW_HEIGHT - GROUND_HEIGHT
}

/// Complete run state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerState {
    /// Session seed
    pub seed: u32,
    /// Session RNG (obstacle sizes)
    pub rng: Lcg32,
    /// Parameters the run is using
    pub params: RuntimeParameters,
    pub phase: RunPhase,
    /// Simulated time since start (ms)
    pub time_ms: f64,
    /// Fixed steps taken
    pub ticks: u64,
    pub player: PlayerBody,
    /// Active obstacles (sorted by id)
    pub obstacles: Vec<Obstacle>,
    /// Time accumulated toward the next spawn (ms)
    pub spawn_timer_ms: f64,
    /// Total obstacles spawned this run
    pub spawned: u32,
    /// Distance scrolled (px)
    pub distance: f64,
    /// Time of failure (ms), once the run is over
    pub fail_time_ms: Option<f64>,
    pub fail_cause: Option<FailCause>,
    /// Events since the last drain
    #[serde(skip)]
    pub events: Vec<RunEvent>,
    /// Next entity ID
    next_id: u32,
}

impl RunnerState {
    pub fn new(seed: u32, params: RuntimeParameters) -> Self {
        Self {
            seed,
            rng: Lcg32::new(seed),
            params,
            phase: RunPhase::Running,
            time_ms: 0.0,
            ticks: 0,
            player: PlayerBody::on_ground(),
            obstacles: Vec::new(),
            spawn_timer_ms: 0.0,
            spawned: 0,
            distance: 0.0,
            fail_time_ms: None,
            fail_cause: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Score is whole seconds survived
    pub fn score(&self) -> u64 {
        let end = self.fail_time_ms.unwrap_or(self.time_ms);
        (end / 1000.0).floor() as u64
    }

    pub fn is_over(&self) -> bool {
        self.phase == RunPhase::GameOver
    }

    /// Spawn an obstacle just past the right edge, sized from the session RNG
    pub fn spawn_obstacle(&mut self) {
        let size = self.rng.next_int(OBSTACLE_MIN_SIZE, OBSTACLE_MAX_SIZE) as f32;
        let id = self.next_entity_id();
        self.obstacles.push(Obstacle {
            id,
            pos: Vec2::new(VIEW_WIDTH + OBSTACLE_SPAWN_MARGIN, ground_top() - size / 2.0),
            size,
        });
        self.spawned += 1;
        self.events.push(RunEvent::ObstacleSpawned { id });
    }

    /// End the run (first failure wins)
    pub fn fail(&mut self, cause: FailCause) {
        if self.is_over() {
            return;
        }
        self.phase = RunPhase::GameOver;
        self.fail_time_ms = Some(self.time_ms);
        self.fail_cause = Some(cause);
        self.player.vel = Vec2::ZERO;
        self.events.push(RunEvent::Crashed(cause));
        log::info!(
            "Game over ({:?}) at {:.0}ms, distance {:.0}",
            cause,
            self.time_ms,
            self.distance
        );
    }

    /// Take and clear pending events
    pub fn drain_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }
}

//! Runtime parameters
//!
//! `RuntimeParameters` is the simulation's own view of a spec. `ParamStore`
//! holds the current set for a session and pushes hot patches into whichever
//! simulation is registered as live.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_SPAWN_INTERVAL_MS, LOSE_BELOW_Y};
use crate::spec::GameSpec;

/// Resolved simulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeParameters {
    /// Downward acceleration (px/s²)
    pub gravity_y: f64,
    /// Jump impulse (px/s, applied upward)
    pub player_jump: f64,
    /// Leftward obstacle speed (px/s)
    pub obstacle_speed: f64,
    pub spawn_interval_ms: f64,
    /// Lose line above the play area
    pub lose_below_y: f64,
}

impl RuntimeParameters {
    /// Map a validated spec onto simulation parameters. Pure.
    pub fn from_spec(spec: &GameSpec) -> Self {
        let mut spawn_interval_ms = match &spec.obstacle {
            Some(obstacle) => (1000.0 / obstacle.spawn_rate).round(),
            None => DEFAULT_SPAWN_INTERVAL_MS,
        };

        // Higher density in the opening section means shorter gaps between spawns
        if let Some(first) = spec.level_sections.as_ref().and_then(|s| s.first()) {
            if first.density != 1.0 && first.density > 0.0 {
                spawn_interval_ms = (spawn_interval_ms / first.density).round();
            }
        }

        let params = Self {
            gravity_y: spec.gravity,
            player_jump: spec.jump_force,
            obstacle_speed: spec.scroll_speed,
            spawn_interval_ms,
            lose_below_y: LOSE_BELOW_Y,
        };
        log::info!("Applied spec '{}': {:?}", spec.title, params);
        params
    }

    /// Shallow-merge a patch
    pub fn apply(&mut self, patch: &ParamPatch) {
        if let Some(v) = patch.gravity_y {
            self.gravity_y = v;
        }
        if let Some(v) = patch.player_jump {
            self.player_jump = v;
        }
        if let Some(v) = patch.obstacle_speed {
            self.obstacle_speed = v;
        }
        if let Some(v) = patch.spawn_interval_ms {
            self.spawn_interval_ms = v;
        }
        if let Some(v) = patch.lose_below_y {
            self.lose_below_y = v;
        }
    }
}

/// Partial update to `RuntimeParameters`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_jump: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_interval_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lose_below_y: Option<f64>,
}

impl ParamPatch {
    pub fn gravity(gravity_y: f64) -> Self {
        Self {
            gravity_y: Some(gravity_y),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True if the patch touches a field a running simulation can't take in place
    pub fn needs_restart(&self) -> bool {
        self.player_jump.is_some()
            || self.obstacle_speed.is_some()
            || self.spawn_interval_ms.is_some()
            || self.lose_below_y.is_some()
    }
}

/// What the store needs from a running simulation
pub trait LiveSimulation {
    /// Take the in-place fields of a patch (gravity) without restarting
    fn apply_immediate(&mut self, patch: &ParamPatch);
    /// Rebuild moving bodies from the merged parameters
    fn restart(&mut self, params: &RuntimeParameters);
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsError {
    #[error("runtime parameters not initialized; call set_all() first")]
    NotInitialized,
}

/// Single-slot parameter register for one session
#[derive(Default)]
pub struct ParamStore {
    current: Option<RuntimeParameters>,
    live: Option<Weak<RefCell<dyn LiveSimulation>>>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_all(&mut self, params: RuntimeParameters) {
        self.current = Some(params);
    }

    pub fn get_all(&self) -> Result<&RuntimeParameters, ParamsError> {
        self.current.as_ref().ok_or(ParamsError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    /// Register the running simulation, or unregister with `None`
    pub fn set_live_instance(&mut self, instance: Option<&Rc<RefCell<dyn LiveSimulation>>>) {
        self.live = instance.map(Rc::downgrade);
    }

    pub fn has_live_instance(&self) -> bool {
        self.live.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    /// Merge a patch and propagate it to the live simulation
    pub fn patch(&mut self, patch: ParamPatch) -> Result<(), ParamsError> {
        let current = self.current.as_mut().ok_or(ParamsError::NotInitialized)?;
        current.apply(&patch);
        let merged = *current;

        let Some(live) = self.live.as_ref().and_then(Weak::upgrade) else {
            log::debug!("Param patch stored, no live simulation: {:?}", patch);
            return Ok(());
        };

        let mut sim = live.borrow_mut();
        sim.apply_immediate(&patch);
        if patch.needs_restart() {
            log::info!("Param patch needs restart: {:?}", patch);
            sim.restart(&merged);
        }
        Ok(())
    }
}

//! Audio preference
//!
//! Persisted separately from scores. Volume is clamped on load and on set.

use serde::{Deserialize, Serialize};

use crate::persistence::KeyValueStore;
use crate::replay::{ActionCode, EdgeKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioPrefs {
    /// Master volume (0.0 - 1.0)
    pub volume: f32,
    pub mute: bool,
}

impl Default for AudioPrefs {
    fn default() -> Self {
        Self {
            volume: 0.5,
            mute: false,
        }
    }
}

impl AudioPrefs {
    /// Storage key
    const STORAGE_KEY: &'static str = "spec-runner:audio";

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn toggle_mute(&mut self) {
        self.mute = !self.mute;
    }

    /// Toggle and persist mute on a live Mute key press.
    ///
    /// Returns true when the preference changed.
    pub fn on_action(&mut self, kind: EdgeKind, code: ActionCode, store: &dyn KeyValueStore) -> bool {
        if kind != EdgeKind::Down || code != ActionCode::Mute {
            return false;
        }
        self.toggle_mute();
        self.save(store);
        true
    }

    /// Volume after mute
    pub fn effective_volume(&self) -> f32 {
        if self.mute { 0.0 } else { self.volume }
    }

    /// Load preferences, falling back to defaults on missing or corrupt data
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Some(json) = store.get(Self::STORAGE_KEY) {
            match serde_json::from_str::<AudioPrefs>(&json) {
                Ok(mut prefs) => {
                    prefs.set_volume(prefs.volume);
                    log::info!("Loaded audio preferences");
                    return prefs;
                }
                Err(e) => log::warn!("Ignoring corrupt audio preferences: {}", e),
            }
        }

        log::info!("Using default audio preferences");
        Self::default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        if let Ok(json) = serde_json::to_string(self) {
            store.set(Self::STORAGE_KEY, &json);
            log::info!("Audio preferences saved");
        }
    }
}

//! Key/value persistence
//!
//! Features:
//! - `KeyValueStore` seam (LocalStorage on web, in-memory elsewhere)
//! - Last replay blob
//! - Every read tolerates missing or corrupt entries

use std::cell::RefCell;
use std::collections::HashMap;

use crate::replay::Replay;

/// Storage key for the last finished recording
pub const LAST_REPLAY_KEY: &str = "spec-runner:lastReplay";

/// Minimal string store. Failures are logged by implementations, never raised.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store for native builds and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Browser LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(key, value).is_err() {
                log::warn!("LocalStorage write failed for {}", key);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Store the last finished recording
pub fn save_last_replay(store: &dyn KeyValueStore, replay: &Replay) {
    match replay.to_json() {
        Ok(json) => {
            store.set(LAST_REPLAY_KEY, &json);
            log::info!("Last replay saved ({} events)", replay.events.len());
        }
        Err(e) => log::error!("Failed to serialize replay: {}", e),
    }
}

/// Load the last recording. Missing or corrupt entries yield `None`.
pub fn load_last_replay(store: &dyn KeyValueStore) -> Option<Replay> {
    let json = store.get(LAST_REPLAY_KEY)?;
    match Replay::from_json(&json) {
        Ok(replay) => Some(replay),
        Err(e) => {
            log::warn!("Ignoring corrupt last replay: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ActionCode, EdgeKind, ReplayEvent};

    #[test]
    fn test_memory_store_roundtrip_and_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_last_replay_saved_and_loaded() {
        let store = MemoryStore::new();
        assert!(load_last_replay(&store).is_none());

        let replay = Replay {
            seed: 9,
            started_at: 100,
            level: None,
            spec: Some("example".to_string()),
            events: vec![ReplayEvent {
                offset_ms: 5,
                kind: EdgeKind::Down,
                code: ActionCode::ArrowUp,
            }],
        };
        save_last_replay(&store, &replay);
        assert_eq!(load_last_replay(&store), Some(replay));
    }

    #[test]
    fn test_corrupt_last_replay_is_ignored() {
        let store = MemoryStore::new();
        store.set(LAST_REPLAY_KEY, "{\"seed\":");
        assert!(load_last_replay(&store).is_none());
    }
}

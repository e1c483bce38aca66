//! Platform abstraction layer
//!
//! The engine talks to the outside world through small traits
//! (`Scheduler`, `SyntheticInput`, `TelemetrySink`, `KeyValueStore`).
//! Native builds use the in-crate implementations; the browser ones live in
//! `web`.

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Current wall-clock time in milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Current wall-clock time in milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

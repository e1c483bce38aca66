//! Session telemetry
//!
//! Accumulates per-session statistics and hands a snapshot to a sink on
//! flush. Flushing resets the accumulators, so every flush sends its own
//! independent payload.

use std::collections::VecDeque;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{FPS_WINDOW, TELEMETRY_VERSION};

/// Why a flush happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushReason {
    /// Run ended (game over)
    End,
    Manual,
    /// Page hidden or unloading
    Lifecycle,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::End => "end",
            FlushReason::Manual => "manual",
            FlushReason::Lifecycle => "lifecycle",
        }
    }
}

/// Payload sent to the telemetry endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Seconds into the run of the first failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_fail_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps_avg: Option<f64>,
    pub ver: String,
}

/// Destination for flushed snapshots. Sinks swallow and log their own errors.
pub trait TelemetrySink {
    fn send(&self, snapshot: &TelemetrySnapshot, reason: FlushReason);
}

/// Writes snapshots to the log. Used when no endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn send(&self, snapshot: &TelemetrySnapshot, reason: FlushReason) {
        match serde_json::to_string(snapshot) {
            Ok(json) => log::info!("[Telemetry] Session data ({}): {}", reason.as_str(), json),
            Err(e) => log::error!("[Telemetry] Failed to serialize snapshot: {}", e),
        }
    }
}

/// Base-36 timestamp plus a random base-36 suffix
pub fn new_session_id(now_ms: u64) -> String {
    let mut rng = Pcg32::try_from_os_rng().unwrap_or_else(|_| Pcg32::seed_from_u64(now_ms));
    format!("{}{}", to_base36(now_ms), to_base36(rng.next_u64()))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    session_id: String,
    seed: Option<u32>,
    level: Option<String>,
    spec: Option<String>,
    variant: Option<String>,
    first_fail_time: Option<f64>,
    max_distance: f64,
    fps_samples: VecDeque<f64>,
    /// Running sum of `fps_samples`
    fps_sum: f64,
}

impl TelemetryAggregator {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            seed: None,
            level: None,
            spec: None,
            variant: None,
            first_fail_time: None,
            max_distance: 0.0,
            fps_samples: VecDeque::with_capacity(FPS_WINDOW),
            fps_sum: 0.0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = Some(seed);
    }

    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = Some(level.into());
    }

    pub fn set_spec(&mut self, spec: impl Into<String>) {
        self.spec = Some(spec.into());
    }

    pub fn set_variant(&mut self, variant: impl Into<String>) {
        self.variant = Some(variant.into());
    }

    /// Record one frame's duration in milliseconds
    pub fn tick(&mut self, dt_ms: f64) {
        if dt_ms <= 0.0 || !dt_ms.is_finite() {
            return;
        }
        let fps = 1000.0 / dt_ms;
        self.fps_samples.push_back(fps);
        self.fps_sum += fps;
        if self.fps_samples.len() > FPS_WINDOW {
            if let Some(old) = self.fps_samples.pop_front() {
                self.fps_sum -= old;
            }
        }
    }

    /// Only the first call per session is kept
    pub fn note_fail_once(&mut self, seconds: f64) {
        if self.first_fail_time.is_none() {
            self.first_fail_time = Some(seconds);
        }
    }

    pub fn note_distance(&mut self, distance: f64) {
        self.max_distance = self.max_distance.max(distance);
    }

    /// Mean frame rate over the current window
    pub fn fps_avg(&self) -> Option<f64> {
        if self.fps_samples.is_empty() {
            None
        } else {
            Some(self.fps_sum / self.fps_samples.len() as f64)
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            session_id: self.session_id.clone(),
            seed: self.seed,
            level: self.level.clone(),
            spec: self.spec.clone(),
            variant: self.variant.clone(),
            first_fail_time: self.first_fail_time,
            max_distance: (self.max_distance > 0.0).then_some(self.max_distance),
            fps_avg: self.fps_avg().map(|f| (f * 100.0).round() / 100.0),
            ver: TELEMETRY_VERSION.to_string(),
        }
    }

    /// Send a snapshot and reset the per-session accumulators
    pub fn flush(&mut self, reason: FlushReason, sink: &dyn TelemetrySink) -> TelemetrySnapshot {
        let snapshot = self.snapshot();
        sink.send(&snapshot, reason);
        self.reset();
        snapshot
    }

    fn reset(&mut self) {
        self.max_distance = 0.0;
        self.fps_samples.clear();
        self.fps_sum = 0.0;
        self.first_fail_time = None;
    }
}

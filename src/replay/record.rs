//! Input recorder
//!
//! Platform-neutral half of recording: the browser layer forwards raw input
//! edges here with a timestamp, and `stop` freezes them into a `Replay`.

use super::types::{ActionCode, EdgeKind, Replay, ReplayError, ReplayEvent};

/// A raw platform input edge before mapping to an action code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput<'a> {
    /// Keyboard, identified by `KeyboardEvent.code`
    Key { code: &'a str, kind: EdgeKind },
    Pointer(EdgeKind),
    Touch(EdgeKind),
}

impl RawInput<'_> {
    /// Pointer and touch share one action code. Unmapped keys yield `None`.
    pub fn action(&self) -> Option<(EdgeKind, ActionCode)> {
        match *self {
            RawInput::Key { code, kind } => ActionCode::from_key_code(code).map(|c| (kind, c)),
            RawInput::Pointer(kind) | RawInput::Touch(kind) => Some((kind, ActionCode::Pointer)),
        }
    }
}

/// Optional labels stored alongside a recording
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayMeta {
    pub level: Option<String>,
    pub spec: Option<String>,
}

#[derive(Debug)]
struct Session {
    seed: u32,
    started_at: u64,
    meta: ReplayMeta,
    events: Vec<ReplayEvent>,
}

#[derive(Debug, Default)]
pub struct Recorder {
    session: Option<Session>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin recording. An in-flight recording is stopped and discarded.
    pub fn start(&mut self, seed: u32, now_ms: u64, meta: ReplayMeta) {
        if let Some(prev) = self.session.take() {
            log::info!(
                "Discarding in-flight recording ({} events) for new start",
                prev.events.len()
            );
        }
        self.session = Some(Session {
            seed,
            started_at: now_ms,
            meta,
            events: Vec::new(),
        });
        log::info!("Replay recording started with seed: {}", seed);
    }

    /// Append an edge if recording and the input maps to an action.
    /// Returns whether an event was recorded.
    pub fn capture(&mut self, input: RawInput<'_>, now_ms: u64) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some((kind, code)) = input.action() else {
            return false;
        };
        session.events.push(ReplayEvent {
            offset_ms: now_ms.saturating_sub(session.started_at),
            kind,
            code,
        });
        true
    }

    pub fn stop(&mut self) -> Result<Replay, ReplayError> {
        let session = self.session.take().ok_or(ReplayError::NotRecording)?;
        log::info!(
            "Replay recording stopped, captured {} events",
            session.events.len()
        );
        Ok(Replay {
            seed: session.seed,
            started_at: session.started_at,
            level: session.meta.level,
            spec: session.meta.spec,
            events: session.events,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn event_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.events.len())
    }
}

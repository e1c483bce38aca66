//! Replay data and its URL transport encoding

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Down,
    Up,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Down => "down",
            EdgeKind::Up => "up",
        }
    }
}

/// Logical input symbols a replay can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCode {
    /// Jump
    #[serde(rename = "SPACE")]
    Space,
    /// Jump (alternate key)
    #[serde(rename = "ARROWUP")]
    ArrowUp,
    /// Toggle mute
    #[serde(rename = "M")]
    Mute,
    /// Toggle the parameter inspector
    #[serde(rename = "I")]
    Inspector,
    /// Mouse, pen or touch press. Older recordings wrote touches as "TOUCH".
    #[serde(rename = "POINTER", alias = "TOUCH")]
    Pointer,
}

impl ActionCode {
    /// Map a `KeyboardEvent.code` to an action
    pub fn from_key_code(code: &str) -> Option<Self> {
        match code {
            "Space" => Some(ActionCode::Space),
            "ArrowUp" => Some(ActionCode::ArrowUp),
            "KeyM" => Some(ActionCode::Mute),
            "KeyI" => Some(ActionCode::Inspector),
            _ => None,
        }
    }

    /// Physical `(code, key)` pair used when synthesizing a keyboard event.
    /// Pointer presses are replayed as Space.
    pub fn physical_key(&self) -> (&'static str, &'static str) {
        match self {
            ActionCode::Space | ActionCode::Pointer => ("Space", " "),
            ActionCode::ArrowUp => ("ArrowUp", "ArrowUp"),
            ActionCode::Mute => ("KeyM", "KeyM"),
            ActionCode::Inspector => ("KeyI", "KeyI"),
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, ActionCode::Pointer)
    }

    /// True for actions that make the runner jump
    pub fn is_jump(&self) -> bool {
        matches!(self, ActionCode::Space | ActionCode::ArrowUp | ActionCode::Pointer)
    }
}

/// One recorded input edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Milliseconds since recording started
    #[serde(rename = "t")]
    pub offset_ms: u64,
    #[serde(rename = "k")]
    pub kind: EdgeKind,
    #[serde(rename = "c")]
    pub code: ActionCode,
}

/// A finished recording. Events stay in capture order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replay {
    pub seed: u32,
    /// Epoch milliseconds
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    pub events: Vec<ReplayEvent>,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("no recording in progress")]
    NotRecording,
    #[error("replay blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("replay JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Replay {
    /// Offset of the latest event, 0 if empty
    pub fn duration_ms(&self) -> u64 {
        self.events.iter().map(|e| e.offset_ms).max().unwrap_or(0)
    }

    /// JSON, then URL-safe base64 without padding
    pub fn encode(&self) -> Result<String, ReplayError> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Inverse of `encode`. Also accepts the standard alphabet and padding,
    /// and `+` that a query decoder turned into a space.
    pub fn decode(blob: &str) -> Result<Self, ReplayError> {
        let normalized: String = blob
            .trim()
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' | ' ' => '-',
                '/' => '_',
                c => c,
            })
            .collect();
        let bytes = URL_SAFE_NO_PAD.decode(normalized)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use proptest::prelude::*;

    fn sample() -> Replay {
        Replay {
            seed: 42,
            started_at: 1_700_000_000_000,
            level: Some("normal".to_string()),
            spec: None,
            events: vec![
                ReplayEvent {
                    offset_ms: 0,
                    kind: EdgeKind::Down,
                    code: ActionCode::Space,
                },
                ReplayEvent {
                    offset_ms: 120,
                    kind: EdgeKind::Up,
                    code: ActionCode::Space,
                },
            ],
        }
    }

    #[test]
    fn test_wire_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"startedAt\":1700000000000"));
        assert!(json.contains("{\"t\":0,\"k\":\"down\",\"c\":\"SPACE\"}"));
        assert!(!json.contains("\"spec\""));
    }

    #[test]
    fn test_touch_alias_decodes_to_pointer() {
        let json = r#"{"seed":1,"startedAt":5,"events":[{"t":3,"k":"down","c":"TOUCH"}]}"#;
        let replay = Replay::from_json(json).unwrap();
        assert_eq!(replay.events[0].code, ActionCode::Pointer);
        assert!(replay.level.is_none());
    }

    #[test]
    fn test_decode_standard_padded_base64() {
        let replay = sample();
        let blob = STANDARD.encode(replay.to_json().unwrap());
        assert_eq!(Replay::decode(&blob).unwrap(), replay);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(Replay::decode("!!!"), Err(ReplayError::Base64(_))));
        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(matches!(Replay::decode(&not_json), Err(ReplayError::Json(_))));
    }

    #[test]
    fn test_empty_and_max_offset_round_trip() {
        let mut replay = sample();
        replay.events.clear();
        assert_eq!(Replay::decode(&replay.encode().unwrap()).unwrap(), replay);

        replay.events.push(ReplayEvent {
            offset_ms: u64::MAX,
            kind: EdgeKind::Down,
            code: ActionCode::Inspector,
        });
        assert_eq!(Replay::decode(&replay.encode().unwrap()).unwrap(), replay);
        assert_eq!(replay.duration_ms(), u64::MAX);
    }

    #[test]
    fn test_key_code_mapping() {
        assert_eq!(ActionCode::from_key_code("KeyM"), Some(ActionCode::Mute));
        assert_eq!(ActionCode::from_key_code("KeyX"), None);
        assert_eq!(ActionCode::Pointer.physical_key(), ("Space", " "));
    }

    fn arb_event() -> impl Strategy<Value = ReplayEvent> {
        let kind = prop_oneof![Just(EdgeKind::Down), Just(EdgeKind::Up)];
        let code = prop_oneof![
            Just(ActionCode::Space),
            Just(ActionCode::ArrowUp),
            Just(ActionCode::Mute),
            Just(ActionCode::Inspector),
            Just(ActionCode::Pointer),
        ];
        (any::<u64>(), kind, code).prop_map(|(offset_ms, kind, code)| ReplayEvent {
            offset_ms,
            kind,
            code,
        })
    }

    proptest! {
        #[test]
        fn prop_encode_decode(
            seed in any::<u32>(),
            started_at in any::<u64>(),
            level in proptest::option::of("[a-z]{1,8}"),
            spec in proptest::option::of("[ -~]{0,16}"),
            events in prop::collection::vec(arb_event(), 0..40),
        ) {
            let replay = Replay { seed, started_at, level, spec, events };
            let blob = replay.encode().unwrap();
            prop_assert!(blob.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            prop_assert_eq!(Replay::decode(&blob).unwrap(), replay);
        }
    }
}

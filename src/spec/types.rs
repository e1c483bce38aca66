//! Typed game spec
//!
//! A `GameSpec` is always fully defaulted: the validator fills every optional
//! sub-object before handing one out.

use serde::{Deserialize, Serialize};

/// Game loop discriminator. Only the runner loop exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameLoop {
    #[default]
    Runner,
}

impl GameLoop {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameLoop::Runner => "runner",
        }
    }
}

/// Sound effect pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sfx {
    #[default]
    Arcade,
    None,
}

impl Sfx {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "arcade" => Some(Sfx::Arcade),
            "none" => Some(Sfx::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtStyle {
    pub theme: String,
    pub sfx: Sfx,
}

impl Default for ArtStyle {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            sfx: Sfx::Arcade,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpec {
    /// Width and height
    pub hitbox: [f64; 2],
    pub jump_buffer_ms: f64,
}

impl Default for PlayerSpec {
    fn default() -> Self {
        Self {
            hitbox: [32.0, 32.0],
            jump_buffer_ms: 150.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleSpec {
    /// Obstacles per second
    pub spawn_rate: f64,
    pub gap_min: f64,
    pub gap_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSection {
    pub len: f64,
    /// Spawn density multiplier (higher = more frequent)
    pub density: f64,
    pub boost: bool,
}

/// Validated game spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSpec {
    pub title: String,
    pub game_loop: GameLoop,
    pub scroll_speed: f64,
    pub gravity: f64,
    pub jump_force: f64,
    pub art_style: ArtStyle,
    pub player: PlayerSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle: Option<ObstacleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_sections: Option<Vec<LevelSection>>,
}

/// Schema defaults for fields a document may omit
pub mod defaults {
    pub const TITLE: &str = "Untitled Game";
    pub const SCROLL_SPEED: f64 = 200.0;
    pub const GRAVITY: f64 = 1200.0;
    pub const JUMP_FORCE: f64 = 400.0;
    pub const GAP_MIN: f64 = 100.0;
    pub const GAP_MAX: f64 = 200.0;
    pub const BOOST: bool = false;
}

impl GameSpec {
    /// The constant spec handed out whenever a document is rejected
    pub fn fallback() -> Self {
        Self {
            title: "Example Game".to_string(),
            game_loop: GameLoop::Runner,
            scroll_speed: defaults::SCROLL_SPEED,
            gravity: defaults::GRAVITY,
            jump_force: defaults::JUMP_FORCE,
            art_style: ArtStyle::default(),
            player: PlayerSpec::default(),
            obstacle: Some(ObstacleSpec {
                spawn_rate: 100.0,
                gap_min: defaults::GAP_MIN,
                gap_max: defaults::GAP_MAX,
            }),
            level_sections: Some(vec![
                LevelSection {
                    len: 1000.0,
                    density: 0.5,
                    boost: false,
                },
                LevelSection {
                    len: 2000.0,
                    density: 0.7,
                    boost: true,
                },
            ]),
        }
    }
}

/// Outcome of validating an untrusted document.
///
/// Both arms carry a usable value; `Invalid` adds the diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    Valid(T),
    Invalid { error: String, fallback: T },
}

impl<T> ValidationResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid { error, .. } => Some(error),
        }
    }

    /// The validated value, or the fallback
    pub fn value(&self) -> &T {
        match self {
            ValidationResult::Valid(v) => v,
            ValidationResult::Invalid { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ValidationResult::Valid(v) => v,
            ValidationResult::Invalid { fallback, .. } => fallback,
        }
    }
}

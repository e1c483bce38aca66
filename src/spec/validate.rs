//! Spec document validation
//!
//! Walks an untyped JSON document field by field, filling defaults and
//! collecting every problem it finds. Never panics: a rejected document yields
//! the constant fallback spec plus a diagnostic listing each failing path.

use serde_json::{Map, Value};

use super::types::{
    ArtStyle, GameLoop, GameSpec, LevelSection, ObstacleSpec, PlayerSpec, Sfx, ValidationResult,
    defaults,
};

/// Numeric range rule
#[derive(Debug, Clone, Copy)]
enum Bound {
    Positive,
    NonNegative,
}

impl Bound {
    fn check(self, n: f64) -> Option<&'static str> {
        match self {
            Bound::Positive if n <= 0.0 => Some("Number must be greater than 0"),
            Bound::NonNegative if n < 0.0 => Some("Number must be greater than or equal to 0"),
            _ => None,
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Collects issues while walking the document
#[derive(Default)]
struct Checker {
    path: Vec<String>,
    issues: Vec<String>,
}

impl Checker {
    fn issue(&mut self, key: &str, message: impl AsRef<str>) {
        let mut segments = self.path.clone();
        if !key.is_empty() {
            segments.push(key.to_string());
        }
        let path = if segments.is_empty() {
            "(root)".to_string()
        } else {
            segments.join(".")
        };
        self.issues.push(format!("{}: {}", path, message.as_ref()));
    }

    fn enter(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    fn leave(&mut self) {
        self.path.pop();
    }

    /// Check a number. Missing keys take `default`, or are required if none.
    fn number(&mut self, obj: &Map<String, Value>, key: &str, bound: Bound, default: Option<f64>) -> f64 {
        match obj.get(key) {
            None => match default {
                Some(d) => d,
                None => {
                    self.issue(key, "Required");
                    0.0
                }
            },
            Some(v) => self.number_value(v, key, bound),
        }
    }

    fn number_value(&mut self, v: &Value, key: &str, bound: Bound) -> f64 {
        let Some(n) = v.as_f64().filter(|n| n.is_finite()) else {
            self.issue(key, format!("Expected number, received {}", type_name(v)));
            return 0.0;
        };
        if let Some(msg) = bound.check(n) {
            self.issue(key, msg);
        }
        n
    }

    fn string(&mut self, obj: &Map<String, Value>, key: &str, default: &str) -> String {
        match obj.get(key) {
            None => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(v) => {
                self.issue(key, format!("Expected string, received {}", type_name(v)));
                default.to_string()
            }
        }
    }

    fn boolean(&mut self, obj: &Map<String, Value>, key: &str, default: bool) -> bool {
        match obj.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(v) => {
                self.issue(key, format!("Expected boolean, received {}", type_name(v)));
                default
            }
        }
    }

    /// Fetch an optional nested object. `Err(())` means present but not an object.
    fn object<'a>(&mut self, obj: &'a Map<String, Value>, key: &str) -> Result<Option<&'a Map<String, Value>>, ()> {
        match obj.get(key) {
            None => Ok(None),
            Some(Value::Object(m)) => Ok(Some(m)),
            Some(v) => {
                self.issue(key, format!("Expected object, received {}", type_name(v)));
                Err(())
            }
        }
    }

    fn game_loop(&mut self, obj: &Map<String, Value>) -> GameLoop {
        match obj.get("gameLoop") {
            Some(Value::String(s)) if s == GameLoop::Runner.as_str() => GameLoop::Runner,
            _ => {
                self.issue("gameLoop", "Invalid literal value, expected \"runner\"");
                GameLoop::Runner
            }
        }
    }

    fn art_style(&mut self, obj: &Map<String, Value>) -> ArtStyle {
        let Ok(Some(art)) = self.object(obj, "artStyle") else {
            return ArtStyle::default();
        };
        self.enter("artStyle");
        let theme = self.string(art, "theme", "default");
        let sfx = match art.get("sfx") {
            None => Sfx::Arcade,
            Some(v) => match v.as_str().and_then(Sfx::from_str) {
                Some(sfx) => sfx,
                None => {
                    self.issue("sfx", "Invalid enum value. Expected 'arcade' | 'none'");
                    Sfx::Arcade
                }
            },
        };
        self.leave();
        ArtStyle { theme, sfx }
    }

    fn player(&mut self, obj: &Map<String, Value>) -> PlayerSpec {
        let Ok(Some(player)) = self.object(obj, "player") else {
            return PlayerSpec::default();
        };
        let defaults = PlayerSpec::default();
        self.enter("player");
        let hitbox = match player.get("hitbox") {
            None => defaults.hitbox,
            Some(Value::Array(items)) if items.len() == 2 => {
                self.enter("hitbox");
                let w = self.number_value(&items[0], "0", Bound::Positive);
                let h = self.number_value(&items[1], "1", Bound::Positive);
                self.leave();
                [w, h]
            }
            Some(Value::Array(items)) => {
                self.issue("hitbox", format!("Expected 2 items, received {}", items.len()));
                defaults.hitbox
            }
            Some(v) => {
                self.issue("hitbox", format!("Expected array, received {}", type_name(v)));
                defaults.hitbox
            }
        };
        let jump_buffer_ms = self.number(player, "jumpBufferMs", Bound::NonNegative, Some(defaults.jump_buffer_ms));
        self.leave();
        PlayerSpec { hitbox, jump_buffer_ms }
    }

    fn obstacle(&mut self, obj: &Map<String, Value>) -> Option<ObstacleSpec> {
        let obstacle = self.object(obj, "obstacle").ok().flatten()?;
        self.enter("obstacle");
        let spawn_rate = self.number(obstacle, "spawnRate", Bound::Positive, None);
        let gap_min = self.number(obstacle, "gapMin", Bound::NonNegative, Some(defaults::GAP_MIN));
        let gap_max = self.number(obstacle, "gapMax", Bound::NonNegative, Some(defaults::GAP_MAX));
        self.leave();
        Some(ObstacleSpec {
            spawn_rate,
            gap_min,
            gap_max,
        })
    }

    fn level_sections(&mut self, obj: &Map<String, Value>) -> Option<Vec<LevelSection>> {
        let items = match obj.get("levelSections")? {
            Value::Array(items) => items,
            v => {
                self.issue("levelSections", format!("Expected array, received {}", type_name(v)));
                return None;
            }
        };
        self.enter("levelSections");
        let mut sections = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Value::Object(section) = item else {
                self.issue(&i.to_string(), format!("Expected object, received {}", type_name(item)));
                continue;
            };
            self.enter(i.to_string());
            let len = self.number(section, "len", Bound::Positive, None);
            let density = self.number(section, "density", Bound::NonNegative, None);
            let boost = self.boolean(section, "boost", defaults::BOOST);
            self.leave();
            sections.push(LevelSection { len, density, boost });
        }
        self.leave();
        Some(sections)
    }
}

/// Validate an untyped document into a fully-defaulted `GameSpec`
pub fn validate_spec(raw: &Value) -> ValidationResult<GameSpec> {
    let mut checker = Checker::default();

    let spec = match raw {
        Value::Object(obj) => {
            let title = checker.string(obj, "title", defaults::TITLE);
            let game_loop = checker.game_loop(obj);
            let scroll_speed = checker.number(obj, "scrollSpeed", Bound::Positive, Some(defaults::SCROLL_SPEED));
            let gravity = checker.number(obj, "gravity", Bound::Positive, Some(defaults::GRAVITY));
            let jump_force = checker.number(obj, "jumpForce", Bound::Positive, Some(defaults::JUMP_FORCE));
            Some(GameSpec {
                title,
                game_loop,
                scroll_speed,
                gravity,
                jump_force,
                art_style: checker.art_style(obj),
                player: checker.player(obj),
                obstacle: checker.obstacle(obj),
                level_sections: checker.level_sections(obj),
            })
        }
        other => {
            checker.issue("", format!("Expected object, received {}", type_name(other)));
            None
        }
    };

    match spec {
        Some(spec) if checker.issues.is_empty() => ValidationResult::Valid(spec),
        _ => {
            let details = checker.issues.join("; ");
            log::warn!("GameSpec validation failed: {}", details);
            ValidationResult::Invalid {
                error: format!("Invalid GameSpec: {}", details),
                fallback: GameSpec::fallback(),
            }
        }
    }
}

/// Parse JSON text and validate it. Syntax errors are validation failures.
pub fn validate_spec_str(text: &str) -> ValidationResult<GameSpec> {
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => validate_spec(&raw),
        Err(e) => {
            log::warn!("GameSpec is not valid JSON: {}", e);
            ValidationResult::Invalid {
                error: format!("Validation error: {}", e),
                fallback: GameSpec::fallback(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({ "gameLoop": "runner", "scrollSpeed": 200, "gravity": 1200, "jumpForce": 400 })
    }

    #[test]
    fn test_minimal_document_defaults() {
        let result = validate_spec(&minimal());
        let ValidationResult::Valid(spec) = result else {
            panic!("minimal spec should validate");
        };
        assert!(spec.obstacle.is_none());
        assert!(spec.level_sections.is_none());
        assert_eq!(spec.player.hitbox, [32.0, 32.0]);
        assert_eq!(spec.player.jump_buffer_ms, 150.0);
        assert_eq!(spec.title, "Untitled Game");
        assert_eq!(spec.art_style, ArtStyle::default());
    }

    #[test]
    fn test_wrong_discriminator_returns_fallback() {
        let raw = json!({ "gameLoop": "flappy", "scrollSpeed": 200, "gravity": 1200, "jumpForce": 400 });
        let result = validate_spec(&raw);
        assert!(!result.is_valid());
        assert!(result.error().unwrap().contains("gameLoop"));
        assert_eq!(result.into_value(), GameSpec::fallback());
    }

    #[test]
    fn test_missing_discriminator_fails() {
        let result = validate_spec(&json!({ "scrollSpeed": 200 }));
        assert!(!result.is_valid());
    }

    #[test]
    fn test_negative_scroll_speed_fails() {
        let raw = json!({ "gameLoop": "runner", "scrollSpeed": -5, "gravity": 1200, "jumpForce": 400 });
        let result = validate_spec(&raw);
        let ValidationResult::Invalid { error, fallback } = result else {
            panic!("negative scrollSpeed should be rejected");
        };
        assert!(error.contains("scrollSpeed: Number must be greater than 0"));
        assert_eq!(fallback, GameSpec::fallback());
    }

    #[test]
    fn test_missing_numerics_take_defaults() {
        let ValidationResult::Valid(spec) = validate_spec(&json!({ "gameLoop": "runner" })) else {
            panic!("defaults should fill in");
        };
        assert_eq!(spec.scroll_speed, 200.0);
        assert_eq!(spec.gravity, 1200.0);
        assert_eq!(spec.jump_force, 400.0);
    }

    #[test]
    fn test_obstacle_requires_spawn_rate() {
        let mut raw = minimal();
        raw["obstacle"] = json!({ "gapMin": 10 });
        let result = validate_spec(&raw);
        assert!(result.error().unwrap().contains("obstacle.spawnRate: Required"));
    }

    #[test]
    fn test_obstacle_sub_field_defaults() {
        let mut raw = minimal();
        raw["obstacle"] = json!({ "spawnRate": 2 });
        let ValidationResult::Valid(spec) = validate_spec(&raw) else {
            panic!("obstacle with spawnRate should validate");
        };
        let obstacle = spec.obstacle.unwrap();
        assert_eq!(obstacle.spawn_rate, 2.0);
        assert_eq!(obstacle.gap_min, 100.0);
        assert_eq!(obstacle.gap_max, 200.0);
    }

    #[test]
    fn test_partial_player_gets_field_defaults() {
        let mut raw = minimal();
        raw["player"] = json!({ "jumpBufferMs": 0 });
        let ValidationResult::Valid(spec) = validate_spec(&raw) else {
            panic!("player with zero buffer should validate");
        };
        assert_eq!(spec.player.hitbox, [32.0, 32.0]);
        assert_eq!(spec.player.jump_buffer_ms, 0.0);
    }

    #[test]
    fn test_bad_hitbox_reports_index_path() {
        let mut raw = minimal();
        raw["player"] = json!({ "hitbox": [16, 0] });
        let result = validate_spec(&raw);
        assert!(result.error().unwrap().contains("player.hitbox.1"));
    }

    #[test]
    fn test_invalid_section_rejects_document() {
        let mut raw = minimal();
        raw["levelSections"] = json!([
            { "len": 100, "density": 1.0 },
            { "len": 0, "density": -1 }
        ]);
        let result = validate_spec(&raw);
        let error = result.error().unwrap();
        assert!(error.contains("levelSections.1.len"));
        assert!(error.contains("levelSections.1.density"));
        assert_eq!(result.into_value(), GameSpec::fallback());
    }

    #[test]
    fn test_sections_default_boost() {
        let mut raw = minimal();
        raw["levelSections"] = json!([{ "len": 100, "density": 0 }]);
        let ValidationResult::Valid(spec) = validate_spec(&raw) else {
            panic!("zero density is allowed");
        };
        assert!(!spec.level_sections.unwrap()[0].boost);
    }

    #[test]
    fn test_bad_sfx_and_title_collect_all_issues() {
        let mut raw = minimal();
        raw["title"] = json!(12);
        raw["artStyle"] = json!({ "sfx": "orchestra" });
        let error = validate_spec(&raw).error().unwrap().to_string();
        assert!(error.contains("title: Expected string"));
        assert!(error.contains("artStyle.sfx"));
    }

    #[test]
    fn test_non_object_root() {
        let result = validate_spec(&json!([1, 2, 3]));
        assert!(result.error().unwrap().contains("(root): Expected object"));
    }

    #[test]
    fn test_unparseable_text() {
        let result = validate_spec_str("{ not json");
        assert!(!result.is_valid());
        assert_eq!(result.into_value(), GameSpec::fallback());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut raw = minimal();
        raw["extra"] = json!({ "anything": true });
        assert!(validate_spec(&raw).is_valid());
    }
}

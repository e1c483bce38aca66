//! Session bootstrap
//!
//! Turns the page's query string into a `SessionConfig`, then wires the
//! parameter store, the seeded runner and telemetry together for one run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::highscores::{BestScore, ScoreResult};
use crate::params::{LiveSimulation, ParamStore, RuntimeParameters};
use crate::persistence::KeyValueStore;
use crate::replay::Replay;
use crate::sim::Runner;
use crate::spec::loader::encode_component;
use crate::spec::variant::VARIANT_QUERY_KEY;
use crate::spec::{LoadedSpec, Variant, apply_variant, select_variant};
use crate::telemetry::{FlushReason, TelemetryAggregator, TelemetrySink, TelemetrySnapshot, new_session_id};

/// Level used when the query names none
pub const DEFAULT_LEVEL: &str = "normal";

/// Decoded `?key=value&...` pairs. Later duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: HashMap<String, String>,
}

impl QueryParams {
    /// Parse a query string. The leading `?` is optional.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut pairs = HashMap::new();
        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            pairs
                .entry(decode_component(key))
                .or_insert_with(|| decode_component(value));
        }
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }
}

/// Form-style decoding: `+` is a space, malformed escapes are kept verbatim
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Whether the session records input or plays a recording back
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    Record,
    Playback(Replay),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub seed: u32,
    /// Spec name, when the session is spec-driven
    pub spec: Option<String>,
    pub level: String,
    pub variant: Option<Variant>,
    pub mode: SessionMode,
}

impl SessionConfig {
    pub fn from_query(query: &QueryParams, now_ms: u64) -> Self {
        let seed = match query.get("seed").map(|s| s.trim().parse::<u32>()) {
            Some(Ok(seed)) => seed,
            Some(Err(_)) => {
                log::warn!("Ignoring invalid seed {:?}", query.get("seed"));
                now_ms as u32
            }
            None => now_ms as u32,
        };

        let mode = match query.get("replay") {
            Some(blob) => match Replay::decode(blob) {
                Ok(replay) => {
                    log::info!("Replay mode: {} events, seed {}", replay.events.len(), replay.seed);
                    SessionMode::Playback(replay)
                }
                Err(e) => {
                    log::warn!("Failed to decode replay, recording instead: {}", e);
                    SessionMode::Record
                }
            },
            None => SessionMode::Record,
        };

        let mut spec = query.get("spec").filter(|s| !s.is_empty()).map(str::to_string);
        let mut level = query
            .get("level")
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LEVEL)
            .to_string();

        // A replay carries its own seed, spec and level, and overrides the query
        let seed = match &mode {
            SessionMode::Playback(replay) => {
                if let Some(recorded) = replay.spec.as_ref().filter(|s| !s.is_empty()) {
                    spec = Some(recorded.clone());
                }
                if let Some(recorded) = replay.level.as_ref().filter(|s| !s.is_empty()) {
                    level = recorded.clone();
                }
                replay.seed
            }
            SessionMode::Record => seed,
        };

        Self {
            seed,
            spec,
            level,
            variant: select_variant(query),
            mode,
        }
    }

    /// Query string that plays `replay` back under this session's spec, level
    /// and variant
    pub fn share_query(&self, replay: &Replay) -> Result<String, crate::replay::ReplayError> {
        let mut query = format!("?replay={}", replay.encode()?);
        if let Some(spec) = &self.spec {
            query.push_str(&format!("&spec={}", encode_component(spec)));
        }
        query.push_str(&format!("&level={}", encode_component(&self.level)));
        if let Some(variant) = self.variant {
            query.push_str(&format!("&{}={}", VARIANT_QUERY_KEY, variant.label()));
        }
        Ok(query)
    }
}

/// Built-in parameters for the named difficulty tier. Unknown names get `normal`.
pub fn legacy_tier(level: &str) -> RuntimeParameters {
    let (gravity_y, player_jump, obstacle_speed, spawn_interval_ms) = match level {
        "easy" => (1000.0, 420.0, 200.0, 1600.0),
        "hard" => (1400.0, 520.0, 340.0, 900.0),
        "normal" => (1200.0, 450.0, 260.0, 1250.0),
        other => {
            log::warn!("Unknown level '{}', using {}", other, DEFAULT_LEVEL);
            (1200.0, 450.0, 260.0, 1250.0)
        }
    };
    RuntimeParameters {
        gravity_y,
        player_jump,
        obstacle_speed,
        spawn_interval_ms,
        lose_below_y: crate::consts::LOSE_BELOW_Y,
    }
}

/// One live run with its parameter store and telemetry
pub struct Session {
    pub config: SessionConfig,
    pub store: ParamStore,
    pub runner: Rc<RefCell<Runner>>,
    pub telemetry: TelemetryAggregator,
    /// Guards the end-of-run bookkeeping
    ended: bool,
}

impl Session {
    /// Build a session. `loaded` is the resolved spec when `config.spec` is set.
    pub fn start(config: SessionConfig, loaded: Option<&LoadedSpec>, now_ms: u64) -> Self {
        let params = match loaded {
            Some(loaded) => RuntimeParameters::from_spec(&apply_variant(&loaded.spec, config.variant)),
            None => legacy_tier(&config.level),
        };

        let mut store = ParamStore::new();
        store.set_all(params);

        let runner = Rc::new(RefCell::new(Runner::new(config.seed, params)));
        let live: Rc<RefCell<dyn LiveSimulation>> = runner.clone();
        store.set_live_instance(Some(&live));

        let mut telemetry = TelemetryAggregator::new(new_session_id(now_ms));
        telemetry.set_seed(config.seed);
        telemetry.set_level(config.level.clone());
        if let Some(loaded) = loaded {
            telemetry.set_spec(loaded.name.clone());
        }
        if let Some(variant) = config.variant {
            telemetry.set_variant(variant.label());
        }

        log::info!(
            "Session {} started: seed {}, level {}, spec {:?}",
            telemetry.session_id(),
            config.seed,
            config.level,
            config.spec
        );

        Self {
            config,
            store,
            runner,
            telemetry,
            ended: false,
        }
    }

    /// Advance the run by one rendered frame and feed telemetry
    pub fn frame(&mut self, frame_dt_ms: f64) {
        let mut runner = self.runner.borrow_mut();
        runner.update(frame_dt_ms);
        self.telemetry.tick(frame_dt_ms);
        self.telemetry.note_distance(runner.state.distance);
        if let Some(fail_ms) = runner.state.fail_time_ms {
            self.telemetry.note_fail_once(fail_ms / 1000.0);
        }
    }

    pub fn is_over(&self) -> bool {
        self.runner.borrow().state.is_over()
    }

    /// Record the score and flush telemetry once per run. Playback sessions
    /// report against the stored best without writing it.
    ///
    /// Returns `None` if the run already ended.
    pub fn end_run(
        &mut self,
        kv: &dyn KeyValueStore,
        sink: &dyn TelemetrySink,
    ) -> Option<(ScoreResult, TelemetrySnapshot)> {
        if self.ended {
            return None;
        }
        self.ended = true;

        let score = self.runner.borrow().state.score();
        let mut best = BestScore::load(kv);
        let result = match self.config.mode {
            SessionMode::Record => best.submit(kv, score),
            SessionMode::Playback(_) => ScoreResult {
                score,
                best: best.value,
                is_new_best: false,
            },
        };
        let snapshot = self.telemetry.flush(FlushReason::End, sink);
        Some((result, snapshot))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.store.set_live_instance(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamPatch;
    use crate::persistence::MemoryStore;
    use crate::replay::{ActionCode, EdgeKind, ReplayEvent};
    use crate::spec::{GameSpec, SpecSource};
    use std::cell::Cell;

    struct CountingSink(Cell<u32>);

    impl TelemetrySink for CountingSink {
        fn send(&self, _snapshot: &TelemetrySnapshot, _reason: FlushReason) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn loaded(spec: GameSpec) -> LoadedSpec {
        LoadedSpec {
            name: "example".to_string(),
            spec,
            source: SpecSource::Local,
            diagnostic: None,
        }
    }

    #[test]
    fn test_query_parsing() {
        let q = QueryParams::parse("?seed=42&spec=my%20game&level=hard&x=a+b&seed=7&flag");
        assert_eq!(q.get("seed"), Some("42"));
        assert_eq!(q.get("spec"), Some("my game"));
        assert_eq!(q.get("x"), Some("a b"));
        assert_eq!(q.get("flag"), Some(""));
        assert_eq!(q.get("missing"), None);

        let bare = QueryParams::parse("level=easy");
        assert_eq!(bare.get("level"), Some("easy"));
    }

    #[test]
    fn test_malformed_escape_kept() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("%41"), "A");
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::from_query(&QueryParams::parse(""), 0x1_0000_0005);
        assert_eq!(config.seed, 5);
        assert_eq!(config.level, DEFAULT_LEVEL);
        assert_eq!(config.spec, None);
        assert_eq!(config.variant, None);
        assert_eq!(config.mode, SessionMode::Record);
    }

    #[test]
    fn test_config_from_query() {
        let q = QueryParams::parse("?seed=12345&spec=example&ab=a&level=easy");
        let config = SessionConfig::from_query(&q, 0);
        assert_eq!(config.seed, 12345);
        assert_eq!(config.spec.as_deref(), Some("example"));
        assert_eq!(config.level, "easy");
        assert_eq!(config.variant, Some(Variant::A));

        let bad_seed = SessionConfig::from_query(&QueryParams::parse("seed=abc"), 99);
        assert_eq!(bad_seed.seed, 99);
    }

    #[test]
    fn test_replay_query_selects_playback() {
        let replay = Replay {
            seed: 321,
            started_at: 10,
            level: None,
            spec: None,
            events: vec![ReplayEvent {
                offset_ms: 100,
                kind: EdgeKind::Down,
                code: ActionCode::Space,
            }],
        };
        let blob = replay.encode().unwrap();
        let q = QueryParams::parse(&format!("?seed=1&replay={}", blob));
        let config = SessionConfig::from_query(&q, 0);
        assert_eq!(config.seed, 321);
        assert_eq!(config.mode, SessionMode::Playback(replay));

        let broken = SessionConfig::from_query(&QueryParams::parse("?replay=%%%"), 0);
        assert_eq!(broken.mode, SessionMode::Record);
    }

    #[test]
    fn test_replay_supplies_spec_and_level() {
        let replay = Replay {
            seed: 55,
            started_at: 0,
            level: Some("hard".to_string()),
            spec: Some("example".to_string()),
            events: Vec::new(),
        };
        let q = QueryParams::parse(&format!("?replay={}", replay.encode().unwrap()));
        let config = SessionConfig::from_query(&q, 0);
        assert_eq!(config.seed, 55);
        assert_eq!(config.spec.as_deref(), Some("example"));
        assert_eq!(config.level, "hard");

        // Without recorded labels the query still decides
        let bare = Replay {
            level: None,
            spec: None,
            ..replay
        };
        let q = QueryParams::parse(&format!("?level=easy&replay={}", bare.encode().unwrap()));
        let config = SessionConfig::from_query(&q, 0);
        assert_eq!(config.spec, None);
        assert_eq!(config.level, "easy");
    }

    #[test]
    fn test_share_query_reproduces_config() {
        let recorded = SessionConfig::from_query(
            &QueryParams::parse("?seed=9&spec=my%20spec&level=hard&ab=b"),
            0,
        );
        let replay = Replay {
            seed: recorded.seed,
            started_at: 0,
            level: None,
            spec: None,
            events: vec![ReplayEvent {
                offset_ms: 40,
                kind: EdgeKind::Down,
                code: ActionCode::Space,
            }],
        };
        let link = recorded.share_query(&replay).unwrap();
        let played = SessionConfig::from_query(&QueryParams::parse(&link), 1234);

        assert_eq!(played.seed, 9);
        assert_eq!(played.spec.as_deref(), Some("my spec"));
        assert_eq!(played.level, "hard");
        assert_eq!(played.variant, Some(Variant::B));
        assert_eq!(played.mode, SessionMode::Playback(replay));
    }

    #[test]
    fn test_playback_does_not_overwrite_best() {
        let kv = MemoryStore::new();
        kv.set(crate::highscores::BEST_SCORE_KEY, "1");

        let replay = Replay {
            seed: 8,
            started_at: 0,
            level: Some("hard".to_string()),
            spec: None,
            events: Vec::new(),
        };
        let q = QueryParams::parse(&format!("?replay={}", replay.encode().unwrap()));
        let mut session = Session::start(SessionConfig::from_query(&q, 0), None, 0);
        while !session.is_over() {
            session.frame(16.0);
        }
        let score = session.runner.borrow().state.score();
        assert!(score > 1);

        let sink = CountingSink(Cell::new(0));
        let (result, _) = session.end_run(&kv, &sink).unwrap();
        assert!(!result.is_new_best);
        assert_eq!(result.best, 1);
        assert_eq!(BestScore::load(&kv).value, 1);
        assert_eq!(sink.0.get(), 1);
    }

    #[test]
    fn test_legacy_tiers() {
        assert!(legacy_tier("hard").obstacle_speed > legacy_tier("easy").obstacle_speed);
        assert_eq!(legacy_tier("nightmare"), legacy_tier("normal"));
    }

    #[test]
    fn test_start_with_spec_applies_variant() {
        let spec = GameSpec::fallback();
        let base = RuntimeParameters::from_spec(&spec);
        let config = SessionConfig::from_query(&QueryParams::parse("?seed=3&spec=example&ab=B"), 0);
        let session = Session::start(config, Some(&loaded(spec)), 0);

        let params = *session.store.get_all().unwrap();
        assert!(params.obstacle_speed > base.obstacle_speed);
        assert_eq!(session.runner.borrow().state.seed, 3);
        assert!(session.store.has_live_instance());

        let snapshot = session.telemetry.snapshot();
        assert_eq!(snapshot.seed, Some(3));
        assert_eq!(snapshot.spec.as_deref(), Some("example"));
        assert_eq!(snapshot.variant.as_deref(), Some("B"));
    }

    #[test]
    fn test_store_patch_reaches_runner() {
        let config = SessionConfig::from_query(&QueryParams::parse("?seed=8"), 0);
        let mut session = Session::start(config, None, 0);
        session.frame(50.0);

        session.store.patch(ParamPatch::gravity(300.0)).unwrap();
        assert_eq!(session.runner.borrow().state.params.gravity_y, 300.0);
        assert_eq!(session.runner.borrow().restarts(), 0);

        let patch = ParamPatch {
            player_jump: Some(600.0),
            ..Default::default()
        };
        session.store.patch(patch).unwrap();
        let runner = session.runner.borrow();
        assert_eq!(runner.restarts(), 1);
        assert_eq!(runner.state.params.player_jump, 600.0);
        assert_eq!(runner.state.params.gravity_y, 300.0);
    }

    #[test]
    fn test_end_run_once() {
        let config = SessionConfig::from_query(&QueryParams::parse("?seed=8&level=hard"), 0);
        let mut session = Session::start(config, None, 0);
        while !session.is_over() {
            session.frame(16.0);
        }
        assert!(session.telemetry.snapshot().first_fail_time.is_some());

        let kv = MemoryStore::new();
        let sink = CountingSink(Cell::new(0));
        let (result, _) = session.end_run(&kv, &sink).unwrap();
        assert_eq!(result.best, session.runner.borrow().state.score());
        assert!(session.end_run(&kv, &sink).is_none());
        assert_eq!(sink.0.get(), 1);
    }
}

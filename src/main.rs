//! Spec Runner entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use spec_runner::consts::SIM_DT_MS;
    use spec_runner::persistence::{LocalStorage, save_last_replay};
    use spec_runner::platform::web::{
        BeaconSink, InputHandler, WebScheduler, WebSynthetic, WindowInput, fetch_json,
        location_search, on_page_hidden,
    };
    use spec_runner::platform::now_ms;
    use spec_runner::replay::{Player, RawInput, Recorder, ReplayMeta};
    use spec_runner::session::{QueryParams, Session, SessionConfig, SessionMode};
    use spec_runner::spec::{resolve_spec, spec_url};
    use spec_runner::telemetry::FlushReason;
    use spec_runner::AudioPrefs;

    /// Where spec documents are served from
    const SPEC_BASE_URL: &str = match option_env!("SPEC_RUNNER_BASE_URL") {
        Some(base) => base,
        None => "/",
    };

    /// Game instance holding all state
    struct Game {
        session: Session,
        recorder: Rc<RefCell<Recorder>>,
        player: Player<WebScheduler>,
        input: Option<WindowInput>,
        sink: BeaconSink,
        last_time: f64,
    }

    impl Game {
        fn frame(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                time - self.last_time
            } else {
                SIM_DT_MS
            };
            self.last_time = time;

            if self.session.is_over() {
                return;
            }
            self.session.frame(dt);
            if self.session.is_over() {
                self.end_run();
            }
        }

        fn end_run(&mut self) {
            let kv = LocalStorage;
            if let Some((result, _)) = self.session.end_run(&kv, &self.sink) {
                log::info!("Run over: score {}, best {}", result.score, result.best);
            }

            // Stop listening before freezing the recording
            self.input = None;
            self.player.cancel();
            if !self.recorder.borrow().is_recording() {
                return;
            }
            match self.recorder.borrow_mut().stop() {
                Ok(replay) => {
                    save_last_replay(&kv, &replay);
                    match self.session.config.share_query(&replay) {
                        Ok(link) => log::info!("Replay link: {}", link),
                        Err(e) => log::warn!("Failed to encode replay: {}", e),
                    }
                }
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Spec Runner starting...");

        let started = now_ms();
        let query = QueryParams::parse(&location_search());
        let config = SessionConfig::from_query(&query, started);

        let loaded = match config.spec.as_deref() {
            Some(name) => {
                let fetched = fetch_json(&spec_url(SPEC_BASE_URL, name)).await;
                let loaded = resolve_spec(name, fetched);
                if let Some(diagnostic) = &loaded.diagnostic {
                    log::warn!("Spec '{}' from {}: {}", name, loaded.source.as_str(), diagnostic);
                }
                Some(loaded)
            }
            None => None,
        };

        let mode = config.mode.clone();
        let meta = ReplayMeta {
            level: Some(config.level.clone()),
            spec: config.spec.clone(),
        };
        let session = Session::start(config, loaded.as_ref(), started);

        let kv = LocalStorage;
        let audio = AudioPrefs::load(&kv);
        session.runner.borrow_mut().muted = audio.mute;

        let game = Rc::new(RefCell::new(Game {
            session,
            recorder: Rc::new(RefCell::new(Recorder::new())),
            player: Player::new(WebScheduler),
            input: None,
            sink: BeaconSink::from_env(),
            last_time: 0.0,
        }));

        match mode {
            SessionMode::Record => {
                let (seed, recorder, runner) = {
                    let g = game.borrow();
                    (g.session.config.seed, g.recorder.clone(), g.session.runner.clone())
                };
                // Offsets count from now, after the spec fetch
                recorder.borrow_mut().start(seed, now_ms(), meta);

                let mut audio = audio;
                let handler: InputHandler = Rc::new(RefCell::new(move |raw: RawInput<'_>, now: u64| {
                    recorder.borrow_mut().capture(raw, now);
                    if let Some((kind, code)) = raw.action() {
                        runner.borrow_mut().apply_input(kind, code);
                        audio.on_action(kind, code, &LocalStorage);
                    }
                }));
                game.borrow_mut().input = Some(WindowInput::attach(handler));
            }
            SessionMode::Playback(replay) => {
                let runner = game.borrow().session.runner.clone();
                let playback = game.borrow_mut().player.play(
                    &replay,
                    move |kind, code| runner.borrow_mut().apply_input(kind, code),
                    WebSynthetic,
                );
                wasm_bindgen_futures::spawn_local(async move {
                    let outcome = playback.await;
                    log::info!("Replay finished: {:?}", outcome);
                });
            }
        }

        // Flush telemetry when the tab goes away
        {
            let game = game.clone();
            on_page_hidden(move || {
                let mut g = game.borrow_mut();
                let g = &mut *g;
                g.session.telemetry.flush(FlushReason::Lifecycle, &g.sink);
            });
        }

        // Start game loop
        request_animation_frame(game);

        log::info!("Spec Runner running!");
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Spec Runner (native) starting...");
    log::info!("Native mode is headless, build for wasm32 to play in a browser");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Record a scripted session, then verify it replays to the same result
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use spec_runner::persistence::{MemoryStore, load_last_replay, save_last_replay};
    use spec_runner::replay::{EdgeKind, RawInput, Recorder, Replay, ReplayMeta};
    use spec_runner::sim::run_replay;
    use spec_runner::spec::resolve_spec;
    use spec_runner::RuntimeParameters;

    let loaded = resolve_spec("example", Err("offline".to_string()));
    log::info!("Using spec '{}' ({})", loaded.spec.title, loaded.source.as_str());
    let params = RuntimeParameters::from_spec(&loaded.spec);

    let seed = 12345;
    let mut recorder = Recorder::new();
    recorder.start(
        seed,
        0,
        ReplayMeta {
            level: None,
            spec: Some(loaded.name.clone()),
        },
    );
    for press in [600u64, 1700, 2900, 4100, 5200] {
        recorder.capture(RawInput::Key { code: "Space", kind: EdgeKind::Down }, press);
        recorder.capture(RawInput::Key { code: "Space", kind: EdgeKind::Up }, press + 80);
    }
    let replay = match recorder.stop() {
        Ok(replay) => replay,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };

    let store = MemoryStore::new();
    save_last_replay(&store, &replay);
    let replay: Replay = load_last_replay(&store).unwrap_or(replay);

    let first = run_replay(&replay, params, 60_000.0);
    let second = run_replay(&replay, params, 60_000.0);
    println!("Run:    {:?}", first);
    println!("Replay: {:?}", second);
    println!("Deterministic: {}", first == second);

    match replay.encode() {
        Ok(blob) => println!("Replay link: ?replay={}", blob),
        Err(e) => log::error!("Failed to encode replay: {}", e),
    }
}

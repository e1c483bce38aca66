//! Live runner: fixed-step driver around `RunnerState`
//!
//! Owns the pending input for the next tick, the frame accumulator and the
//! presentation toggles. This is what the parameter store registers as the
//! live simulation.

use std::cell::RefCell;
use std::rc::Rc;

use super::state::RunnerState;
use super::tick::{TickInput, tick};
use crate::consts::{MAX_SUBSTEPS, SIM_DT_MS};
use crate::params::{LiveSimulation, ParamPatch, RuntimeParameters};
use crate::replay::{ActionCode, EdgeKind, ManualScheduler, NoSynthetic, Player, Replay};

pub struct Runner {
    pub state: RunnerState,
    input: TickInput,
    accumulator_ms: f64,
    /// Toggled by the mute action
    pub muted: bool,
    /// Toggled by the inspector action
    pub inspector_open: bool,
    restarts: u32,
}

impl Runner {
    pub fn new(seed: u32, params: RuntimeParameters) -> Self {
        Self {
            state: RunnerState::new(seed, params),
            input: TickInput::default(),
            accumulator_ms: 0.0,
            muted: false,
            inspector_open: false,
            restarts: 0,
        }
    }

    /// Route an input edge (live or replayed) to the run
    pub fn apply_input(&mut self, kind: EdgeKind, code: ActionCode) {
        if kind != EdgeKind::Down {
            return;
        }
        match code {
            ActionCode::Mute => self.muted = !self.muted,
            ActionCode::Inspector => self.inspector_open = !self.inspector_open,
            c if c.is_jump() => self.input.jump = true,
            _ => {}
        }
    }

    /// Run one fixed step, consuming one-shot input
    pub fn step(&mut self) {
        let input = std::mem::take(&mut self.input);
        tick(&mut self.state, &input, SIM_DT_MS);
    }

    /// Advance by a frame's worth of time, in fixed substeps
    pub fn update(&mut self, frame_dt_ms: f64) {
        self.accumulator_ms += frame_dt_ms.min(100.0);
        let mut substeps = 0;
        while self.accumulator_ms >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator_ms -= SIM_DT_MS;
            substeps += 1;
        }
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl LiveSimulation for Runner {
    fn apply_immediate(&mut self, patch: &ParamPatch) {
        if let Some(gravity_y) = patch.gravity_y {
            log::info!("Live gravity {} -> {}", self.state.params.gravity_y, gravity_y);
            self.state.params.gravity_y = gravity_y;
        }
    }

    fn restart(&mut self, params: &RuntimeParameters) {
        self.state = RunnerState::new(self.state.seed, *params);
        self.input = TickInput::default();
        self.accumulator_ms = 0.0;
        self.restarts += 1;
        log::info!("Runner restarted with seed: {}", self.state.seed);
    }
}

/// Result of a headless run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub distance: f64,
    pub score: u64,
    pub spawned: u32,
    pub fail_time_ms: Option<f64>,
}

impl RunSummary {
    pub fn of(state: &RunnerState) -> Self {
        Self {
            ticks: state.ticks,
            distance: state.distance,
            score: state.score(),
            spawned: state.spawned,
            fail_time_ms: state.fail_time_ms,
        }
    }
}

/// Replay a recording against a fresh runner on a virtual clock.
///
/// Input timers fire before the tick that starts at or after their offset.
/// Stops at game over or after `max_ms` of simulated time.
pub fn run_replay(replay: &Replay, params: RuntimeParameters, max_ms: f64) -> RunSummary {
    let scheduler = ManualScheduler::new();
    let runner = Rc::new(RefCell::new(Runner::new(replay.seed, params)));
    let mut player = Player::new(scheduler.clone());

    let target = runner.clone();
    let _playback = player.play(
        replay,
        move |kind, code| target.borrow_mut().apply_input(kind, code),
        NoSynthetic,
    );

    let mut tick_index: u64 = 0;
    loop {
        let t = tick_index as f64 * SIM_DT_MS;
        if t >= max_ms || runner.borrow().state.is_over() {
            break;
        }
        scheduler.advance_to(t.floor() as u64);
        runner.borrow_mut().step();
        tick_index += 1;
    }
    player.cancel();

    RunSummary::of(&runner.borrow().state)
}

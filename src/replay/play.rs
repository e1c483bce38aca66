//! Replay player
//!
//! Schedules one timer per recorded event at its offset from playback start,
//! plus a watchdog that bounds the whole playback. Timers come from a
//! `Scheduler` so the same player drives `window.setTimeout` in the browser
//! and a virtual clock in tests and headless verification.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use glam::Vec2;

use super::types::{ActionCode, EdgeKind, Replay};
use crate::consts::REPLAY_GRACE_MS;

/// Where synthesized pointer presses land (center of the 800x600 view)
pub const DEFAULT_POINTER_POS: Vec2 = Vec2::new(400.0, 300.0);

pub type TimerId = u64;

/// One-shot timer source
pub trait Scheduler {
    fn set_timeout(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId;
    fn clear_timeout(&self, id: TimerId);
}

/// Best-effort platform input for listeners that don't see `dispatch`
pub trait SyntheticInput {
    /// `code` is the physical key code, `key` the key value
    fn key(&mut self, kind: EdgeKind, code: &str, key: &str);
    fn pointer(&mut self, kind: EdgeKind, pos: Vec2);
}

/// Synthesizes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSynthetic;

impl SyntheticInput for NoSynthetic {
    fn key(&mut self, _kind: EdgeKind, _code: &str, _key: &str) {}
    fn pointer(&mut self, _kind: EdgeKind, _pos: Vec2) {}
}

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every event was dispatched
    Completed,
    /// The watchdog fired before every event was dispatched
    TimedOut,
    /// `cancel` was called, or a new playback replaced this one
    Cancelled,
}

#[derive(Default)]
struct Completion {
    outcome: Cell<Option<PlaybackOutcome>>,
    waker: RefCell<Option<Waker>>,
}

impl Completion {
    /// First resolution wins
    fn resolve(&self, outcome: PlaybackOutcome) {
        if self.outcome.get().is_some() {
            return;
        }
        self.outcome.set(Some(outcome));
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future for a single playback
pub struct Playback {
    completion: Rc<Completion>,
}

impl Playback {
    /// The outcome, if playback has finished
    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        self.completion.outcome.get()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }
}

impl Future for Playback {
    type Output = PlaybackOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.completion.outcome.get() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                *self.completion.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

type DispatchFn = Box<dyn FnMut(EdgeKind, ActionCode)>;

struct Run<S> {
    scheduler: S,
    playing: bool,
    timers: Vec<TimerId>,
    dispatched: usize,
    total: usize,
    dispatch: DispatchFn,
    synthetic: Box<dyn SyntheticInput>,
    completion: Rc<Completion>,
}

impl<S: Scheduler> Run<S> {
    fn finish(&mut self, outcome: PlaybackOutcome) {
        self.playing = false;
        for id in self.timers.drain(..) {
            self.scheduler.clear_timeout(id);
        }
        self.completion.resolve(outcome);
    }

    fn fire(&mut self, kind: EdgeKind, code: ActionCode) {
        if !self.playing {
            return;
        }
        (self.dispatch)(kind, code);

        let (phys, key) = code.physical_key();
        self.synthetic.key(kind, phys, key);
        if code.is_pointer() {
            self.synthetic.pointer(kind, DEFAULT_POINTER_POS);
        }

        self.dispatched += 1;
        if self.dispatched == self.total {
            log::info!("Replay completed");
            self.finish(PlaybackOutcome::Completed);
        }
    }
}

/// Plays replays, one at a time
pub struct Player<S: Scheduler + Clone + 'static> {
    scheduler: S,
    current: Option<Rc<RefCell<Run<S>>>>,
}

impl<S: Scheduler + Clone + 'static> Player<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            current: None,
        }
    }

    /// Start playing `replay`, cancelling any playback already running
    pub fn play(
        &mut self,
        replay: &Replay,
        dispatch: impl FnMut(EdgeKind, ActionCode) + 'static,
        synthetic: impl SyntheticInput + 'static,
    ) -> Playback {
        self.cancel();

        let completion = Rc::new(Completion::default());
        let playback = Playback {
            completion: completion.clone(),
        };

        log::info!(
            "Starting replay with seed: {} and {} events",
            replay.seed,
            replay.events.len()
        );

        if replay.events.is_empty() {
            completion.resolve(PlaybackOutcome::Completed);
            return playback;
        }

        let run = Rc::new(RefCell::new(Run {
            scheduler: self.scheduler.clone(),
            playing: true,
            timers: Vec::with_capacity(replay.events.len() + 1),
            dispatched: 0,
            total: replay.events.len(),
            dispatch: Box::new(dispatch),
            synthetic: Box::new(synthetic),
            completion,
        }));

        for event in &replay.events {
            let run_ref = run.clone();
            let (kind, code) = (event.kind, event.code);
            let id = self.scheduler.set_timeout(
                event.offset_ms,
                Box::new(move || run_ref.borrow_mut().fire(kind, code)),
            );
            run.borrow_mut().timers.push(id);
        }

        let watchdog_delay = replay.duration_ms().saturating_add(REPLAY_GRACE_MS);
        let run_ref = run.clone();
        let watchdog = self.scheduler.set_timeout(
            watchdog_delay,
            Box::new(move || {
                let mut run = run_ref.borrow_mut();
                if run.playing {
                    log::warn!(
                        "Replay timed out after {} of {} events",
                        run.dispatched,
                        run.total
                    );
                    run.finish(PlaybackOutcome::TimedOut);
                }
            }),
        );
        run.borrow_mut().timers.push(watchdog);

        self.current = Some(run);
        playback
    }

    /// Stop the current playback. Safe to call at any time.
    pub fn cancel(&mut self) {
        let Some(run) = self.current.take() else {
            return;
        };
        let mut run = run.borrow_mut();
        if run.playing {
            run.finish(PlaybackOutcome::Cancelled);
            log::info!("Replay cancelled");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|run| run.borrow().playing)
    }
}

#[derive(Default)]
struct ManualClock {
    now_ms: u64,
    next_id: TimerId,
    /// Keyed by (deadline, id) so equal deadlines fire in scheduling order
    pending: BTreeMap<(u64, TimerId), Box<dyn FnOnce()>>,
}

/// Virtual-time scheduler driven by explicit `advance` calls
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.borrow().now_ms
    }

    pub fn pending(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Run every timer due at or before `target_ms`, in deadline order
    pub fn advance_to(&self, target_ms: u64) {
        loop {
            let due = {
                let mut clock = self.clock.borrow_mut();
                match clock.pending.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target_ms => {
                        clock.now_ms = clock.now_ms.max(deadline);
                        clock.pending.pop_first()
                    }
                    _ => None,
                }
            };
            // Callbacks run outside the borrow; they may schedule or clear timers
            match due {
                Some((_, callback)) => callback(),
                None => break,
            }
        }
        let mut clock = self.clock.borrow_mut();
        clock.now_ms = clock.now_ms.max(target_ms);
    }

    pub fn advance_by(&self, delta_ms: u64) {
        let target = self.now_ms().saturating_add(delta_ms);
        self.advance_to(target);
    }

    /// Run timers until none are left
    pub fn run_until_idle(&self) {
        loop {
            let next = self.clock.borrow().pending.first_key_value().map(|(&(d, _), _)| d);
            match next {
                Some(deadline) => self.advance_to(deadline),
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        let deadline = clock.now_ms.saturating_add(delay_ms);
        clock.pending.insert((deadline, id), callback);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.clock.borrow_mut().pending.retain(|&(_, tid), _| tid != id);
    }
}

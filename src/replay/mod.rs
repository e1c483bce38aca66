//! Input recording and deterministic replay
//!
//! A replay is the seed plus every input edge of a session. Playing it back
//! against a fresh simulation with the same seed and parameters reproduces
//! the session.

pub mod play;
pub mod record;
pub mod types;

pub use play::{
    DEFAULT_POINTER_POS, ManualScheduler, NoSynthetic, Playback, PlaybackOutcome, Player,
    Scheduler, SyntheticInput, TimerId,
};
pub use record::{RawInput, Recorder, ReplayMeta};
pub use types::{ActionCode, EdgeKind, Replay, ReplayError, ReplayEvent};

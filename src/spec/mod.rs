//! Game spec documents
//!
//! A spec is an untrusted JSON document describing gameplay tunables. It is
//! validated into a typed `GameSpec` (or replaced by the fallback), optionally
//! perturbed by an A/B variant, and then adapted into runtime parameters.

pub mod loader;
pub mod types;
pub mod validate;
pub mod variant;

pub use loader::{LoadedSpec, SpecSource, resolve_spec, spec_url};
pub use types::{ArtStyle, GameLoop, GameSpec, LevelSection, ObstacleSpec, PlayerSpec, Sfx, ValidationResult};
pub use validate::{validate_spec, validate_spec_str};
pub use variant::{Variant, apply_variant, select_variant};

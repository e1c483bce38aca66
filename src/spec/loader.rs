//! Spec resolution chain
//!
//! remote document -> bundled example -> constant fallback. The last step
//! always succeeds. The fetch itself lives in the platform layer; this module
//! only decides what to do with whatever came back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::GameSpec;
use super::validate::{validate_spec, validate_spec_str};
use super::ValidationResult;

/// Name of the spec compiled into the binary
pub const BUNDLED_SPEC_NAME: &str = "example";

const BUNDLED_EXAMPLE: &str = include_str!("../../specs/example.json");

/// Where the session's spec came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecSource {
    Remote,
    Local,
    Fallback,
}

impl SpecSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecSource::Remote => "remote",
            SpecSource::Local => "local",
            SpecSource::Fallback => "fallback",
        }
    }
}

/// A resolved spec plus the diagnostics shown in the debug badge
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSpec {
    pub name: String,
    pub spec: GameSpec,
    pub source: SpecSource,
    /// Validation or transport problem, if any step failed
    pub diagnostic: Option<String>,
}

/// Build `{base}/specs/{name}.json`, percent-encoding the name
pub fn spec_url(base: &str, name: &str) -> String {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    format!("{}specs/{}.json", base, encode_component(name))
}

/// Percent-encode like `encodeURIComponent`
pub(crate) fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// The bundled example spec, validated
pub fn bundled_example() -> ValidationResult<GameSpec> {
    validate_spec_str(BUNDLED_EXAMPLE)
}

/// Resolve a spec from the outcome of fetching `name`.
///
/// `fetched` is the parsed body on success or a transport error message.
pub fn resolve_spec(name: &str, fetched: Result<Value, String>) -> LoadedSpec {
    let mut diagnostics = Vec::new();

    match fetched {
        Ok(raw) => match validate_spec(&raw) {
            ValidationResult::Valid(spec) => {
                log::info!("Loaded spec '{}' from remote", name);
                return LoadedSpec {
                    name: name.to_string(),
                    spec,
                    source: SpecSource::Remote,
                    diagnostic: None,
                };
            }
            ValidationResult::Invalid { error, .. } => diagnostics.push(error),
        },
        Err(e) => {
            log::warn!("Spec '{}' fetch failed: {}", name, e);
            diagnostics.push(format!("Spec not found: {}", e));
        }
    }

    if name == BUNDLED_SPEC_NAME {
        match bundled_example() {
            ValidationResult::Valid(spec) => {
                log::info!("Using bundled spec '{}'", name);
                return LoadedSpec {
                    name: name.to_string(),
                    spec,
                    source: SpecSource::Local,
                    diagnostic: Some(diagnostics.join("; ")),
                };
            }
            ValidationResult::Invalid { error, .. } => diagnostics.push(error),
        }
    }

    log::warn!("Falling back to default spec for '{}'", name);
    LoadedSpec {
        name: name.to_string(),
        spec: GameSpec::fallback(),
        source: SpecSource::Fallback,
        diagnostic: Some(diagnostics.join("; ")),
    }
}

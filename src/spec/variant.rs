//! A/B variants
//!
//! A variant scales a validated spec before it reaches the adapter. The
//! transform is pure and never touches the caller's spec.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::types::GameSpec;
use crate::session::QueryParams;

/// Query key that selects a variant
pub const VARIANT_QUERY_KEY: &str = "ab";

/// Lower bounds after scaling
const MIN_SCROLL_SPEED: f64 = 1.0;
const MIN_SPAWN_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    /// Case-insensitive, exactly `A` or `B`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Variant::A),
            "B" => Some(Variant::B),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }

    pub fn scroll_speed_factor(&self) -> f64 {
        match self {
            Variant::A => 0.9,
            Variant::B => 1.1,
        }
    }

    pub fn spawn_rate_factor(&self) -> f64 {
        match self {
            Variant::A => 0.9,
            Variant::B => 1.1,
        }
    }
}

/// Pick the variant named by the `ab` query parameter, if any
pub fn select_variant(query: &QueryParams) -> Option<Variant> {
    query.get(VARIANT_QUERY_KEY).and_then(Variant::parse)
}

/// Apply a variant. `None` hands the input back borrowed and untouched.
pub fn apply_variant(spec: &GameSpec, variant: Option<Variant>) -> Cow<'_, GameSpec> {
    let Some(variant) = variant else {
        return Cow::Borrowed(spec);
    };

    let mut out = spec.clone();
    out.scroll_speed = (out.scroll_speed * variant.scroll_speed_factor()).max(MIN_SCROLL_SPEED);
    if let Some(obstacle) = out.obstacle.as_mut() {
        obstacle.spawn_rate = (obstacle.spawn_rate * variant.spawn_rate_factor()).max(MIN_SPAWN_RATE);
    }
    log::info!(
        "A/B variant {} applied: scrollSpeed {} -> {}",
        variant.label(),
        spec.scroll_speed,
        out.scroll_speed
    );
    Cow::Owned(out)
}

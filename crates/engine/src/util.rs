//! Internal helpers for model validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every entry point enforces the same invariants.

use crate::{EngineError, ResultEngine};

/// Domain inputs that can check their own invariants before the engine acts
/// on them.
pub trait Validate {
    fn validate(&self) -> ResultEngine<()>;
}

/// Trim `value` and reject it when nothing is left.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation(format!("{label} is required")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

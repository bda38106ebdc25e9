//! Value parsing with fallback defaults.
//!
//! # Responsibilities
//! - Interpret raw string values from the environment map
//! - Replace missing, empty, zero or malformed numbers with the default
//! - Emit a warning for every value that was present but rejected
//!
//! # Design Decisions
//! - Never fails: a bad value is a configuration smell, not an outage
//! - Zero counts as unset, matching how the deployment tooling writes blanks

use std::collections::HashMap;
use std::str::FromStr;

/// Read a trimmed, non-empty value.
pub fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Parse a strictly positive number, falling back to `default`.
pub fn positive_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = non_empty(vars, key) else {
        return default;
    };

    match raw.parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!(key, value = raw, "Ignoring invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag (`1`, `true`, `yes`, `on`).
pub fn flag(vars: &HashMap<String, String>, key: &str) -> bool {
    match non_empty(vars, key).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") | None => false,
        Some(other) => {
            tracing::warn!(key, value = other, "Ignoring invalid flag, using false");
            false
        }
    }
}

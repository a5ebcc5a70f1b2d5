//! Hashing - SHA-256 over Canonical JSON
//!
//! Gives every generated output a reproducible fingerprint.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::registry::GeneratedPages;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{:02x}", byte);
        out
    })
}

/// Serializes `value` with object keys sorted at every level and no whitespace.
///
/// With `preserve_order` enabled, plain `to_string` would follow insertion order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&with_sorted_keys(value))
}

fn with_sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, nested)| (key, with_sorted_keys(nested)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(with_sorted_keys).collect()),
        other => other,
    }
}

/// Digest of a generated page set, independent of insertion order.
pub fn compute_generated_digest(pages: &GeneratedPages) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(pages)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

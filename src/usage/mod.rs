//! Usage normalization — provider-shaped usage payloads to one canonical form.
//!
//! Providers and bridge CLIs disagree on field names for the same four
//! counters. Everything downstream (transcript scans, session accounting)
//! works on [`NormalizedUsage`] only; this module is the single place that
//! knows about the wire spellings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized token usage across providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NormalizedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub cache_write_tokens: u64,
}

// Canonical spelling first, then the provider variants seen in real
// transcripts (OpenAI-style, Anthropic-style).
const INPUT_KEYS: &[&str] = &["input", "input_tokens", "prompt_tokens"];
const OUTPUT_KEYS: &[&str] = &["output", "output_tokens", "completion_tokens"];
const CACHE_READ_KEYS: &[&str] = &["cacheRead", "cache_read_tokens", "cache_read_input_tokens"];
const CACHE_WRITE_KEYS: &[&str] = &[
    "cacheWrite",
    "cache_write_tokens",
    "cache_creation_input_tokens",
];

/// Convert a loose usage record into a [`NormalizedUsage`].
///
/// Returns `None` when the value is not an object or none of the recognized
/// keys holds a usable number — the "no usable data" outcome callers treat as
/// a skip, not an error.
pub fn normalize_usage(raw: &Value) -> Option<NormalizedUsage> {
    let obj = raw.as_object()?;

    let input = read_count(obj, INPUT_KEYS);
    let output = read_count(obj, OUTPUT_KEYS);
    let cache_read = read_count(obj, CACHE_READ_KEYS);
    let cache_write = read_count(obj, CACHE_WRITE_KEYS);

    if input.is_none() && output.is_none() && cache_read.is_none() && cache_write.is_none() {
        return None;
    }

    Some(NormalizedUsage {
        input_tokens: input.unwrap_or(0),
        output_tokens: output.unwrap_or(0),
        cache_read_tokens: cache_read.unwrap_or(0),
        cache_write_tokens: cache_write.unwrap_or(0),
    })
}

/// First usable number among `keys`. Negative and non-finite values are
/// treated as absent; floats are rounded (some bridges emit `123.0`).
fn read_count(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<u64> {
    for key in keys {
        let Some(Value::Number(number)) = obj.get(*key) else {
            continue;
        };
        if let Some(count) = number.as_u64() {
            return Some(count);
        }
        if let Some(float) = number.as_f64() {
            if float.is_finite() && float >= 0.0 {
                return Some(float.round() as u64);
            }
        }
    }
    None
}

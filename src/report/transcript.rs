//! Transcript scanning — classify JSONL records into usage turns and
//! compaction markers.
//!
//! A transcript is append-only with a single writer, so a scan taken mid-write
//! may see a partial trailing line. Any line that fails to parse as a complete
//! record is dropped as noise; one bad line never fails the whole scan.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::ReportError;
use crate::usage::{NormalizedUsage, normalize_usage};

/// One assistant-authored exchange with token usage counts.
///
/// `prompt` and `cache_hit_pct` are derived at construction and the struct is
/// never mutated afterwards: `prompt = input + cache_read + cache_write`,
/// `cache_hit_pct = 100 * cache_read / prompt` (0 when the prompt is empty).
#[derive(Debug, Clone, PartialEq)]
pub struct UsageTurn {
    pub timestamp: Option<String>,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub prompt: u64,
    pub cache_hit_pct: f64,
}

impl UsageTurn {
    pub fn from_usage(timestamp: Option<String>, usage: NormalizedUsage) -> Self {
        let prompt = usage.input_tokens + usage.cache_read_tokens + usage.cache_write_tokens;
        let cache_hit_pct = if prompt > 0 {
            100.0 * usage.cache_read_tokens as f64 / prompt as f64
        } else {
            0.0
        };
        Self {
            timestamp,
            input: usage.input_tokens,
            output: usage.output_tokens,
            cache_read: usage.cache_read_tokens,
            cache_write: usage.cache_write_tokens,
            prompt,
            cache_hit_pct,
        }
    }
}

/// Result of scanning one transcript file.
///
/// Turn order equals physical line order. Compaction markers are not turns;
/// `last_compaction_turn_index` records the position *between* turns where the
/// most recent marker sits (`None` = no compaction seen).
#[derive(Debug, Clone, Default)]
pub struct ParsedTranscript {
    pub turns: Vec<UsageTurn>,
    pub compaction_count: u64,
    pub last_compaction_turn_index: Option<usize>,
    pub last_compaction_timestamp: Option<String>,
    /// Lines that failed to parse as JSON. Diagnostics only — skipped lines
    /// never affect report semantics.
    pub skipped_lines: usize,
}

/// Scan the transcript at `path`.
///
/// An unreadable file is the distinct "no transcript" condition; individual
/// bad lines are recovered by skipping.
pub fn parse_transcript(path: &Path) -> Result<ParsedTranscript, ReportError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ReportError::TranscriptUnreadable(format!("{}: {e}", path.display())))?;

    let parsed = parse_transcript_str(&content);
    if parsed.skipped_lines > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = parsed.skipped_lines,
            "skipped unparseable transcript lines"
        );
    }
    Ok(parsed)
}

/// Pure transform over transcript bytes — the scan itself never fails.
pub fn parse_transcript_str(content: &str) -> ParsedTranscript {
    let mut parsed = ParsedTranscript::default();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok(record) = serde_json::from_str::<Value>(trimmed) else {
            parsed.skipped_lines += 1;
            continue;
        };

        match record.get("type").and_then(Value::as_str) {
            Some("compaction") => {
                parsed.compaction_count += 1;
                parsed.last_compaction_turn_index = Some(parsed.turns.len());
                if let Some(ts) = record.get("timestamp").and_then(Value::as_str) {
                    parsed.last_compaction_timestamp = Some(ts.to_string());
                }
            }
            Some("message") => {
                if let Some(turn) = usage_turn_from_record(&record) {
                    parsed.turns.push(turn);
                }
            }
            // Unknown record types are not an error, merely not data.
            _ => {}
        }
    }

    parsed
}

fn usage_turn_from_record(record: &Value) -> Option<UsageTurn> {
    let message = record.get("message")?;
    if message.get("role").and_then(Value::as_str) != Some("assistant") {
        return None;
    }

    // `message.usage` is the current payload location; a top-level `usage`
    // field is the legacy shape still present in old transcripts.
    let raw = message.get("usage").or_else(|| record.get("usage"))?;
    let usage = normalize_usage(raw)?;

    let timestamp = record
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(UsageTurn::from_usage(timestamp, usage))
}

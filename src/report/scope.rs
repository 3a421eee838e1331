//! Reporting windows — scope argument parsing, turn selection, and labels.

use super::transcript::{ParsedTranscript, UsageTurn};

/// Turn count used when `turns` is requested without a usable number.
pub const DEFAULT_TURNS: usize = 10;
/// Upper clamp for `turns N`.
pub const MAX_TURNS: usize = 500;

/// The reporting window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Every turn in the transcript.
    Session,
    /// Turns strictly after the most recent compaction marker.
    LastCompaction,
    /// The trailing `N` turns.
    Turns,
}

/// Parsed scope arguments for one report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeArgs {
    pub scope: ReportScope,
    pub turns: usize,
}

impl Default for ScopeArgs {
    fn default() -> Self {
        Self {
            scope: ReportScope::LastCompaction,
            turns: DEFAULT_TURNS,
        }
    }
}

/// Parse the whitespace-separated argument string following the command token.
///
/// Argument ambiguity never hard-fails: an unrecognized token falls back to
/// the default scope, an out-of-range or unparsable count to a clamped
/// default.
pub fn parse_scope_args(raw_args: &str) -> ScopeArgs {
    let mut parts = raw_args.split_whitespace();
    match parts.next() {
        None => ScopeArgs::default(),
        Some(token) if token.eq_ignore_ascii_case("session") => ScopeArgs {
            scope: ReportScope::Session,
            turns: DEFAULT_TURNS,
        },
        Some(token) if token.eq_ignore_ascii_case("turns") => ScopeArgs {
            scope: ReportScope::Turns,
            turns: parts.next().map_or(DEFAULT_TURNS, parse_turn_count),
        },
        Some(_) => ScopeArgs::default(),
    }
}

/// Clamp a requested turn count to `[1, MAX_TURNS]`, defaulting when the
/// token is not a finite number. Fractional counts are floored.
fn parse_turn_count(raw: &str) -> usize {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => (n.floor() as i64).clamp(1, MAX_TURNS as i64) as usize,
        _ => DEFAULT_TURNS,
    }
}

/// Select the contiguous suffix of turns in scope.
///
/// An empty result (e.g. a compaction as the very last event) is a valid
/// "no usage in window" condition; surfacing it as an error is the caller's
/// call, not the selector's.
pub fn select_window<'a>(parsed: &'a ParsedTranscript, args: ScopeArgs) -> &'a [UsageTurn] {
    match args.scope {
        ReportScope::Session => &parsed.turns,
        ReportScope::Turns => {
            let start = parsed.turns.len().saturating_sub(args.turns);
            &parsed.turns[start..]
        }
        ReportScope::LastCompaction => match parsed.last_compaction_turn_index {
            None => &parsed.turns,
            Some(index) => &parsed.turns[index.min(parsed.turns.len())..],
        },
    }
}

/// Human-readable window description for the report's scope line.
pub fn scope_label(parsed: &ParsedTranscript, args: ScopeArgs) -> String {
    match args.scope {
        ReportScope::Session => "session".to_string(),
        ReportScope::Turns => format!("last {} turns", args.turns),
        ReportScope::LastCompaction => {
            if parsed.last_compaction_turn_index.is_none() {
                "since last compaction (none found, using full session)".to_string()
            } else {
                "since last compaction".to_string()
            }
        }
    }
}

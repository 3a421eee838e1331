//! Cache telemetry reports over session transcripts.
//!
//! One report request is one sequential scan of the transcript named by the
//! session entry followed by in-memory aggregation — nothing is cached across
//! requests, so a report is always as fresh as the file. Every failure path
//! resolves to a user-visible reply string; nothing here propagates past the
//! command boundary.

pub mod aggregate;
pub mod format;
pub mod scope;
pub mod transcript;

use std::path::PathBuf;

use thiserror::Error;

use self::aggregate::TURN_LIST_LIMIT;
use self::format::CacheReport;
use self::scope::ScopeArgs;

/// User-visible failure taxonomy for the reporting pipeline.
///
/// The `Display` text of each variant is the exact reply sent back to the
/// operator; "transcript has no data" and "your scope filtered everything
/// out" are deliberately distinct strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("❌ Cache report unavailable: no session file found.")]
    NoSessionFile,
    #[error("❌ Cache report failed: {0}")]
    TranscriptUnreadable(String),
    #[error("❌ Cache report unavailable: no assistant usage rows found in transcript.")]
    NoUsageRows,
    #[error("❌ Cache report unavailable: selected window has no usage rows.")]
    EmptyWindow,
}

/// One report request, after command parsing.
#[derive(Debug)]
pub struct ReportRequest<'a> {
    /// Resolved transcript path, or `None` when no session file could be
    /// determined for the session entry.
    pub session_file: Option<PathBuf>,
    pub session_key: &'a str,
    pub provider: &'a str,
    pub model: &'a str,
    pub args: ScopeArgs,
}

/// Run the full pipeline: parse, select, aggregate, render.
pub fn run(request: &ReportRequest<'_>) -> Result<String, ReportError> {
    let session_file = request
        .session_file
        .as_deref()
        .ok_or(ReportError::NoSessionFile)?;

    let parsed = transcript::parse_transcript(session_file)?;
    if parsed.turns.is_empty() {
        return Err(ReportError::NoUsageRows);
    }

    let window = scope::select_window(&parsed, request.args);
    if window.is_empty() {
        return Err(ReportError::EmptyWindow);
    }

    let totals = aggregate::calculate_totals(window);
    let session_totals = aggregate::calculate_totals(&parsed.turns);
    let break_candidates = aggregate::break_candidates(window);
    let recent_turns = &window[window.len().saturating_sub(TURN_LIST_LIMIT)..];

    Ok(format::render_report(&CacheReport {
        session_key: request.session_key,
        model_ref: format!("{}/{}", request.provider, request.model),
        scope: request.args.scope,
        scope_label: scope::scope_label(&parsed, request.args),
        compaction_count: parsed.compaction_count,
        last_compaction_timestamp: parsed.last_compaction_timestamp.as_deref(),
        totals,
        session_totals,
        break_candidates: &break_candidates,
        recent_turns,
    }))
}

#[cfg(test)]
mod tests {
    use super::scope::parse_scope_args;
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_transcript(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn request<'a>(path: Option<PathBuf>, args_text: &str) -> ReportRequest<'a> {
        ReportRequest {
            session_file: path,
            session_key: "whatsapp:+1555",
            provider: "anthropic",
            model: "claude-opus-4-6",
            args: parse_scope_args(args_text),
        }
    }

    #[test]
    fn missing_session_file_is_reported() {
        let err = run(&request(None, "session")).unwrap_err();
        assert_eq!(err, ReportError::NoSessionFile);
        assert!(err.to_string().starts_with("❌"));
    }

    #[test]
    fn unreadable_transcript_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = run(&request(Some(tmp.path().join("gone.jsonl")), "session")).unwrap_err();
        assert!(matches!(err, ReportError::TranscriptUnreadable(_)));
    }

    #[test]
    fn transcript_without_usage_rows_is_distinct_from_empty_window() {
        let tmp = TempDir::new().unwrap();

        let no_rows = write_transcript(&tmp, "none.jsonl", &[r#"{"type":"system"}"#]);
        assert_eq!(
            run(&request(Some(no_rows), "session")).unwrap_err(),
            ReportError::NoUsageRows
        );

        // A compaction as the very last event empties the default window.
        let empty_window = write_transcript(
            &tmp,
            "empty.jsonl",
            &[
                r#"{"type":"message","message":{"role":"assistant","usage":{"input":10,"output":1,"cacheRead":0,"cacheWrite":0}}}"#,
                r#"{"type":"compaction"}"#,
            ],
        );
        assert_eq!(
            run(&request(Some(empty_window), "")).unwrap_err(),
            ReportError::EmptyWindow
        );
    }

    #[test]
    fn renders_a_full_report() {
        let tmp = TempDir::new().unwrap();
        let path = write_transcript(
            &tmp,
            "ok.jsonl",
            &[
                r#"{"type":"message","timestamp":"2026-02-21T00:00:00Z","message":{"role":"assistant","usage":{"input":100,"output":10,"cacheRead":900,"cacheWrite":0}}}"#,
            ],
        );

        let text = run(&request(Some(path), "session")).unwrap();
        assert!(text.starts_with("🧊 Cache Report"));
        assert!(text.contains("🧠 Model: anthropic/claude-opus-4-6"));
        assert!(text.contains("🪟 Scope: session"));
        assert!(text.contains("🧮 Tokens: 1.0k in · 10 out"));
    }
}

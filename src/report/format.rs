//! Report rendering — fixed text layout plus the number formatters it uses.

use super::aggregate::ReportTotals;
use super::scope::ReportScope;
use super::transcript::UsageTurn;

/// Everything the formatter needs for one report. Pure data in, text out.
#[derive(Debug)]
pub struct CacheReport<'a> {
    pub session_key: &'a str,
    pub model_ref: String,
    pub scope: ReportScope,
    pub scope_label: String,
    pub compaction_count: u64,
    pub last_compaction_timestamp: Option<&'a str>,
    pub totals: ReportTotals,
    pub session_totals: ReportTotals,
    pub break_candidates: &'a [UsageTurn],
    pub recent_turns: &'a [UsageTurn],
}

/// Render the fixed multi-line report block. Line order is part of the
/// contract; operators grep these replies.
pub fn render_report(report: &CacheReport<'_>) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("🧊 Cache Report".to_string());
    lines.push(format!("🧵 Session: {}", report.session_key));
    lines.push(format!("🧠 Model: {}", report.model_ref));
    lines.push(format!("🪟 Scope: {}", report.scope_label));
    lines.push(match report.last_compaction_timestamp {
        Some(ts) => format!("🧹 Compactions: {} · last {ts}", report.compaction_count),
        None => format!("🧹 Compactions: {}", report.compaction_count),
    });
    lines.push(format!(
        "🧮 Tokens: {} in · {} out",
        format_short(report.totals.prompt),
        format_short(report.totals.output)
    ));
    lines.push(format!(
        "📦 Cache: {} read · {} write · {} hit",
        format_short(report.totals.cache_read),
        format_short(report.totals.cache_write),
        format_pct(report.totals.cache_hit_pct)
    ));
    lines.push(format!(
        "🔎 Uncached input: {} ({})",
        format_short(report.totals.input),
        format_int(report.totals.input)
    ));

    // Windowed reports get the whole-session line for context.
    if report.scope != ReportScope::Session {
        lines.push(format!(
            "📚 Session totals: {} in · {} read · {} hit",
            format_short(report.session_totals.prompt),
            format_short(report.session_totals.cache_read),
            format_pct(report.session_totals.cache_hit_pct)
        ));
    }

    if !report.break_candidates.is_empty() {
        lines.push("💥 Low cache-hit turns (possible breaks):".to_string());
        for turn in report.break_candidates {
            lines.push(format!(
                "• {} · hit {} · in {} · cacheR {} · out {}",
                turn.timestamp.as_deref().unwrap_or("unknown"),
                format_pct(turn.cache_hit_pct),
                format_int(turn.input),
                format_int(turn.cache_read),
                format_int(turn.output)
            ));
        }
    }

    if !report.recent_turns.is_empty() {
        lines.push("🕒 Last turns:".to_string());
        for turn in report.recent_turns {
            lines.push(format!(
                "• {} · hit {} · uncached {} · cacheR {} · out {}",
                turn.timestamp.as_deref().unwrap_or("unknown"),
                format_pct(turn.cache_hit_pct),
                format_int(turn.input),
                format_int(turn.cache_read),
                format_int(turn.output)
            ));
        }
    }

    lines.join("\n")
}

/// Exact integer with grouped thousands: `1234567` → `1,234,567`.
pub fn format_int(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Short-scale token count: one decimal of `k` above 1,000, `M` above
/// 1,000,000, exact integer below.
pub fn format_short(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", short_scale(value, 1_000_000.0))
    } else if value >= 1_000 {
        format!("{:.1}k", short_scale(value, 1_000.0))
    } else {
        value.to_string()
    }
}

// Round to one decimal half-away-from-zero; `{:.1}` alone would round ties
// to even and disagree with the counts operators see elsewhere.
fn short_scale(value: u64, unit: f64) -> f64 {
    (value as f64 / unit * 10.0).round() / 10.0
}

/// Percentage with exactly two decimals, clamped to finite non-negative
/// values (`NaN`/infinite render as `0.00%`).
pub fn format_pct(value: f64) -> String {
    let safe = if value.is_finite() { value.max(0.0) } else { 0.0 };
    format!("{safe:.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::NormalizedUsage;

    fn turn(ts: Option<&str>, input: u64, output: u64, cache_read: u64) -> UsageTurn {
        UsageTurn::from_usage(
            ts.map(str::to_string),
            NormalizedUsage {
                input_tokens: input,
                output_tokens: output,
                cache_read_tokens: cache_read,
                cache_write_tokens: 0,
            },
        )
    }

    #[test]
    fn format_int_groups_thousands() {
        assert_eq!(format_int(0), "0");
        assert_eq!(format_int(999), "999");
        assert_eq!(format_int(1_000), "1,000");
        assert_eq!(format_int(1_234_567), "1,234,567");
    }

    #[test]
    fn format_short_scales_and_rounds() {
        assert_eq!(format_short(999), "999");
        assert_eq!(format_short(1_000), "1.0k");
        assert_eq!(format_short(1_350), "1.4k");
        assert_eq!(format_short(1_500), "1.5k");
        assert_eq!(format_short(999_999), "1000.0k");
        assert_eq!(format_short(1_000_000), "1.0M");
        assert_eq!(format_short(2_460_000), "2.5M");
    }

    #[test]
    fn format_pct_clamps_and_fixes_decimals() {
        assert_eq!(format_pct(0.0), "0.00%");
        assert_eq!(format_pct(89.9999), "90.00%");
        assert_eq!(format_pct(33.333), "33.33%");
        assert_eq!(format_pct(f64::NAN), "0.00%");
        assert_eq!(format_pct(f64::INFINITY), "0.00%");
        assert_eq!(format_pct(-3.0), "0.00%");
    }

    #[test]
    fn renders_all_fixed_lines_in_order() {
        let turns = vec![turn(Some("2026-02-21T00:00:00Z"), 100, 10, 900)];
        let totals = crate::report::aggregate::calculate_totals(&turns);
        let report = CacheReport {
            session_key: "whatsapp:+1555",
            model_ref: "anthropic/claude-opus-4-6".to_string(),
            scope: ReportScope::Session,
            scope_label: "session".to_string(),
            compaction_count: 0,
            last_compaction_timestamp: None,
            totals,
            session_totals: totals,
            break_candidates: &[],
            recent_turns: &turns,
        };

        let text = render_report(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "🧊 Cache Report");
        assert_eq!(lines[1], "🧵 Session: whatsapp:+1555");
        assert_eq!(lines[2], "🧠 Model: anthropic/claude-opus-4-6");
        assert_eq!(lines[3], "🪟 Scope: session");
        assert_eq!(lines[4], "🧹 Compactions: 0");
        assert_eq!(lines[5], "🧮 Tokens: 1.0k in · 10 out");
        assert_eq!(lines[6], "📦 Cache: 900 read · 0 write · 90.00% hit");
        assert_eq!(lines[7], "🔎 Uncached input: 100 (100)");
        assert_eq!(lines[8], "🕒 Last turns:");
        assert_eq!(
            lines[9],
            "• 2026-02-21T00:00:00Z · hit 90.00% · uncached 100 · cacheR 900 · out 10"
        );
    }

    #[test]
    fn windowed_scope_adds_session_totals_line() {
        let turns = vec![turn(None, 100, 10, 900)];
        let totals = crate::report::aggregate::calculate_totals(&turns);
        let all = vec![turn(None, 1000, 20, 0), turn(None, 100, 10, 900)];
        let session_totals = crate::report::aggregate::calculate_totals(&all);

        let report = CacheReport {
            session_key: "telegram:42",
            model_ref: "openai-codex/gpt-5.3-codex".to_string(),
            scope: ReportScope::LastCompaction,
            scope_label: "since last compaction".to_string(),
            compaction_count: 1,
            last_compaction_timestamp: Some("2026-02-21T00:02:00Z"),
            totals,
            session_totals,
            break_candidates: &[],
            recent_turns: &turns,
        };

        let text = render_report(&report);
        assert!(text.contains("🧹 Compactions: 1 · last 2026-02-21T00:02:00Z"));
        assert!(text.contains("📚 Session totals: 2.0k in · 900 read · 45.00% hit"));
    }

    #[test]
    fn break_candidates_use_the_in_label() {
        let breaks = vec![turn(None, 2000, 30, 0)];
        let totals = crate::report::aggregate::calculate_totals(&breaks);
        let report = CacheReport {
            session_key: "irc:#ops",
            model_ref: "openrouter/llama".to_string(),
            scope: ReportScope::Session,
            scope_label: "session".to_string(),
            compaction_count: 0,
            last_compaction_timestamp: None,
            totals,
            session_totals: totals,
            break_candidates: &breaks,
            recent_turns: &[],
        };

        let text = render_report(&report);
        assert!(text.contains("💥 Low cache-hit turns (possible breaks):"));
        assert!(text.contains("• unknown · hit 0.00% · in 2,000 · cacheR 0 · out 30"));
    }
}

//! Turn aggregation — window totals and cache-break candidates.

use super::transcript::UsageTurn;

/// Prompt floor below which a turn is too small to call a cache break.
pub const BREAK_PROMPT_FLOOR: u64 = 1_000;
/// Hit percentage under which a large turn counts as a break candidate.
pub const BREAK_HIT_PCT_FLOOR: f64 = 35.0;
/// Break candidates and "last turns" listings are capped at this many rows.
pub const TURN_LIST_LIMIT: usize = 5;

/// Aggregate over a turn subsequence.
///
/// `cache_hit_pct` is the ratio of summed cache-read over summed prompt, not
/// an average of per-turn percentages — large turns weigh more, deliberately.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportTotals {
    pub turns: u64,
    pub prompt: u64,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub cache_hit_pct: f64,
}

/// Sum a turn sequence into [`ReportTotals`].
pub fn calculate_totals(turns: &[UsageTurn]) -> ReportTotals {
    let mut totals = ReportTotals::default();
    for turn in turns {
        totals.turns += 1;
        totals.prompt += turn.prompt;
        totals.input += turn.input;
        totals.output += turn.output;
        totals.cache_read += turn.cache_read;
        totals.cache_write += turn.cache_write;
    }
    if totals.prompt > 0 {
        totals.cache_hit_pct = 100.0 * totals.cache_read as f64 / totals.prompt as f64;
    }
    totals
}

/// Turns where a large prompt got little or no cache benefit — a proxy for a
/// cache break (e.g. a context edit invalidating the cached prefix).
///
/// Fixed-threshold heuristic, not a statistical test: prompt of at least
/// [`BREAK_PROMPT_FLOOR`] with zero cache reads or a hit percentage below
/// [`BREAK_HIT_PCT_FLOOR`]. Keeps only the most recent
/// [`TURN_LIST_LIMIT`] matches, in original order.
pub fn break_candidates(turns: &[UsageTurn]) -> Vec<UsageTurn> {
    let matching: Vec<&UsageTurn> = turns
        .iter()
        .filter(|turn| turn.prompt >= BREAK_PROMPT_FLOOR)
        .filter(|turn| turn.cache_read == 0 || turn.cache_hit_pct < BREAK_HIT_PCT_FLOOR)
        .collect();

    let start = matching.len().saturating_sub(TURN_LIST_LIMIT);
    matching[start..].iter().map(|turn| (*turn).clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::NormalizedUsage;

    fn turn(input: u64, output: u64, cache_read: u64, cache_write: u64) -> UsageTurn {
        UsageTurn::from_usage(
            None,
            NormalizedUsage {
                input_tokens: input,
                output_tokens: output,
                cache_read_tokens: cache_read,
                cache_write_tokens: cache_write,
            },
        )
    }

    #[test]
    fn totals_sum_all_fields() {
        let turns = vec![turn(100, 10, 900, 0), turn(50, 5, 450, 10)];
        let totals = calculate_totals(&turns);

        assert_eq!(totals.turns, 2);
        assert_eq!(totals.prompt, 1510);
        assert_eq!(totals.input, 150);
        assert_eq!(totals.output, 15);
        assert_eq!(totals.cache_read, 1350);
        assert_eq!(totals.cache_write, 10);
        // Prompt always equals input + cacheRead + cacheWrite.
        assert_eq!(totals.prompt, totals.input + totals.cache_read + totals.cache_write);
    }

    #[test]
    fn hit_pct_is_ratio_of_sums() {
        // One huge cached turn and one tiny uncached turn: the ratio-of-sums
        // stays high where a per-turn average would sit near 50%.
        let turns = vec![turn(0, 1, 10_000, 0), turn(10, 1, 0, 0)];
        let totals = calculate_totals(&turns);
        assert!(totals.cache_hit_pct > 99.0);
    }

    #[test]
    fn empty_window_has_zero_hit_pct() {
        let totals = calculate_totals(&[]);
        assert_eq!(totals.turns, 0);
        assert_eq!(totals.cache_hit_pct, 0.0);
        assert!(totals.cache_hit_pct.is_finite());
    }

    #[test]
    fn break_candidates_require_large_prompts() {
        let turns = vec![
            turn(999, 1, 0, 0),    // below the prompt floor
            turn(1000, 1, 0, 0),   // zero cache read
            turn(700, 1, 300, 0),  // 30% hit on a 1000-token prompt
            turn(100, 1, 900, 0),  // healthy 90% hit
        ];
        let candidates = break_candidates(&turns);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].input, 1000);
        assert_eq!(candidates[1].input, 700);
    }

    #[test]
    fn break_candidates_keep_most_recent_five_in_order() {
        let turns: Vec<UsageTurn> = (0..8).map(|i| turn(2000 + i, 1, 0, 0)).collect();
        let candidates = break_candidates(&turns);
        assert_eq!(candidates.len(), TURN_LIST_LIMIT);
        assert_eq!(candidates[0].input, 2003);
        assert_eq!(candidates[4].input, 2007);
    }

    #[test]
    fn boundary_hit_pct_is_not_a_candidate() {
        // Exactly 35% hit on a large prompt is healthy enough.
        let turns = vec![turn(650, 1, 350, 0)];
        assert!(break_candidates(&turns).is_empty());
    }
}

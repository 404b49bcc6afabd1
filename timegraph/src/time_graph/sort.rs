//! Track ordering and the thread filter

use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;

use crate::domain::Tid;

/// Thread display order: instrumented threads by descending call count,
/// then sampled-only threads by descending event count. Ties go to the
/// lower thread id. The all-threads sentinel is never part of the result.
#[must_use]
pub fn sorted_thread_ids(
    call_counts: &FxHashMap<i32, u64>,
    event_counts: &FxHashMap<i32, usize>,
) -> Vec<Tid> {
    let mut instrumented: Vec<(i32, u64)> = call_counts
        .iter()
        .map(|(&tid, &count)| (tid, count))
        .filter(|&(tid, _)| !Tid(tid).is_all_threads())
        .collect();
    instrumented.sort_by_key(|&(tid, count)| (Reverse(count), tid));

    let mut sampled: Vec<(i32, usize)> = event_counts
        .iter()
        .map(|(&tid, &count)| (tid, count))
        .filter(|&(tid, _)| !Tid(tid).is_all_threads() && !call_counts.contains_key(&tid))
        .collect();
    sampled.sort_by_key(|&(tid, count)| (Reverse(count), tid));

    instrumented
        .into_iter()
        .map(|(tid, _)| Tid(tid))
        .chain(sampled.into_iter().map(|(tid, _)| Tid(tid)))
        .collect()
}

/// Space separated filter tokens, duplicates removed
#[must_use]
pub fn filter_tokens(filter: &str) -> Vec<&str> {
    let mut seen = FxHashSet::default();
    filter.split_whitespace().filter(|token| seen.insert(*token)).collect()
}

/// True if `name` contains any of `tokens` (case-sensitive), or if there
/// are no tokens at all
#[must_use]
pub fn matches_filter(name: &str, tokens: &[&str]) -> bool {
    tokens.is_empty() || tokens.iter().any(|token| name.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumented_before_sampled() {
        let calls: FxHashMap<i32, u64> = [(10, 5), (11, 50), (12, 5)].into_iter().collect();
        let events: FxHashMap<i32, usize> =
            [(10, 1000), (20, 3), (21, 30), (-1, 5000)].into_iter().collect();
        let order = sorted_thread_ids(&calls, &events);
        assert_eq!(order, vec![Tid(11), Tid(10), Tid(12), Tid(21), Tid(20)]);
    }

    #[test]
    fn test_filter_tokens() {
        assert_eq!(filter_tokens("  render  io render "), vec!["render", "io"]);
        assert!(filter_tokens("   ").is_empty());
    }

    #[test]
    fn test_matches_filter() {
        let tokens = filter_tokens("Render io");
        assert!(matches_filter("RenderThread", &tokens));
        assert!(matches_filter("aio_worker", &tokens));
        assert!(!matches_filter("renderthread", &tokens), "case-sensitive");
        assert!(matches_filter("anything", &[]));
    }
}

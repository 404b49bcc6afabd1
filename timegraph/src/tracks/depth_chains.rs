//! Rows of timer chains, indexed by depth (or core, or lane)

use arc_swap::ArcSwap;
use std::sync::Arc;
use timegraph_common::TimerInfo;

use crate::storage::TimerChain;

/// One [`TimerChain`] per row, rows created on first use.
///
/// The row list is published through an [`ArcSwap`] like the blocks of a
/// chain, so readers never wait on the writer. Only the single ingestion
/// context may append.
#[derive(Debug, Default)]
pub struct DepthChains {
    rows: ArcSwap<Vec<Arc<TimerChain>>>,
}

impl DepthChains {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `timer` to row `row`, creating missing rows up to it
    pub fn append(&self, row: usize, timer: TimerInfo) {
        self.get_or_create(row).append(timer);
    }

    fn get_or_create(&self, row: usize) -> Arc<TimerChain> {
        let rows = self.rows.load();
        if let Some(chain) = rows.get(row) {
            return Arc::clone(chain);
        }

        let mut next = Vec::with_capacity(row + 1);
        next.extend(rows.iter().cloned());
        next.resize_with(row + 1, || Arc::new(TimerChain::new()));
        let chain = Arc::clone(&next[row]);
        self.rows.store(Arc::new(next));
        chain
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<Arc<TimerChain>> {
        self.rows.load().get(row).cloned()
    }

    /// All rows, top to bottom
    #[must_use]
    pub fn rows(&self) -> Arc<Vec<Arc<TimerChain>>> {
        self.rows.load_full()
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.load().len()
    }

    #[must_use]
    pub fn num_timers(&self) -> usize {
        self.rows.load().iter().map(|chain| chain.len()).sum()
    }

    #[must_use]
    pub fn min_time(&self) -> Option<u64> {
        self.rows.load().iter().filter_map(|chain| chain.snapshot().min_tick()).min()
    }

    #[must_use]
    pub fn max_time(&self) -> Option<u64> {
        self.rows.load().iter().filter_map(|chain| chain.snapshot().max_tick()).max()
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Closest timer on the same row ending before `from` ends
    #[must_use]
    pub fn left(&self, from: &TimerInfo) -> Option<TimerInfo> {
        let chain = self.row(usize::from(from.depth))?;
        let snapshot = chain.snapshot();
        let left = snapshot.nearest_before(from.end, |_| true).copied();
        left
    }

    /// Closest timer on the same row ending after `from` ends
    #[must_use]
    pub fn right(&self, from: &TimerInfo) -> Option<TimerInfo> {
        let chain = self.row(usize::from(from.depth))?;
        let snapshot = chain.snapshot();
        let right = snapshot.nearest_after(from.end, |_| true).copied();
        right
    }

    /// Enclosing timer one row up
    #[must_use]
    pub fn up(&self, from: &TimerInfo) -> Option<TimerInfo> {
        let depth = usize::from(from.depth).checked_sub(1)?;
        let chain = self.row(depth)?;
        let snapshot = chain.snapshot();
        let parent = snapshot
            .query_range(from.start, from.start)
            .filter(|parent| parent.start <= from.start && parent.end >= from.end)
            .last()
            .copied();
        parent
    }

    /// First timer one row down enclosed by `from`
    #[must_use]
    pub fn down(&self, from: &TimerInfo) -> Option<TimerInfo> {
        let chain = self.row(usize::from(from.depth) + 1)?;
        let snapshot = chain.snapshot();
        let child = snapshot
            .query_range(from.start, from.end)
            .find(|child| child.start >= from.start && child.end <= from.end)
            .copied();
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(start: u64, end: u64, depth: u8) -> TimerInfo {
        TimerInfo { start, end, depth, thread_id: 1, ..TimerInfo::default() }
    }

    /// ```text
    /// depth 0: [0 ............ 100]      [200 ....... 300]
    /// depth 1:    [10..40] [50..90]          [210..250]
    /// ```
    fn nested() -> DepthChains {
        let chains = DepthChains::new();
        let timers = [
            timer(10, 40, 1),
            timer(50, 90, 1),
            timer(0, 100, 0),
            timer(210, 250, 1),
            timer(200, 300, 0),
        ];
        for t in timers {
            chains.append(usize::from(t.depth), t);
        }
        chains
    }

    #[test]
    fn test_rows_created_lazily() {
        let chains = DepthChains::new();
        chains.append(2, timer(0, 1, 2));
        assert_eq!(chains.num_rows(), 3);
        assert_eq!(chains.num_timers(), 1);
        assert!(chains.row(0).is_some_and(|row| row.is_empty()));
    }

    #[test]
    fn test_min_max_from_aggregates() {
        let chains = nested();
        assert_eq!(chains.min_time(), Some(0));
        assert_eq!(chains.max_time(), Some(300));
        assert_eq!(DepthChains::new().min_time(), None);
    }

    #[test]
    fn test_left_right_same_depth() {
        let chains = nested();
        assert_eq!(chains.right(&timer(10, 40, 1)), Some(timer(50, 90, 1)));
        assert_eq!(chains.left(&timer(50, 90, 1)), Some(timer(10, 40, 1)));
        assert_eq!(chains.left(&timer(10, 40, 1)), None);
        assert_eq!(chains.right(&timer(200, 300, 0)), None);
    }

    #[test]
    fn test_up_down() {
        let chains = nested();
        assert_eq!(chains.up(&timer(50, 90, 1)), Some(timer(0, 100, 0)));
        assert_eq!(chains.up(&timer(210, 250, 1)), Some(timer(200, 300, 0)));
        assert_eq!(chains.up(&timer(0, 100, 0)), None);
        assert_eq!(chains.down(&timer(0, 100, 0)), Some(timer(10, 40, 1)));
        assert_eq!(chains.down(&timer(10, 40, 1)), None);
    }
}

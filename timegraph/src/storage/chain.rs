//! Append-only chain of timer blocks and its read-side snapshot.

use arc_swap::ArcSwap;
use std::sync::Arc;
use timegraph_common::TimerInfo;

use super::block::{overlaps, Extent, TimerBlock, BLOCK_CAPACITY};

/// Chain of timers, the storage behind every timer track.
pub type TimerChain = BlockChain<TimerInfo>;

/// Ordered sequence of [`TimerBlock`]s, growing at the tail.
///
/// `append` must only ever be called from one context at a time. Any number
/// of readers may call [`BlockChain::snapshot`] concurrently.
#[derive(Debug)]
pub struct BlockChain<T> {
    blocks: ArcSwap<Vec<Arc<TimerBlock<T>>>>,
    block_capacity: usize,
}

impl<T: Extent> Default for BlockChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Extent> BlockChain<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_capacity(BLOCK_CAPACITY)
    }

    /// Chain with a custom block size (small sizes are useful in tests).
    ///
    /// # Panics
    ///
    /// Panics if `block_capacity` is zero.
    #[must_use]
    pub fn with_block_capacity(block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "Block capacity must be non-zero");
        Self { blocks: ArcSwap::from_pointee(Vec::new()), block_capacity }
    }

    /// Append one item. O(1) amortized; allocates a block when the tail is full.
    pub fn append(&self, item: T) {
        let blocks = self.blocks.load();
        let item = match blocks.last() {
            Some(tail) => match tail.try_push(item) {
                Ok(()) => return,
                Err(item) => item,
            },
            None => item,
        };

        let block = TimerBlock::with_capacity(self.block_capacity);
        let pushed = block.try_push(item);
        debug_assert!(pushed.is_ok(), "fresh block rejected its first item");

        let mut next = Vec::with_capacity(blocks.len() + 1);
        next.extend(blocks.iter().cloned());
        next.push(Arc::new(block));
        self.blocks.store(Arc::new(next));
    }

    /// Consistent prefix of the chain as of now.
    #[must_use]
    pub fn snapshot(&self) -> ChainSnapshot<T> {
        let blocks = self.blocks.load_full();
        let last_len = blocks.last().map_or(0, |block| block.len());
        ChainSnapshot { blocks, last_len }
    }

    /// Number of published items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.load().iter().map(|block| block.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.load().first().is_none_or(|block| block.is_empty())
    }

    /// Number of allocated blocks.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.load().len()
    }
}

// =============================================================================
// READ SIDE
// =============================================================================

/// Read-only view of one block, bounded by the length observed at snapshot time.
#[derive(Debug)]
pub struct BlockView<'a, T> {
    block: &'a TimerBlock<T>,
    len: usize,
}

impl<T> Clone for BlockView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BlockView<'_, T> {}

impl<'a, T: Extent> BlockView<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn min_tick(&self) -> u64 {
        self.block.min_tick()
    }

    pub fn max_tick(&self) -> u64 {
        self.block.max_tick()
    }

    /// Could any entry of this block overlap `[t0, t1]`?
    pub fn intersects(&self, t0: u64, t1: u64) -> bool {
        !self.is_empty() && self.min_tick() <= t1 && self.max_tick() >= t0
    }

    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.block.get_within(index, self.len)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a T> {
        self.block.items_within(self.len)
    }
}

/// Prefix of a chain captured at one instant.
///
/// Holds the block list alive, so it can be iterated while the writer keeps
/// appending.
#[derive(Debug, Clone)]
pub struct ChainSnapshot<T> {
    blocks: Arc<Vec<Arc<TimerBlock<T>>>>,
    last_len: usize,
}

impl<T: Extent> ChainSnapshot<T> {
    /// Blocks in append order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = BlockView<'_, T>> {
        let last = self.blocks.len().saturating_sub(1);
        self.blocks.iter().enumerate().map(move |(index, block)| BlockView {
            block,
            len: if index == last { self.last_len } else { block.len() },
        })
    }

    /// All items in append order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.blocks().flat_map(|view| view.iter())
    }

    pub fn len(&self) -> usize {
        self.blocks().map(|view| view.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<&T> {
        self.iter().next_back()
    }

    /// Smallest start tick over the snapshot, if any.
    pub fn min_tick(&self) -> Option<u64> {
        self.blocks().filter(|view| !view.is_empty()).map(|view| view.min_tick()).min()
    }

    /// Largest end tick over the snapshot, if any.
    pub fn max_tick(&self) -> Option<u64> {
        self.blocks().filter(|view| !view.is_empty()).map(|view| view.max_tick()).max()
    }

    /// Items whose `[start, end)` overlaps `[t0, t1]`, skipping whole blocks
    /// whose aggregate lies outside the range.
    pub fn query_range(&self, t0: u64, t1: u64) -> impl Iterator<Item = &T> {
        self.blocks().filter(move |view| view.intersects(t0, t1)).flat_map(move |view| {
            view.iter().filter(move |item| overlaps(item.start_tick(), item.end_tick(), t0, t1))
        })
    }

    /// Item with the largest end tick strictly before `time` satisfying `pred`.
    ///
    /// On equal end ticks the most recently appended item wins.
    pub fn nearest_before(&self, time: u64, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        let mut best: Option<&T> = None;
        for view in self.blocks() {
            if view.is_empty() || view.min_tick() >= time {
                continue;
            }
            if best.is_some_and(|b| view.max_tick() < b.end_tick()) {
                continue;
            }
            for item in view.iter() {
                let end = item.end_tick();
                if end < time && best.is_none_or(|b| end >= b.end_tick()) && pred(item) {
                    best = Some(item);
                }
            }
        }
        best
    }

    /// Item with the smallest end tick strictly after `time` satisfying `pred`.
    ///
    /// On equal end ticks the most recently appended item wins.
    pub fn nearest_after(&self, time: u64, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        let mut best: Option<&T> = None;
        for view in self.blocks() {
            if view.is_empty() || view.max_tick() <= time {
                continue;
            }
            if best.is_some_and(|b| view.min_tick() > b.end_tick()) {
                continue;
            }
            for item in view.iter() {
                let end = item.end_tick();
                if end > time && best.is_none_or(|b| end <= b.end_tick()) && pred(item) {
                    best = Some(item);
                }
            }
        }
        best
    }
}

//! Fixed-capacity append-only block with a time aggregate.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use timegraph_common::TimerInfo;

/// Number of entries per block.
pub const BLOCK_CAPACITY: usize = 1024;

/// Anything stored in a chain exposes the tick range it covers.
pub trait Extent {
    fn start_tick(&self) -> u64;
    fn end_tick(&self) -> u64;
}

impl Extent for TimerInfo {
    fn start_tick(&self) -> u64 {
        self.start
    }

    fn end_tick(&self) -> u64 {
        self.end
    }
}

/// Does an item covering `[start, end)` overlap the closed query `[t0, t1]`?
///
/// Zero-length items (samples, instants) are treated as a point at `start`.
#[must_use]
pub fn overlaps(start: u64, end: u64, t0: u64, t1: u64) -> bool {
    if start == end {
        start >= t0 && start <= t1
    } else {
        start <= t1 && end > t0
    }
}

/// Fixed-capacity, append-only block.
///
/// Slots are write-once. `len` is the publication point: entries below it
/// are complete and immutable. The aggregate `[min_tick, max_tick]` is
/// widened before `len` is published, so a reader that sees an entry also
/// sees an aggregate covering it.
#[derive(Debug)]
pub struct TimerBlock<T> {
    slots: Box<[OnceLock<T>]>,
    len: AtomicUsize,
    min_tick: AtomicU64,
    max_tick: AtomicU64,
}

impl<T: Extent> TimerBlock<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            len: AtomicUsize::new(0),
            min_tick: AtomicU64::new(u64::MAX),
            max_tick: AtomicU64::new(0),
        }
    }

    /// Append one entry, handing it back if the block is full.
    ///
    /// Writer side only.
    pub(crate) fn try_push(&self, item: T) -> Result<(), T> {
        let len = self.len.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(len) else {
            return Err(item);
        };

        let (start, end) = (item.start_tick(), item.end_tick());
        slot.set(item)?;
        self.min_tick.fetch_min(start, Ordering::Relaxed);
        self.max_tick.fetch_max(end, Ordering::Relaxed);
        self.len.store(len + 1, Ordering::Release);
        Ok(())
    }

    /// Number of published entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Smallest start tick over the block (`u64::MAX` when empty).
    pub fn min_tick(&self) -> u64 {
        self.min_tick.load(Ordering::Relaxed)
    }

    /// Largest end tick over the block (0 when empty).
    pub fn max_tick(&self) -> u64 {
        self.max_tick.load(Ordering::Relaxed)
    }

    /// Published entry at `index`, bounded by an externally captured length.
    pub(crate) fn get_within(&self, index: usize, len: usize) -> Option<&T> {
        if index < len {
            self.slots.get(index).and_then(OnceLock::get)
        } else {
            None
        }
    }

    /// Entries `[0, len)`; `len` must not exceed a previously observed `len()`.
    pub(crate) fn items_within(&self, len: usize) -> impl DoubleEndedIterator<Item = &T> {
        self.slots[..len.min(self.slots.len())].iter().filter_map(OnceLock::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(start: u64, end: u64) -> TimerInfo {
        TimerInfo { start, end, ..TimerInfo::default() }
    }

    #[test]
    fn test_push_until_full() {
        let block = TimerBlock::with_capacity(2);
        assert!(block.try_push(timer(10, 20)).is_ok());
        assert!(block.try_push(timer(5, 30)).is_ok());
        let rejected = block.try_push(timer(40, 50));
        assert_eq!(rejected, Err(timer(40, 50)));
        assert_eq!(block.len(), 2);
        assert_eq!(block.min_tick(), 5);
        assert_eq!(block.max_tick(), 30);
    }

    #[test]
    fn test_items_respect_len() {
        let block = TimerBlock::with_capacity(4);
        for i in 0..3 {
            block.try_push(timer(i, i + 1)).unwrap();
        }
        assert_eq!(block.items_within(2).count(), 2);
        assert_eq!(block.get_within(2, 2), None);
        assert_eq!(block.get_within(1, 3).map(|t| t.start), Some(1));
    }

    #[test]
    fn test_overlaps_half_open() {
        assert!(overlaps(10, 20, 15, 30));
        assert!(!overlaps(10, 20, 20, 30), "end is exclusive");
        assert!(overlaps(10, 20, 0, 10), "start is inclusive");
        assert!(overlaps(7, 7, 7, 9), "point sample at query start");
        assert!(!overlaps(7, 7, 8, 9));
    }
}

//! # Append-Only Timer Storage
//!
//! The foundational storage primitive for ordered timer sequences.
//!
//! ## Layout
//!
//! ```text
//! BlockChain
//!   blocks: ArcSwap<Vec<Arc<TimerBlock>>>   ← published list, swapped on growth
//!             │
//!             ├── TimerBlock [min_start, max_end]  (full, never touched again)
//!             ├── TimerBlock [min_start, max_end]  (full)
//!             └── TimerBlock [min_start, max_end]  (current, len grows)
//! ```
//!
//! ## Concurrency Discipline
//!
//! - **One writer per chain.** Appends never move or mutate published entries.
//! - **Slot publish:** the writer fills a slot, then stores `len + 1` with
//!   `Release`. Readers load `len` with `Acquire` and only look at `[0, len)`.
//! - **Block publish:** a new block is fully constructed (first item already
//!   inside) before the block list is swapped in.
//! - **Readers** take a [`ChainSnapshot`]: the block list plus the length of
//!   the last block at that instant. A snapshot is always a prefix of the
//!   chain; it may miss the very latest append but never shows a torn entry.
//!
//! No lock is taken on the append path, so rendering never serializes against
//! ingestion.

pub mod block;
pub mod chain;

pub use block::{Extent, TimerBlock, BLOCK_CAPACITY};
pub use chain::{BlockChain, BlockView, ChainSnapshot, TimerChain};

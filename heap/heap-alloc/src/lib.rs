//! # Trusted-Memory Fit Allocators
//!
//! User-space allocators that manage a single contiguous region obtained
//! once from an upstream source (an [`OuterAllocator`] or the operating
//! system) and carve it into variable-sized blocks on request. All
//! allocator state lives inside the managed bytes themselves; the Rust
//! structs hold nothing but the region base and the borrowed
//! collaborators.
//!
//! Two layout disciplines are implemented side by side:
//!
//! - [`SortedListAllocator`] keeps its free list **sorted by address** and
//!   coalesces at deallocation by boundary arithmetic against the list
//!   neighbors.
//! - [`TaggedListAllocator`] tags every size word with an allocation bit
//!   (sizes are kept even to make room for it) and coalesces by scanning
//!   the unordered free list for physically adjacent members.
//!
//! Both honor the same block geometry (free block `[size | next | ...]`,
//! occupied block `[size | user bytes...]`, sizes counting the header
//! words) and the same three fit policies ([`FitMode`]). Requests are
//! served by splitting a chosen free block at its low end; a residue too
//! small to hold a free header is handed to the caller instead of being
//! leaked outside the block sequence, so the payload is covered by blocks
//! at all times.
//!
//! Failures split into two surfaces on purpose: impossible construction
//! and exhausted memory are returned as [`MemoryError`]s, while a
//! deallocation of a foreign pointer is logged as a warning and ignored.

mod allocator;
mod coalesce;
mod error;
mod free_list;
mod outer;
mod sorted_list;
mod tagged_list;

pub use allocator::{Allocator, BlockRecord, BlockStatus};
pub use error::MemoryError;
pub use heap_layout::FitMode;
pub use outer::OuterAllocator;
pub use sorted_list::SortedListAllocator;
pub use tagged_list::TaggedListAllocator;

//! Buddy allocator module
//!
//! This module provides a single-arena buddy system implementation with:
//! - Pure address translation between addresses, pages and buddies
//! - A fixed page metadata table holding block heads
//! - Intrusive per-order free lists threaded through that table
//! - Free block reports and optional statistics

pub mod buddy_allocator;
pub mod buddy_block;
pub mod free_list;
pub mod page_table;
pub mod stats;
pub mod translator;

pub use buddy_allocator::BuddyAllocator;
pub use buddy_block::BuddyBlock;
pub use free_list::{FreeList, FreeListIter};
pub use page_table::{PageDescriptor, PageState, PageTable};
#[cfg(feature = "tracking")]
pub use stats::BuddyStats;
pub use stats::{DumpReport, MemoryStatsReporter};
pub use translator::ArenaTranslator;

//! Fixed-arena buddy allocator
//!
//! This crate manages a single contiguous byte region of `2^MAX_ORDER` bytes
//! by recursively halving it into power-of-two blocks, featuring:
//! - Per-order free lists threaded through a fixed page metadata table
//! - Eager buddy coalescing on every release
//! - Double-free and foreign-pointer detection
//! - A lock-guarded wrapper usable as a `GlobalAlloc`

#![no_std]

extern crate alloc;

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Default minimum block order (4 KiB pages)
pub const DEFAULT_MIN_ORDER: usize = 12;

/// Default maximum block order (1 MiB arena)
pub const DEFAULT_MAX_ORDER: usize = 20;

/// The largest `MAX_ORDER` an allocator can be instantiated with
pub const MAX_ORDER_LIMIT: usize = 40;

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Requested size is zero or larger than the whole arena.
    InvalidSize,
    /// No free block of a sufficient order is left.
    OutOfMemory,
    /// Release of an address that is not a live allocation.
    InvalidFree,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "invalid allocation size"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidFree => write!(f, "address is not a live allocation"),
        }
    }
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Byte-granularity allocator.
pub trait ByteAllocator {
    /// Allocate memory with the given size (in bytes) and alignment.
    fn alloc(&mut self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Deallocate memory at the given position, size, and alignment.
    fn dealloc(&mut self, pos: NonNull<u8>, layout: Layout) -> AllocResult;

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes.
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{
    ArenaTranslator, BuddyAllocator, BuddyBlock, DumpReport, FreeList, PageDescriptor, PageState,
    PageTable,
};

pub mod locked;
pub use locked::LockedBuddyAllocator;

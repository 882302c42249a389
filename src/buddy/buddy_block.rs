//! Buddy block metadata
//!
//! Represents a block of the arena with order and address information.

use core::cmp::PartialOrd;

/// Buddy block metadata
///
/// A block of order `k` covers `2^k` bytes starting at `addr`.
#[derive(Debug, Clone, Copy)]
pub struct BuddyBlock {
    pub order: usize,
    pub addr: usize,
}

impl BuddyBlock {
    /// Create a new buddy block
    pub const fn new(order: usize, addr: usize) -> Self {
        Self { order, addr }
    }

    /// Size of the block in bytes
    pub const fn size(&self) -> usize {
        1 << self.order
    }

    /// One past the last byte of the block
    pub const fn end(&self) -> usize {
        self.addr + self.size()
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.addr && addr < self.end()
    }

    /// Whether the two blocks share at least one byte
    pub const fn overlaps(&self, other: &BuddyBlock) -> bool {
        self.addr < other.end() && other.addr < self.end()
    }

    /// Calculate the buddy address for this block
    ///
    /// The buddy is the other half of the parent block at the next higher order.
    /// Offsets are taken relative to `base`, so for a block at order k with
    /// offset A its buddy sits at offset A ^ 2^k.
    pub const fn buddy_addr(&self, base: usize) -> usize {
        base + ((self.addr - base) ^ (1 << self.order))
    }
}

impl PartialOrd for BuddyBlock {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.addr.partial_cmp(&other.addr)
    }
}

impl PartialEq for BuddyBlock {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.order == other.order
    }
}

impl Eq for BuddyBlock {}

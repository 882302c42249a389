//! Fixed-arena buddy allocator
//!
//! Owns the page table and the per-order free lists for a single arena of
//! `2^MAX_ORDER` bytes carved into `2^MIN_ORDER`-byte pages.

use alloc::vec::Vec;
use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{AllocError, AllocResult, ByteAllocator, MAX_ORDER_LIMIT};

#[cfg(feature = "log")]
use log::{debug, info, trace, warn};

use super::{
    buddy_block::BuddyBlock, free_list::FreeList, page_table::PageTable, stats::DumpReport,
    translator::ArenaTranslator,
};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

/// Buddy allocator over one fixed arena
///
/// Blocks are tracked by the page descriptor of their lowest page. Free
/// blocks of order `k` are chained on `free_lists[k]` through those
/// descriptors; allocated blocks are on no list.
pub struct BuddyAllocator<
    const MIN_ORDER: usize = { crate::DEFAULT_MIN_ORDER },
    const MAX_ORDER: usize = { crate::DEFAULT_MAX_ORDER },
> {
    translator: Option<ArenaTranslator>,
    pages: PageTable,
    /// Free lists indexed by order; only `MIN_ORDER..=MAX_ORDER` are used
    free_lists: [FreeList; MAX_ORDER_LIMIT + 1],
    used_bytes: usize,
    #[cfg(feature = "tracking")]
    stats: BuddyStats,
}

impl<const MIN_ORDER: usize, const MAX_ORDER: usize> BuddyAllocator<MIN_ORDER, MAX_ORDER> {
    const VALID_ORDERS: () = assert!(
        MIN_ORDER <= MAX_ORDER
            && MAX_ORDER <= MAX_ORDER_LIMIT
            && MAX_ORDER < usize::BITS as usize,
        "buddy allocator requires MIN_ORDER <= MAX_ORDER <= MAX_ORDER_LIMIT"
    );

    /// Size of a page in bytes
    pub const PAGE_SIZE: usize = 1 << MIN_ORDER;

    /// Size of the whole arena in bytes
    pub const ARENA_SIZE: usize = 1 << MAX_ORDER;

    /// Create an allocator with no arena (must call init())
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_ORDERS;
        Self {
            translator: None,
            pages: PageTable::new(),
            free_lists: [const { FreeList::new() }; MAX_ORDER_LIMIT + 1],
            used_bytes: 0,
            #[cfg(feature = "tracking")]
            stats: BuddyStats::new(),
        }
    }

    /// Install the arena starting at `base_addr` as one free block of `MAX_ORDER`.
    ///
    /// The `ARENA_SIZE` bytes at `base_addr` must stay valid and unused by
    /// anyone else for as long as the allocator hands out addresses.
    ///
    /// # Panics
    ///
    /// Panics if `base_addr` is not page-aligned, if the arena would wrap
    /// the address space, or if allocations from a previous arena are live.
    pub fn init(&mut self, base_addr: usize) {
        if self.used_bytes != 0 {
            panic!(
                "Cannot re-initialize: {:#x} bytes still allocated",
                self.used_bytes
            );
        }
        if !crate::is_aligned(base_addr, Self::PAGE_SIZE) {
            panic!(
                "Arena base {:#x} is not aligned to page size {:#x}",
                base_addr,
                Self::PAGE_SIZE
            );
        }
        if base_addr.checked_add(Self::ARENA_SIZE).is_none() {
            panic!("Arena at {:#x} wraps the address space", base_addr);
        }

        let translator = ArenaTranslator::new(base_addr, MIN_ORDER, MAX_ORDER);

        self.pages.init(translator.page_count());
        for list in &mut self.free_lists {
            list.clear();
        }

        self.pages.descriptor_mut(0).mark_free(MAX_ORDER);
        self.free_lists[MAX_ORDER].push(&mut self.pages, 0);
        self.translator = Some(translator);

        info!(
            "buddy allocator: arena [{:#x}, {:#x}), {} pages of {:#x} bytes",
            base_addr,
            translator.end_addr(),
            translator.page_count(),
            Self::PAGE_SIZE
        );

        #[cfg(feature = "tracking")]
        self.update_stats();
    }

    pub fn is_initialized(&self) -> bool {
        self.translator.is_some()
    }

    /// Base address of the arena, if initialized
    pub fn base_addr(&self) -> Option<usize> {
        self.translator.map(|t| t.base_addr())
    }

    /// Smallest order whose block holds `size` bytes, never below `MIN_ORDER`.
    ///
    /// Returns `None` for zero or for sizes larger than the arena.
    pub fn order_for_size(size: usize) -> Option<usize> {
        if size == 0 || size > Self::ARENA_SIZE {
            return None;
        }
        let order = size.next_power_of_two().trailing_zeros() as usize;
        Some(order.max(MIN_ORDER))
    }

    /// Allocate a block of at least `size` bytes and return its base address.
    pub fn alloc(&mut self, size: usize) -> AllocResult<usize> {
        let desired_order = Self::order_for_size(size).ok_or(AllocError::InvalidSize)?;
        let translator = self.translator.ok_or(AllocError::OutOfMemory)?;

        // Smallest non-empty order at or above the target
        let mut source = None;
        for order in desired_order..=MAX_ORDER {
            if let Some(idx) = self.free_lists[order].pop(&mut self.pages) {
                source = Some((order, idx));
                break;
            }
        }
        let Some((source_order, idx)) = source else {
            debug!(
                "buddy allocator: allocation failure: {} bytes (order {})",
                size, desired_order
            );
            #[cfg(feature = "tracking")]
            MemoryStatsReporter::print_alloc_failure_stats(
                MIN_ORDER,
                &self.dump(),
                size,
                desired_order,
            );
            return Err(AllocError::OutOfMemory);
        };

        assert!(
            self.pages.descriptor(idx).is_free_at(source_order),
            "page {} on free list of order {} is not a free block of that order",
            idx,
            source_order
        );

        // Split down to the desired order; the left half keeps page `idx`
        // and every right half goes onto the free list one order below.
        let mut order = source_order;
        while order > desired_order {
            order -= 1;
            let buddy = translator.buddy_page(idx, order);
            self.pages.descriptor_mut(buddy).mark_free(order);
            self.free_lists[order].push(&mut self.pages, buddy);
            trace!(
                "buddy allocator: split {:#x} at order {}, buddy {:#x} freed",
                translator.addr_of_page(idx),
                order + 1,
                translator.addr_of_page(buddy)
            );
        }

        self.pages.descriptor_mut(idx).mark_allocated(desired_order);
        self.used_bytes += 1 << desired_order;

        #[cfg(feature = "tracking")]
        self.update_stats();

        Ok(translator.addr_of_page(idx))
    }

    /// Return the block at `addr` and merge it with free buddies.
    ///
    /// `addr` must be a live allocation previously returned by
    /// [`Self::alloc`]; anything else, including a second release of the
    /// same block, fails with [`AllocError::InvalidFree`] and leaves the
    /// allocator untouched.
    pub fn dealloc(&mut self, addr: usize) -> AllocResult {
        let Some((translator, mut idx)) = self.live_block_page(addr) else {
            warn!(
                "buddy allocator: invalid free of {:#x}: not a live allocation",
                addr
            );
            return Err(AllocError::InvalidFree);
        };

        let mut order = self.pages.descriptor(idx).order;
        self.used_bytes -= 1 << order;
        self.pages.descriptor_mut(idx).reset();

        while order < MAX_ORDER {
            let buddy = translator.buddy_page(idx, order);
            if !self.pages.descriptor(buddy).is_free_at(order) {
                break;
            }

            let removed = self.free_lists[order].remove(&mut self.pages, buddy);
            assert!(
                removed,
                "free buddy page {} missing from free list of order {}",
                buddy, order
            );
            self.pages.descriptor_mut(buddy).reset();
            trace!(
                "buddy allocator: merge {:#x} with buddy {:#x} at order {}",
                translator.addr_of_page(idx),
                translator.addr_of_page(buddy),
                order
            );

            idx = idx.min(buddy);
            order += 1;
        }

        self.pages.descriptor_mut(idx).mark_free(order);
        self.free_lists[order].push(&mut self.pages, idx);

        #[cfg(feature = "tracking")]
        self.update_stats();

        Ok(())
    }

    /// Translator and page index for `addr` if it heads a live allocation
    fn live_block_page(&self, addr: usize) -> Option<(ArenaTranslator, usize)> {
        let translator = self.translator?;
        let idx = translator.checked_page_index(addr)?;
        self.pages
            .descriptor(idx)
            .is_allocated()
            .then_some((translator, idx))
    }

    /// Order of the live allocation at `addr`
    pub fn allocated_order(&self, addr: usize) -> Option<usize> {
        self.live_block_page(addr)
            .map(|(_, idx)| self.pages.descriptor(idx).order)
    }

    /// Usable size of the live allocation at `addr`
    ///
    /// This is the block size, not the size originally requested.
    pub fn allocated_size(&self, addr: usize) -> Option<usize> {
        self.allocated_order(addr).map(|order| 1 << order)
    }

    /// Get the number of free blocks of a specific order
    pub fn free_block_count(&self, order: usize) -> usize {
        if (MIN_ORDER..=MAX_ORDER).contains(&order) {
            self.free_lists[order].len()
        } else {
            0
        }
    }

    /// Free blocks of a specific order
    pub fn free_blocks(&self, order: usize) -> Vec<BuddyBlock> {
        let Some(translator) = self.translator else {
            return Vec::new();
        };
        if !(MIN_ORDER..=MAX_ORDER).contains(&order) {
            return Vec::new();
        }
        self.free_lists[order]
            .iter(&self.pages)
            .map(|idx| BuddyBlock::new(order, translator.addr_of_page(idx)))
            .collect()
    }

    /// Live allocations as blocks, lowest address first
    pub fn allocated_blocks(&self) -> Vec<BuddyBlock> {
        let Some(translator) = self.translator else {
            return Vec::new();
        };
        self.pages
            .heads()
            .filter(|(_, page)| page.is_allocated())
            .map(|(idx, page)| BuddyBlock::new(page.order, translator.addr_of_page(idx)))
            .collect()
    }

    /// Free block count for every order from `MIN_ORDER` to `MAX_ORDER`
    pub fn dump(&self) -> DumpReport {
        DumpReport::new(
            (MIN_ORDER..=MAX_ORDER)
                .map(|order| (order, self.free_lists[order].len()))
                .collect(),
        )
    }

    /// Log the free block distribution
    pub fn log_dump(&self) {
        let _report = self.dump();
        info!("buddy allocator: {}", _report);
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> BuddyStats {
        self.stats
    }

    #[cfg(feature = "tracking")]
    fn update_stats(&mut self) {
        let mut stats = BuddyStats::new();
        if self.translator.is_some() {
            stats.total_pages = Self::ARENA_SIZE >> MIN_ORDER;
        }
        for order in MIN_ORDER..=MAX_ORDER {
            let count = self.free_lists[order].len();
            stats.free_blocks_by_order[order] = count;
            stats.free_pages += count << (order - MIN_ORDER);
        }
        stats.used_pages = stats.total_pages.saturating_sub(stats.free_pages);
        self.stats = stats;
    }
}

impl<const MIN_ORDER: usize, const MAX_ORDER: usize> Default
    for BuddyAllocator<MIN_ORDER, MAX_ORDER>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const MIN_ORDER: usize, const MAX_ORDER: usize> ByteAllocator
    for BuddyAllocator<MIN_ORDER, MAX_ORDER>
{
    /// Blocks are aligned to their size relative to the arena base, so the
    /// effective size is `max(size, align)` and `align` may not exceed the
    /// alignment of the base itself.
    fn alloc(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let base = self.base_addr().ok_or(AllocError::OutOfMemory)?;
        if !crate::is_aligned(base, layout.align()) {
            return Err(AllocError::InvalidSize);
        }
        let addr = BuddyAllocator::alloc(self, layout.size().max(layout.align()))?;
        NonNull::new(addr as *mut u8).ok_or(AllocError::OutOfMemory)
    }

    fn dealloc(&mut self, pos: NonNull<u8>, layout: Layout) -> AllocResult {
        let addr = pos.as_ptr() as usize;
        let expected = Self::order_for_size(layout.size().max(layout.align()));
        if self.allocated_order(addr) != expected {
            warn!(
                "buddy allocator: layout {:?} does not match block at {:#x}",
                layout, addr
            );
            return Err(AllocError::InvalidFree);
        }
        BuddyAllocator::dealloc(self, addr)
    }

    fn total_bytes(&self) -> usize {
        if self.is_initialized() {
            Self::ARENA_SIZE
        } else {
            0
        }
    }

    fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn available_bytes(&self) -> usize {
        self.total_bytes() - self.used_bytes
    }
}

//! Address translation for a buddy arena
//!
//! Maps between absolute addresses, page indices and buddy addresses. All
//! arithmetic is done on offsets from the arena base, so the base itself only
//! has to be page-aligned.

/// Pure address arithmetic for one arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaTranslator {
    base_addr: usize,
    min_order: usize,
    max_order: usize,
}

impl ArenaTranslator {
    pub const fn new(base_addr: usize, min_order: usize, max_order: usize) -> Self {
        Self {
            base_addr,
            min_order,
            max_order,
        }
    }

    pub const fn base_addr(&self) -> usize {
        self.base_addr
    }

    pub const fn page_size(&self) -> usize {
        1 << self.min_order
    }

    pub const fn arena_size(&self) -> usize {
        1 << self.max_order
    }

    pub const fn page_count(&self) -> usize {
        1 << (self.max_order - self.min_order)
    }

    /// One past the last byte of the arena
    pub const fn end_addr(&self) -> usize {
        self.base_addr + self.arena_size()
    }

    pub const fn addr_in_arena(&self, addr: usize) -> bool {
        addr >= self.base_addr && addr < self.end_addr()
    }

    /// Page index of a page-aligned address inside the arena.
    ///
    /// The address must lie in the arena; use [`Self::checked_page_index`]
    /// for untrusted input.
    #[inline]
    pub fn page_index_of(&self, addr: usize) -> usize {
        debug_assert!(self.addr_in_arena(addr));
        (addr - self.base_addr) >> self.min_order
    }

    /// Page index of `addr`, or `None` if it is outside the arena or not
    /// on a page boundary.
    pub fn checked_page_index(&self, addr: usize) -> Option<usize> {
        if !self.addr_in_arena(addr) {
            return None;
        }
        let offset = addr - self.base_addr;
        if !crate::is_aligned(offset, self.page_size()) {
            return None;
        }
        Some(offset >> self.min_order)
    }

    #[inline]
    pub const fn addr_of_page(&self, index: usize) -> usize {
        self.base_addr + (index << self.min_order)
    }

    /// Address of the buddy of the order-`order` block starting at `addr`.
    ///
    /// Only meaningful for `min_order <= order < max_order`.
    #[inline]
    pub fn buddy_addr(&self, addr: usize, order: usize) -> usize {
        debug_assert!(order >= self.min_order && order < self.max_order);
        self.base_addr + ((addr - self.base_addr) ^ (1 << order))
    }

    /// Page index of the buddy of the order-`order` block headed by page `index`.
    #[inline]
    pub fn buddy_page(&self, index: usize, order: usize) -> usize {
        debug_assert!(order >= self.min_order && order < self.max_order);
        index ^ (1 << (order - self.min_order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: usize = 0x40_0000;

    #[test]
    fn test_geometry() {
        let t = ArenaTranslator::new(BASE, 12, 20);
        assert_eq!(t.page_size(), 0x1000);
        assert_eq!(t.arena_size(), 0x10_0000);
        assert_eq!(t.page_count(), 256);
        assert_eq!(t.end_addr(), BASE + 0x10_0000);
    }

    #[test]
    fn test_page_index_round_trip() {
        let t = ArenaTranslator::new(BASE, 12, 20);
        assert_eq!(t.page_index_of(BASE), 0);
        assert_eq!(t.page_index_of(BASE + 0x5000), 5);
        assert_eq!(t.addr_of_page(255), BASE + 0xff000);
        assert_eq!(t.page_index_of(t.addr_of_page(17)), 17);
    }

    #[test]
    fn test_checked_page_index_rejects_foreign_addresses() {
        let t = ArenaTranslator::new(BASE, 12, 20);
        assert_eq!(t.checked_page_index(BASE - 0x1000), None);
        assert_eq!(t.checked_page_index(BASE + 0x10_0000), None);
        assert_eq!(t.checked_page_index(BASE + 0x1001), None);
        assert_eq!(t.checked_page_index(BASE + 0x3000), Some(3));
    }

    #[test]
    fn test_buddy_addr_and_page_agree() {
        let t = ArenaTranslator::new(BASE, 12, 20);
        assert_eq!(t.buddy_addr(BASE, 12), BASE + 0x1000);
        assert_eq!(t.buddy_addr(BASE + 0x1000, 12), BASE);
        assert_eq!(t.buddy_addr(BASE, 19), BASE + 0x8_0000);
        assert_eq!(t.buddy_addr(BASE + 0xc000, 14), BASE + 0x8000);

        for order in 12..20 {
            let addr = BASE + (1 << order);
            let buddy = t.buddy_addr(addr, order);
            assert_eq!(t.page_index_of(buddy), t.buddy_page(t.page_index_of(addr), order));
        }
    }

    #[test]
    fn test_unaligned_base_uses_relative_offsets() {
        // Base only page-aligned, not arena-aligned.
        let base = 0x7000;
        let t = ArenaTranslator::new(base, 12, 16);
        assert_eq!(t.buddy_addr(base, 15), base + 0x8000);
        assert_eq!(t.buddy_addr(base + 0x8000, 15), base);
    }
}

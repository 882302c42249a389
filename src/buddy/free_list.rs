//! Per-order free lists threaded through the page table
//!
//! A list only keeps its head and length; the links live in the page
//! descriptors, so every member is a page index into the shared table.

#[cfg(feature = "log")]
use log::error;

use super::page_table::PageTable;

/// Intrusive free list of page indices
#[derive(Debug, Clone, Copy)]
pub struct FreeList {
    head: Option<usize>,
    len: usize,
}

impl FreeList {
    /// Create a new empty free list
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Push page `idx` to the front of the list
    pub fn push(&mut self, table: &mut PageTable, idx: usize) {
        let old_head = self.head;
        {
            let page = table.descriptor_mut(idx);
            page.prev = None;
            page.next = old_head;
        }
        if let Some(head) = old_head {
            table.descriptor_mut(head).prev = Some(idx);
        }
        self.head = Some(idx);
        self.len += 1;
    }

    /// Pop the most recently pushed page
    pub fn pop(&mut self, table: &mut PageTable) -> Option<usize> {
        let idx = self.head?;
        self.unlink(table, idx);
        Some(idx)
    }

    /// Remove a specific page known to be on this list
    pub fn remove(&mut self, table: &mut PageTable, idx: usize) -> bool {
        let page = table.descriptor(idx);
        if page.prev.is_none() && self.head != Some(idx) {
            error!("page {} is not on this free list", idx);
            return false;
        }
        self.unlink(table, idx);
        true
    }

    fn unlink(&mut self, table: &mut PageTable, idx: usize) {
        let (prev, next) = {
            let page = table.descriptor_mut(idx);
            let links = (page.prev, page.next);
            page.prev = None;
            page.next = None;
            links
        };

        match prev {
            Some(prev) => table.descriptor_mut(prev).next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            table.descriptor_mut(next).prev = prev;
        }
        self.len -= 1;
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the length of the list
    pub fn len(&self) -> usize {
        self.len
    }

    /// Get iterator over member page indices
    pub fn iter<'a>(&self, table: &'a PageTable) -> FreeListIter<'a> {
        FreeListIter {
            table,
            current: self.head,
        }
    }

    /// Forget all members without touching the table
    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator for FreeList
pub struct FreeListIter<'a> {
    table: &'a PageTable,
    current: Option<usize>,
}

impl Iterator for FreeListIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        self.current = self.table.descriptor(idx).next;
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const TEST_PAGE_COUNT: usize = 64;

    fn new_table() -> PageTable {
        let mut table = PageTable::new();
        table.init(TEST_PAGE_COUNT);
        table
    }

    #[test]
    fn test_free_list_basic() {
        let mut table = new_table();
        let mut list = FreeList::new();

        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.pop(&mut table), None);

        list.push(&mut table, 1);
        list.push(&mut table, 2);
        list.push(&mut table, 3);
        assert_eq!(list.len(), 3);

        // Most recently pushed comes out first
        assert_eq!(list.pop(&mut table), Some(3));
        assert_eq!(list.pop(&mut table), Some(2));
        assert_eq!(list.len(), 1);

        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_by_identity() {
        let mut table = new_table();
        let mut list = FreeList::new();

        for idx in [8, 16, 24, 32] {
            list.push(&mut table, idx);
        }

        // middle
        assert!(list.remove(&mut table, 16));
        let items: Vec<_> = list.iter(&table).collect();
        assert_eq!(items, [32, 24, 8]);

        // head
        assert!(list.remove(&mut table, 32));
        // tail
        assert!(list.remove(&mut table, 8));
        let items: Vec<_> = list.iter(&table).collect();
        assert_eq!(items, [24]);
        assert_eq!(list.len(), 1);

        assert_eq!(list.pop(&mut table), Some(24));
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_non_member() {
        let mut table = new_table();
        let mut list = FreeList::new();
        list.push(&mut table, 5);

        assert!(!list.remove(&mut table, 6));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_lists_share_one_table() {
        let mut table = new_table();
        let mut small = FreeList::new();
        let mut large = FreeList::new();

        small.push(&mut table, 1);
        large.push(&mut table, 2);
        small.push(&mut table, 3);

        assert!(small.remove(&mut table, 1));
        let items: Vec<_> = small.iter(&table).collect();
        assert_eq!(items, [3]);
        let items: Vec<_> = large.iter(&table).collect();
        assert_eq!(items, [2]);
    }
}

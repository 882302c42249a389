//! Page metadata table
//!
//! One descriptor per minimum-size page. Only the descriptor of the page
//! heading a block carries meaning; the pages it covers stay `Unowned`.
//! Free-list links are stored in the descriptors themselves, so lists are
//! chains of page indices into this table.

use alloc::vec::Vec;

/// State of the block headed by a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// The page heads no block.
    Unowned,
    /// The page heads a free block sitting on the free list of its order.
    Free,
    /// The page heads a block handed out to a caller.
    Allocated,
}

/// Per-page metadata
#[derive(Debug, Clone, Copy)]
pub struct PageDescriptor {
    /// Order of the headed block. Only meaningful when not `Unowned`.
    pub order: usize,
    pub state: PageState,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl PageDescriptor {
    pub const fn unowned() -> Self {
        Self {
            order: 0,
            state: PageState::Unowned,
            prev: None,
            next: None,
        }
    }

    /// Whether this page heads a free block of exactly `order`
    pub fn is_free_at(&self, order: usize) -> bool {
        self.state == PageState::Free && self.order == order
    }

    pub fn is_allocated(&self) -> bool {
        self.state == PageState::Allocated
    }

    pub(crate) fn mark_free(&mut self, order: usize) {
        self.order = order;
        self.state = PageState::Free;
    }

    pub(crate) fn mark_allocated(&mut self, order: usize) {
        self.order = order;
        self.state = PageState::Allocated;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::unowned();
    }
}

impl Default for PageDescriptor {
    fn default() -> Self {
        Self::unowned()
    }
}

/// Fixed table of page descriptors
pub struct PageTable {
    pages: Vec<PageDescriptor>,
}

impl PageTable {
    /// Create an empty table (must call init())
    pub const fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Size the table to `page_count` descriptors, all `Unowned`
    pub fn init(&mut self, page_count: usize) {
        self.pages.clear();
        self.pages.resize(page_count, PageDescriptor::unowned());
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Descriptor of page `index`.
    ///
    /// Panics on an out-of-range index; the engine never produces one.
    #[inline]
    pub fn descriptor(&self, index: usize) -> &PageDescriptor {
        &self.pages[index]
    }

    #[inline]
    pub fn descriptor_mut(&mut self, index: usize) -> &mut PageDescriptor {
        &mut self.pages[index]
    }

    /// Number of pages currently heading an allocated block
    pub fn allocated_heads(&self) -> usize {
        self.pages.iter().filter(|p| p.is_allocated()).count()
    }

    /// Iterate over `(page_index, descriptor)` for every page heading a block
    pub fn heads(&self) -> impl Iterator<Item = (usize, &PageDescriptor)> + '_ {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state != PageState::Unowned)
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

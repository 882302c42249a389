//! Lock-guarded buddy allocator.
//!
//! Puts the whole allocator behind one spin lock so every `alloc`/`dealloc`
//! runs as a single critical section, and exposes it as a `GlobalAlloc`.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use kspin::SpinNoIrq;

#[cfg(feature = "log")]
use log::error;

use super::buddy::{BuddyAllocator, DumpReport};
use crate::{AllocError, AllocResult, ByteAllocator};

/// Buddy allocator shared between execution contexts
pub struct LockedBuddyAllocator<
    const MIN_ORDER: usize = { crate::DEFAULT_MIN_ORDER },
    const MAX_ORDER: usize = { crate::DEFAULT_MAX_ORDER },
> {
    inner: SpinNoIrq<BuddyAllocator<MIN_ORDER, MAX_ORDER>>,
    initialized: AtomicBool,
}

impl<const MIN_ORDER: usize, const MAX_ORDER: usize> LockedBuddyAllocator<MIN_ORDER, MAX_ORDER> {
    pub const fn new() -> Self {
        Self {
            inner: SpinNoIrq::new(BuddyAllocator::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Initialize allocator with the arena at `base_addr`
    ///
    /// See [`BuddyAllocator::init`] for the requirements on the arena.
    pub fn init(&self, base_addr: usize) {
        self.inner.lock().init(base_addr);
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn alloc(&self, size: usize) -> AllocResult<usize> {
        if !self.is_initialized() {
            error!("locked buddy allocator: allocator not initialized");
            return Err(AllocError::OutOfMemory);
        }
        self.inner.lock().alloc(size)
    }

    pub fn dealloc(&self, addr: usize) -> AllocResult {
        self.inner.lock().dealloc(addr)
    }

    pub fn dump(&self) -> DumpReport {
        self.inner.lock().dump()
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used_bytes()
    }

    pub fn available_bytes(&self) -> usize {
        self.inner.lock().available_bytes()
    }

    /// Run `f` with exclusive access to the allocator
    pub fn with<R>(&self, f: impl FnOnce(&mut BuddyAllocator<MIN_ORDER, MAX_ORDER>) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

impl<const MIN_ORDER: usize, const MAX_ORDER: usize> Default
    for LockedBuddyAllocator<MIN_ORDER, MAX_ORDER>
{
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const MIN_ORDER: usize, const MAX_ORDER: usize> GlobalAlloc
    for LockedBuddyAllocator<MIN_ORDER, MAX_ORDER>
{
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !self.is_initialized() {
            return core::ptr::null_mut();
        }
        match ByteAllocator::alloc(&mut *self.inner.lock(), layout) {
            Ok(ptr) => ptr.as_ptr(),
            Err(_) => core::ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Some(pos) = NonNull::new(ptr) else {
            return;
        };
        if let Err(_e) = ByteAllocator::dealloc(&mut *self.inner.lock(), pos, layout) {
            error!(
                "locked buddy allocator: dealloc {:p} ({:?}) failed: {}",
                ptr, layout, _e
            );
        }
    }
}

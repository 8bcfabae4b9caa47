//! Optional `#[global_allocator]` integration, gated behind the `global`
//! feature.
//!
//! `GlobalTagHeap<P>` wraps a `Heap<P>` in a `spin::Mutex` and implements
//! `GlobalAlloc`, translating `Layout` into the four core entry points. Only
//! 16-byte-or-weaker alignment requests are honoured; anything stricter is
//! refused with null rather than silently under-aligned.

use core::alloc::{GlobalAlloc, Layout};

use spin::Mutex;

use crate::config::ALIGNMENT;
use crate::heap::Heap;
use crate::provider::MemoryProvider;

/// A `Heap<P>` behind a spinlock, suitable for `#[global_allocator]`.
///
/// Built, not initialized: construct with [`GlobalTagHeap::new`] from a
/// `P`, then install it. Bootstrap runs lazily on first allocation, same
/// as the unwrapped `Heap`.
pub struct GlobalTagHeap<P: MemoryProvider> {
    inner: Mutex<Heap<P>>,
}

impl<P: MemoryProvider> GlobalTagHeap<P> {
    pub const fn new(provider: P) -> Self {
        Self {
            inner: Mutex::new(Heap::new(provider)),
        }
    }
}

// SAFETY: every entry point takes the lock before touching the heap; no
// method leaves it in an inconsistent state if it returns.
unsafe impl<P: MemoryProvider + Send> GlobalAlloc for GlobalTagHeap<P> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            log::warn!(
                "tagheap: GlobalAlloc request for {}-byte alignment exceeds the {}-byte ceiling",
                layout.align(),
                ALIGNMENT
            );
            return core::ptr::null_mut();
        }
        self.inner.lock().allocate(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.inner.lock().free(ptr);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return core::ptr::null_mut();
        }
        self.inner.lock().reallocate(ptr, new_size)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return core::ptr::null_mut();
        }
        self.inner.lock().zero_allocate(1, layout.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VecProvider;

    #[test]
    fn alloc_and_dealloc_round_trip() {
        let heap = GlobalTagHeap::new(VecProvider::new(1 << 16));
        let layout = Layout::from_size_align(64, 16).unwrap();
        unsafe {
            let p = heap.alloc(layout);
            assert!(!p.is_null());
            assert_eq!((p as usize) % 16, 0);
            heap.dealloc(p, layout);
        }
    }

    #[test]
    fn alloc_refuses_overaligned_requests() {
        let heap = GlobalTagHeap::new(VecProvider::new(1 << 16));
        let layout = Layout::from_size_align(64, 64).unwrap();
        unsafe {
            assert!(heap.alloc(layout).is_null());
        }
    }
}

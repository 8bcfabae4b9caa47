// =============================================================================
// tagheap — Heap Bootstrap, Extension & Public API
// =============================================================================
//
// `Heap<P>` owns the managed region: the prologue/epilogue sentinels, the
// segregated free-list index, and a handle to the `MemoryProvider` that
// supplies backing bytes. Every public entry point (`allocate`, `free`,
// `reallocate`, `zero_allocate`) is thin orchestration over the lower-level
// modules — codec, block cursor, free-list index, coalescer, split policy,
// fit search — each of which stays ignorant of the others' existence.
//
// TAGGED BLOCK STATES
//   A block is either allocated (no footer, no list links, payload valid)
//   or free (footer present, list links valid, no payload). Both states
//   share the same eight bytes of storage starting at `payload_of(addr)`;
//   which interpretation applies is determined entirely by the `alloc` bit
//   in the header. This module never materializes a Rust enum for that —
//   the on-heap bytes themselves are the sum type, read by whichever view
//   (`block`, `list`) the caller asks for, and that's only ever correct
//   because callers never ask for the list-link view of an allocated block.
//
// THREAD SAFETY
//   None. `Heap<P>` assumes a single, serialized caller. See `global.rs`
//   for an opt-in synchronized wrapper suitable for `#[global_allocator]`.
// =============================================================================

use core::ptr;

use crate::block;
use crate::codec;
use crate::coalesce;
use crate::config::{CHUNK_SIZE, MIN_BLOCK_SIZE};
use crate::fit;
use crate::list::FreeLists;
use crate::provider::MemoryProvider;

/// A boundary-tag segregated free-list heap over a `MemoryProvider`.
pub struct Heap<P: MemoryProvider> {
    provider: P,
    lists: FreeLists,
    /// Address of the prologue word; also the address of the first real
    /// block once one exists.
    heap_start: usize,
    /// Address of the current epilogue word (one past the last block).
    top: usize,
    initialized: bool,
}

impl<P: MemoryProvider> Heap<P> {
    /// Creates an uninitialized heap. `bootstrap` runs lazily on first use
    /// (mirroring the C malloc family's lazy-init convention); call
    /// [`Heap::bootstrap`] directly if you want init failures surfaced
    /// eagerly instead.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            lists: FreeLists::new(),
            heap_start: 0,
            top: 0,
            initialized: false,
        }
    }

    /// Establishes the prologue/epilogue sentinels and a single initial
    /// free chunk. Idempotent: a second call is a no-op returning `true`.
    ///
    /// Returns `false` if the provider can't supply the initial sentinel
    /// words or the first chunk.
    pub fn bootstrap(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        let sentinels = match self.provider.extend(16) {
            Some(addr) => addr,
            None => {
                log::warn!("tagheap: provider refused the initial 16 sentinel bytes");
                return false;
            }
        };

        // SAFETY: the provider just handed back 16 fresh, writable bytes.
        unsafe {
            block::set_header_at(sentinels, codec::pack(0, true, true)); // prologue
            block::set_header_at(sentinels + 8, codec::pack(0, true, true)); // epilogue
        }

        self.heap_start = sentinels + 8;
        self.top = self.heap_start;
        self.initialized = true;

        if self.extend(CHUNK_SIZE).is_none() {
            log::warn!("tagheap: provider refused the initial {CHUNK_SIZE}-byte chunk");
            self.initialized = false;
            return false;
        }

        log::debug!("tagheap: bootstrapped, heap_start={:#x}", self.heap_start);
        true
    }

    /// Grows the managed region by at least `n` bytes, installing a new
    /// free block and coalescing it with whatever free block previously
    /// sat at the top of the heap.
    ///
    /// Per §4.7 step 3, the new block's header reuses the word the old
    /// epilogue occupied (`self.top`) rather than living at whatever fresh
    /// address the provider hands back — the provider only owns the bytes
    /// *past* that word, since the word itself was already granted by a
    /// prior `extend`/bootstrap call.
    ///
    /// Returns the address of the block actually inserted (pre-coalesce),
    /// or `None` if the provider can't grow.
    fn extend(&mut self, n: usize) -> Option<usize> {
        let n = round_up(n, 16);
        // The epilogue about to be overwritten still carries an accurate
        // prev_alloc bit for whatever block currently sits at the top —
        // true for the first call (bootstrap's prologue) and true for
        // every later one (the bit `coalesce` maintains on each free/extend).
        let prev_alloc = codec::prev_alloc_of(unsafe { block::header_at(self.top) });

        let block_addr = self.top;
        let addr = self.provider.extend(n)?;
        debug_assert_eq!(
            addr,
            block_addr + crate::config::WORD_SIZE,
            "MemoryProvider::extend must grow contiguously immediately past the reused epilogue word"
        );

        // SAFETY: the old epilogue word at `block_addr` is reused as the
        // new block's header; the provider just handed back `n` fresh,
        // writable bytes starting at `block_addr + WORD_SIZE`, covering the
        // rest of the block's body/footer and room for the new epilogue
        // word (accounted for by the provider's bookkeeping — callers size
        // their requests accordingly).
        unsafe {
            block::write_free_block(block_addr, n, prev_alloc);
            let new_epilogue = block_addr + n;
            block::set_header_at(new_epilogue, codec::pack(0, true, false));
            self.top = new_epilogue;

            coalesce::coalesce(&mut self.lists, self.heap_start, block_addr);
        }

        log::debug!("tagheap: extended by {n} bytes at {block_addr:#x}");
        Some(block_addr)
    }

    /// Allocates `requested_size` bytes, returning a 16-byte-aligned
    /// payload pointer or null.
    pub fn allocate(&mut self, requested_size: usize) -> *mut u8 {
        if requested_size == 0 {
            return ptr::null_mut();
        }
        if !self.initialized && !self.bootstrap() {
            return ptr::null_mut();
        }

        let adjusted = core::cmp::max(MIN_BLOCK_SIZE, round_up(requested_size + 8, 16));

        let mut found = fit::find_fit(&self.lists, adjusted);
        if found.is_none() {
            if self.extend(core::cmp::max(adjusted, CHUNK_SIZE)).is_none() {
                log::warn!("tagheap: allocate({requested_size}) failed: provider exhausted");
                return ptr::null_mut();
            }
            found = fit::find_fit(&self.lists, adjusted);
        }

        let Some(block_addr) = found else {
            // The heap just grew by at least `adjusted` bytes; a fit must
            // exist unless something upstream is inconsistent.
            log::error!("tagheap: extend succeeded but no fit found for {adjusted} bytes");
            return ptr::null_mut();
        };

        // SAFETY: `block_addr` came from the free-list, so it is a
        // well-formed free block; we own the only reference to it.
        unsafe {
            let block_size = codec::size_of_word(block::header_at(block_addr));
            self.lists.remove(block_addr, block_size);
            crate::split::split(&mut self.lists, block_addr, block_size, adjusted);
            block::payload_of(block_addr) as *mut u8
        }
    }

    /// Frees a previously allocated payload. `ptr == null` is a no-op.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let addr = block::header_of_payload(ptr as usize);

        // SAFETY: caller contract — `ptr` came from a prior `allocate` /
        // `reallocate` / `zero_allocate` call on this heap and hasn't been
        // freed already (double free is documented undefined behavior).
        unsafe {
            let header = block::header_at(addr);
            let size = codec::size_of_word(header);
            let prev_alloc = codec::prev_alloc_of(header);
            block::write_free_block(addr, size, prev_alloc);
            coalesce::coalesce(&mut self.lists, self.heap_start, addr);
        }
    }

    /// Resizes an allocation, preserving the lesser of the old and new
    /// payload's worth of bytes. `new_size == 0` behaves like `free`;
    /// `ptr == null` behaves like `allocate`.
    pub fn reallocate(&mut self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        if new_size == 0 {
            self.free(ptr);
            return ptr::null_mut();
        }
        if ptr.is_null() {
            return self.allocate(new_size);
        }

        let new_ptr = self.allocate(new_size);
        if new_ptr.is_null() {
            return ptr::null_mut();
        }

        let old_addr = block::header_of_payload(ptr as usize);
        // SAFETY: `ptr` names a live allocation on this heap (caller
        // contract); its header is readable without synchronization.
        let old_block_size = codec::size_of_word(unsafe { block::header_at(old_addr) });
        let old_payload_size = old_block_size - 8;
        let copy_len = core::cmp::min(old_payload_size, new_size);

        // SAFETY: `ptr` and `new_ptr` name `copy_len` readable/writable
        // bytes each, and — because `allocate` never hands back a block
        // still linked into the free list — they cannot overlap.
        unsafe {
            ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
        }

        self.free(ptr);
        new_ptr
    }

    /// Allocates space for `count` elements of `elem_size` bytes each,
    /// zero-initialized. Overflow in `count * elem_size` yields null.
    pub fn zero_allocate(&mut self, count: usize, elem_size: usize) -> *mut u8 {
        if count == 0 || elem_size == 0 {
            return ptr::null_mut();
        }
        let Some(total) = count.checked_mul(elem_size) else {
            log::warn!("tagheap: zero_allocate({count}, {elem_size}) overflowed");
            return ptr::null_mut();
        };

        let ptr = self.allocate(total);
        if !ptr.is_null() {
            // SAFETY: `allocate` just handed back `total` writable bytes.
            unsafe {
                ptr::write_bytes(ptr, 0, total);
            }
        }
        ptr
    }

    /// Address of the prologue / first real block. `0` before bootstrap.
    pub(crate) fn heap_start(&self) -> usize {
        self.heap_start
    }

    /// Address of the current epilogue.
    pub(crate) fn top(&self) -> usize {
        self.top
    }

    pub(crate) fn lists(&self) -> &FreeLists {
        &self.lists
    }

    /// Whether `bootstrap` has run successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Walks the heap and free lists, checking every consistency invariant.
    /// Cheap enough to call after every operation in a test or debug build;
    /// not called automatically on any hot path.
    pub fn check(&self) -> Result<(), crate::check::Violation> {
        if !self.initialized {
            return Ok(());
        }
        crate::check::walk(&self.lists, self.heap_start, self.top)
    }

    /// Like [`Heap::check`], but panics with the violation on failure.
    pub fn debug_assert_consistent(&self) {
        if let Err(violation) = self.check() {
            panic!("tagheap consistency check failed: {violation:?}");
        }
    }
}

/// Rounds `size` up to the next multiple of `n`. `n` must be a power of two.
#[inline]
fn round_up(size: usize, n: usize) -> usize {
    (size + n - 1) & !(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VecProvider;

    fn new_heap(capacity: usize) -> Heap<VecProvider> {
        Heap::new(VecProvider::new(capacity))
    }

    #[test]
    fn bootstrap_then_allocate_one_byte() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(1);
        assert!(!p.is_null());
        assert_eq!((p as usize) % 16, 0);
    }

    #[test]
    fn allocate_zero_returns_null() {
        let mut heap = new_heap(1 << 16);
        assert!(heap.allocate(0).is_null());
    }

    #[test]
    fn free_then_allocate_may_reuse_same_address() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(64);
        heap.free(p);
        let q = heap.allocate(64);
        assert!(!q.is_null());
        assert_eq!(p, q);
    }

    #[test]
    fn realloc_grow_preserves_leading_bytes() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(64);
        assert!(!p.is_null());
        unsafe {
            ptr::write_bytes(p, 0xA5, 64);
        }
        let q = heap.reallocate(p, 1024);
        assert!(!q.is_null());
        let bytes = unsafe { core::slice::from_raw_parts(q, 64) };
        assert!(bytes.iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn realloc_to_zero_frees_and_returns_null() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(64);
        let q = heap.reallocate(p, 0);
        assert!(q.is_null());
    }

    #[test]
    fn realloc_null_behaves_like_allocate() {
        let mut heap = new_heap(1 << 16);
        let q = heap.reallocate(ptr::null_mut(), 64);
        assert!(!q.is_null());
    }

    #[test]
    fn zero_allocate_contents_are_zero() {
        let mut heap = new_heap(1 << 16);
        let p = heap.zero_allocate(16, 8);
        assert!(!p.is_null());
        let bytes = unsafe { core::slice::from_raw_parts(p, 128) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_allocate_overflow_returns_null() {
        let mut heap = new_heap(1 << 16);
        assert!(heap.zero_allocate(usize::MAX, 2).is_null());
    }

    #[test]
    fn zero_allocate_zero_count_or_size_returns_null() {
        let mut heap = new_heap(1 << 16);
        assert!(heap.zero_allocate(0, 8).is_null());
        assert!(heap.zero_allocate(8, 0).is_null());
    }

    #[test]
    fn free_null_is_a_no_op() {
        let mut heap = new_heap(1 << 16);
        heap.free(ptr::null_mut());
    }
}

//! Coalescer: merges a just-freed block with adjacent free neighbours on
//! the heap.
//!
//! Called eagerly every time a block is freed and every time the heap is
//! extended (the new free block might abut a free block that was already
//! at the old top of the heap). Four cases, keyed by whether the heap
//! neighbours on either side are themselves free.

use crate::block;
use crate::codec;
use crate::list::FreeLists;

/// Merges `addr` (a block already written as free, header and footer, with
/// its `prev_alloc` bit correctly reflecting the predecessor) with any
/// free heap neighbours, and inserts the surviving block into `lists`.
///
/// `heap_high` is the provider's current `high()` — used to recognise the
/// epilogue boundary (an extension or bootstrap may place the epilogue at
/// a size-0 sentinel right past `heap_high`).
///
/// Returns the address of the surviving block — itself, or whichever
/// absorbed neighbour became the new combined block's header.
///
/// # Safety
/// `addr` must be a properly-formed free block (header == footer) whose
/// `prev_alloc` bit is accurate, and not already present on any free list.
pub unsafe fn coalesce(lists: &mut FreeLists, heap_start: usize, addr: usize) -> usize {
    let header = block::header_at(addr);
    let size = codec::size_of_word(header);

    let prev_alloc = if addr == heap_start {
        // The prologue sentinel is always allocated; nothing to read.
        true
    } else {
        codec::prev_alloc_of(header)
    };

    let next_addr = block::next_on_heap(addr);
    let next_header = block::header_at(next_addr);
    // A size-0 header is the epilogue: always treated as allocated.
    let next_alloc = codec::size_of_word(next_header) == 0 || codec::alloc_of(next_header);

    let survivor = match (prev_alloc, next_alloc) {
        (true, true) => {
            lists.insert(addr, size);
            addr
        }
        (true, false) => {
            let next_size = codec::size_of_word(next_header);
            lists.remove(next_addr, next_size);
            let combined = size + next_size;
            block::write_free_block(addr, combined, true);
            lists.insert(addr, combined);
            addr
        }
        (false, true) => {
            let prev_addr = block::prev_on_heap(addr);
            let prev_size = codec::size_of_word(block::header_at(prev_addr));
            lists.remove(prev_addr, prev_size);
            let combined = prev_size + size;
            let prev_prev_alloc = codec::prev_alloc_of(block::header_at(prev_addr));
            block::write_free_block(prev_addr, combined, prev_prev_alloc);
            lists.insert(prev_addr, combined);
            prev_addr
        }
        (false, false) => {
            let prev_addr = block::prev_on_heap(addr);
            let prev_size = codec::size_of_word(block::header_at(prev_addr));
            let next_size = codec::size_of_word(next_header);
            lists.remove(prev_addr, prev_size);
            lists.remove(next_addr, next_size);
            let combined = prev_size + size + next_size;
            let prev_prev_alloc = codec::prev_alloc_of(block::header_at(prev_addr));
            block::write_free_block(prev_addr, combined, prev_prev_alloc);
            lists.insert(prev_addr, combined);
            prev_addr
        }
    };

    // The block immediately after the survivor must record that its
    // predecessor is now free.
    let survivor_size = codec::size_of_word(block::header_at(survivor));
    let after = survivor + survivor_size;
    let after_header = block::header_at(after);
    block::set_header_at(after, codec::set_prev_alloc(after_header, false));

    survivor
}

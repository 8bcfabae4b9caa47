//! Consistency checker: walks the heap and the free lists, confirming every
//! invariant the rest of the crate relies on actually holds.
//!
//! Never called from the hot allocate/free paths. Intended for debug builds,
//! tests, and an opt-in panic-on-violation helper (`Heap::debug_assert_consistent`).
//! Runs in O(blocks + list nodes) time with no heap allocation of its own —
//! every check is a forward walk or a bounded linear list scan.

use crate::block;
use crate::codec;
use crate::list::FreeLists;

/// A single invariant violation, with enough context to diagnose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A payload address was not 16-byte aligned.
    Alignment { addr: usize },
    /// A block's size was not a multiple of 16, or fell below the minimum.
    BadSize { addr: usize, size: usize },
    /// A free block's header and footer words disagreed.
    TagMismatch { addr: usize },
    /// A block's `prev_alloc` bit disagreed with its predecessor's `alloc` bit.
    PrevAllocMismatch { addr: usize },
    /// Two heap-adjacent blocks were both free (should have been coalesced).
    AdjacentFree { addr: usize },
    /// The set of free blocks found walking the heap didn't match the set
    /// found walking the free lists.
    ListMismatch,
    /// A list node's forward/backward links didn't agree with its neighbour.
    ListLinkBroken { addr: usize },
    /// A list node's size fell outside the range of the class it's filed under.
    ClassContainment { addr: usize, class: usize },
}

/// Walks the heap from the prologue to the epilogue and every free list,
/// checking every invariant in one pass. Returns the first violation found.
pub fn walk(lists: &FreeLists, heap_start: usize, top: usize) -> Result<(), Violation> {
    check_heap_walk(lists, heap_start, top)?;
    check_lists(lists)?;
    Ok(())
}

fn check_heap_walk(lists: &FreeLists, heap_start: usize, top: usize) -> Result<(), Violation> {
    let mut addr = heap_start;
    let mut prev_was_alloc = true; // the prologue is always allocated
    let mut free_blocks_on_heap = 0usize;

    while addr < top {
        // SAFETY: `addr` stays within [heap_start, top) by the loop bound,
        // and every step advances by exactly one block's size, which this
        // same invariant check confirms is sane before we trust it.
        let header = unsafe { block::header_at(addr) };
        let size = codec::size_of_word(header);
        let alloc = codec::alloc_of(header);
        let prev_alloc = codec::prev_alloc_of(header);

        let payload = block::payload_of(addr);
        if payload % 16 != 0 {
            return Err(Violation::Alignment { addr: payload });
        }
        if size % 16 != 0 || size < crate::config::MIN_BLOCK_SIZE {
            return Err(Violation::BadSize { addr, size });
        }
        if prev_alloc != prev_was_alloc {
            return Err(Violation::PrevAllocMismatch { addr });
        }

        if !alloc {
            // SAFETY: a free block always carries a footer at this offset.
            let footer = unsafe { block::footer_at(addr, size) };
            if footer != header {
                return Err(Violation::TagMismatch { addr });
            }

            let next_addr = addr + size;
            if next_addr < top {
                // SAFETY: `next_addr` is still within the managed region.
                let next_header = unsafe { block::header_at(next_addr) };
                if !codec::alloc_of(next_header) {
                    return Err(Violation::AdjacentFree { addr });
                }
            }

            let class = FreeLists::class_of(size);
            if !lists.contains(class, addr) {
                return Err(Violation::ListMismatch);
            }
            free_blocks_on_heap += 1;
        }

        prev_was_alloc = alloc;
        addr += size;
    }

    let total_list_nodes: usize = (0..crate::config::NUM_SIZE_CLASSES)
        .map(|class| lists.iter(class).count())
        .sum();
    if total_list_nodes != free_blocks_on_heap {
        return Err(Violation::ListMismatch);
    }

    Ok(())
}

fn check_lists(lists: &FreeLists) -> Result<(), Violation> {
    for class in 0..crate::config::NUM_SIZE_CLASSES {
        for addr in lists.iter(class) {
            // SAFETY: `addr` was just yielded by iterating this class's
            // list, so it is a live free-block node.
            let header = unsafe { block::header_at(addr) };
            let size = codec::size_of_word(header);
            if FreeLists::class_of(size) != class {
                return Err(Violation::ClassContainment { addr, class });
            }

            // SAFETY: same as above.
            let (prev, next) = unsafe { FreeLists::raw_links(addr) };
            if next != 0 {
                // SAFETY: `next` is a node of the same list.
                let (next_prev, _) = unsafe { FreeLists::raw_links(next) };
                if next_prev != addr {
                    return Err(Violation::ListLinkBroken { addr });
                }
            }
            if prev != 0 {
                // SAFETY: `prev` is a node of the same list.
                let (_, prev_next) = unsafe { FreeLists::raw_links(prev) };
                if prev_next != addr {
                    return Err(Violation::ListLinkBroken { addr });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::test_support::VecProvider;

    fn new_heap(capacity: usize) -> Heap<VecProvider> {
        Heap::new(VecProvider::new(capacity))
    }

    #[test]
    fn fresh_allocation_passes_every_check() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(1);
        assert!(!p.is_null());
        assert!(heap.check().is_ok());
    }

    #[test]
    fn free_then_coalesce_passes_every_check() {
        let mut heap = new_heap(1 << 16);
        let a = heap.allocate(256);
        let b = heap.allocate(256);
        let c = heap.allocate(256);
        heap.free(a);
        heap.free(c);
        heap.free(b);
        assert!(heap.check().is_ok());
    }

    #[test]
    fn detects_tampered_header_as_bad_size() {
        let mut heap = new_heap(1 << 16);
        let p = heap.allocate(64);
        let addr = block::header_of_payload(p as usize);
        unsafe {
            // Corrupt the size field directly, bypassing the codec.
            let header = block::header_at(addr);
            block::set_header_at(addr, (header & 0xF) | (17 << 4));
        }
        assert!(matches!(
            heap.check(),
            Err(Violation::BadSize { .. })
        ));
    }
}

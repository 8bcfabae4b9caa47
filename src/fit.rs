//! Fit search: locate a free block of at least a requested size.
//!
//! Bounded best-fit over segregated lists: starting at the
//! requested size's own class, scan each class in turn; within a class,
//! track the smallest sufficient block seen, capping the scan at
//! [`FIT_SEARCH_CAP`] nodes. If the cap is hit before a candidate turns up,
//! settle for the first fit found beyond the cap rather than scanning the
//! rest of a (potentially very long) list. Ties go to the first-encountered
//! block in list order.

use crate::block;
use crate::codec;
use crate::config::{FIT_SEARCH_CAP, NUM_SIZE_CLASSES};
use crate::list::FreeLists;

/// Returns the address of a free block of size `>= requested`, or `None`
/// if no class has one.
pub fn find_fit(lists: &FreeLists, requested: usize) -> Option<usize> {
    let start_class = FreeLists::class_of(requested);

    for class in start_class..NUM_SIZE_CLASSES {
        let mut best: Option<(usize, usize)> = None; // (addr, size)
        let mut first_fit_beyond_cap: Option<usize> = None;

        for (scanned, addr) in lists.iter(class).enumerate() {
            if scanned >= FIT_SEARCH_CAP {
                if best.is_some() {
                    break;
                }
                let size = codec::size_of_word(unsafe { block::header_at(addr) });
                if size >= requested {
                    first_fit_beyond_cap = Some(addr);
                    break;
                }
                continue;
            }
            let size = codec::size_of_word(unsafe { block::header_at(addr) });
            if size < requested {
                continue;
            }
            best = Some(match best {
                Some((best_addr, best_size)) if best_size <= size => (best_addr, best_size),
                _ => (addr, size),
            });
        }

        if let Some((addr, _)) = best {
            return Some(addr);
        }
        if let Some(addr) = first_fit_beyond_cap {
            return Some(addr);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VecProvider;

    #[test]
    fn prefers_best_fit_over_head_of_list() {
        let provider = VecProvider::new(4096);
        let base = provider.low();
        let mut lists = FreeLists::new();
        let sizes = [256usize, 272, 288];
        let mut addr = base;
        unsafe {
            for &size in &sizes {
                block::write_free_block(addr, size, true);
                lists.insert(addr, size);
                addr += size;
            }
        }
        // Insertion order means 288 is the list head (LIFO); best fit for
        // 256 must still pick the 256-byte block.
        let chosen = find_fit(&lists, 256).unwrap();
        let chosen_size = codec::size_of_word(unsafe { block::header_at(chosen) });
        assert_eq!(chosen_size, 256);
    }

    #[test]
    fn falls_through_to_next_nonempty_class() {
        let provider = VecProvider::new(4096);
        let base = provider.low();
        let mut lists = FreeLists::new();
        unsafe {
            block::write_free_block(base, 128, true);
            lists.insert(base, 128);
        }
        // Requesting something in class_of(256)'s range with nothing
        // there should fall through to class 2 (128-byte blocks) — wait,
        // class_of(256) starts searching at class 3; class 2 (128..256)
        // is *before* the start class and is never visited. Request
        // something whose own class is empty but a later class has a fit.
        let found = find_fit(&lists, 32);
        // class_of(32) = 0, scans up through class containing our 128 block.
        assert_eq!(found, Some(base));
    }

    #[test]
    fn returns_none_when_no_class_has_a_fit() {
        let lists = FreeLists::new();
        assert_eq!(find_fit(&lists, 64), None);
    }
}

//! Boundary-tag codec: packs `(size, alloc, prev_alloc)` into a single
//! 64-bit word and back.
//!
//! Every header and footer in the heap is one of these words. The low four
//! bits are free for flags because every size is a multiple of sixteen.
//!
//!   bits 4..63  size, in bytes
//!   bit 1       prev_alloc — the on-heap predecessor is allocated
//!   bit 0       alloc      — this block is allocated

const ALLOC_BIT: u64 = 0b01;
const PREV_ALLOC_BIT: u64 = 0b10;
const SIZE_MASK: u64 = !0b1111;

/// Packs a boundary-tag word.
///
/// # Panics
/// Debug builds assert `size % 16 == 0`; this is a precondition, not a
/// runtime error the caller should plan to hit.
#[inline]
pub fn pack(size: usize, alloc: bool, prev_alloc: bool) -> u64 {
    debug_assert_eq!(size & 0xF, 0, "block size must be a multiple of 16");
    let mut word = size as u64;
    if alloc {
        word |= ALLOC_BIT;
    }
    if prev_alloc {
        word |= PREV_ALLOC_BIT;
    }
    word
}

/// Extracts the size field, clearing the low four flag bits.
#[inline]
pub fn size_of_word(word: u64) -> usize {
    (word & SIZE_MASK) as usize
}

/// Extracts the `alloc` flag.
#[inline]
pub fn alloc_of(word: u64) -> bool {
    word & ALLOC_BIT != 0
}

/// Extracts the `prev_alloc` flag.
#[inline]
pub fn prev_alloc_of(word: u64) -> bool {
    word & PREV_ALLOC_BIT != 0
}

/// Returns `word` with its `prev_alloc` bit set or cleared, all else
/// unchanged.
#[inline]
pub fn set_prev_alloc(word: u64, prev_alloc: bool) -> u64 {
    if prev_alloc {
        word | PREV_ALLOC_BIT
    } else {
        word & !PREV_ALLOC_BIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips_size_and_flags() {
        for &(size, alloc, prev_alloc) in &[
            (32usize, true, true),
            (32, false, false),
            (4096, true, false),
            (16 * 1024, false, true),
        ] {
            let word = pack(size, alloc, prev_alloc);
            assert_eq!(size_of_word(word), size);
            assert_eq!(alloc_of(word), alloc);
            assert_eq!(prev_alloc_of(word), prev_alloc);
        }
    }

    #[test]
    fn set_prev_alloc_preserves_size_and_alloc() {
        let word = pack(256, true, false);
        let updated = set_prev_alloc(word, true);
        assert_eq!(size_of_word(updated), 256);
        assert!(alloc_of(updated));
        assert!(prev_alloc_of(updated));

        let cleared = set_prev_alloc(updated, false);
        assert_eq!(size_of_word(cleared), 256);
        assert!(alloc_of(cleared));
        assert!(!prev_alloc_of(cleared));
    }

    #[test]
    fn zero_size_sentinel_encodes_as_expected() {
        let epilogue = pack(0, true, true);
        assert_eq!(size_of_word(epilogue), 0);
        assert!(alloc_of(epilogue));
        assert!(prev_alloc_of(epilogue));
    }
}

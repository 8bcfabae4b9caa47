//! Block cursor: given a block's address, locate its header, footer,
//! payload, and on-heap neighbours.
//!
//! Every function here is a *view* — it reads or writes the boundary-tag
//! words at computed offsets but never walks further than the one block or
//! word it's asked about. Callers (the coalescer, fit search, heap
//! bootstrap) compose these into algorithms.
//!
//! # Safety
//! All functions take a raw `usize` address and dereference it as a
//! pointer. Callers must ensure `addr` lies within the managed heap region
//! and is word-aligned; these functions perform no bounds checking of their
//! own — the heap's own block-layout invariants are what keep every call
//! site safe.

use crate::codec;

/// Reads the header word at `addr`.
#[inline]
pub unsafe fn header_at(addr: usize) -> u64 {
    *(addr as *const u64)
}

/// Writes the header word at `addr`.
#[inline]
pub unsafe fn set_header_at(addr: usize, word: u64) {
    *(addr as *mut u64) = word;
}

/// Start of the payload: immediately past the header word.
#[inline]
pub fn payload_of(addr: usize) -> usize {
    addr + 8
}

/// Given a payload pointer, recovers the block's header address.
#[inline]
pub fn header_of_payload(payload: usize) -> usize {
    payload - 8
}

/// Address of a free block's footer word (the last 8 bytes of the block).
///
/// # Safety
/// Only free blocks carry a footer; calling this on an allocated block
/// reads whatever bytes happen to sit there.
#[inline]
pub unsafe fn footer_of(addr: usize, size: usize) -> usize {
    addr + size - 8
}

/// Reads a block's footer word.
///
/// # Safety
/// `addr` must be a free block with a valid footer.
#[inline]
pub unsafe fn footer_at(addr: usize, size: usize) -> u64 {
    header_at(footer_of(addr, size))
}

/// Writes both the header and footer of a free block with the same packed
/// word — the defining property that distinguishes a free block from an
/// allocated one.
///
/// # Safety
/// `addr..addr+size` must be valid, writable heap memory.
#[inline]
pub unsafe fn write_free_block(addr: usize, size: usize, prev_alloc: bool) {
    let word = codec::pack(size, false, prev_alloc);
    set_header_at(addr, word);
    set_header_at(footer_of(addr, size), word);
}

/// Writes the header of an allocated block. Allocated blocks carry no
/// footer — payload overhead for an allocated block is just the 8-byte
/// header.
///
/// # Safety
/// `addr` must point to valid, writable heap memory for at least 8 bytes.
#[inline]
pub unsafe fn write_alloc_header(addr: usize, size: usize, prev_alloc: bool) {
    set_header_at(addr, codec::pack(size, true, prev_alloc));
}

/// Address of the next block on the heap, found by stepping past this
/// block's size.
///
/// # Safety
/// `addr` must not be the epilogue (size-0 sentinel); stepping past it
/// leaves the managed region.
#[inline]
pub unsafe fn next_on_heap(addr: usize) -> usize {
    let size = codec::size_of_word(header_at(addr));
    addr + size
}

/// Address of the previous block on the heap, found by reading the footer
/// word that should sit immediately before this block's header.
///
/// # Safety
/// Defined only when this block's `prev_alloc` bit is false — only then
/// does a previous-block footer actually exist to read. Calling this when
/// `prev_alloc` is true reads footer-shaped garbage (most likely the tail
/// of the previous allocated block's payload).
#[inline]
pub unsafe fn prev_on_heap(addr: usize) -> usize {
    let prev_footer_addr = addr - 8;
    let prev_size = codec::size_of_word(header_at(prev_footer_addr));
    addr - prev_size
}

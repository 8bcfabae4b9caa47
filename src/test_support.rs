//! Host-testable memory provider.
//!
//! A provider whose region lives in an ordinary `Vec<u8>`, so the heap can
//! be exercised in a normal `cargo test` run without an OS underneath it —
//! the same role a simulated heap buffer plays in a trace-replay harness
//! for a classic malloc implementation.

extern crate std;

use std::vec;
use std::vec::Vec;

use crate::provider::MemoryProvider;

/// A [`MemoryProvider`] backed by a growable heap-allocated buffer.
///
/// `extend` grows the backing `Vec` and hands back the address of the
/// first newly-available byte. Because `Vec` reallocation would move
/// previously-handed-out addresses (which would corrupt every pointer the
/// allocator under test has already given out), `VecProvider` pre-reserves
/// its full capacity up front and refuses to grow past it rather than
/// reallocate.
pub struct VecProvider {
    buf: Vec<u8>,
    used: usize,
}

impl VecProvider {
    /// Creates a provider with `capacity` bytes reserved (and never moved)
    /// up front. `extend` calls fail once `capacity` is exhausted.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            used: 0,
        }
    }

    /// Total reserved capacity, in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl MemoryProvider for VecProvider {
    fn low(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    fn high(&self) -> usize {
        self.buf.as_ptr() as usize + self.used.saturating_sub(1)
    }

    fn extend(&mut self, nbytes: usize) -> Option<usize> {
        if self.used + nbytes > self.buf.len() {
            return None;
        }
        let addr = self.buf.as_ptr() as usize + self.used;
        self.used += nbytes;
        Some(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_hands_back_contiguous_monotonic_addresses() {
        let mut provider = VecProvider::new(4096);
        let first = provider.extend(256).unwrap();
        let second = provider.extend(256).unwrap();
        assert_eq!(second, first + 256);
    }

    #[test]
    fn extend_fails_past_capacity() {
        let mut provider = VecProvider::new(128);
        assert!(provider.extend(256).is_none());
        assert!(provider.extend(128).is_some());
        assert!(provider.extend(1).is_none());
    }
}

//! Tunable constants for the heap layout and search policy.
//!
//! Centralized here (rather than scattered across modules) so a downstream
//! integrator tuning the allocator for a specific workload edits one file.

/// Every block address and size is a multiple of this many bytes. Also
/// the strongest payload alignment this allocator promises — sixteen
/// bytes, not stronger.
pub const ALIGNMENT: usize = 16;

/// Smallest possible block: header + two list-link pointers, or header +
/// footer, whichever governs. Also the smallest class's lower bound.
pub const MIN_BLOCK_SIZE: usize = 32;

/// Default heap-extension granularity, in bytes. An allocation request
/// larger than this extends by its own adjusted size instead.
pub const CHUNK_SIZE: usize = 4096;

/// Bytes per boundary-tag word (header or footer).
pub const WORD_SIZE: usize = 8;

/// Maximum number of free-list nodes the bounded best-fit search inspects
/// per size class before settling for the best candidate found so far.
pub const FIT_SEARCH_CAP: usize = 50;

/// Number of segregated size classes.
pub const NUM_SIZE_CLASSES: usize = 8;

/// Inclusive lower bound of each size class, indexed by class number.
/// Class `k`'s range is `[SIZE_CLASS_MIN[k], SIZE_CLASS_MIN[k + 1])`, and
/// class 7 (the last) is unbounded above.
pub const SIZE_CLASS_MIN: [usize; NUM_SIZE_CLASSES] =
    [32, 64, 128, 256, 512, 1024, 2048, 4096];

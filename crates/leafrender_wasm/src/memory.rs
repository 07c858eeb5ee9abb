//! Bump allocation over guest linear memory.
//!
//! The host owns a monotonic cursor into the module's exported memory:
//! offsets are handed out in increasing order, nothing is ever freed, and
//! the memory only grows (in whole 64 KiB pages), never shrinks. Guest low
//! memory below [`HEAP_BASE`] (data segments, globals) is never touched.

use wasmtime::{AsContextMut, Memory};

/// WASM page size in bytes
pub const PAGE_SIZE: u64 = 65536;

/// First offset the host allocator will hand out
pub const HEAP_BASE: u32 = 1024;

/// An offset+length handle into guest linear memory.
///
/// Valid only for the call it was allocated for; growth between calls may
/// not relocate data under the bump discipline, but callers must not rely
/// on a handle outliving its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestPtr {
    /// Byte offset within guest memory
    pub offset: u32,
    /// Length of the region in bytes
    pub len: u32,
}

impl GuestPtr {
    /// Create a new handle
    #[must_use]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// The null handle, used for empty payloads
    #[must_use]
    pub const fn null() -> Self {
        Self { offset: 0, len: 0 }
    }

    /// True for the null handle
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.offset == 0 && self.len == 0
    }

    /// End offset (exclusive), widened to avoid overflow
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.len as u64
    }
}

/// Number of whole pages needed to hold `bytes`
#[must_use]
pub fn pages_for(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE)
}

/// Memory-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Zero-size allocations are meaningless at this boundary
    #[error("Zero-size allocation")]
    ZeroSize,

    /// The allocation would run past the 32-bit guest address space
    #[error("Allocation end 0x{end:X} exceeds the 32-bit guest address space")]
    AddressOverflow {
        /// Exclusive end offset of the rejected allocation
        end: u64,
    },

    /// The configured page budget is too small for the allocation
    #[error("Allocation needs {needed} pages, limit is {limit}")]
    PageLimit {
        /// Pages required to satisfy the allocation
        needed: u64,
        /// Configured maximum pages
        limit: u64,
    },

    /// The sandbox refused to supply more pages; unrecoverable for the call
    #[error("Memory growth by {delta} pages failed: {cause}")]
    Grow {
        /// Pages requested from the sandbox
        delta: u64,
        /// Underlying failure
        cause: String,
    },

    /// A read or write fell outside the current memory bounds
    #[error("Byte range {offset}+{len} is outside guest memory of {size} bytes")]
    OutOfBounds {
        /// Start offset of the range
        offset: u32,
        /// Length of the range
        len: u32,
        /// Current memory size in bytes
        size: usize,
    },
}

/// Monotonic bump allocator over a guest memory export.
///
/// Holds no reference to the memory itself; every call takes the store and
/// memory explicitly, so the allocator can live alongside them in the same
/// struct without borrow conflicts.
#[derive(Debug, Clone)]
pub struct BumpAlloc {
    /// Next offset to hand out
    cursor: u32,
    /// Maximum pages the memory may grow to
    max_pages: u64,
}

impl BumpAlloc {
    /// Create an allocator with the given page budget
    #[must_use]
    pub fn new(max_pages: u64) -> Self {
        Self {
            cursor: HEAP_BASE,
            max_pages,
        }
    }

    /// Next offset the allocator would hand out
    #[must_use]
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Total bytes handed out so far
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.cursor as u64 - HEAP_BASE as u64
    }

    /// Hand out `size` bytes, growing the memory first if needed.
    ///
    /// # Errors
    ///
    /// Returns error for zero-size requests, address-space or page-budget
    /// exhaustion, and failed growth.
    pub fn alloc(
        &mut self,
        mut store: impl AsContextMut,
        memory: &Memory,
        size: u32,
    ) -> Result<u32, MemoryError> {
        if size == 0 {
            return Err(MemoryError::ZeroSize);
        }

        let offset = self.cursor;
        let end = offset as u64 + size as u64;
        if end > u32::MAX as u64 {
            return Err(MemoryError::AddressOverflow { end });
        }

        ensure_capacity(&mut store, memory, end, self.max_pages)?;
        self.cursor = end as u32;
        Ok(offset)
    }
}

/// Grow `memory` until it holds at least `byte_len` bytes.
///
/// Growth happens in whole pages and only ever increases capacity.
fn ensure_capacity(
    mut store: impl AsContextMut,
    memory: &Memory,
    byte_len: u64,
    max_pages: u64,
) -> Result<(), MemoryError> {
    let needed = pages_for(byte_len);
    if needed > max_pages {
        return Err(MemoryError::PageLimit {
            needed,
            limit: max_pages,
        });
    }

    let current = memory.size(store.as_context());
    if needed > current {
        let delta = needed - current;
        memory
            .grow(&mut store, delta)
            .map_err(|e| MemoryError::Grow {
                delta,
                cause: e.to_string(),
            })?;
    }
    Ok(())
}

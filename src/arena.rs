use bumpalo::Bump;
use std::cell::Cell;
use std::fmt::{Display, Formatter};

/// An error returned when an [Arena] with a quota cannot serve an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    pub requested: usize,
    pub limit: usize,
}

impl Display for AllocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AllocationError: requested {} bytes over the {} byte quota.",
            self.requested, self.limit
        )
    }
}

/// A region allocator scoped to a single parse call.
///
/// All bookkeeping a parse call creates lives for exactly as long as the arena of that call.
/// Individual values are never released; dropping the arena returns every block at once.
/// An optional quota bounds the memory a parse is allowed to touch,
/// which is the supported way to bound a long running parse.
pub struct Arena {
    bump: Bump,
    charged: Cell<usize>,
    allocations: Cell<usize>,
    quota: Option<usize>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            bump: Bump::new(),
            charged: Cell::new(0),
            allocations: Cell::new(0),
            quota: None,
        }
    }

    /// Create an arena with a pre-sized first block.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
            charged: Cell::new(0),
            allocations: Cell::new(0),
            quota: None,
        }
    }

    /// Create an arena which fails any allocation that would take the total past `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            bump: Bump::new(),
            charged: Cell::new(0),
            allocations: Cell::new(0),
            quota: Some(quota),
        }
    }

    pub fn quota(&self) -> Option<usize> {
        self.quota
    }

    /// Total bytes attributed to this arena, both bump-allocated and charged.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes() + self.charged.get()
    }

    /// Number of allocations and charges served.
    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }

    /// Free capacity remaining in the current block.
    pub fn chunk_capacity(&self) -> usize {
        self.bump.chunk_capacity()
    }

    fn admit(&self, requested: usize) -> Result<(), AllocError> {
        if let Some(limit) = self.quota {
            if self.allocated_bytes() + requested > limit {
                return Err(AllocError { requested, limit });
            }
        }
        self.allocations.set(self.allocations.get() + 1);
        Ok(())
    }

    /// Move `value` into the region.
    pub fn alloc<T>(&self, value: T) -> Result<&T, AllocError> {
        self.admit(std::mem::size_of::<T>())?;
        Ok(self.bump.alloc(value))
    }

    /// Copy `bytes` into the region.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<&[u8], AllocError> {
        self.admit(bytes.len())?;
        Ok(self.bump.alloc_slice_copy(bytes))
    }

    /// Attribute `bytes` of growth in a structure owned by the current parse call.
    ///
    /// The memo table of the packrat backend and the graph structured stack of the
    /// GLR backend account their growth here so that a quota covers them as well.
    pub(crate) fn charge(&self, bytes: usize) -> Result<(), AllocError> {
        self.admit(bytes)?;
        self.charged.set(self.charged.get() + bytes);
        Ok(())
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod __tests__ {
    use super::Arena;

    #[test]
    fn bump_allocation_test() {
        let arena = Arena::new();
        let a = arena.alloc(42_u64).unwrap();
        let b = arena.alloc_bytes(b"abcdef").unwrap();
        assert_eq!(*a, 42);
        assert_eq!(b, b"abcdef");
        assert!(arena.allocated_bytes() >= 14);
        assert_eq!(arena.allocation_count(), 2);
    }

    #[test]
    fn quota_test() {
        let arena = Arena::with_quota(16);
        arena.alloc_bytes(&[0_u8; 8]).unwrap();
        arena.charge(4).unwrap();
        let err = arena.charge(8).expect_err("Quota should be exhausted.");
        assert_eq!(err.requested, 8);
        assert_eq!(err.limit, 16);
        // A failed charge must not count against the arena.
        arena.charge(4).unwrap();
    }
}

//! Virtual Memory Areas
//!
//! A [`Vma`] is a contiguous committed range `[start, end)` of an
//! address space. It only ever grows at `end`, one whole page at a
//! time, and keeps its own list of reusable regions.

use super::address::VirtAddr;
use super::region::{FreeList, Region};

/// A growable virtual memory area.
pub struct Vma {
    /// Area id, its index in the address space.
    pub id: usize,
    /// First committed address.
    pub start: VirtAddr,
    /// One past the last committed address. Page-aligned, never decreases.
    pub end: VirtAddr,
    /// Released or not-yet-used sub-ranges of `[start, end)`.
    pub free_list: FreeList,
}

impl Vma {
    /// Create an area with zero extent at `start`.
    pub fn new(id: usize, start: VirtAddr) -> Self {
        debug_assert!(start.is_aligned());
        Self {
            id,
            start,
            end: start,
            free_list: FreeList::new(),
        }
    }

    /// The committed extent.
    #[inline]
    pub fn extent(&self) -> Region {
        Region {
            start: self.start,
            end: self.end,
        }
    }

    /// Committed size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.as_usize() - self.start.as_usize()
    }

    /// Whether nothing is committed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `region` lies inside the committed extent.
    #[inline]
    pub fn contains(&self, region: &Region) -> bool {
        self.start <= region.start && region.end <= self.end
    }

    /// Commit `inc` more bytes at `end` and return the new range.
    ///
    /// The caller must already have mapped the pages behind it.
    pub(crate) fn extend(&mut self, inc: usize) -> Region {
        debug_assert!(VirtAddr::new(inc).is_aligned());
        let grown = Region {
            start: self.end,
            end: self.end.add(inc),
        };
        self.end = grown.end;
        grown
    }

    /// Drop back to zero extent with an empty free list.
    pub(crate) fn reset(&mut self) {
        self.end = self.start;
        self.free_list.clear();
    }
}

impl core::fmt::Debug for Vma {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Vma({}, [{:#x}, {:#x}), free={})",
            self.id,
            self.start.as_usize(),
            self.end.as_usize(),
            self.free_list.len()
        )
    }
}

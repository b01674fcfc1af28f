//! Physical and Virtual Address Types
//!
//! Type-safe wrappers that keep virtual addresses, physical addresses
//! and page numbers from being mixed up at compile time.

use core::fmt;

use crate::config::{MAX_PGN, PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};

/// A physical address inside a [`MemPhy`](super::MemPhy) device.
///
/// Composed as `(frame << PAGE_SHIFT) | offset`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Create a new physical address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Compose a physical address from a frame number and a page offset.
    #[inline]
    pub const fn from_frame(frame: usize, offset: usize) -> Self {
        debug_assert!(offset < PAGE_SIZE);
        Self((frame << PAGE_SHIFT) | offset)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Get the frame number.
    #[inline]
    pub const fn frame(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the offset within the frame.
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#010x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A virtual address inside one process's address space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Split into the page number and the offset within the page.
    #[inline]
    pub const fn split(self) -> (PageNum, usize) {
        (PageNum(self.0 >> PAGE_SHIFT), self.0 & PAGE_MASK)
    }

    /// Get the page number.
    #[inline]
    pub const fn page_num(self) -> PageNum {
        PageNum(self.0 >> PAGE_SHIFT)
    }

    /// Get the page offset (lowest PAGE_SHIFT bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Add an offset to this address.
    #[inline]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#08x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

/// A virtual page number, the index into a page directory.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct PageNum(pub usize);

impl PageNum {
    /// Whether this page number has a page directory entry.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 < MAX_PGN
    }

    /// First virtual address of the page.
    #[inline]
    pub const fn base(self) -> VirtAddr {
        VirtAddr(self.0 << PAGE_SHIFT)
    }
}

/// Round `size` up to a whole number of pages.
#[inline]
pub const fn page_align_up(size: usize) -> usize {
    debug_assert!(size <= usize::MAX - PAGE_MASK);
    (size + PAGE_MASK) & !PAGE_MASK
}

/// Number of pages needed to hold `size` bytes.
#[inline]
pub const fn pages_for(size: usize) -> usize {
    page_align_up(size) >> PAGE_SHIFT
}

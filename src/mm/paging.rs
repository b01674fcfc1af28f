//! Page Table Management
//!
//! A flat page directory with one packed 32-bit entry per virtual page.
//!
//! # Entry Layout
//! ```text
//!  31  30  29  28  27 ........ 13 12 ............ 0
//! ┌───┬───┬───┬───┬────────────────────────────────┐
//! │ P │ S │ R │ D │   resident: frame number [12:0] │
//! │   │   │   │   │   swapped:  offset [25:5]       │
//! │   │   │   │   │             type   [4:0]        │
//! └───┴───┴───┴───┴────────────────────────────────┘
//! ```
//! `P` is set whenever a mapping exists, resident or swapped; it does
//! not mean "in RAM". Residency is decided by `S` alone.

use alloc::boxed::Box;
use alloc::vec;
use core::ops::{Index, IndexMut};

use bitflags::bitflags;

use super::address::PageNum;
use super::error::MemError;
use crate::config::MAX_PGN;

bitflags! {
    /// Control bits of a page table entry.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct PteFlags: u32 {
        /// A mapping exists (resident or swapped).
        const PRESENT  = 1 << 31;
        /// The page lives on a swap device.
        const SWAPPED  = 1 << 30;
        /// Reserved.
        const RESERVED = 1 << 29;
        /// Written since last swap-in. Never consulted.
        const DIRTY    = 1 << 28;
    }
}

/// Where a virtual page currently lives.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PageState {
    /// No mapping.
    Unmapped,
    /// Backed by a RAM frame.
    Resident { frame: usize },
    /// Backed by a slot on swap device `device`.
    Swapped { device: usize, offset: usize },
}

/// A single packed page table entry.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    const FPN_MASK: u32 = 0x0000_1FFF;
    const SWPTYP_MASK: u32 = 0x0000_001F;
    const SWPOFF_MASK: u32 = 0x03FF_FFE0;
    const SWPOFF_LOBIT: u32 = 5;
    /// Every bit that is not a control flag.
    const PAYLOAD_MASK: u32 = 0x0FFF_FFFF;

    /// Create an unmapped entry.
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create an entry from its raw word.
    #[inline]
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw)
    }

    /// Point the entry at a RAM frame: sets present, clears swapped.
    pub fn set_frame(&mut self, frame: usize) {
        debug_assert!(frame as u32 & !Self::FPN_MASK == 0, "frame {} overflows entry", frame);
        let flags = (self.flags() | PteFlags::PRESENT) - PteFlags::SWAPPED;
        self.0 = flags.bits() | (frame as u32 & Self::FPN_MASK);
    }

    /// Point the entry at a swap slot: sets present and swapped.
    pub fn set_swap(&mut self, swap_type: usize, swap_offset: usize) {
        let offset = (swap_offset as u32) << Self::SWPOFF_LOBIT;
        debug_assert!(
            offset & !Self::SWPOFF_MASK == 0,
            "swap offset {} overflows entry",
            swap_offset
        );
        let flags = self.flags() | PteFlags::PRESENT | PteFlags::SWAPPED;
        self.0 = flags.bits()
            | (offset & Self::SWPOFF_MASK)
            | (swap_type as u32 & Self::SWPTYP_MASK);
    }

    /// Get the control flags.
    #[inline]
    pub fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0 & !Self::PAYLOAD_MASK)
    }

    /// A mapping exists, resident or swapped.
    #[inline]
    pub fn is_present(self) -> bool {
        self.flags().contains(PteFlags::PRESENT)
    }

    /// The page is backed by swap.
    #[inline]
    pub fn is_swapped(self) -> bool {
        self.flags().contains(PteFlags::SWAPPED)
    }

    /// The page is backed by a RAM frame.
    #[inline]
    pub fn is_resident(self) -> bool {
        self.is_present() && !self.is_swapped()
    }

    /// Frame number. Only meaningful when not swapped.
    #[inline]
    pub const fn frame_number(self) -> usize {
        (self.0 & Self::FPN_MASK) as usize
    }

    /// Swap device index. Only meaningful when swapped.
    #[inline]
    pub const fn swap_type(self) -> usize {
        (self.0 & Self::SWPTYP_MASK) as usize
    }

    /// Swap slot. Only meaningful when swapped.
    #[inline]
    pub const fn swap_offset(self) -> usize {
        ((self.0 & Self::SWPOFF_MASK) >> Self::SWPOFF_LOBIT) as usize
    }

    /// Decode the entry.
    pub fn state(self) -> PageState {
        if !self.is_present() {
            PageState::Unmapped
        } else if self.is_swapped() {
            PageState::Swapped {
                device: self.swap_type(),
                offset: self.swap_offset(),
            }
        } else {
            PageState::Resident {
                frame: self.frame_number(),
            }
        }
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Clear the entry (unmapped).
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.state() {
            PageState::Unmapped => write!(f, "PTE(unmapped)"),
            PageState::Resident { frame } => write!(f, "PTE(frame={})", frame),
            PageState::Swapped { device, offset } => {
                write!(f, "PTE(swap={}:{})", device, offset)
            }
        }
    }
}

/// The page directory: one entry per virtual page number.
pub struct PageDirectory {
    entries: Box<[PageTableEntry]>,
}

impl PageDirectory {
    /// Create a directory of `MAX_PGN` unmapped entries.
    pub fn new() -> Self {
        Self {
            entries: vec![PageTableEntry::empty(); MAX_PGN].into_boxed_slice(),
        }
    }

    /// Look up the entry for a page, failing if it is outside the directory.
    #[inline]
    pub fn get(&self, pgn: PageNum) -> Result<PageTableEntry, MemError> {
        self.entries.get(pgn.0).copied().ok_or(MemError::InvalidAddress)
    }

    /// Mutable lookup, failing if the page is outside the directory.
    #[inline]
    pub fn get_mut(&mut self, pgn: PageNum) -> Result<&mut PageTableEntry, MemError> {
        self.entries.get_mut(pgn.0).ok_or(MemError::InvalidAddress)
    }

    /// Iterate over all mapped entries with their page numbers.
    pub fn iter_mapped(&self) -> impl Iterator<Item = (PageNum, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_present())
            .map(|(i, e)| (PageNum(i), *e))
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.clear();
        }
    }
}

impl Index<PageNum> for PageDirectory {
    type Output = PageTableEntry;

    #[inline]
    fn index(&self, pgn: PageNum) -> &Self::Output {
        &self.entries[pgn.0]
    }
}

impl IndexMut<PageNum> for PageDirectory {
    #[inline]
    fn index_mut(&mut self, pgn: PageNum) -> &mut Self::Output {
        &mut self.entries[pgn.0]
    }
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

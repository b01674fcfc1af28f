//! Residency and Swapping
//!
//! Every RAM-resident page of an address space is queued in a FIFO in
//! the order it became resident. When a swapped-out page is touched,
//! the oldest resident page is written to swap and the touched page is
//! read into the frame it vacated. While RAM is full the resident set
//! never grows on a fault. A free RAM frame, left behind by a rolled
//! back growth or another process's exit, is used without evicting.
//!
//! # Fault Sequence
//! ```text
//!   victim = fifo.pop_front()             (skipped if RAM has a free frame)
//!   swap[active][slot]   <- ram[victim.frame]     (victim -> Swapped(active, slot))
//!   ram[victim.frame]    <- swap[dev][off]        (page   -> Resident(victim.frame))
//!   fifo.push_back(page)
//! ```
//! Every eviction writes the victim out; the dirty bit is not consulted.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::ops::Range;

use log::{info, trace, warn};

use super::address::PageNum;
use super::error::MemError;
use crate::config::{MAX_RAM_FRAMES, MAX_SWAP_DEVICES, MAX_SWAP_FRAMES};
use super::frame::{copy_page, MemPhy};
use super::paging::{PageDirectory, PageState};

/// The physical devices an operation runs against.
#[derive(Clone, Copy)]
pub struct Backing<'a> {
    /// RAM.
    pub ram: &'a MemPhy,
    /// Swap devices, indexed by the PTE swap type.
    pub swap: &'a [Arc<MemPhy>],
    /// Device that receives evicted pages.
    pub active_swap: usize,
}

impl<'a> Backing<'a> {
    /// Bundle devices for one operation.
    ///
    /// Fails unless every device fits the page table entry fields and
    /// `active_swap` names one of the swap devices.
    pub fn new(
        ram: &'a MemPhy,
        swap: &'a [Arc<MemPhy>],
        active_swap: usize,
    ) -> Result<Self, MemError> {
        if swap.is_empty() || swap.len() > MAX_SWAP_DEVICES || active_swap >= swap.len() {
            return Err(MemError::InvalidSwapDevice);
        }
        if ram.total_frames() > MAX_RAM_FRAMES
            || swap.iter().any(|dev| dev.total_frames() > MAX_SWAP_FRAMES)
        {
            return Err(MemError::InvalidConfig);
        }
        Ok(Self::validated(ram, swap, active_swap))
    }

    /// Bundle devices already accepted by [`Backing::new`].
    pub(crate) fn validated(
        ram: &'a MemPhy,
        swap: &'a [Arc<MemPhy>],
        active_swap: usize,
    ) -> Self {
        debug_assert!(active_swap < swap.len());
        Self {
            ram,
            swap,
            active_swap,
        }
    }

    /// Swap device named by a PTE swap type.
    ///
    /// # Panics
    /// Panics if the process has no such device.
    #[inline]
    pub fn swap_device(&self, swap_type: usize) -> &'a MemPhy {
        match self.swap.get(swap_type) {
            Some(dev) => dev,
            None => panic!("page table refers to missing swap device {}", swap_type),
        }
    }
}

/// Resident pages, oldest first.
#[derive(Debug, Default)]
pub struct ResidencyFifo {
    queue: VecDeque<PageNum>,
}

impl ResidencyFifo {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Record a page as the newest resident.
    #[inline]
    pub fn push(&mut self, pgn: PageNum) {
        trace!("fifo: push page {}", pgn.0);
        self.queue.push_back(pgn);
    }

    /// Take the oldest resident page.
    #[inline]
    pub fn pop_victim(&mut self) -> Option<PageNum> {
        self.queue.pop_front()
    }

    /// Put a victim back as the oldest resident.
    #[inline]
    fn restore_victim(&mut self, pgn: PageNum) {
        self.queue.push_front(pgn);
    }

    /// Number of resident pages.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no page is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = PageNum> + '_ {
        self.queue.iter().copied()
    }

    /// Drop every queued page whose number falls in `pages`.
    pub fn forget(&mut self, pages: Range<usize>) {
        self.queue.retain(|pgn| !pages.contains(&pgn.0));
    }

    /// Forget every page.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Write `victim` out to the active swap device.
    ///
    /// Returns the RAM frame it vacated. On `SwapExhausted` nothing
    /// changes and the victim stays the oldest resident.
    fn swap_out(
        &mut self,
        pgd: &mut PageDirectory,
        dev: &Backing<'_>,
        victim: PageNum,
    ) -> Result<usize, MemError> {
        let victim_frame = match pgd[victim].state() {
            PageState::Resident { frame } => frame,
            other => panic!("residency queue holds non-resident page {}: {:?}", victim.0, other),
        };

        let swap = dev.swap_device(dev.active_swap);
        let Some(slot) = swap.get_free_frame() else {
            warn!("swap device {} exhausted evicting page {}", dev.active_swap, victim.0);
            self.restore_victim(victim);
            return Err(MemError::SwapExhausted);
        };

        copy_page(dev.ram, victim_frame, swap, slot);
        pgd[victim].set_swap(dev.active_swap, slot);
        info!(
            "evict page {} frame {} -> swap {}:{}",
            victim.0, victim_frame, dev.active_swap, slot
        );
        Ok(victim_frame)
    }

    /// Free one RAM frame by evicting the oldest resident page.
    ///
    /// Returns `Ok(None)` when no page is resident.
    pub fn evict_oldest(
        &mut self,
        pgd: &mut PageDirectory,
        dev: &Backing<'_>,
    ) -> Result<Option<usize>, MemError> {
        match self.pop_victim() {
            Some(victim) => self.swap_out(pgd, dev, victim).map(Some),
            None => Ok(None),
        }
    }

    /// Make `pgn` RAM-resident and return its frame.
    ///
    /// A resident page is returned as is. A swapped page is read into a
    /// free RAM frame if there is one, otherwise it is exchanged with
    /// the oldest resident page.
    ///
    /// # Panics
    /// Panics if RAM is full and the queue is empty.
    pub fn ensure_resident(
        &mut self,
        pgd: &mut PageDirectory,
        dev: &Backing<'_>,
        pgn: PageNum,
    ) -> Result<usize, MemError> {
        let pte = pgd.get(pgn)?;
        let (src_type, src_slot) = match pte.state() {
            PageState::Resident { frame } => return Ok(frame),
            PageState::Unmapped => return Err(MemError::InvalidAddress),
            PageState::Swapped { device, offset } => (device, offset),
        };

        let frame = match dev.ram.get_free_frame() {
            Some(frame) => frame,
            None => {
                let Some(victim) = self.pop_victim() else {
                    panic!("{} (fault on page {})", MemError::NoVictimAvailable, pgn.0);
                };

                if victim == pgn {
                    // Never route a page through its own swap slot.
                    self.push(pgn);
                    return Ok(pte.frame_number());
                }

                self.swap_out(pgd, dev, victim)?
            }
        };

        let src = dev.swap_device(src_type);
        copy_page(src, src_slot, dev.ram, frame);
        src.put_free_frame(src_slot);
        pgd[pgn].set_frame(frame);
        info!(
            "fault page {}: swap {}:{} -> frame {}",
            pgn.0, src_type, src_slot, frame
        );

        self.push(pgn);
        Ok(frame)
    }
}

//! Address Spaces
//!
//! An [`AddressSpace`] owns a page directory, its virtual memory areas,
//! the symbol table of live regions and the residency queue. All of it
//! sits behind one spinlock, and every public operation holds that lock
//! for its whole duration, so allocate's probe/grow/probe runs as one
//! unit.
//!
//! # Allocation
//! ```text
//! allocate(size)
//!   ├─ probe free list ── hit ──────────────────────┐
//!   └─ miss: grow area by page_align_up(size)       │
//!        ├─ per page: take a frame (evicting if     │
//!        │  RAM is full), map it, queue as resident │
//!        ├─ add the new range to the free list      │
//!        └─ probe again ── hit ─────────────────────┤
//!                          miss: OutOfVirtualMemory  ▼
//!                                          bind into symbol table
//! ```

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write;
use core::ops::Range;

use log::{debug, info, trace, warn};
use spin::Mutex;

use super::address::{page_align_up, PageNum, PhysAddr, VirtAddr};
use super::error::MemError;
use super::paging::{PageDirectory, PageState};
use super::region::{Region, RegionId, SymbolTable};
use super::swap::{Backing, ResidencyFifo};
use super::vma::Vma;
use crate::config::{MAX_PGN, MAX_VIRT_SIZE, PAGE_SIZE};

/// Everything guarded by the address-space lock.
struct MmInner {
    pgd: PageDirectory,
    vmas: Vec<Vma>,
    symbols: SymbolTable,
    fifo: ResidencyFifo,
}

impl MmInner {
    fn vma(&self, vma_id: usize) -> Result<&Vma, MemError> {
        self.vmas.get(vma_id).ok_or(MemError::InvalidRegion)
    }

    /// The area that committed `region`.
    fn vma_containing(&mut self, region: &Region) -> Option<&mut Vma> {
        self.vmas.iter_mut().find(|vma| vma.contains(region))
    }

    /// Take one RAM frame, evicting the oldest resident page if the
    /// pool is empty. The frame is zeroed.
    fn take_frame(&mut self, dev: &Backing<'_>) -> Result<usize, MemError> {
        if let Some(frame) = dev.ram.get_free_frame() {
            return Ok(frame);
        }

        match self.fifo.evict_oldest(&mut self.pgd, dev)? {
            Some(frame) => {
                dev.ram.zero_frame(frame);
                Ok(frame)
            }
            None => {
                warn!("RAM exhausted with no resident page to evict");
                Err(MemError::FrameExhausted)
            }
        }
    }

    /// Undo a partial growth: unmap `count` pages from `first`, giving
    /// back whatever backs them.
    fn unmap_pages(&mut self, dev: &Backing<'_>, first: PageNum, count: usize) {
        let pages = first.0..first.0 + count;
        self.fifo.forget(pages.clone());
        for pgn in pages.map(PageNum) {
            match self.pgd[pgn].state() {
                PageState::Resident { frame } => dev.ram.put_free_frame(frame),
                PageState::Swapped { device, offset } => {
                    dev.swap_device(device).put_free_frame(offset)
                }
                PageState::Unmapped => {}
            }
            self.pgd[pgn].clear();
        }
    }

    /// Commit `size` more bytes (rounded up to pages) at the end of an
    /// area and make the whole new range reusable.
    ///
    /// Pages are mapped and queued one at a time, so a growth larger
    /// than free RAM evicts its own earlier pages.
    fn grow_vma(&mut self, dev: &Backing<'_>, vma_id: usize, size: usize) -> Result<(), MemError> {
        let old_end = self.vma(vma_id)?.end;
        // Both bounds are page-aligned, so the rounded size fits too
        if size > MAX_VIRT_SIZE - old_end.as_usize() {
            warn!("vma {} cannot grow by {:#x} past {:#x}", vma_id, size, MAX_VIRT_SIZE);
            return Err(MemError::OutOfVirtualMemory);
        }
        let inc = page_align_up(size);

        let first = old_end.page_num();
        for i in 0..inc / PAGE_SIZE {
            let frame = match self.take_frame(dev) {
                Ok(frame) => frame,
                Err(err) => {
                    self.unmap_pages(dev, first, i);
                    return Err(err);
                }
            };
            let pgn = PageNum(first.0 + i);
            self.pgd[pgn].set_frame(frame);
            self.fifo.push(pgn);
        }

        let vma = &mut self.vmas[vma_id];
        let grown = vma.extend(inc);
        vma.free_list.insert(grown)?;
        debug!("vma {} grown to {:?}", vma_id, vma.extent());
        Ok(())
    }

    fn probe(&mut self, vma_id: usize, size: usize) -> Option<Region> {
        self.vmas.get_mut(vma_id)?.free_list.probe(size)
    }

    /// Resolve `(region, offset)` to the RAM address backing it.
    fn translate_region(
        &mut self,
        dev: &Backing<'_>,
        id: RegionId,
        offset: usize,
    ) -> Result<PhysAddr, MemError> {
        let region = self.symbols.lookup(id)?;
        if offset >= region.len() {
            return Err(MemError::InvalidAddress);
        }
        if !self.vmas.iter().any(|vma| vma.contains(&region)) {
            return Err(MemError::InvalidRegion);
        }
        self.translate(dev, region.start.add(offset))
    }

    /// Check that `len` bytes from `offset` lie inside region `id`.
    fn check_span(&self, id: RegionId, offset: usize, len: usize) -> Result<(), MemError> {
        let region = self.symbols.lookup(id)?;
        match offset.checked_add(len) {
            Some(end) if end <= region.len() => Ok(()),
            _ => Err(MemError::InvalidAddress),
        }
    }

    fn translate(&mut self, dev: &Backing<'_>, addr: VirtAddr) -> Result<PhysAddr, MemError> {
        let (pgn, offset) = addr.split();
        if !pgn.is_valid() {
            return Err(MemError::InvalidAddress);
        }
        let frame = self.fifo.ensure_resident(&mut self.pgd, dev, pgn)?;
        let phys = PhysAddr::from_frame(frame, offset);
        trace!("translate {} -> {}", addr, phys);
        Ok(phys)
    }
}

/// One process's virtual address space.
pub struct AddressSpace {
    owner: u32,
    inner: Mutex<MmInner>,
}

impl AddressSpace {
    /// Create an empty address space: a zeroed page directory, VMA 0
    /// with zero extent and an empty residency queue.
    pub fn new(owner: u32) -> Self {
        debug!("pid {}: new address space", owner);
        Self {
            owner,
            inner: Mutex::new(MmInner {
                pgd: PageDirectory::new(),
                vmas: vec![Vma::new(0, VirtAddr::new(0))],
                symbols: SymbolTable::new(),
                fifo: ResidencyFifo::new(),
            }),
        }
    }

    /// Id of the owning process.
    #[inline]
    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// Allocate `size` bytes in area `vma_id` and bind them to `id`.
    ///
    /// Returns the region's start address.
    pub fn allocate(
        &self,
        dev: &Backing<'_>,
        vma_id: usize,
        id: RegionId,
        size: usize,
    ) -> Result<VirtAddr, MemError> {
        if size == 0 {
            return Err(MemError::InvalidRegion);
        }

        let mut inner = self.inner.lock();
        inner.vma(vma_id)?;
        if !inner.symbols.is_free(id) {
            warn!("pid {}: region {} already bound", self.owner, id.index());
            return Err(MemError::InvalidRegion);
        }

        let region = match inner.probe(vma_id, size) {
            Some(region) => region,
            None => {
                inner.grow_vma(dev, vma_id, size)?;
                inner.probe(vma_id, size).ok_or_else(|| {
                    warn!("pid {}: out of virtual memory for {} bytes", self.owner, size);
                    MemError::OutOfVirtualMemory
                })?
            }
        };

        inner.symbols.insert(id, region)?;
        debug!("pid {}: alloc region {} = {:?}", self.owner, id.index(), region);
        Ok(region.start)
    }

    /// Release region `id` onto its area's free list.
    pub fn deallocate(&self, id: RegionId) -> Result<(), MemError> {
        let mut inner = self.inner.lock();
        let region = inner.symbols.delete(id)?;
        let vma = inner.vma_containing(&region).ok_or(MemError::InvalidRegion)?;
        vma.free_list.insert(region)?;
        debug!("pid {}: free region {} = {:?}", self.owner, id.index(), region);
        Ok(())
    }

    /// Read the byte at `offset` inside region `id`.
    pub fn read_byte(
        &self,
        dev: &Backing<'_>,
        id: RegionId,
        offset: usize,
    ) -> Result<u8, MemError> {
        let mut inner = self.inner.lock();
        let phys = inner.translate_region(dev, id, offset)?;
        Ok(dev.ram.read(phys))
    }

    /// Write the byte at `offset` inside region `id`.
    pub fn write_byte(
        &self,
        dev: &Backing<'_>,
        id: RegionId,
        offset: usize,
        value: u8,
    ) -> Result<(), MemError> {
        let mut inner = self.inner.lock();
        let phys = inner.translate_region(dev, id, offset)?;
        dev.ram.write(phys, value);
        Ok(())
    }

    /// Fill `buf` from region `id` starting at `offset`.
    ///
    /// A span that leaves the region is rejected before any byte moves.
    pub fn read_bytes(
        &self,
        dev: &Backing<'_>,
        id: RegionId,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<(), MemError> {
        let mut inner = self.inner.lock();
        inner.check_span(id, offset, buf.len())?;
        for (i, byte) in buf.iter_mut().enumerate() {
            let phys = inner.translate_region(dev, id, offset + i)?;
            *byte = dev.ram.read(phys);
        }
        Ok(())
    }

    /// Copy `data` into region `id` starting at `offset`.
    ///
    /// A span that leaves the region is rejected before any byte moves.
    pub fn write_bytes(
        &self,
        dev: &Backing<'_>,
        id: RegionId,
        offset: usize,
        data: &[u8],
    ) -> Result<(), MemError> {
        let mut inner = self.inner.lock();
        inner.check_span(id, offset, data.len())?;
        for (i, &byte) in data.iter().enumerate() {
            let phys = inner.translate_region(dev, id, offset + i)?;
            dev.ram.write(phys, byte);
        }
        Ok(())
    }

    /// Translate a virtual address, faulting the page in if needed.
    pub fn translate(&self, dev: &Backing<'_>, addr: VirtAddr) -> Result<PhysAddr, MemError> {
        self.inner.lock().translate(dev, addr)
    }

    /// Make a page RAM-resident and return its frame.
    pub fn ensure_resident(&self, dev: &Backing<'_>, pgn: PageNum) -> Result<usize, MemError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.fifo.ensure_resident(&mut inner.pgd, dev, pgn)
    }

    /// Return every frame and swap slot this space holds and reset it
    /// to its freshly created state.
    pub fn reclaim_all(&self, dev: &Backing<'_>) {
        let mut inner = self.inner.lock();
        let mut ram_frames = 0;
        let mut swap_slots = 0;

        for (_, pte) in inner.pgd.iter_mapped() {
            match pte.state() {
                PageState::Resident { frame } => {
                    dev.ram.put_free_frame(frame);
                    ram_frames += 1;
                }
                PageState::Swapped { device, offset } => {
                    dev.swap_device(device).put_free_frame(offset);
                    swap_slots += 1;
                }
                PageState::Unmapped => {}
            }
        }

        inner.pgd.clear();
        inner.fifo.clear();
        inner.symbols.clear();
        for vma in inner.vmas.iter_mut() {
            vma.reset();
        }

        if ram_frames + swap_slots > 0 {
            info!(
                "pid {}: reclaimed {} RAM frames, {} swap slots",
                self.owner, ram_frames, swap_slots
            );
        }
    }

    /// Print mapped entries in `range` of page numbers, one per line.
    pub fn dump_page_table(&self, range: Range<usize>) -> String {
        let inner = self.inner.lock();
        let end = range.end.min(MAX_PGN);
        let mut out = String::new();

        for pgn in range.start..end {
            let pte = inner.pgd[PageNum(pgn)];
            if pte.as_u32() == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "PTE[{}]: {:#010x} | present={} | fpn={} | swapped={} | swp_offset={}",
                pgn,
                pte.as_u32(),
                pte.is_present() as u8,
                pte.frame_number(),
                pte.is_swapped() as u8,
                pte.swap_offset()
            );
        }
        out
    }

    /// Where page `pgn` currently lives.
    pub fn page_state(&self, pgn: PageNum) -> Result<PageState, MemError> {
        Ok(self.inner.lock().pgd.get(pgn)?.state())
    }

    /// Resident pages, oldest first.
    pub fn resident_pages(&self) -> Vec<PageNum> {
        self.inner.lock().fifo.iter().collect()
    }

    /// Live regions with their ids.
    pub fn regions(&self) -> Vec<(RegionId, Region)> {
        self.inner.lock().symbols.iter().collect()
    }

    /// Committed extent of an area.
    pub fn vma_extent(&self, vma_id: usize) -> Result<Region, MemError> {
        Ok(self.inner.lock().vma(vma_id)?.extent())
    }

    /// Free-list nodes of an area, in list order.
    pub fn free_regions(&self, vma_id: usize) -> Result<Vec<Region>, MemError> {
        Ok(self.inner.lock().vma(vma_id)?.free_list.iter().copied().collect())
    }
}

/// Create the address space for a new process.
pub fn create_address_space(owner: u32) -> AddressSpace {
    AddressSpace::new(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::frame::MemPhy;
    use alloc::sync::Arc;

    fn rid(index: u32) -> RegionId {
        RegionId::new(index).unwrap()
    }

    struct Devices {
        ram: MemPhy,
        swap: Vec<Arc<MemPhy>>,
    }

    impl Devices {
        fn new(ram_frames: usize, swap_frames: usize) -> Self {
            Self {
                ram: MemPhy::with_frames(ram_frames),
                swap: vec![Arc::new(MemPhy::with_frames(swap_frames))],
            }
        }

        fn backing(&self) -> Backing<'_> {
            Backing::new(&self.ram, &self.swap, 0).unwrap()
        }
    }

    /// Live and free regions of VMA 0 tile its extent exactly.
    fn assert_tiled(mm: &AddressSpace) {
        let extent = mm.vma_extent(0).unwrap();
        let mut pieces: Vec<Region> = mm.regions().into_iter().map(|(_, r)| r).collect();
        pieces.extend(mm.free_regions(0).unwrap());
        pieces.sort_by_key(|r| r.start);

        let mut cursor = extent.start;
        for piece in &pieces {
            assert_eq!(piece.start, cursor, "gap or overlap at {:?}", piece);
            cursor = piece.end;
        }
        assert_eq!(cursor, extent.end);
    }

    #[test]
    fn test_new_space_is_empty() {
        let mm = create_address_space(7);
        assert_eq!(mm.owner(), 7);
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, 0)));
        assert!(mm.free_regions(0).unwrap().is_empty());
        assert!(mm.resident_pages().is_empty());
        assert_eq!(mm.vma_extent(1), Err(MemError::InvalidRegion));
    }

    #[test]
    fn test_allocate_grows_and_keeps_surplus() {
        let dev = Devices::new(8, 8);
        let mm = AddressSpace::new(1);

        assert_eq!(mm.allocate(&dev.backing(), 0, rid(0), 100), Ok(VirtAddr::new(0)));
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, PAGE_SIZE)));
        assert_eq!(mm.free_regions(0).unwrap(), [Region::new(100, PAGE_SIZE)]);

        // Fits in the surplus, no growth
        assert_eq!(mm.allocate(&dev.backing(), 0, rid(1), 50), Ok(VirtAddr::new(100)));
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, PAGE_SIZE)));
        assert_eq!(dev.ram.free_frames(), 7);
        assert_tiled(&mm);
    }

    #[test]
    fn test_allocate_rejects_bad_requests() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);

        assert_eq!(mm.allocate(&dev.backing(), 0, rid(0), 0), Err(MemError::InvalidRegion));
        assert_eq!(mm.allocate(&dev.backing(), 3, rid(0), 8), Err(MemError::InvalidRegion));

        mm.allocate(&dev.backing(), 0, rid(0), 8).unwrap();
        assert_eq!(mm.allocate(&dev.backing(), 0, rid(0), 8), Err(MemError::InvalidRegion));
        assert_tiled(&mm);
    }

    #[test]
    fn test_free_then_reallocate_recycles() {
        let dev = Devices::new(4, 4);
        let mm = AddressSpace::new(1);

        let first = mm.allocate(&dev.backing(), 0, rid(2), PAGE_SIZE).unwrap();
        mm.deallocate(rid(2)).unwrap();
        let extent = mm.vma_extent(0).unwrap();

        let again = mm.allocate(&dev.backing(), 0, rid(2), PAGE_SIZE).unwrap();
        assert_eq!(again, first);
        assert_eq!(mm.vma_extent(0).unwrap(), extent);
        assert_tiled(&mm);
    }

    #[test]
    fn test_double_free_rejected() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(4), 10).unwrap();

        assert_eq!(mm.deallocate(rid(4)), Ok(()));
        assert_eq!(mm.deallocate(rid(4)), Err(MemError::InvalidRegion));
        assert_eq!(mm.deallocate(rid(5)), Err(MemError::InvalidRegion));
        assert_tiled(&mm);
    }

    #[test]
    fn test_fragmentation_is_not_coalesced() {
        let dev = Devices::new(8, 8);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), PAGE_SIZE / 2).unwrap();
        mm.allocate(&dev.backing(), 0, rid(1), PAGE_SIZE / 2).unwrap();
        mm.deallocate(rid(0)).unwrap();
        mm.deallocate(rid(1)).unwrap();

        // Two adjacent half pages cannot satisfy a full page
        let addr = mm.allocate(&dev.backing(), 0, rid(2), PAGE_SIZE).unwrap();
        assert_eq!(addr, VirtAddr::new(PAGE_SIZE));
        assert_eq!(mm.free_regions(0).unwrap().len(), 2);
        assert_tiled(&mm);
    }

    #[test]
    fn test_read_write_bounds() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 10).unwrap();

        mm.write_byte(&dev.backing(), rid(0), 9, 0x5A).unwrap();
        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 9), Ok(0x5A));
        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 10), Err(MemError::InvalidAddress));
        assert_eq!(mm.read_byte(&dev.backing(), rid(1), 0), Err(MemError::InvalidRegion));
    }

    #[test]
    fn test_translate_composes_frame_and_offset() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 2 * PAGE_SIZE).unwrap();

        let phys = mm.translate(&dev.backing(), VirtAddr::new(PAGE_SIZE + 3)).unwrap();
        assert_eq!(phys, PhysAddr::from_frame(1, 3));
        assert_eq!(
            mm.translate(&dev.backing(), VirtAddr::new(MAX_VIRT_SIZE)),
            Err(MemError::InvalidAddress)
        );
    }

    #[test]
    fn test_frame_exhausted_without_victims() {
        let dev = Devices::new(0, 4);
        let mm = AddressSpace::new(1);
        assert_eq!(mm.allocate(&dev.backing(), 0, rid(0), 1), Err(MemError::FrameExhausted));
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, 0)));
    }

    #[test]
    fn test_failed_growth_returns_fresh_frames() {
        let dev = Devices::new(2, 0);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), PAGE_SIZE).unwrap();

        // One frame comes fresh, the second needs swap that is absent
        assert_eq!(
            mm.allocate(&dev.backing(), 0, rid(1), 2 * PAGE_SIZE),
            Err(MemError::SwapExhausted)
        );
        assert_eq!(dev.ram.free_frames(), 1);
        assert_eq!(mm.resident_pages(), [PageNum(0)]);
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, PAGE_SIZE)));
        assert_tiled(&mm);
    }

    #[test]
    fn test_single_growth_larger_than_ram() {
        let dev = Devices::new(2, 4);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 4 * PAGE_SIZE).unwrap();

        assert!(matches!(mm.page_state(PageNum(0)), Ok(PageState::Swapped { .. })));
        assert!(matches!(mm.page_state(PageNum(1)), Ok(PageState::Swapped { .. })));
        assert_eq!(mm.resident_pages(), [PageNum(2), PageNum(3)]);
        assert_eq!(dev.swap[0].free_frames(), 2);
    }

    #[test]
    fn test_failed_growth_rolls_back_own_pages() {
        let dev = Devices::new(1, 1);
        let mm = AddressSpace::new(1);
        // Page 0 takes the frame, page 1 evicts page 0 into the only
        // slot, page 2 finds swap full
        assert_eq!(
            mm.allocate(&dev.backing(), 0, rid(0), 3 * PAGE_SIZE),
            Err(MemError::SwapExhausted)
        );
        assert_eq!(dev.ram.free_frames(), 1);
        assert_eq!(dev.swap[0].free_frames(), 1);
        assert!(mm.resident_pages().is_empty());
        assert_eq!(mm.page_state(PageNum(0)), Ok(PageState::Unmapped));
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, 0)));
    }

    #[test]
    fn test_region_survives_failed_growth() {
        let dev = Devices::new(1, 1);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), PAGE_SIZE).unwrap();
        mm.write_byte(&dev.backing(), rid(0), 5, 0x42).unwrap();

        // Page 1 evicts page 0 into the only slot and is rolled back
        // when page 2 finds swap full
        assert_eq!(
            mm.allocate(&dev.backing(), 0, rid(1), 2 * PAGE_SIZE),
            Err(MemError::SwapExhausted)
        );
        assert!(mm.resident_pages().is_empty());
        assert!(matches!(mm.page_state(PageNum(0)), Ok(PageState::Swapped { .. })));

        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 5), Ok(0x42));
        assert_eq!(mm.resident_pages(), [PageNum(0)]);
        assert_eq!(dev.ram.free_frames(), 0);
        assert_eq!(dev.swap[0].free_frames(), 1);
        assert_tiled(&mm);
    }

    #[test]
    fn test_growth_size_overflow() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);
        assert_eq!(
            mm.allocate(&dev.backing(), 0, rid(0), usize::MAX),
            Err(MemError::OutOfVirtualMemory)
        );
        mm.allocate(&dev.backing(), 0, rid(0), 1).unwrap();
        assert_eq!(
            mm.allocate(&dev.backing(), 0, rid(1), MAX_VIRT_SIZE - PAGE_SIZE + 1),
            Err(MemError::OutOfVirtualMemory)
        );
        assert_eq!(dev.ram.free_frames(), 1);
    }

    #[test]
    fn test_out_of_bounds_transfer_is_atomic() {
        let dev = Devices::new(2, 2);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 10).unwrap();

        assert_eq!(
            mm.write_bytes(&dev.backing(), rid(0), 8, &[7, 7, 7]),
            Err(MemError::InvalidAddress)
        );
        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 8), Ok(0));
        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 9), Ok(0));

        let mut buf = [0xFFu8; 2];
        assert_eq!(
            mm.read_bytes(&dev.backing(), rid(0), usize::MAX, &mut buf),
            Err(MemError::InvalidAddress)
        );
        assert_eq!(buf, [0xFF; 2]);
        assert_eq!(
            mm.write_bytes(&dev.backing(), rid(1), 0, &[1]),
            Err(MemError::InvalidRegion)
        );
    }

    #[test]
    fn test_growth_evicts_when_ram_full() {
        let dev = Devices::new(1, 4);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), PAGE_SIZE).unwrap();
        mm.write_byte(&dev.backing(), rid(0), 0, 0x77).unwrap();

        mm.allocate(&dev.backing(), 0, rid(1), PAGE_SIZE).unwrap();
        assert_eq!(mm.page_state(PageNum(0)), Ok(PageState::Swapped { device: 0, offset: 0 }));
        assert_eq!(mm.page_state(PageNum(1)), Ok(PageState::Resident { frame: 0 }));
        // The reused frame comes back clean
        assert_eq!(mm.read_byte(&dev.backing(), rid(1), 0), Ok(0));
        assert_eq!(mm.read_byte(&dev.backing(), rid(0), 0), Ok(0x77));
    }

    #[test]
    fn test_reclaim_all_returns_everything() {
        let dev = Devices::new(2, 4);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 3 * PAGE_SIZE).unwrap();
        assert_eq!(dev.ram.free_frames(), 0);
        assert_eq!(dev.swap[0].free_frames(), 3);

        mm.reclaim_all(&dev.backing());
        assert_eq!(dev.ram.free_frames(), 2);
        assert_eq!(dev.swap[0].free_frames(), 4);
        assert!(mm.regions().is_empty());
        assert_eq!(mm.vma_extent(0), Ok(Region::new(0, 0)));

        // Idempotent
        mm.reclaim_all(&dev.backing());
        assert_eq!(dev.ram.free_frames(), 2);
    }

    #[test]
    fn test_dump_page_table() {
        let dev = Devices::new(1, 2);
        let mm = AddressSpace::new(1);
        mm.allocate(&dev.backing(), 0, rid(0), 2 * PAGE_SIZE).unwrap();

        let dump = mm.dump_page_table(0..usize::MAX);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "PTE[0]: 0xc0000000 | present=1 | fpn=0 | swapped=1 | swp_offset=0"
        );
        assert_eq!(
            lines[1],
            "PTE[1]: 0x80000000 | present=1 | fpn=0 | swapped=0 | swp_offset=0"
        );
        assert!(mm.dump_page_table(2..10).is_empty());
    }
}

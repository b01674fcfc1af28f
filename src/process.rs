//! Process Memory Handle
//!
//! The view of a process that the memory manager needs: its id, its
//! address space, the RAM device and its swap devices. RAM and swap may
//! be shared with other processes; the address space is private.
//!
//! Dropping a [`Process`] reclaims every frame it still holds.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use crate::config::MemoryConfig;
use crate::mm::{AddressSpace, Backing, MemError, MemPhy, RegionId, VirtAddr};

/// A simulated process as seen by the memory manager.
pub struct Process {
    pid: u32,
    mm: AddressSpace,
    ram: Arc<MemPhy>,
    swap: Vec<Arc<MemPhy>>,
    active_swap: AtomicUsize,
}

impl Process {
    /// Create a process over existing devices. Swap device 0 starts active.
    pub fn new(pid: u32, ram: Arc<MemPhy>, swap: Vec<Arc<MemPhy>>) -> Result<Self, MemError> {
        Backing::new(&ram, &swap, 0)?;

        debug!("pid {}: {} RAM frames, {} swap devices", pid, ram.total_frames(), swap.len());
        Ok(Self {
            pid,
            mm: AddressSpace::new(pid),
            ram,
            swap,
            active_swap: AtomicUsize::new(0),
        })
    }

    /// Create a process with private devices sized by `config`.
    pub fn from_config(pid: u32, config: &MemoryConfig) -> Result<Self, MemError> {
        config.validate()?;
        let ram = Arc::new(MemPhy::new(config.ram_size));
        let swap = config
            .swap_sizes
            .iter()
            .map(|&size| Arc::new(MemPhy::new(size)))
            .collect();
        Self::new(pid, ram, swap)
    }

    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    #[inline]
    pub fn address_space(&self) -> &AddressSpace {
        &self.mm
    }

    #[inline]
    pub fn ram(&self) -> &Arc<MemPhy> {
        &self.ram
    }

    /// Swap device by index.
    #[inline]
    pub fn swap(&self, index: usize) -> Option<&Arc<MemPhy>> {
        self.swap.get(index)
    }

    /// Index of the device receiving evicted pages.
    #[inline]
    pub fn active_swap(&self) -> usize {
        self.active_swap.load(Ordering::Acquire)
    }

    /// Route future evictions to swap device `index`.
    pub fn set_active_swap(&self, index: usize) -> Result<(), MemError> {
        if index >= self.swap.len() {
            return Err(MemError::InvalidSwapDevice);
        }
        self.active_swap.store(index, Ordering::Release);
        Ok(())
    }

    fn backing(&self) -> Backing<'_> {
        Backing::validated(&self.ram, &self.swap, self.active_swap())
    }

    /// Allocate `size` bytes in VMA 0 under region id `region`.
    pub fn alloc(&self, region: usize, size: usize) -> Result<VirtAddr, MemError> {
        self.alloc_in(0, region, size)
    }

    /// Allocate `size` bytes in area `vma_id` under region id `region`.
    pub fn alloc_in(
        &self,
        vma_id: usize,
        region: usize,
        size: usize,
    ) -> Result<VirtAddr, MemError> {
        self.mm.allocate(&self.backing(), vma_id, RegionId::try_from(region)?, size)
    }

    /// Release region `region`.
    pub fn free(&self, region: usize) -> Result<(), MemError> {
        self.mm.deallocate(RegionId::try_from(region)?)
    }

    /// Read one byte at `offset` in `region`.
    pub fn read(&self, region: usize, offset: usize) -> Result<u8, MemError> {
        self.mm.read_byte(&self.backing(), RegionId::try_from(region)?, offset)
    }

    /// Write one byte at `offset` in `region`.
    pub fn write(&self, region: usize, offset: usize, value: u8) -> Result<(), MemError> {
        self.mm.write_byte(&self.backing(), RegionId::try_from(region)?, offset, value)
    }

    /// Fill `buf` from `region` starting at `offset`.
    pub fn read_bytes(&self, region: usize, offset: usize, buf: &mut [u8]) -> Result<(), MemError> {
        self.mm.read_bytes(&self.backing(), RegionId::try_from(region)?, offset, buf)
    }

    /// Copy `data` into `region` starting at `offset`.
    pub fn write_bytes(&self, region: usize, offset: usize, data: &[u8]) -> Result<(), MemError> {
        self.mm.write_bytes(&self.backing(), RegionId::try_from(region)?, offset, data)
    }

    /// Give back every RAM frame and swap slot. Called on termination.
    pub fn reclaim_all(&self) {
        self.mm.reclaim_all(&self.backing());
    }

    /// Diagnostic listing of mapped page table entries in `range`.
    pub fn dump_page_table(&self, range: Range<usize>) -> alloc::string::String {
        self.mm.dump_page_table(range)
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.reclaim_all();
    }
}

//! Memory management module
//!
//! Provides:
//! - Physical RAM and swap devices with free-frame tracking
//! - Packed page table entries and a flat page directory
//! - Growable virtual memory areas with first-fit region allocation
//! - FIFO page replacement with swapping between RAM and swap devices
//!
//! # Locking
//! - Each address space is guarded by one spinlock held for the whole
//!   of every operation
//! - Each physical device has its own spinlock, always taken after the
//!   address-space lock and only for the duration of one access

mod address;
mod error;
mod frame;
mod paging;
mod region;
mod space;
mod swap;
mod vma;

pub use address::{page_align_up, pages_for, PageNum, PhysAddr, VirtAddr};
pub use error::MemError;
pub use frame::{copy_page, MemPhy};
pub use paging::{PageDirectory, PageState, PageTableEntry, PteFlags};
pub use region::{FreeList, Region, RegionId, SymbolTable};
pub use space::{create_address_space, AddressSpace};
pub use swap::{Backing, ResidencyFifo};
pub use vma::Vma;

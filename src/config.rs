//! Memory Geometry and Sizing
//!
//! Compile-time constants describe the paging geometry shared by every
//! address space. [`MemoryConfig`] sizes the physical devices handed to
//! a process at creation.

use alloc::vec::Vec;

use crate::mm::MemError;

/// Page size (256 bytes)
pub const PAGE_SIZE: usize = 256;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 8;

/// Width of a virtual address in bits.
pub const VIRT_ADDR_BITS: usize = 22;
/// Number of page directory entries (one per virtual page).
pub const MAX_PGN: usize = 1 << (VIRT_ADDR_BITS - PAGE_SHIFT);
/// Size of the virtual address space in bytes.
pub const MAX_VIRT_SIZE: usize = MAX_PGN * PAGE_SIZE;

/// Number of region slots in a symbol table.
pub const SYMTBL_SIZE: usize = 30;

/// Maximum number of swap devices per process.
pub const MAX_SWAP_DEVICES: usize = 4;

/// Largest frame number a page table entry can hold (13-bit field).
pub const MAX_RAM_FRAMES: usize = 1 << 13;
/// Largest swap offset a page table entry can hold (21-bit field).
pub const MAX_SWAP_FRAMES: usize = 1 << 21;

/// Default RAM size: 1 MiB.
pub const DEFAULT_RAM_SIZE: usize = 0x10_0000;
/// Default swap size: 16 MiB.
pub const DEFAULT_SWAP_SIZE: usize = 0x100_0000;

/// Sizes (in bytes) of the physical devices backing a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// RAM size in bytes.
    pub ram_size: usize,
    /// Swap device sizes in bytes; device 0 starts out active.
    pub swap_sizes: Vec<usize>,
}

impl MemoryConfig {
    /// A configuration with the given RAM size and no swap devices yet.
    pub fn new(ram_size: usize) -> Self {
        Self {
            ram_size,
            swap_sizes: Vec::new(),
        }
    }

    /// Add a swap device of `size` bytes.
    pub fn with_swap(mut self, size: usize) -> Self {
        self.swap_sizes.push(size);
        self
    }

    /// Number of RAM frames this configuration describes.
    pub fn ram_frames(&self) -> usize {
        self.ram_size / PAGE_SIZE
    }

    /// Check that every device is a whole number of pages and fits the
    /// page table entry fields.
    pub fn validate(&self) -> Result<(), MemError> {
        if self.ram_size % PAGE_SIZE != 0 || self.ram_frames() > MAX_RAM_FRAMES {
            return Err(MemError::InvalidConfig);
        }

        if self.swap_sizes.is_empty() || self.swap_sizes.len() > MAX_SWAP_DEVICES {
            return Err(MemError::InvalidConfig);
        }

        for &size in &self.swap_sizes {
            if size % PAGE_SIZE != 0 || size / PAGE_SIZE > MAX_SWAP_FRAMES {
                return Err(MemError::InvalidConfig);
            }
        }

        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RAM_SIZE).with_swap(DEFAULT_SWAP_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        assert_eq!(1 << PAGE_SHIFT, PAGE_SIZE);
        assert_eq!(MAX_PGN, 16384);
        assert_eq!(MAX_VIRT_SIZE, 1 << 22);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MemoryConfig::default();
        assert_eq!(config.ram_frames(), 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        // Not a whole number of pages
        assert_eq!(
            MemoryConfig::new(PAGE_SIZE + 1).with_swap(PAGE_SIZE).validate(),
            Err(MemError::InvalidConfig)
        );
        // No swap at all
        assert_eq!(
            MemoryConfig::new(PAGE_SIZE).validate(),
            Err(MemError::InvalidConfig)
        );
        // Too many swap devices
        let mut config = MemoryConfig::new(PAGE_SIZE);
        for _ in 0..=MAX_SWAP_DEVICES {
            config = config.with_swap(PAGE_SIZE);
        }
        assert_eq!(config.validate(), Err(MemError::InvalidConfig));
    }
}

//! Sierra VM - Paging Memory Manager for a Simulated Multiprocess OS
//!
//! Each process gets a private virtual address space backed by a shared
//! RAM device and one or more swap devices. Pages that do not fit in
//! RAM are swapped out in FIFO order and brought back on access.
//!
//! # Components
//! - [`mm::MemPhy`]: byte-addressable RAM or swap device
//! - [`mm::PageTableEntry`]: packed 32-bit page table entry
//! - [`mm::AddressSpace`]: page directory, areas, regions, residency
//! - [`Process`]: the handle the rest of the OS passes around
//!
//! # Example
//! ```
//! use sierra_vm::{MemoryConfig, Process};
//!
//! let config = MemoryConfig::new(2 * 256).with_swap(16 * 256);
//! let proc = Process::from_config(1, &config).unwrap();
//! proc.alloc(0, 300).unwrap();
//! proc.write(0, 5, 0x42).unwrap();
//! assert_eq!(proc.read(0, 5), Ok(0x42));
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod mm;
mod process;

pub use config::MemoryConfig;
pub use mm::MemError;
pub use process::Process;

//! Physical Memory Devices
//!
//! A [`MemPhy`] is a byte-addressable device split into fixed-size
//! frames, used both for RAM and for swap. Free frames are tracked with
//! a bitmap.
//!
//! # Design
//! - Each bit in the bitmap represents one frame
//! - Bit = 0: frame is free
//! - Bit = 1: frame is allocated
//! - Allocated frames are zeroed before they are handed out
//! - Double-free and out-of-range accesses panic
//! - Each device is protected by its own spinlock

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write;

use spin::Mutex;

use super::address::PhysAddr;
use crate::config::PAGE_SIZE;

/// Device state.
struct MemPhyInner {
    /// Backing bytes, `total_frames * PAGE_SIZE` long.
    storage: Vec<u8>,
    /// Bitmap tracking allocated frames (1 = allocated, 0 = free).
    bitmap: Vec<u8>,
    /// Number of free frames remaining.
    free_count: usize,
    /// Total frames under management.
    total_frames: usize,
}

impl MemPhyInner {
    fn new(total_frames: usize) -> Self {
        Self {
            storage: vec![0; total_frames * PAGE_SIZE],
            bitmap: vec![0; total_frames.div_ceil(8)],
            free_count: total_frames,
            total_frames,
        }
    }

    /// Set a bit in the bitmap.
    #[inline]
    fn set_bit(&mut self, frame: usize, allocated: bool) {
        let byte_idx = frame / 8;
        let bit_idx = frame % 8;

        if allocated {
            self.bitmap[byte_idx] |= 1 << bit_idx;
        } else {
            self.bitmap[byte_idx] &= !(1 << bit_idx);
        }
    }

    /// Check if a frame is allocated.
    #[inline]
    fn is_allocated(&self, frame: usize) -> bool {
        (self.bitmap[frame / 8] >> (frame % 8)) & 1 == 1
    }

    /// Allocate a single frame.
    fn alloc(&mut self) -> Option<usize> {
        if self.free_count == 0 {
            return None;
        }

        let (byte_idx, byte) = self
            .bitmap
            .iter()
            .enumerate()
            .find(|(_, byte)| **byte != 0xFF)?;
        let frame = byte_idx * 8 + byte.trailing_ones() as usize;
        if frame >= self.total_frames {
            return None;
        }

        self.set_bit(frame, true);
        self.free_count -= 1;
        self.frame_bytes_mut(frame).fill(0);
        Some(frame)
    }

    /// Free a previously allocated frame.
    fn free(&mut self, frame: usize) {
        if frame >= self.total_frames {
            panic!(
                "Attempted to free frame {} outside device of {} frames",
                frame, self.total_frames
            );
        }

        if !self.is_allocated(frame) {
            panic!("Double free detected for frame {}", frame);
        }

        self.set_bit(frame, false);
        self.free_count += 1;
    }

    #[inline]
    fn frame_bytes(&self, frame: usize) -> &[u8] {
        assert!(frame < self.total_frames, "frame {} out of range", frame);
        &self.storage[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE]
    }

    #[inline]
    fn frame_bytes_mut(&mut self, frame: usize) -> &mut [u8] {
        assert!(frame < self.total_frames, "frame {} out of range", frame);
        &mut self.storage[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE]
    }
}

/// A physical memory device (RAM or swap).
pub struct MemPhy {
    inner: Mutex<MemPhyInner>,
}

impl MemPhy {
    /// Create a device of `size` bytes, rounded down to whole frames.
    pub fn new(size: usize) -> Self {
        Self::with_frames(size / PAGE_SIZE)
    }

    /// Create a device holding `frames` frames.
    pub fn with_frames(frames: usize) -> Self {
        Self {
            inner: Mutex::new(MemPhyInner::new(frames)),
        }
    }

    /// Take one free frame. The frame is zeroed.
    ///
    /// Returns `None` if the device is exhausted.
    pub fn get_free_frame(&self) -> Option<usize> {
        self.inner.lock().alloc()
    }

    /// Return a frame to the free set.
    ///
    /// # Panics
    /// Panics if the frame is outside the device or already free.
    pub fn put_free_frame(&self, frame: usize) {
        self.inner.lock().free(frame);
    }

    /// Get the number of free frames remaining.
    pub fn free_frames(&self) -> usize {
        self.inner.lock().free_count
    }

    /// Get the number of frames on the device.
    pub fn total_frames(&self) -> usize {
        self.inner.lock().total_frames
    }

    /// Read one byte.
    ///
    /// # Panics
    /// Panics if `frame` or `offset` is out of range.
    pub fn read_byte(&self, frame: usize, offset: usize) -> u8 {
        assert!(offset < PAGE_SIZE, "offset {} out of page", offset);
        self.inner.lock().frame_bytes(frame)[offset]
    }

    /// Write one byte.
    ///
    /// # Panics
    /// Panics if `frame` or `offset` is out of range.
    pub fn write_byte(&self, frame: usize, offset: usize, value: u8) {
        assert!(offset < PAGE_SIZE, "offset {} out of page", offset);
        self.inner.lock().frame_bytes_mut(frame)[offset] = value;
    }

    /// Read the byte at a composed physical address.
    #[inline]
    pub fn read(&self, addr: PhysAddr) -> u8 {
        self.read_byte(addr.frame(), addr.page_offset())
    }

    /// Write the byte at a composed physical address.
    #[inline]
    pub fn write(&self, addr: PhysAddr, value: u8) {
        self.write_byte(addr.frame(), addr.page_offset(), value)
    }

    /// Copy a whole frame out of the device.
    pub fn read_frame(&self, frame: usize) -> [u8; PAGE_SIZE] {
        let mut page = [0u8; PAGE_SIZE];
        page.copy_from_slice(self.inner.lock().frame_bytes(frame));
        page
    }

    /// Overwrite a whole frame.
    pub fn write_frame(&self, frame: usize, page: &[u8; PAGE_SIZE]) {
        self.inner.lock().frame_bytes_mut(frame).copy_from_slice(page);
    }

    /// Zero a whole frame.
    pub fn zero_frame(&self, frame: usize) {
        self.inner.lock().frame_bytes_mut(frame).fill(0);
    }

    /// List every non-zero byte as `0xADDR: 0xVAL`, one per line.
    pub fn dump(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        for (addr, byte) in inner.storage.iter().enumerate().filter(|(_, b)| **b != 0) {
            let _ = writeln!(out, "{:#010x}: {:#04x}", addr, byte);
        }
        out
    }
}

/// Copy one page between devices, byte for byte.
pub fn copy_page(src: &MemPhy, src_frame: usize, dst: &MemPhy, dst_frame: usize) {
    let page = src.read_frame(src_frame);
    dst.write_frame(dst_frame, &page);
}

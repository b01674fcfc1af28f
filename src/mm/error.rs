//! Memory Manager Errors

/// Error type for virtual memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// No free region fits, even after growing the area.
    OutOfVirtualMemory,
    /// The RAM pool is empty and no resident page can be evicted.
    FrameExhausted,
    /// The active swap device has no free slot for an evicted page.
    SwapExhausted,
    /// Bad region id, empty region, or zero-sized request.
    InvalidRegion,
    /// Page number outside the page directory, or offset outside its region.
    InvalidAddress,
    /// The residency queue was empty when an eviction was required.
    NoVictimAvailable,
    /// Swap device index out of range.
    InvalidSwapDevice,
    /// Device sizes that do not fit the paging geometry.
    InvalidConfig,
}

impl core::fmt::Display for MemError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfVirtualMemory => write!(f, "out of virtual memory"),
            Self::FrameExhausted => write!(f, "no free RAM frame"),
            Self::SwapExhausted => write!(f, "no free swap frame"),
            Self::InvalidRegion => write!(f, "invalid memory region"),
            Self::InvalidAddress => write!(f, "invalid virtual address"),
            Self::NoVictimAvailable => write!(f, "no victim page in residency queue"),
            Self::InvalidSwapDevice => write!(f, "invalid swap device"),
            Self::InvalidConfig => write!(f, "invalid memory configuration"),
        }
    }
}

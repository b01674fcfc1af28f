//! Regions, Symbol Tables and Free Lists
//!
//! A region is a named sub-range `[start, end)` of a virtual memory
//! area. A live region sits in its address space's [`SymbolTable`]
//! under a small integer id; a released region sits in the owning
//! area's [`FreeList`]. Regions move between the two and are never
//! merged.

use alloc::collections::VecDeque;

use super::address::VirtAddr;
use super::error::MemError;
use crate::config::SYMTBL_SIZE;

/// A region id, the index into a symbol table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct RegionId(u32);

impl RegionId {
    /// Create a new region id.
    ///
    /// Returns None if the index is out of range.
    #[inline]
    pub const fn new(index: u32) -> Option<Self> {
        if (index as usize) < SYMTBL_SIZE {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Get the index value.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<usize> for RegionId {
    type Error = MemError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        u32::try_from(index)
            .ok()
            .and_then(Self::new)
            .ok_or(MemError::InvalidRegion)
    }
}

/// A virtual range `[start, end)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: VirtAddr,
    pub end: VirtAddr,
}

impl Region {
    /// The cleared region.
    pub const EMPTY: Self = Self::new(0, 0);

    /// Create a region from raw bounds.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start: VirtAddr::new(start),
            end: VirtAddr::new(end),
        }
    }

    /// Size in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.as_usize().saturating_sub(self.start.as_usize())
    }

    /// True unless `start < end`.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start.as_usize() >= self.end.as_usize()
    }

    /// Whether two regions share any byte.
    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Debug for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Region[{:#x}, {:#x})", self.start.as_usize(), self.end.as_usize())
    }
}

/// Live regions of an address space, addressed by [`RegionId`].
///
/// An empty slot holds [`Region::EMPTY`].
#[derive(Debug)]
pub struct SymbolTable {
    slots: [Region; SYMTBL_SIZE],
}

impl SymbolTable {
    /// Create a table with every slot cleared.
    pub const fn new() -> Self {
        Self {
            slots: [Region::EMPTY; SYMTBL_SIZE],
        }
    }

    /// Look up a live region.
    #[inline]
    pub fn lookup(&self, id: RegionId) -> Result<Region, MemError> {
        let region = self.slots[id.index()];
        if region.is_empty() {
            Err(MemError::InvalidRegion)
        } else {
            Ok(region)
        }
    }

    /// Bind a region into an empty slot.
    pub fn insert(&mut self, id: RegionId, region: Region) -> Result<(), MemError> {
        if !self.slots[id.index()].is_empty() || region.is_empty() {
            return Err(MemError::InvalidRegion);
        }
        self.slots[id.index()] = region;
        Ok(())
    }

    /// Take a live region out of its slot.
    pub fn delete(&mut self, id: RegionId) -> Result<Region, MemError> {
        let region = self.lookup(id)?;
        self.slots[id.index()] = Region::EMPTY;
        Ok(region)
    }

    /// Whether a slot is free for binding.
    #[inline]
    pub fn is_free(&self, id: RegionId) -> bool {
        self.slots[id.index()].is_empty()
    }

    /// Iterate over live regions with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, Region)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_empty())
            .map(|(i, r)| (RegionId(i as u32), *r))
    }

    /// Clear every slot.
    pub fn clear(&mut self) {
        self.slots = [Region::EMPTY; SYMTBL_SIZE];
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Reusable sub-ranges of an area. First-fit, never coalesced.
#[derive(Debug, Default)]
pub struct FreeList {
    nodes: VecDeque<Region>,
}

impl FreeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            nodes: VecDeque::new(),
        }
    }

    /// Put a region at the head of the list.
    pub fn insert(&mut self, region: Region) -> Result<(), MemError> {
        if region.is_empty() {
            return Err(MemError::InvalidRegion);
        }
        self.nodes.push_front(region);
        Ok(())
    }

    /// Carve `size` bytes from the front of the first node that fits.
    ///
    /// The node shrinks in place, or is unlinked when consumed exactly.
    pub fn probe(&mut self, size: usize) -> Option<Region> {
        let idx = self.nodes.iter().position(|node| node.len() >= size)?;
        let node = &mut self.nodes[idx];
        let carved = Region {
            start: node.start,
            end: node.start.add(size),
        };

        node.start = carved.end;
        if node.is_empty() {
            self.nodes.remove(idx);
        }

        Some(carved)
    }

    /// Iterate in list order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.nodes.iter()
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the list has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total free bytes.
    pub fn free_bytes(&self) -> usize {
        self.nodes.iter().map(Region::len).sum()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_bounds() {
        assert!(RegionId::new(0).is_some());
        assert!(RegionId::new(SYMTBL_SIZE as u32 - 1).is_some());
        assert!(RegionId::new(SYMTBL_SIZE as u32).is_none());
        assert_eq!(RegionId::try_from(SYMTBL_SIZE), Err(MemError::InvalidRegion));
    }

    #[test]
    fn test_probe_first_fit_shrinks_node() {
        let mut list = FreeList::new();
        list.insert(Region::new(0, 100)).unwrap();

        assert_eq!(list.probe(30), Some(Region::new(0, 30)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next(), Some(&Region::new(30, 100)));
    }

    #[test]
    fn test_probe_exact_fit_unlinks_node() {
        let mut list = FreeList::new();
        list.insert(Region::new(0, 40)).unwrap();
        list.insert(Region::new(100, 110)).unwrap();

        // Head is [100, 110): too small, so the second node is consumed
        assert_eq!(list.probe(40), Some(Region::new(0, 40)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.probe(11), None);
        assert_eq!(list.probe(10), Some(Region::new(100, 110)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_no_coalescing() {
        let mut list = FreeList::new();
        list.insert(Region::new(0, 10)).unwrap();
        list.insert(Region::new(10, 20)).unwrap();

        // Adjacent nodes stay separate, so a 20-byte request misses
        assert_eq!(list.len(), 2);
        assert_eq!(list.free_bytes(), 20);
        assert_eq!(list.probe(20), None);
    }

    #[test]
    fn test_empty_region_rejected() {
        let mut list = FreeList::new();
        assert_eq!(list.insert(Region::new(8, 8)), Err(MemError::InvalidRegion));
    }

    #[test]
    fn test_symbol_table_lifecycle() {
        let mut table = SymbolTable::new();
        let id = RegionId::new(3).unwrap();

        assert_eq!(table.lookup(id), Err(MemError::InvalidRegion));
        table.insert(id, Region::new(0, 16)).unwrap();
        assert_eq!(table.lookup(id), Ok(Region::new(0, 16)));

        // Occupied slot cannot be rebound
        assert_eq!(table.insert(id, Region::new(16, 32)), Err(MemError::InvalidRegion));

        assert_eq!(table.delete(id), Ok(Region::new(0, 16)));
        assert!(table.is_free(id));
        assert_eq!(table.delete(id), Err(MemError::InvalidRegion));
    }

    #[test]
    fn test_overlap() {
        let a = Region::new(0, 10);
        assert!(a.overlaps(&Region::new(9, 12)));
        assert!(!a.overlaps(&Region::new(10, 12)));
    }
}

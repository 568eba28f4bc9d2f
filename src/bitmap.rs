//! Free-block tracking and allocation.
//! A block is free exactly when no live directory entry lists it; the bitmap mirrors
//! that relation so a claim does not have to scan every entry.

use bitvec::vec::BitVec;
use log::debug;

use crate::{DirEntry, Error, Result};

/// Block bitmap. A set bit means "allocated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocator {
    used: BitVec,
}

impl Allocator {
    /// All blocks free.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            used: BitVec::repeat(false, num_blocks),
        }
    }

    /// Rebuilds the bitmap from the allocation lists of live entries.
    /// Fails if a list names a block out of range or a block owned by another entry.
    pub fn from_entries(num_blocks: usize, entries: &[DirEntry]) -> Result<Self> {
        let mut allocator = Self::new(num_blocks);
        for entry in entries.iter().filter(|e| e.is_live()) {
            for &block_id in &entry.blocks {
                let block_id = block_id as usize;
                if block_id >= num_blocks {
                    return Err(Error::CorruptImage("allocation list names a block out of range"));
                }
                if allocator.used.replace(block_id, true) {
                    return Err(Error::CorruptImage("block owned by more than one entry"));
                }
            }
        }
        Ok(allocator)
    }

    pub fn num_blocks(&self) -> usize {
        self.used.len()
    }

    pub fn free_blocks(&self) -> usize {
        self.used.count_zeros()
    }

    pub fn is_allocated(&self, block_id: u32) -> bool {
        self.used.get(block_id as usize).map(|bit| *bit).unwrap_or(false)
    }

    /// Picks the `count` lowest free blocks without claiming them.
    /// All or nothing: fails with `InsufficientSpace` if fewer are free.
    pub fn find_free(&self, count: usize) -> Result<Vec<u32>> {
        let found: Vec<u32> = self
            .used
            .iter_zeros()
            .take(count)
            .map(|block_id| block_id as u32)
            .collect();
        if found.len() < count {
            return Err(Error::InsufficientSpace {
                needed: count,
                free: self.free_blocks(),
            });
        }
        Ok(found)
    }

    /// Claims the `count` lowest free blocks, in ascending order.
    pub fn allocate(&mut self, count: usize) -> Result<Vec<u32>> {
        let blocks = self.find_free(count)?;
        for &block_id in &blocks {
            self.used.set(block_id as usize, true);
        }
        debug!("allocated {} blocks: {:?}", blocks.len(), blocks);
        Ok(blocks)
    }

    /// Returns blocks to the free set. Indices out of range are ignored.
    pub fn release(&mut self, blocks: &[u32]) {
        for &block_id in blocks {
            if let Some(mut bit) = self.used.get_mut(block_id as usize) {
                *bit = false;
            }
        }
        debug!("released {} blocks", blocks.len());
    }

    /// Marks every block free.
    pub fn reset(&mut self) {
        self.used.fill(false);
    }
}

//! The virtual disk: `num_blocks` fixed-size blocks kept in one flat buffer.
//! Blocks are addressed by index and overwritten in place.

use core::fmt;

use crate::{Error, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct BlockStore {
    data: Vec<u8>,
    block_size: usize,
    num_blocks: usize,
}

impl BlockStore {
    /// Creates a zero-filled store.
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        Self {
            data: vec![0u8; block_size * num_blocks],
            block_size,
            num_blocks,
        }
    }

    /// Wraps an existing flat region. `data.len()` must be `block_size * num_blocks`.
    pub fn from_bytes(data: Vec<u8>, block_size: usize, num_blocks: usize) -> Result<Self> {
        if data.len() != block_size * num_blocks {
            return Err(Error::CorruptImage("block region has the wrong length"));
        }
        Ok(Self { data, block_size, num_blocks })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn range(&self, block_id: u32) -> Result<core::ops::Range<usize>> {
        let block_id = block_id as usize;
        if block_id >= self.num_blocks {
            return Err(Error::InvalidArgument("block index out of range"));
        }
        let start = block_id * self.block_size;
        Ok(start..start + self.block_size)
    }

    pub fn block(&self, block_id: u32) -> Result<&[u8]> {
        let range = self.range(block_id)?;
        Ok(&self.data[range])
    }

    pub fn block_mut(&mut self, block_id: u32) -> Result<&mut [u8]> {
        let range = self.range(block_id)?;
        Ok(&mut self.data[range])
    }

    /// Copies `buf` to the start of the block and zeroes the rest of it.
    /// Fails if `buf` is longer than a block.
    pub fn write_block(&mut self, block_id: u32, buf: &[u8]) -> Result<()> {
        if buf.len() > self.block_size {
            return Err(Error::InvalidArgument("data does not fit in one block"));
        }
        let block = self.block_mut(block_id)?;
        let (head, tail) = block.split_at_mut(buf.len());
        head.copy_from_slice(buf);
        tail.fill(0);
        Ok(())
    }

    pub fn zero_block(&mut self, block_id: u32) -> Result<()> {
        self.block_mut(block_id)?.fill(0);
        Ok(())
    }

    /// Zero-fills every block.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// The whole disk as one flat byte region, block 0 first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStore")
            .field("block_size", &self.block_size)
            .field("num_blocks", &self.num_blocks)
            .finish_non_exhaustive()
    }
}

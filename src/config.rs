use crate::{Error, Result};

pub const MAGIC: u32 = 0x49584653; // "IXFS" in ASCII
pub const FORMAT_VERSION: u32 = 1;

pub const BLOCK_SIZE: usize = 1024; // 1 KiB
pub const DISK_SIZE: usize = 64 * 1024 * 1024; // 64 MiB
pub const NUM_BLOCKS: usize = DISK_SIZE / BLOCK_SIZE;
pub const MAX_FILES: usize = 128; // Number of directory slots
pub const MAX_FILE_NAME_LEN: usize = 64;

pub const CONTENT_MASK_KEY: u8 = b'K'; // Applied to file contents as they are written
pub const IMAGE_MASK_KEY: u8 = b'k'; // Applied to the whole block region when saving masked

pub const SUPERBLOCK_SIZE: usize = 64;
pub const DIR_RECORD_SIZE: usize = 88; // name + start + blocks + len + flags + reserved
pub const NO_BLOCK: u32 = u32::MAX; // On-disk encoding of an unset start block

/// Sizing of a virtual disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub num_blocks: usize,
    pub max_files: usize,
}

impl Geometry {
    pub fn new(block_size: usize, num_blocks: usize, max_files: usize) -> Result<Self> {
        let geometry = Self { block_size, num_blocks, max_files };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > u32::MAX as usize {
            return Err(Error::InvalidArgument("block size must be in 1..=u32::MAX"));
        }
        // NO_BLOCK is reserved, so the highest index must stay below it.
        if self.num_blocks == 0 || self.num_blocks >= NO_BLOCK as usize {
            return Err(Error::InvalidArgument("block count must be in 1..u32::MAX"));
        }
        if self.max_files == 0 || self.max_files > u32::MAX as usize {
            return Err(Error::InvalidArgument("slot count must be in 1..=u32::MAX"));
        }
        if self.block_size.checked_mul(self.num_blocks).is_none() {
            return Err(Error::InvalidArgument("disk size overflows usize"));
        }
        Ok(())
    }

    /// Size in bytes of the raw block region.
    pub fn disk_size(&self) -> usize {
        self.block_size * self.num_blocks
    }

    /// Number of blocks needed to hold `len` bytes.
    pub fn blocks_for(&self, len: usize) -> usize {
        len.div_ceil(self.block_size)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            num_blocks: NUM_BLOCKS,
            max_files: MAX_FILES,
        }
    }
}

/// Everything a [`FileSystem`](crate::FileSystem) needs besides its device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub geometry: Geometry,
    /// Mask the block region on every automatic save.
    pub mask_image: bool,
}

impl Config {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, mask_image: false }
    }

    pub fn masked(mut self) -> Self {
        self.mask_image = true;
        self
    }
}

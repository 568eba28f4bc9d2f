use sha2::{Digest, Sha256};

use crate::config::*;
use crate::structs::{read_u32, read_u64, SuperBlock, SB_FLAG_MASKED};
use crate::{Error, Geometry, Result};

impl SuperBlock {
    /// Header for `payload` laid out with `geometry`.
    pub fn new(geometry: &Geometry, masked: bool, payload: &[u8]) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            block_size: geometry.block_size as u32,
            num_blocks: geometry.num_blocks as u32,
            max_files: geometry.max_files as u32,
            flags: if masked { SB_FLAG_MASKED } else { 0 },
            payload_len: payload.len() as u64,
            digest: Sha256::digest(payload).into(),
        }
    }

    pub fn is_masked(&self) -> bool {
        self.flags & SB_FLAG_MASKED != 0
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            block_size: self.block_size as usize,
            num_blocks: self.num_blocks as usize,
            max_files: self.max_files as usize,
        }
    }

    /// Checks `payload` against the recorded length and digest.
    pub fn verify_payload(&self, payload: &[u8]) -> Result<()> {
        if payload.len() as u64 != self.payload_len {
            return Err(Error::CorruptImage("payload length does not match the header"));
        }
        let digest: [u8; 32] = Sha256::digest(payload).into();
        if digest != self.digest {
            return Err(Error::ChecksumMismatch);
        }
        Ok(())
    }
}

pub fn read_superblock(image: &[u8]) -> Result<SuperBlock> {
    if image.len() < SUPERBLOCK_SIZE {
        return Err(Error::CorruptImage("image is shorter than its header"));
    }
    let mut digest = [0; 32];
    digest.copy_from_slice(&image[32..64]);
    let superblock = SuperBlock {
        magic: read_u32(image, 0),
        version: read_u32(image, 4),
        block_size: read_u32(image, 8),
        num_blocks: read_u32(image, 12),
        max_files: read_u32(image, 16),
        flags: read_u32(image, 20),
        payload_len: read_u64(image, 24),
        digest,
    };

    if superblock.magic != MAGIC {
        return Err(Error::InvalidMagic);
    }
    if superblock.version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion(superblock.version));
    }
    if superblock.flags & !SB_FLAG_MASKED != 0 {
        return Err(Error::CorruptImage("unknown header flags"));
    }

    Ok(superblock)
}

pub fn write_superblock(superblock: &SuperBlock, out: &mut Vec<u8>) {
    out.extend_from_slice(&superblock.magic.to_le_bytes());
    out.extend_from_slice(&superblock.version.to_le_bytes());
    out.extend_from_slice(&superblock.block_size.to_le_bytes());
    out.extend_from_slice(&superblock.num_blocks.to_le_bytes());
    out.extend_from_slice(&superblock.max_files.to_le_bytes());
    out.extend_from_slice(&superblock.flags.to_le_bytes());
    out.extend_from_slice(&superblock.payload_len.to_le_bytes());
    out.extend_from_slice(&superblock.digest);
}

//! Serialization of the whole file system into one image.
//!
//! Image layout:
//! - Superblock (magic, version, geometry, flags, payload length, payload digest)
//! - Block region: every block in index order, optionally masked
//! - Directory table: one fixed-size record per slot
//! - Allocation lists: for each live slot in slot order, a count and that many block indices
//!
//! Loading walks the live slots in the same order as saving, so the two must stay in step.

use log::{debug, warn};

use crate::bitmap::Allocator;
use crate::config::*;
use crate::mask::apply_mask;
use crate::structs::{read_u32, DirEntry, EntryKind, SuperBlock};
use crate::superblock::{read_superblock, write_superblock};
use crate::{BlockStore, DirectoryTable, Error, Geometry, Result};

/// Everything restored from an image.
#[derive(Debug)]
pub struct Loaded {
    pub store: BlockStore,
    pub table: DirectoryTable,
    pub allocator: Allocator,
    pub masked: bool,
}

pub fn encode_image(
    geometry: &Geometry,
    store: &BlockStore,
    table: &DirectoryTable,
    masked: bool,
) -> Vec<u8> {
    let alloc_len: usize = table.live().map(|(_, entry)| 4 + 4 * entry.blocks.len()).sum();
    let mut image = Vec::with_capacity(
        SUPERBLOCK_SIZE + store.as_bytes().len() + table.capacity() * DIR_RECORD_SIZE + alloc_len,
    );
    image.resize(SUPERBLOCK_SIZE, 0); // Filled in once the payload is known

    image.extend_from_slice(store.as_bytes());
    if masked {
        apply_mask(&mut image[SUPERBLOCK_SIZE..], IMAGE_MASK_KEY);
    }

    for entry in table.slots() {
        entry.encode_record(&mut image);
    }

    for (_, entry) in table.live() {
        image.extend_from_slice(&(entry.blocks.len() as u32).to_le_bytes());
        for block_id in &entry.blocks {
            image.extend_from_slice(&block_id.to_le_bytes());
        }
    }

    let superblock = SuperBlock::new(geometry, masked, &image[SUPERBLOCK_SIZE..]);
    let mut header = Vec::with_capacity(SUPERBLOCK_SIZE);
    write_superblock(&superblock, &mut header);
    image[..SUPERBLOCK_SIZE].copy_from_slice(&header);

    debug!("encoded image: {} bytes, masked: {}", image.len(), masked);
    image
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(Error::CorruptImage(what));
        };
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(read_u32(self.take(4, what)?, 0))
    }
}

/// Restores a file system from `image`, which must have been laid out with `geometry`.
pub fn decode_image(image: &[u8], geometry: &Geometry) -> Result<Loaded> {
    let superblock = read_superblock(image)?;
    if superblock.geometry() != *geometry {
        return Err(Error::GeometryMismatch);
    }
    let payload = &image[SUPERBLOCK_SIZE..];
    superblock.verify_payload(payload)?;

    let mut reader = Reader { buf: payload, pos: 0 };

    let mut region = reader.take(geometry.disk_size(), "truncated block region")?.to_vec();
    if superblock.is_masked() {
        apply_mask(&mut region, IMAGE_MASK_KEY);
    }
    let store = BlockStore::from_bytes(region, geometry.block_size, geometry.num_blocks)?;

    let mut slots = Vec::with_capacity(geometry.max_files);
    for _ in 0..geometry.max_files {
        let record = reader.take(DIR_RECORD_SIZE, "truncated directory table")?;
        slots.push(DirEntry::decode_record(record)?);
    }

    for (index, entry) in slots.iter_mut().enumerate().filter(|(_, e)| e.is_live()) {
        let count = reader.u32("truncated allocation list")? as usize;
        if count > geometry.num_blocks {
            return Err(Error::CorruptImage("allocation list longer than the disk"));
        }
        entry.blocks = (0..count)
            .map(|_| reader.u32("truncated allocation list"))
            .collect::<Result<_>>()?;
        check_entry(index, entry, geometry)?;
    }

    if reader.pos != payload.len() {
        return Err(Error::CorruptImage("trailing bytes after allocation lists"));
    }

    let allocator = Allocator::from_entries(geometry.num_blocks, &slots)?;
    Ok(Loaded {
        store,
        table: DirectoryTable::from_slots(slots),
        allocator,
        masked: superblock.is_masked(),
    })
}

fn check_entry(index: usize, entry: &mut DirEntry, geometry: &Geometry) -> Result<()> {
    match entry.kind {
        EntryKind::File => {
            if entry.blocks.len() != entry.size_in_blocks as usize {
                return Err(Error::CorruptImage("file block count does not match its size"));
            }
            if entry.len_bytes > (entry.blocks.len() * geometry.block_size) as u64 {
                return Err(Error::CorruptImage("file length exceeds its blocks"));
            }
        }
        EntryKind::Directory => {
            if entry.size_in_blocks != 0 || entry.len_bytes != 0 {
                return Err(Error::CorruptImage("directory with a data size"));
            }
        }
    }
    if entry.start_block != entry.blocks.first().copied() {
        warn!(
            "slot {}: start block {:?} disagrees with allocation list, using {:?}",
            index,
            entry.start_block,
            entry.blocks.first()
        );
        entry.start_block = entry.blocks.first().copied();
    }
    Ok(())
}

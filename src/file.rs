//! Reading and writing file contents through an entry's allocation list.
//! File contents are stored masked with `CONTENT_MASK_KEY`.

use crate::config::CONTENT_MASK_KEY;
use crate::mask::apply_mask;
use crate::{BlockStore, DirEntry, Error, Result};

/// Returns the contents of `entry`: its data blocks in order, unmasked and cut to its length.
/// Works on a copy, the stored bytes are left as they are.
pub fn fread(store: &BlockStore, entry: &DirEntry) -> Result<Vec<u8>> {
    let len = entry.len_bytes as usize;
    let mut buffer = Vec::with_capacity(len);

    for &block_id in entry.data_blocks() {
        let remaining = len - buffer.len();
        if remaining == 0 {
            break;
        }
        let block = store.block(block_id)?;
        let bytes_to_read = block.len().min(remaining);
        buffer.extend_from_slice(&block[..bytes_to_read]);
    }

    if buffer.len() != len {
        return Err(Error::CorruptImage("file length exceeds its blocks"));
    }
    apply_mask(&mut buffer, CONTENT_MASK_KEY);
    Ok(buffer)
}

/// Writes `data` across `blocks` in order, masked.
/// Bytes of the blocks past the end of `data` are zeroed.
pub fn fwrite(store: &mut BlockStore, blocks: &[u32], data: &[u8]) -> Result<()> {
    let block_size = store.block_size();
    if data.len() > blocks.len() * block_size {
        return Err(Error::InvalidArgument("data exceeds the allocated blocks"));
    }

    let mut chunks = data.chunks(block_size);
    let mut block_buf = Vec::with_capacity(block_size);
    for &block_id in blocks {
        block_buf.clear();
        if let Some(chunk) = chunks.next() {
            block_buf.extend_from_slice(chunk);
            apply_mask(&mut block_buf, CONTENT_MASK_KEY);
        }
        store.write_block(block_id, &block_buf)?;
    }

    Ok(())
}

use crate::config::*;
use crate::Error;
use crate::Result;

/// Image header, stored in the first `SUPERBLOCK_SIZE` bytes of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,         // Magic number to identify the image
    pub version: u32,       // Image format version
    pub block_size: u32,    // Bytes per block
    pub num_blocks: u32,    // Total number of blocks in the block region
    pub max_files: u32,     // Number of directory slots
    pub flags: u32,         // SB_FLAG_* bits
    pub payload_len: u64,   // Bytes following the header
    pub digest: [u8; 32],   // SHA-256 of the payload as stored
}

pub const SB_FLAG_MASKED: u32 = 1 << 0; // Block region is masked with IMAGE_MASK_KEY

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

const ENTRY_FLAG_DELETED: u8 = 1 << 0;
const ENTRY_FLAG_DIRECTORY: u8 = 1 << 1;

/// One directory slot.
/// The slot owns its allocation list, so the slot index needs no separate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; MAX_FILE_NAME_LEN], // NUL padded
    pub start_block: Option<u32>,
    pub size_in_blocks: u32,
    pub len_bytes: u64,
    pub deleted: bool,
    pub kind: EntryKind,
    /// Blocks owned by this slot, in data order. Empty while tombstoned.
    pub blocks: Vec<u32>,
}

impl DirEntry {
    pub const FREE: Self = Self {
        name: [0; MAX_FILE_NAME_LEN],
        start_block: None,
        size_in_blocks: 0,
        len_bytes: 0,
        deleted: true,
        kind: EntryKind::File,
        blocks: Vec::new(),
    };

    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Name bytes without the NUL padding.
    pub fn name_bytes(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn name_eq(&self, name: &[u8]) -> bool {
        self.name_bytes() == name
    }

    /// Blocks that hold file data, in order.
    pub fn data_blocks(&self) -> &[u32] {
        let used = (self.size_in_blocks as usize).min(self.blocks.len());
        &self.blocks[..used]
    }

    /// Appends the fixed-size on-disk record. The allocation list is stored separately.
    pub fn encode_record(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.start_block.unwrap_or(NO_BLOCK).to_le_bytes());
        out.extend_from_slice(&self.size_in_blocks.to_le_bytes());
        out.extend_from_slice(&self.len_bytes.to_le_bytes());
        let mut flags = 0;
        if self.deleted {
            flags |= ENTRY_FLAG_DELETED;
        }
        if self.is_directory() {
            flags |= ENTRY_FLAG_DIRECTORY;
        }
        out.push(flags);
        out.resize(start + DIR_RECORD_SIZE, 0); // reserved
    }

    /// Parses a record written by `encode_record`. The returned entry has no blocks yet.
    pub fn decode_record(buf: &[u8]) -> Result<Self> {
        if buf.len() != DIR_RECORD_SIZE {
            return Err(Error::CorruptImage("directory record has the wrong length"));
        }
        let (name_buf, rest) = buf.split_at(MAX_FILE_NAME_LEN);
        let mut name = [0; MAX_FILE_NAME_LEN];
        name.copy_from_slice(name_buf);
        let start_block = read_u32(rest, 0);
        let flags = rest[16];
        if flags & !(ENTRY_FLAG_DELETED | ENTRY_FLAG_DIRECTORY) != 0 {
            return Err(Error::CorruptImage("unknown directory record flags"));
        }
        Ok(Self {
            name,
            start_block: (start_block != NO_BLOCK).then_some(start_block),
            size_in_blocks: read_u32(rest, 4),
            len_bytes: read_u64(rest, 8),
            deleted: flags & ENTRY_FLAG_DELETED != 0,
            kind: if flags & ENTRY_FLAG_DIRECTORY != 0 {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            blocks: Vec::new(),
        })
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self::FREE
    }
}

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

/// Checks an entry name and packs it into the fixed-size record field.
pub fn pack_name(name: &str) -> Result<[u8; MAX_FILE_NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(Error::InvalidArgument("name is empty"));
    }
    if bytes.len() > MAX_FILE_NAME_LEN {
        return Err(Error::InvalidArgument("name is too long"));
    }
    if bytes.contains(&0) {
        return Err(Error::InvalidArgument("name contains a NUL byte"));
    }
    let mut packed = [0; MAX_FILE_NAME_LEN];
    packed[..bytes.len()].copy_from_slice(bytes);
    Ok(packed)
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

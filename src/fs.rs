use log::{debug, info};

use crate::bitmap::Allocator;
use crate::file::{fread, fwrite};
use crate::image::{decode_image, encode_image};
use crate::structs::*;
use crate::{BlockStore, Config, DirectoryTable, EntryInfo, Error, Geometry, ImageDevice, Result};

/// Usage counters of a mounted file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub block_size: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub total_slots: usize,
    pub free_slots: usize,
}

#[derive(Debug)]
pub struct FileSystem<D: ImageDevice> {
    device: D,
    config: Config,
    store: BlockStore,
    table: DirectoryTable,
    allocator: Allocator,
}

impl<D: ImageDevice> FileSystem<D> {
    fn blank(device: D, config: Config) -> Result<Self> {
        config.geometry.validate()?;
        let geometry = config.geometry;
        Ok(Self {
            device,
            config,
            store: BlockStore::new(geometry.block_size, geometry.num_blocks),
            table: DirectoryTable::new(geometry.max_files),
            allocator: Allocator::new(geometry.num_blocks),
        })
    }

    /// Formats a new file system on `device`, replacing whatever image it held.
    pub fn create(device: D, config: Config) -> Result<Self> {
        let mut fs_inst = Self::blank(device, config)?;
        fs_inst.format()?;
        Ok(fs_inst)
    }

    /// Loads the image held by `device`.
    /// A device without an image starts out as an empty file system; nothing is written
    /// until the first mutating operation.
    pub fn mount(device: D, config: Config) -> Result<Self> {
        let mut fs_inst = Self::blank(device, config)?;
        let image = fs_inst.device.load()?;
        if image.is_empty() {
            info!("no existing image, starting with an empty file system");
            return Ok(fs_inst);
        }

        let loaded = decode_image(&image, &fs_inst.config.geometry)?;
        fs_inst.store = loaded.store;
        fs_inst.table = loaded.table;
        fs_inst.allocator = loaded.allocator;
        info!(
            "mounted image: {} live entries, {} free blocks{}",
            fs_inst.table.live().count(),
            fs_inst.allocator.free_blocks(),
            if loaded.masked { ", masked" } else { "" },
        );
        Ok(fs_inst)
    }

    // Every mutating operation below ends with a full save of the image.

    /// Resets all blocks to zero and all slots to free.
    pub fn format(&mut self) -> Result<()> {
        self.store.clear();
        self.table.clear();
        self.allocator.reset();
        info!("partition formatted");
        self.sync()
    }

    /// Creates a file holding `data`. Returns the slot index of the new entry.
    pub fn create_file(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let slot = self.create_entry(name, EntryKind::File, data)?;
        info!("file '{}' created in slot {} ({} bytes)", name, slot, data.len());
        Ok(slot)
    }

    /// Creates a directory. Directories claim one cleared block and have no data size.
    pub fn create_directory(&mut self, name: &str) -> Result<usize> {
        let slot = self.create_entry(name, EntryKind::Directory, &[])?;
        info!("directory '{}' created in slot {}", name, slot);
        Ok(slot)
    }

    fn create_entry(&mut self, name: &str, kind: EntryKind, data: &[u8]) -> Result<usize> {
        let packed_name = pack_name(name)?;
        if self.table.find_by_name(name, None).is_ok() {
            return Err(Error::AlreadyExists);
        }
        let slot = self.table.find_free_slot()?;

        let (blocks_needed, size_in_blocks) = match kind {
            EntryKind::File => {
                let blocks = self.config.geometry.blocks_for(data.len());
                (blocks, blocks)
            }
            EntryKind::Directory => (1, 0),
        };
        // Nothing has been touched yet if this fails.
        let blocks = self.allocator.allocate(blocks_needed)?;

        let written = match kind {
            EntryKind::File => fwrite(&mut self.store, &blocks, data),
            EntryKind::Directory => blocks.iter().try_for_each(|&b| self.store.zero_block(b)),
        };
        if let Err(e) = written {
            self.allocator.release(&blocks);
            return Err(e);
        }

        let entry = self.table.slot_mut(slot);
        *entry = DirEntry {
            name: packed_name,
            start_block: blocks.first().copied(),
            size_in_blocks: size_in_blocks as u32,
            len_bytes: data.len() as u64,
            deleted: false,
            kind,
            blocks,
        };
        self.sync()?;
        Ok(slot)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        self.delete_entry(name, EntryKind::File)?;
        info!("file '{}' deleted", name);
        Ok(())
    }

    pub fn delete_directory(&mut self, name: &str) -> Result<()> {
        self.delete_entry(name, EntryKind::Directory)?;
        info!("directory '{}' deleted", name);
        Ok(())
    }

    /// Zeroes and frees the entry's blocks and tombstones its slot.
    /// The stale name and sizes stay in the record until the slot is reused.
    fn delete_entry(&mut self, name: &str, kind: EntryKind) -> Result<()> {
        let slot = self.table.find_by_name(name, Some(kind))?;
        let entry = self.table.slot_mut(slot);
        for &block_id in &entry.blocks {
            self.store.zero_block(block_id)?;
        }
        self.allocator.release(&entry.blocks);
        entry.blocks.clear();
        entry.deleted = true;
        self.sync()
    }

    /// Shrinks a file to `new_size` bytes, freeing the blocks it no longer needs.
    /// Growing a file is not supported and fails with `InvalidArgument`.
    pub fn truncate_file(&mut self, name: &str, new_size: u64) -> Result<()> {
        let block_size = self.config.geometry.block_size;
        let slot = self.table.find_by_name(name, Some(EntryKind::File))?;
        let entry = self.table.slot_mut(slot);

        let new_blocks = new_size.div_ceil(block_size as u64);
        let current_blocks = entry.blocks.len();
        if new_blocks > current_blocks as u64 {
            return Err(Error::InvalidArgument("truncation size exceeds current file size"));
        }
        let new_blocks = new_blocks as usize;

        let released = entry.blocks.split_off(new_blocks);
        for &block_id in &released {
            self.store.zero_block(block_id)?;
        }
        self.allocator.release(&released);

        entry.size_in_blocks = new_blocks as u32;
        entry.len_bytes = entry.len_bytes.min(new_size);
        entry.start_block = entry.blocks.first().copied();

        // Clear the cut-off tail of the last kept block.
        if let Some(&last) = entry.blocks.last() {
            let kept = (entry.len_bytes as usize)
                .saturating_sub((new_blocks - 1) * block_size)
                .min(block_size);
            self.store.block_mut(last)?[kept..].fill(0);
        }

        info!(
            "file '{}' truncated to {} bytes, {} blocks released",
            name,
            new_size,
            released.len()
        );
        self.sync()
    }

    /// Returns the contents of a file or directory. Directories read as empty.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let slot = self.table.find_by_name(name, None)?;
        let entry = &self.table.slots()[slot];
        fread(&self.store, entry)
    }

    /// Overwrites a file's contents within its existing blocks.
    /// Data that does not fit fails with `InvalidArgument`; shorter data leaves the
    /// remaining blocks zeroed but still owned by the file.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let slot = self.table.find_by_name(name, Some(EntryKind::File))?;
        let entry = self.table.slot_mut(slot);
        fwrite(&mut self.store, &entry.blocks, data)?;
        entry.len_bytes = data.len() as u64;
        info!("{} bytes written to file '{}'", data.len(), name);
        self.sync()
    }

    /// Raw contents of a block, bypassing the directory.
    pub fn read_block(&self, block_id: u32) -> Result<Vec<u8>> {
        Ok(self.store.block(block_id)?.to_vec())
    }

    /// Overwrites a block directly, bypassing the directory and allocation lists.
    /// The data is stored as given and the rest of the block is zeroed.
    pub fn write_block(&mut self, block_id: u32, data: &[u8]) -> Result<()> {
        self.store.write_block(block_id, data)?;
        info!("block {} written", block_id);
        self.sync()
    }

    pub fn list_files(&self) -> Vec<EntryInfo> {
        self.list_kind(EntryKind::File)
    }

    pub fn list_directories(&self) -> Vec<EntryInfo> {
        self.list_kind(EntryKind::Directory)
    }

    fn list_kind(&self, kind: EntryKind) -> Vec<EntryInfo> {
        self.table
            .live()
            .filter(|(_, entry)| entry.kind == kind)
            .map(EntryInfo::from)
            .collect()
    }

    /// Every live entry in slot order.
    pub fn list_all(&self) -> Vec<EntryInfo> {
        self.table.live().map(EntryInfo::from).collect()
    }

    /// Every live entry as a labeled line, e.g. `[DIR] docs` or `[FILE] a.txt`.
    pub fn list_files_and_directories(&self) -> Vec<String> {
        self.list_all().iter().map(ToString::to_string).collect()
    }

    /// Looks up a live entry, optionally restricted to one kind.
    pub fn lookup(&self, name: &str, kind: Option<EntryKind>) -> Result<EntryInfo> {
        let slot = self.table.find_by_name(name, kind)?;
        Ok(EntryInfo::from((slot, &self.table.slots()[slot])))
    }

    /// Writes the whole file system to the device.
    /// With `mask_on_disk` the block region is masked in the written image only.
    pub fn save_state(&self, mask_on_disk: bool) -> Result<()> {
        let image = encode_image(&self.config.geometry, &self.store, &self.table, mask_on_disk);
        self.device.store(&image)?;
        debug!("saved {} byte image", image.len());
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.save_state(self.config.mask_image)
    }

    /// Verifies that live allocation lists match entry sizes, are pairwise disjoint,
    /// and agree with the free-block bitmap.
    pub fn check(&self) -> Result<()> {
        for (_, entry) in self.table.live() {
            let consistent = match entry.kind {
                EntryKind::File => entry.blocks.len() == entry.size_in_blocks as usize,
                EntryKind::Directory => entry.size_in_blocks == 0,
            };
            if !consistent {
                return Err(Error::CorruptImage("entry size does not match its allocation list"));
            }
        }
        let rebuilt = Allocator::from_entries(self.config.geometry.num_blocks, self.table.slots())?;
        if rebuilt != self.allocator {
            return Err(Error::CorruptImage("free-block bitmap out of sync"));
        }
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        Stats {
            block_size: self.config.geometry.block_size,
            total_blocks: self.allocator.num_blocks(),
            free_blocks: self.allocator.free_blocks(),
            total_slots: self.table.capacity(),
            free_slots: self.table.free_slots(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.config.geometry
    }

    pub fn directory(&self) -> &DirectoryTable {
        &self.table
    }

    pub fn block_store(&self) -> &BlockStore {
        &self.store
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}

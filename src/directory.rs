//! The directory table: a fixed number of slots, reused through tombstoning.
//! Slots are never removed or reordered, so a slot index stays valid for the
//! lifetime of the table.

use core::fmt;

use crate::error::{FsError, Result};
use crate::structs::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTable {
    slots: Vec<DirEntry>,
}

impl DirectoryTable {
    /// A table of `max_files` free slots.
    pub fn new(max_files: usize) -> Self {
        Self {
            slots: vec![DirEntry::FREE; max_files],
        }
    }

    pub(crate) fn from_slots(slots: Vec<DirEntry>) -> Self {
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[DirEntry] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&DirEntry> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut DirEntry {
        &mut self.slots[index]
    }

    /// Lowest free slot.
    pub fn find_free_slot(&self) -> Result<usize> {
        self.slots
            .iter()
            .position(|entry| entry.deleted)
            .ok_or(FsError::DirectoryFull)
    }

    /// Lowest live slot named `name`, optionally restricted to one kind.
    pub fn find_by_name(&self, name: &str, kind: Option<EntryKind>) -> Result<usize> {
        self.slots
            .iter()
            .position(|entry| {
                entry.is_live()
                    && entry.name_eq(name.as_bytes())
                    && kind.is_none_or(|kind| entry.kind == kind)
            })
            .ok_or(FsError::NotFound)
    }

    /// Live slots with their indices, in slot order.
    pub fn live(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots.iter().enumerate().filter(|(_, entry)| entry.is_live())
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|entry| entry.deleted).count()
    }

    /// Resets every slot to free.
    pub fn clear(&mut self) {
        self.slots.fill(DirEntry::FREE);
    }
}

/// A live entry as shown by the listing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub slot: usize,
    pub name: String,
    pub kind: EntryKind,
    pub size_in_blocks: u32,
    pub len_bytes: u64,
}

impl From<(usize, &DirEntry)> for EntryInfo {
    fn from((slot, entry): (usize, &DirEntry)) -> Self {
        Self {
            slot,
            name: entry.name_lossy(),
            kind: entry.kind,
            size_in_blocks: entry.size_in_blocks,
            len_bytes: entry.len_bytes,
        }
    }
}

impl fmt::Display for EntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntryKind::Directory => write!(f, "[DIR] {}", self.name),
            EntryKind::File => write!(f, "[FILE] {}", self.name),
        }
    }
}

//! Ixfs is a small indexed-allocation file system kept entirely in memory and saved
//! as one flat image. Directories are flat name entries; there are no paths.
//!
//! Ixfs image layout:
//! - Superblock
//! - Block region (optionally masked)
//! - Directory table
//! - Allocation lists of live entries
//!
//! Ixfs's layers (from bottom to top):
//! 1. Image Device: Where the image lives between runs.            | User implemented or `FileImage`
//! 2. Block Store: Fixed-size blocks addressed by index.            | Fs implemented
//! 3. Directory / Bitmap: Slots with their allocation lists, and    | Fs implemented
//!    the free-block bitmap used to claim blocks lowest index first.
//! 4. Image: Whole-structure save and load, with integrity checks.  | Fs implemented
//! 5. File: Masked reads and writes through an allocation list.     | Fs implemented
//! 6. FileSystem / Command: Operations for users and front ends.     | Fs implemented
//!
//! Every mutating operation saves the whole image before returning.

mod config;
mod block_dev;
mod block_store;
mod mask;
mod structs;
mod bitmap;
mod superblock;
mod directory;
mod image;
mod file;
mod fs;
mod command;
mod error;

pub use block_dev::{FileImage, ImageDevice};
pub use block_store::BlockStore;
pub use config::*;
pub use mask::apply_mask;
pub use structs::*;
pub use bitmap::Allocator;
pub use superblock::{read_superblock, write_superblock};
pub use directory::*;
pub use image::{decode_image, encode_image, Loaded};
pub use file::{fread, fwrite};
pub use fs::*;
pub use command::{Command, Outcome};
pub use error::FsError as Error;
pub use error::Result;

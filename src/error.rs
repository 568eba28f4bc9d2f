use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("directory is full")]
    DirectoryFull,
    #[error("entry not found")]
    NotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("not enough space: {needed} blocks needed, {free} free")]
    InsufficientSpace { needed: usize, free: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("cannot access disk image: {0}")]
    Persistence(#[from] io::Error),
    #[error("image has an invalid magic number")]
    InvalidMagic,
    #[error("unsupported image format version {0}")]
    UnsupportedVersion(u32),
    #[error("image geometry does not match the configured geometry")]
    GeometryMismatch,
    #[error("image payload digest mismatch")]
    ChecksumMismatch,
    #[error("corrupt image: {0}")]
    CorruptImage(&'static str),
}

pub type Result<T> = core::result::Result<T, FsError>;

//! Common utilities for tests

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ixfs::{Config, Geometry, ImageDevice};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// An image device kept in memory. Clones share the same image,
/// so a test can keep a handle after moving one into a file system.
#[derive(Debug, Clone, Default)]
pub struct RamImage {
    inner: Arc<Mutex<Vec<u8>>>,
    stores: Arc<AtomicUsize>,
}

impl RamImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the image as last stored.
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    /// Replaces the stored image, e.g. to simulate corruption.
    pub fn set_bytes(&self, image: Vec<u8>) {
        *self.inner.lock().unwrap() = image;
    }

    /// Number of times the image has been stored.
    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

impl ImageDevice for RamImage {
    fn load(&self) -> io::Result<Vec<u8>> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn store(&self, image: &[u8]) -> io::Result<()> {
        *self.inner.lock().unwrap() = image.to_vec();
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A device whose stores always fail.
#[derive(Debug, Clone, Default)]
pub struct BrokenImage;

impl ImageDevice for BrokenImage {
    fn load(&self) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn store(&self, _image: &[u8]) -> io::Result<()> {
        Err(io::Error::other("device unplugged"))
    }
}

/// A `RamImage` whose stores can be made to fail and recover.
#[derive(Debug, Clone, Default)]
pub struct FlakyImage {
    inner: RamImage,
    failing: Arc<AtomicBool>,
}

impl FlakyImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &RamImage {
        &self.inner
    }
}

impl ImageDevice for FlakyImage {
    fn load(&self) -> io::Result<Vec<u8>> {
        self.inner.load()
    }

    fn store(&self, image: &[u8]) -> io::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("write rejected"));
        }
        self.inner.store(image)
    }
}

/// 64 blocks of 64 bytes, 8 slots.
pub fn small_config() -> Config {
    Config::new(Geometry::new(64, 64, 8).unwrap())
}

/// A fresh path under the system temp dir, unique per test.
pub fn temp_image_path(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ixfs-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.img", test_name));
    let _ = std::fs::remove_file(&path);
    path
}

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

/// Where a disk image lives between runs.
/// The file system always loads and stores the image as a whole.
pub trait ImageDevice {
    /// Reads the complete image.
    /// A device that holds no image yet must create an empty one and return no bytes.
    fn load(&self) -> io::Result<Vec<u8>>;

    /// Replaces the complete image with `image`.
    fn store(&self, image: &[u8]) -> io::Result<()>;
}

impl<D: ImageDevice + ?Sized> ImageDevice for &D {
    fn load(&self) -> io::Result<Vec<u8>> {
        (**self).load()
    }

    fn store(&self, image: &[u8]) -> io::Result<()> {
        (**self).store(image)
    }
}

/// A disk image stored in a single host file.
#[derive(Debug, Clone)]
pub struct FileImage {
    path: PathBuf,
}

impl FileImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ImageDevice for FileImage {
    fn load(&self) -> io::Result<Vec<u8>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("creating empty image at {}", self.path.display());
                OpenOptions::new().write(true).create_new(true).open(&self.path)?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let mut image = Vec::new();
        file.read_to_end(&mut image)?;
        Ok(image)
    }

    fn store(&self, image: &[u8]) -> io::Result<()> {
        // Write aside and rename, so a failed write leaves the previous image intact.
        let staging = self.staging_path();
        let written = File::create(&staging)
            .and_then(|mut file| {
                file.write_all(image)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&staging, &self.path));
        if written.is_err() {
            let _ = fs::remove_file(&staging);
        }
        written
    }
}

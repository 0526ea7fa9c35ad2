//! Virtual file access.
//!
//! Save memory and disc images are read through [`Vfs`] so the frontend can
//! supply its own file layer. [`StdVfs`] is the plain filesystem.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileAccess {
    Read,
    /// Create or truncate.
    Write,
}

pub trait VfsFile: Read + Write + Seek {
    /// Length of the file in bytes. Leaves the cursor where it was.
    fn size(&mut self) -> io::Result<u64> {
        let here = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(here))?;
        Ok(end)
    }
}

pub trait Vfs {
    fn open(&self, path: &Path, access: FileAccess) -> io::Result<Box<dyn VfsFile>>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

impl VfsFile for File {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct StdVfs;

impl Vfs for StdVfs {
    fn open(&self, path: &Path, access: FileAccess) -> io::Result<Box<dyn VfsFile>> {
        let file = match access {
            FileAccess::Read => File::open(path)?,
            FileAccess::Write => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        };
        Ok(Box::new(file))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// An in-memory file, used for content handed over as a byte buffer.
impl VfsFile for io::Cursor<Vec<u8>> {}

//! Persistent storage for the engine.
//!
//! Responsibilities:
//! - Save memory: serial, one-byte-per-call access to named files in the
//!   frontend's save directory, through at most one open handle.
//! - Optical media: sector and CD-DA access to the loaded disc image.
//!
//! All file access goes through [`Vfs`].

mod media;
mod vfs;

pub use media::{MediaPosition, OpticalMedia};
pub use vfs::{FileAccess, StdVfs, Vfs, VfsFile};

use crate::host::Host;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where save files live: the save directory, else the system directory,
/// else the current directory.
pub fn save_directory(host: &mut dyn Host) -> PathBuf {
    host.save_directory()
        .or_else(|| host.system_directory())
        .unwrap_or_default()
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Mode {
    Reading,
    Writing,
}

/// The single save-memory file session.
pub struct SaveMemory {
    vfs: Rc<dyn Vfs>,
    handle: Option<(Mode, Box<dyn VfsFile>)>,
}

impl SaveMemory {
    pub fn new(vfs: Rc<dyn Vfs>) -> Self {
        Self { vfs, handle: None }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn open_for_reading(&mut self, dir: &Path, name: &str) -> bool {
        self.open(dir, name, Mode::Reading)
    }

    pub fn open_for_writing(&mut self, dir: &Path, name: &str) -> bool {
        self.open(dir, name, Mode::Writing)
    }

    fn open(&mut self, dir: &Path, name: &str, mode: Mode) -> bool {
        if self.handle.is_some() {
            log::warn!("save file {name:?} opened while another is open; closing the old one");
            self.close();
        }

        let path = dir.join(name);
        let access = match mode {
            Mode::Reading => FileAccess::Read,
            Mode::Writing => FileAccess::Write,
        };
        match self.vfs.open(&path, access) {
            Ok(file) => {
                log::debug!("opened save file {} ({mode:?})", path.display());
                self.handle = Some((mode, file));
                true
            }
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    log::warn!("failed to open save file {}: {e}", path.display());
                }
                false
            }
        }
    }

    /// Next byte of the file being read. `None` at end of data or when nothing is open for reading.
    pub fn read_byte(&mut self) -> Option<u8> {
        let (Mode::Reading, file) = self.handle.as_mut()? else {
            return None;
        };
        let mut byte = [0u8; 1];
        match file.read_exact(&mut byte) {
            Ok(()) => Some(byte[0]),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => None,
            Err(e) => {
                log::warn!("save file read failed: {e}");
                None
            }
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        let Some((Mode::Writing, file)) = self.handle.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(&[byte]) {
            log::warn!("save file write failed: {e}");
        }
    }

    pub fn close(&mut self) {
        if let Some((mode, mut file)) = self.handle.take() {
            if mode == Mode::Writing {
                if let Err(e) = file.flush() {
                    log::warn!("save file flush failed: {e}");
                }
            }
        }
    }

    /// Delete `dir/name`. Does not touch the open handle.
    pub fn remove(&self, dir: &Path, name: &str) -> bool {
        self.vfs.remove(&dir.join(name)).is_ok()
    }

    /// Size of `dir/name` in bytes. Does not touch the open handle.
    pub fn size_of(&self, dir: &Path, name: &str) -> Option<u64> {
        let mut file = self.vfs.open(&dir.join(name), FileAccess::Read).ok()?;
        file.size().ok()
    }
}

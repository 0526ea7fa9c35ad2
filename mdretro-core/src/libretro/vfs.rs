//! File access through the frontend's VFS interface (version 1).

use super::ffi::{
    ENVIRONMENT_GET_VFS_INTERFACE, VFS_FILE_ACCESS_HINT_NONE, VFS_FILE_ACCESS_READ,
    VFS_FILE_ACCESS_WRITE, VFS_SEEK_POSITION_CURRENT, VFS_SEEK_POSITION_END,
    VFS_SEEK_POSITION_START, VfsCloseFn, VfsFileHandle, VfsFlushFn, VfsInterfaceInfo, VfsOpenFn,
    VfsReadFn, VfsRemoveFn, VfsSeekFn, VfsSizeFn, VfsTellFn, VfsWriteFn,
};
use super::host::Callbacks;
use crate::storage::{FileAccess, Vfs, VfsFile};
use std::ffi::{CString, c_void};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::ptr::{self, NonNull};

/// The subset of the interface the bridge calls.
#[derive(Copy, Clone)]
struct Functions {
    open: VfsOpenFn,
    close: VfsCloseFn,
    size: VfsSizeFn,
    tell: VfsTellFn,
    seek: VfsSeekFn,
    read: VfsReadFn,
    write: VfsWriteFn,
    flush: Option<VfsFlushFn>,
    remove: VfsRemoveFn,
}

#[derive(Copy, Clone)]
pub struct RetroVfs {
    functions: Functions,
}

impl RetroVfs {
    /// Ask the frontend for its VFS. `None` if it has none, or an incomplete one.
    pub fn from_frontend(callbacks: &Callbacks) -> Option<Self> {
        let mut info = VfsInterfaceInfo {
            required_interface_version: 1,
            iface: ptr::null(),
        };
        // SAFETY: GET_VFS_INTERFACE takes a `struct retro_vfs_interface_info *`.
        if !unsafe { callbacks.environment(ENVIRONMENT_GET_VFS_INTERFACE, &mut info) }
            || info.iface.is_null()
        {
            return None;
        }
        // SAFETY: the frontend keeps the interface alive for the core's lifetime.
        let iface = unsafe { *info.iface };
        Some(Self {
            functions: Functions {
                open: iface.open?,
                close: iface.close?,
                size: iface.size?,
                tell: iface.tell?,
                seek: iface.seek?,
                read: iface.read?,
                write: iface.write?,
                flush: iface.flush,
                remove: iface.remove?,
            },
        })
    }
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.to_string_lossy().into_owned())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn check(result: i64, what: &str) -> io::Result<u64> {
    u64::try_from(result).map_err(|_| io::Error::other(format!("frontend vfs {what} failed")))
}

impl Vfs for RetroVfs {
    fn open(&self, path: &Path, access: FileAccess) -> io::Result<Box<dyn VfsFile>> {
        let c_path = c_path(path)?;
        let mode = match access {
            FileAccess::Read => VFS_FILE_ACCESS_READ,
            FileAccess::Write => VFS_FILE_ACCESS_WRITE,
        };
        // SAFETY: `c_path` is NUL-terminated and outlives the call.
        let handle =
            unsafe { (self.functions.open)(c_path.as_ptr(), mode, VFS_FILE_ACCESS_HINT_NONE) };
        match NonNull::new(handle) {
            Some(handle) => Ok(Box::new(RetroFile {
                handle,
                functions: self.functions,
            })),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("frontend vfs could not open {}", path.display()),
            )),
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let c_path = c_path(path)?;
        // SAFETY: `c_path` is NUL-terminated and outlives the call.
        match unsafe { (self.functions.remove)(c_path.as_ptr()) } {
            0 => Ok(()),
            _ => Err(io::Error::other(format!(
                "frontend vfs could not remove {}",
                path.display()
            ))),
        }
    }
}

/// An open frontend file. Closed on drop.
struct RetroFile {
    handle: NonNull<VfsFileHandle>,
    functions: Functions,
}

impl Read for RetroFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
        let n = unsafe {
            (self.functions.read)(
                self.handle.as_ptr(),
                buf.as_mut_ptr().cast::<c_void>(),
                buf.len() as u64,
            )
        };
        Ok(check(n, "read")? as usize)
    }
}

impl Write for RetroFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for `buf.len()` bytes of reads.
        let n = unsafe {
            (self.functions.write)(
                self.handle.as_ptr(),
                buf.as_ptr().cast::<c_void>(),
                buf.len() as u64,
            )
        };
        Ok(check(n, "write")? as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(flush) = self.functions.flush else {
            return Ok(());
        };
        // SAFETY: `handle` is open until drop.
        match unsafe { flush(self.handle.as_ptr()) } {
            0 => Ok(()),
            _ => Err(io::Error::other("frontend vfs flush failed")),
        }
    }
}

impl Seek for RetroFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
                VFS_SEEK_POSITION_START,
            ),
            SeekFrom::Current(offset) => (offset, VFS_SEEK_POSITION_CURRENT),
            SeekFrom::End(offset) => (offset, VFS_SEEK_POSITION_END),
        };
        // SAFETY: `handle` is open until drop.
        check(
            unsafe { (self.functions.seek)(self.handle.as_ptr(), offset, whence) },
            "seek",
        )?;
        // Frontends disagree on what seek returns; ask for the position instead.
        // SAFETY: as above.
        check(unsafe { (self.functions.tell)(self.handle.as_ptr()) }, "tell")
    }
}

impl VfsFile for RetroFile {
    fn size(&mut self) -> io::Result<u64> {
        // SAFETY: `handle` is open until drop.
        check(unsafe { (self.functions.size)(self.handle.as_ptr()) }, "size")
    }
}

impl Drop for RetroFile {
    fn drop(&mut self) {
        // SAFETY: `handle` is open and is not used again.
        if unsafe { (self.functions.close)(self.handle.as_ptr()) } != 0 {
            log::warn!("frontend vfs close failed");
        }
    }
}

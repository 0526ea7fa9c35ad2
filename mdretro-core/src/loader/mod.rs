//! Loader utilities for mdretro-core.
//!
//! Responsibilities:
//! - Decide whether frontend content is a cartridge ROM or a Mega CD disc.
//! - Open disc images (by path, or from an in-memory buffer).
//! - Read cartridge ROMs into memory.
//!
//! Notes:
//! - Frontends pass either a path or a buffer. Extensions are unreliable for
//!   `.bin`, which is used for both cartridges and raw disc images, so the
//!   bytes themselves are sniffed.

use crate::disc::{DiscError, DiscImage, RAW_SECTOR_SIZE};
use crate::storage::{FileAccess, Vfs};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Error returned by loader helpers.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no content was provided")]
    NoContent,

    #[error("content is empty")]
    Empty,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid disc image: {0}")]
    Disc(#[from] DiscError),
}

/// Loaded content.
#[derive(Debug)]
pub enum Content {
    Cartridge(Vec<u8>),
    Disc(DiscImage),
}

impl Content {
    pub fn is_disc(&self) -> bool {
        matches!(self, Content::Disc(_))
    }
}

/// What kind of content the loader inferred from the bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectedFormat {
    /// Mega CD boot sector at the start of a 2048-byte-sector image.
    Iso,
    /// Mega CD boot sector behind a raw sector header.
    RawDisc,
    /// Anything else is treated as a cartridge.
    Cartridge,
}

const DISC_SIGNATURE: &[u8] = b"SEGADISCSYSTEM";
const RAW_HEADER_LEN: usize = 16;

/// Best-effort detection.
///
/// Rules:
/// - `SEGADISCSYSTEM` at offset 0 is a cooked disc image.
/// - `SEGADISCSYSTEM` after a 16-byte raw sector header is a raw disc image.
/// - Otherwise a cartridge, if there are any bytes at all.
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if bytes.is_empty() {
        return None;
    }
    if bytes.starts_with(DISC_SIGNATURE) {
        return Some(DetectedFormat::Iso);
    }
    if bytes.len() >= RAW_SECTOR_SIZE && bytes[RAW_HEADER_LEN..].starts_with(DISC_SIGNATURE) {
        return Some(DetectedFormat::RawDisc);
    }
    Some(DetectedFormat::Cartridge)
}

/// Whether the bytes carry the standard cartridge header.
pub fn has_cartridge_header(bytes: &[u8]) -> bool {
    bytes.get(0x100..0x104) == Some(b"SEGA".as_slice())
}

/// Load content handed over in memory.
pub fn load_buffer(data: &[u8]) -> Result<Content, LoadError> {
    match detect_format(data).ok_or(LoadError::Empty)? {
        DetectedFormat::Iso | DetectedFormat::RawDisc => {
            let disc = DiscImage::from_single_file(Box::new(Cursor::new(data.to_vec())))?;
            Ok(Content::Disc(disc))
        }
        DetectedFormat::Cartridge => {
            if !has_cartridge_header(data) {
                log::warn!("cartridge has no SEGA header; loading anyway");
            }
            Ok(Content::Cartridge(data.to_vec()))
        }
    }
}

/// Load content by path: a Mega CD disc image if it is one, otherwise a cartridge.
pub fn load_path(vfs: &dyn Vfs, path: &Path) -> Result<Content, LoadError> {
    let is_cue = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("cue"));

    match DiscImage::open(vfs, path) {
        Ok(mut disc) => {
            if disc.is_mega_cd() {
                log::info!("loaded Mega CD disc {}", path.display());
                return Ok(Content::Disc(disc));
            }
            if is_cue {
                log::warn!("{} has no Mega CD boot sector; booting it anyway", path.display());
                return Ok(Content::Disc(disc));
            }
        }
        Err(e) if is_cue => return Err(e.into()),
        Err(_) => {}
    }

    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut rom = Vec::new();
    vfs.open(path, FileAccess::Read)
        .map_err(io_error)?
        .read_to_end(&mut rom)
        .map_err(io_error)?;
    if rom.is_empty() {
        return Err(LoadError::Empty);
    }
    if !has_cartridge_header(&rom) {
        log::warn!("cartridge has no SEGA header; loading anyway");
    }
    log::info!("loaded cartridge {} ({} bytes)", path.display(), rom.len());
    Ok(Content::Cartridge(rom))
}

/// Load from whatever the frontend provided. A buffer wins over a path.
pub fn load(vfs: &dyn Vfs, path: Option<&Path>, data: Option<&[u8]>) -> Result<Content, LoadError> {
    match (data, path) {
        (Some(data), _) => load_buffer(data),
        (None, Some(path)) => load_path(vfs, path),
        (None, None) => Err(LoadError::NoContent),
    }
}

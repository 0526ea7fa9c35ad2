//! Disc image reader.
//!
//! Supports the layouts Mega CD software is commonly distributed in:
//! - `.iso`: a single MODE1/2048 data track
//! - raw `.bin`: a single MODE1/2352 data track (detected by its sync pattern)
//! - `.cue`: a sheet of `FILE`/`TRACK`/`INDEX` entries mixing MODE1/2048,
//!   MODE1/2352 and AUDIO tracks across one or more files
//!
//! Addresses are logical block addresses counted from the first sector of
//! the first file. Audio is 16-bit little-endian stereo, 588 frames per sector.

use crate::abi::SECTOR_SIZE;
use crate::storage::{FileAccess, Vfs, VfsFile};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Raw sector size of MODE1/2352 data and audio tracks.
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Stereo frames in one audio sector.
pub const FRAMES_PER_SECTOR: u32 = (RAW_SECTOR_SIZE / 4) as u32;

const SECTORS_PER_SECOND: u32 = 75;
const RAW_HEADER_LEN: u64 = 16;
const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];
const MEGA_CD_SIGNATURE: &[u8] = b"SEGADISCSYSTEM";

#[derive(Debug, thiserror::Error)]
pub enum DiscError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cue sheet line {line}: {message}")]
    Cue { line: usize, message: String },

    #[error("unsupported track mode: {0}")]
    UnsupportedTrackMode(String),

    #[error("disc image has no tracks")]
    NoTracks,

    #[error("no data track contains sector {0}")]
    SectorOutOfRange(u32),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrackKind {
    /// MODE1/2048.
    Data,
    /// MODE1/2352.
    RawData,
    Audio,
}

impl TrackKind {
    pub fn sector_size(self) -> u64 {
        match self {
            TrackKind::Data => SECTOR_SIZE as u64,
            TrackKind::RawData | TrackKind::Audio => RAW_SECTOR_SIZE as u64,
        }
    }

    fn parse(mode: &str) -> Result<Self, DiscError> {
        match mode.to_ascii_uppercase().as_str() {
            "MODE1/2048" => Ok(TrackKind::Data),
            "MODE1/2352" => Ok(TrackKind::RawData),
            "AUDIO" => Ok(TrackKind::Audio),
            other => Err(DiscError::UnsupportedTrackMode(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub number: u16,
    pub kind: TrackKind,
    /// Index into the image's file list.
    file: usize,
    /// Byte offset of the track's first sector within its file.
    file_offset: u64,
    pub start_lba: u32,
    /// Length in sectors.
    pub length: u32,
}

impl Track {
    pub fn contains(&self, lba: u32) -> bool {
        lba >= self.start_lba && lba - self.start_lba < self.length
    }

    /// Length in stereo frames, for audio tracks.
    pub fn audio_frames(&self) -> u64 {
        self.length as u64 * FRAMES_PER_SECTOR as u64
    }
}

pub struct DiscImage {
    files: Vec<Box<dyn VfsFile>>,
    tracks: Vec<Track>,
}

impl std::fmt::Debug for DiscImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscImage")
            .field("files", &self.files.len())
            .field("tracks", &self.tracks)
            .finish()
    }
}

impl DiscImage {
    /// Open a disc image, choosing the parser by file extension.
    pub fn open(vfs: &dyn Vfs, path: &Path) -> Result<Self, DiscError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("cue") => {
                let mut sheet = String::new();
                vfs.open(path, FileAccess::Read)?
                    .read_to_string(&mut sheet)?;
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                Self::from_cue(vfs, dir, &sheet)
            }
            _ => Self::from_single_file(vfs.open(path, FileAccess::Read)?),
        }
    }

    /// A single data track, raw if the file starts with a sector sync pattern.
    pub fn from_single_file(mut file: Box<dyn VfsFile>) -> Result<Self, DiscError> {
        let size = file.size()?;
        let mut head = [0u8; SYNC_PATTERN.len()];
        file.seek(SeekFrom::Start(0))?;
        let raw = size >= RAW_SECTOR_SIZE as u64
            && file.read_exact(&mut head).is_ok()
            && head == SYNC_PATTERN;
        let kind = if raw {
            TrackKind::RawData
        } else {
            TrackKind::Data
        };

        let length = (size / kind.sector_size()) as u32;
        if length == 0 {
            return Err(DiscError::NoTracks);
        }
        Ok(Self {
            files: vec![file],
            tracks: vec![Track {
                number: 1,
                kind,
                file: 0,
                file_offset: 0,
                start_lba: 0,
                length,
            }],
        })
    }

    /// Parse a cue sheet. `FILE` entries are resolved relative to `dir`.
    pub fn from_cue(vfs: &dyn Vfs, dir: &Path, sheet: &str) -> Result<Self, DiscError> {
        struct Pending {
            number: u16,
            kind: TrackKind,
            index: Option<u32>,
        }

        let mut files: Vec<Box<dyn VfsFile>> = Vec::new();
        let mut tracks: Vec<Track> = Vec::new();
        // Tracks of the file being read, with their INDEX 01 sector offsets.
        let mut current: Vec<(u16, TrackKind, u32)> = Vec::new();
        let mut pending: Option<Pending> = None;
        let mut file_base_lba = 0u32;

        let cue_error = |line: usize, message: &str| DiscError::Cue {
            line,
            message: message.to_string(),
        };

        for (n, raw_line) in sheet.lines().enumerate() {
            let line = n + 1;
            let text = raw_line.trim();
            let (command, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
            match command.to_ascii_uppercase().as_str() {
                "FILE" => {
                    if let Some(p) = pending.take() {
                        let index = p
                            .index
                            .ok_or_else(|| cue_error(line, "track without INDEX 01"))?;
                        current.push((p.number, p.kind, index));
                    }
                    if let Some(last) = files.len().checked_sub(1) {
                        file_base_lba += close_file(
                            files[last].as_mut(),
                            last,
                            file_base_lba,
                            &mut current,
                            &mut tracks,
                        )?;
                    }
                    let name = parse_file_name(rest)
                        .ok_or_else(|| cue_error(line, "missing file name"))?;
                    files.push(vfs.open(&dir.join(name), FileAccess::Read)?);
                }
                "TRACK" => {
                    if files.is_empty() {
                        return Err(cue_error(line, "TRACK before FILE"));
                    }
                    if let Some(p) = pending.take() {
                        let index = p
                            .index
                            .ok_or_else(|| cue_error(line, "track without INDEX 01"))?;
                        current.push((p.number, p.kind, index));
                    }
                    let mut parts = rest.split_whitespace();
                    let number = parts
                        .next()
                        .and_then(|n| n.parse::<u16>().ok())
                        .ok_or_else(|| cue_error(line, "bad track number"))?;
                    let kind = TrackKind::parse(parts.next().unwrap_or(""))?;
                    pending = Some(Pending {
                        number,
                        kind,
                        index: None,
                    });
                }
                "INDEX" => {
                    let mut parts = rest.split_whitespace();
                    let index_number = parts.next().and_then(|n| n.parse::<u8>().ok());
                    let time = parts.next().and_then(parse_msf);
                    let p = pending
                        .as_mut()
                        .ok_or_else(|| cue_error(line, "INDEX outside TRACK"))?;
                    match (index_number, time) {
                        (Some(1), Some(sectors)) => p.index = Some(sectors),
                        (Some(_), Some(_)) => {}
                        _ => return Err(cue_error(line, "bad INDEX entry")),
                    }
                }
                _ => {}
            }
        }

        if let Some(p) = pending.take() {
            let index = p
                .index
                .ok_or_else(|| cue_error(sheet.lines().count(), "track without INDEX 01"))?;
            current.push((p.number, p.kind, index));
        }
        if let Some(last) = files.len().checked_sub(1) {
            close_file(
                files[last].as_mut(),
                last,
                file_base_lba,
                &mut current,
                &mut tracks,
            )?;
        }

        if tracks.is_empty() {
            return Err(DiscError::NoTracks);
        }
        Ok(Self { files, tracks })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, number: u16) -> Option<&Track> {
        self.tracks.iter().find(|t| t.number == number)
    }

    /// Read the 2048 bytes of user data of sector `lba`.
    pub fn read_sector(&mut self, lba: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<(), DiscError> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.kind != TrackKind::Audio && t.contains(lba))
            .ok_or(DiscError::SectorOutOfRange(lba))?;
        let header = match track.kind {
            TrackKind::RawData => RAW_HEADER_LEN,
            _ => 0,
        };
        let offset =
            track.file_offset + (lba - track.start_lba) as u64 * track.kind.sector_size() + header;
        let file = &mut self.files[track.file];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(out)?;
        Ok(())
    }

    /// Read up to `out.len() / 2` stereo frames of audio track `number`,
    /// starting `frame` frames into the track. Returns the frames read.
    pub fn read_audio(&mut self, number: u16, frame: u64, out: &mut [i16]) -> Result<usize, DiscError> {
        let Some(track) = self
            .tracks
            .iter()
            .find(|t| t.number == number && t.kind == TrackKind::Audio)
        else {
            return Ok(0);
        };
        let available = track.audio_frames().saturating_sub(frame);
        let frames = (out.len() as u64 / 2).min(available) as usize;
        if frames == 0 {
            return Ok(0);
        }

        let mut bytes = vec![0u8; frames * 4];
        let file = &mut self.files[track.file];
        file.seek(SeekFrom::Start(track.file_offset + frame * 4))?;
        file.read_exact(&mut bytes)?;
        for (sample, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(frames)
    }

    /// Whether the first data sector carries the Mega CD boot signature.
    pub fn is_mega_cd(&mut self) -> bool {
        let mut sector = [0u8; SECTOR_SIZE];
        self.read_sector(0, &mut sector).is_ok() && sector.starts_with(MEGA_CD_SIGNATURE)
    }
}

/// Finish the tracks of one file. Returns the file's length in sectors.
fn close_file(
    file: &mut dyn VfsFile,
    file_index: usize,
    base_lba: u32,
    current: &mut Vec<(u16, TrackKind, u32)>,
    tracks: &mut Vec<Track>,
) -> Result<u32, DiscError> {
    let size = file.size()?;
    let mut file_sectors = 0u32;
    let entries: Vec<_> = current.drain(..).collect();
    for (i, &(number, kind, index)) in entries.iter().enumerate() {
        let sector_size = kind.sector_size();
        let file_offset = index as u64 * sector_size;
        let end = match entries.get(i + 1) {
            Some(&(_, _, next)) => next,
            None => (size / sector_size) as u32,
        };
        let length = end.saturating_sub(index);
        file_sectors = file_sectors.max(end);
        tracks.push(Track {
            number,
            kind,
            file: file_index,
            file_offset,
            start_lba: base_lba + index,
            length,
        });
    }
    Ok(file_sectors)
}

fn parse_file_name(rest: &str) -> Option<PathBuf> {
    let rest = rest.trim();
    let name = if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next()?
    } else {
        rest.split_whitespace().next()?
    };
    (!name.is_empty()).then(|| PathBuf::from(name))
}

/// `mm:ss:ff` to a sector count.
fn parse_msf(text: &str) -> Option<u32> {
    let mut parts = text.split(':').map(|p| p.parse::<u32>().ok());
    let (m, s, f) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() || s >= 60 || f >= SECTORS_PER_SECOND {
        return None;
    }
    Some((m * 60 + s) * SECTORS_PER_SECOND + f)
}

use crate::abi::{CddaMode, SECTOR_SIZE, SECTOR_WORDS};
use crate::disc::{DiscImage, TrackKind};
use bytemuck::{Pod, Zeroable};

/// Playback position of the optical drive, stored verbatim in snapshots.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MediaPosition {
    pub sector: u32,
    pub track: u32,
    pub audio_frame: u32,
    pub mode: u32,
    pub playing: u32,
}

/// Sector and CD-DA access to the inserted disc.
#[derive(Debug, Default)]
pub struct OpticalMedia {
    disc: Option<DiscImage>,
    sector: u32,
    track: u16,
    audio_frame: u64,
    mode: CddaMode,
    playing: bool,
}

impl OpticalMedia {
    pub fn insert(&mut self, disc: DiscImage) {
        *self = Self {
            disc: Some(disc),
            ..Self::default()
        };
    }

    pub fn eject(&mut self) -> Option<DiscImage> {
        let disc = self.disc.take();
        *self = Self::default();
        disc
    }

    pub fn has_disc(&self) -> bool {
        self.disc.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn seek_to_sector(&mut self, lba: u32) -> bool {
        self.sector = lba;
        self.disc.is_some()
    }

    /// Fill `out` with the current sector as big-endian words and move to the next one.
    ///
    /// A sector that cannot be read comes back as zeros.
    pub fn read_sector(&mut self, out: &mut [u16; SECTOR_WORDS]) {
        let mut bytes = [0u8; SECTOR_SIZE];
        if let Some(disc) = self.disc.as_mut() {
            if let Err(e) = disc.read_sector(self.sector, &mut bytes) {
                log::warn!("cd sector {} unreadable: {e}", self.sector);
                bytes = [0; SECTOR_SIZE];
            }
        }
        for (word, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            *word = u16::from_be_bytes([pair[0], pair[1]]);
        }
        self.sector = self.sector.wrapping_add(1);
    }

    /// Start CD-DA playback at the beginning of `track`. Fails for data or missing tracks.
    pub fn seek_track(&mut self, track: u16, mode: CddaMode) -> bool {
        let is_audio = self
            .disc
            .as_ref()
            .and_then(|d| d.track(track))
            .is_some_and(|t| t.kind == TrackKind::Audio);
        self.playing = is_audio;
        if is_audio {
            self.track = track;
            self.audio_frame = 0;
            self.mode = mode;
        }
        is_audio
    }

    /// Read up to `frames` stereo frames into `out`. Returns the number produced.
    pub fn read_audio(&mut self, out: &mut [i16], frames: usize) -> usize {
        let frames = frames.min(out.len() / 2);
        let mut written = 0;
        let mut rewound = false;

        while self.playing && written < frames {
            let Some(disc) = self.disc.as_mut() else {
                self.playing = false;
                break;
            };
            let dest = &mut out[written * 2..frames * 2];
            let read = match disc.read_audio(self.track, self.audio_frame, dest) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("cd audio track {} unreadable: {e}", self.track);
                    self.playing = false;
                    break;
                }
            };
            written += read;
            self.audio_frame += read as u64;
            if read > 0 {
                rewound = false;
                continue;
            }

            // End of track.
            match self.mode {
                CddaMode::All => {
                    let next = self.track.saturating_add(1);
                    let next_is_audio = disc
                        .track(next)
                        .is_some_and(|t| t.kind == TrackKind::Audio);
                    if next_is_audio {
                        self.track = next;
                        self.audio_frame = 0;
                    } else {
                        self.playing = false;
                    }
                }
                CddaMode::Once => self.playing = false,
                CddaMode::Repeat => {
                    if rewound {
                        self.playing = false;
                    } else {
                        self.audio_frame = 0;
                        rewound = true;
                    }
                }
            }
        }
        written
    }

    pub fn position(&self) -> MediaPosition {
        MediaPosition {
            sector: self.sector,
            track: self.track as u32,
            audio_frame: self.audio_frame as u32,
            mode: self.mode as u32,
            playing: self.playing as u32,
        }
    }

    pub fn set_position(&mut self, position: &MediaPosition) {
        self.sector = position.sector;
        self.track = position.track as u16;
        self.audio_frame = position.audio_frame as u64;
        self.mode = CddaMode::from_u32(position.mode).unwrap_or_default();
        self.playing = position.playing != 0 && self.disc.is_some();
    }
}

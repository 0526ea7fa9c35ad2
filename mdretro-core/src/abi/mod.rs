//! mdretro-core engine ABI
//!
//! This module defines the contract between:
//! - **Bridge**: `mdretro-core` (this crate)
//! - **Engine**: the cycle-stepped Mega Drive / Mega CD emulator it drives
//!
//! ## High-level model (callback-based)
//! The bridge owns the engine and calls [`Engine::iterate`] once per frontend run.
//! While that call is in progress the engine re-enters the bridge through
//! [`EngineCallbacks`]:
//! - **video**: `color_updated` on palette writes, `scanline_rendered` once per line
//! - **audio**: one `*_audio_to_be_generated` call per active generator family;
//!   the bridge hands out an exactly-sized buffer and the engine fills it
//! - **input**: `input_requested` whenever the emulated pads are read
//! - **optical media**: sector seek/read and CD-DA track seek/read
//! - **save memory**: serial one-byte-per-call file access
//!
//! Nothing here blocks or yields. Every call returns before the engine continues.
//!
//! ## State
//! The engine exposes its entire state as one fixed-size byte block
//! ([`Engine::state`]). The bridge copies it verbatim for save states, so the
//! layout is endian- and pointer-width-dependent and never versioned.

/// Size of one user-data sector, in bytes.
pub const SECTOR_SIZE: usize = 2048;

/// Size of one user-data sector as the engine consumes it (big-endian 16-bit words).
pub const SECTOR_WORDS: usize = SECTOR_SIZE / 2;

/// Buttons on the emulated control pad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    C,
    X,
    Y,
    Z,
    Start,
    Mode,
}

/// CD-DA playback behaviour requested by the engine when it seeks to a track.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u32)]
pub enum CddaMode {
    /// Play through to the end of the disc.
    #[default]
    All = 0,
    /// Play the track once, then stop.
    Once = 1,
    /// Loop the track.
    Repeat = 2,
}

impl CddaMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::All),
            1 => Some(Self::Once),
            2 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Console region reported to software.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Region {
    /// Japan.
    Domestic,
    #[default]
    Overseas,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TvStandard {
    #[default]
    Ntsc,
    Pal,
}

impl TvStandard {
    /// Display refresh rate in Hz.
    pub fn frame_rate(self) -> f64 {
        match self {
            TvStandard::Ntsc => 60.0 / 1.001,
            TvStandard::Pal => 50.0,
        }
    }

    /// Master clock of the console in Hz.
    pub fn master_clock(self) -> u32 {
        match self {
            TvStandard::Ntsc => 53_693_175,
            TvStandard::Pal => 53_203_424,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VdpConfig {
    pub sprites_disabled: bool,
    pub window_disabled: bool,
    pub planes_disabled: [bool; 2],
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FmConfig {
    pub channels_disabled: [bool; 6],
    pub dac_disabled: bool,
    pub ladder_effect_disabled: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PsgConfig {
    pub tones_disabled: [bool; 3],
    pub noise_disabled: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PcmConfig {
    pub channels_disabled: [bool; 8],
}

/// Everything the engine can be told about the user's option choices.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EngineConfig {
    pub region: Region,
    pub tv_standard: TvStandard,
    pub low_pass_filter_disabled: bool,
    /// Let cartridge software use Mega CD features such as CD music.
    pub cd_addon: bool,
    pub vdp: VdpConfig,
    pub fm: FmConfig,
    pub psg: PsgConfig,
    pub pcm: PcmConfig,
}

/// Memory blocks the frontend may inspect directly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryRegion {
    /// Cartridge battery-backed RAM.
    SaveRam,
    /// 68000 work RAM.
    WorkRam,
    /// VDP video RAM.
    VideoRam,
}

/// The emulation engine driven by the bridge.
pub trait Engine {
    fn new(config: &EngineConfig) -> Self
    where
        Self: Sized;

    /// Apply changed option values. Called between iterations only.
    fn configure(&mut self, config: &EngineConfig);

    /// Power-cycle the console. `cd_boot` selects booting from the Mega CD.
    fn reset(&mut self, cd_boot: bool, callbacks: &mut dyn EngineCallbacks);

    /// Run the console for one video frame.
    fn iterate(&mut self, callbacks: &mut dyn EngineCallbacks);

    /// The complete engine state as one fixed-size block.
    fn state(&self) -> &[u8];

    fn state_mut(&mut self) -> &mut [u8];

    fn memory_region(&mut self, region: MemoryRegion) -> Option<&mut [u8]>;
}

/// Callbacks the engine makes into the bridge while it runs.
pub trait EngineCallbacks {
    fn cartridge_read(&mut self, address: u32) -> u8;

    fn cartridge_written(&mut self, address: u32, value: u8);

    /// A palette register changed. `colour` is 0BGR4444.
    fn color_updated(&mut self, index: u16, colour: u16);

    /// One line of indexed pixels is ready. Only `[left, right)` carries new data.
    fn scanline_rendered(
        &mut self,
        scanline: u16,
        pixels: &[u8],
        left: u16,
        right: u16,
        screen_width: u16,
        screen_height: u16,
    );

    fn input_requested(&mut self, player: u8, button: Button) -> bool;

    /// The FM generator wants `total_frames` stereo frames.
    fn fm_audio_to_be_generated(&mut self, total_frames: usize, generate: &mut dyn FnMut(&mut [i16]));

    /// The PSG wants `total_samples` mono samples.
    fn psg_audio_to_be_generated(
        &mut self,
        total_samples: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    );

    fn pcm_audio_to_be_generated(&mut self, total_frames: usize, generate: &mut dyn FnMut(&mut [i16]));

    /// `generate` cannot re-enter the bridge; CD audio for it is fetched
    /// beforehand with [`EngineCallbacks::cd_audio_read`].
    fn cdda_audio_to_be_generated(
        &mut self,
        total_frames: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    );

    fn cd_seeked(&mut self, sector: u32);

    fn cd_sector_read(&mut self, buffer: &mut [u16; SECTOR_WORDS]);

    fn cd_track_seeked(&mut self, track: u16, mode: CddaMode) -> bool;

    /// Returns the number of stereo frames written to `buffer`.
    fn cd_audio_read(&mut self, buffer: &mut [i16], total_frames: usize) -> usize;

    fn save_file_opened_for_reading(&mut self, name: &str) -> bool;

    /// `None` once the end of the file is reached.
    fn save_file_read(&mut self) -> Option<u8>;

    fn save_file_opened_for_writing(&mut self, name: &str) -> bool;

    fn save_file_written(&mut self, byte: u8);

    fn save_file_closed(&mut self);

    fn save_file_removed(&mut self, name: &str) -> bool;

    fn save_file_size_obtained(&mut self, name: &str) -> Option<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdda_mode_round_trips_through_u32() {
        for mode in [CddaMode::All, CddaMode::Once, CddaMode::Repeat] {
            assert_eq!(CddaMode::from_u32(mode as u32), Some(mode));
        }
        assert_eq!(CddaMode::from_u32(3), None);
    }

    #[test]
    fn pal_runs_slower_than_ntsc() {
        assert!(TvStandard::Pal.frame_rate() < TvStandard::Ntsc.frame_rate());
        assert!((TvStandard::Ntsc.frame_rate() - 59.94).abs() < 0.001);
    }
}

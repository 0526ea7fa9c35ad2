//! In-memory host and scripted engine for unit tests.

use crate::abi::{Button, Engine, EngineCallbacks, EngineConfig, MemoryRegion};
use crate::av::PixelFormat;
use crate::host::{AvInfo, Geometry, Host, HostFramebuffer, VideoFrame};
use crate::input::JoypadButton;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::ptr::NonNull;

/// A framebuffer the mock host lends out.
pub struct LentBuffer {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    pub format: PixelFormat,
}

impl LentBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let pitch = width as usize * format.bytes_per_pixel();
        Self {
            bytes: vec![0; pitch * height as usize],
            width,
            height,
            pitch,
            format,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliveredFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

impl DeliveredFrame {
    pub fn row(&self, y: usize, bytes_per_pixel: usize) -> &[u8] {
        let start = y * self.pitch;
        &self.pixels[start..start + self.width as usize * bytes_per_pixel]
    }
}

#[derive(Default)]
pub struct MockHost {
    pub accepted_formats: Vec<PixelFormat>,
    pub lent: Option<LentBuffer>,
    pub framebuffer_requests: Vec<(u32, u32)>,
    pub frames: Vec<DeliveredFrame>,
    pub audio: Vec<(Vec<i16>, usize)>,
    pub geometries: Vec<Geometry>,
    pub av_infos: Vec<AvInfo>,
    pub options: HashMap<String, String>,
    pub options_dirty: bool,
    pub pressed: HashSet<(u32, JoypadButton)>,
    pub polls: usize,
    pub save_dir: Option<PathBuf>,
    pub system_dir: Option<PathBuf>,
    /// Names of the host calls made, in order.
    pub calls: Vec<&'static str>,
}

impl MockHost {
    pub fn accepting(formats: &[PixelFormat]) -> Self {
        Self {
            accepted_formats: formats.to_vec(),
            ..Self::default()
        }
    }

    pub fn set_option(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), value.to_string());
        self.options_dirty = true;
    }
}

impl Host for MockHost {
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        self.calls.push("set_pixel_format");
        self.accepted_formats.contains(&format)
    }

    fn software_framebuffer(&mut self, width: u32, height: u32) -> Option<HostFramebuffer> {
        self.framebuffer_requests.push((width, height));
        let lent = self.lent.as_mut()?;
        Some(HostFramebuffer {
            data: NonNull::new(lent.bytes.as_mut_ptr())?,
            width: lent.width,
            height: lent.height,
            pitch: lent.pitch,
            format: lent.format,
        })
    }

    fn poll_input(&mut self) {
        self.calls.push("poll_input");
        self.polls += 1;
    }

    fn joypad_pressed(&mut self, port: u32, button: JoypadButton) -> bool {
        self.pressed.contains(&(port, button))
    }

    fn video_refresh(&mut self, frame: VideoFrame<'_>) {
        self.calls.push("video_refresh");
        self.frames.push(DeliveredFrame {
            pixels: frame.pixels.to_vec(),
            width: frame.width,
            height: frame.height,
            pitch: frame.pitch,
        });
    }

    fn audio_batch(&mut self, samples: &[i16], frames: usize) {
        self.calls.push("audio_batch");
        self.audio.push((samples.to_vec(), frames));
    }

    fn set_geometry(&mut self, geometry: &Geometry) -> bool {
        self.calls.push("set_geometry");
        self.geometries.push(*geometry);
        true
    }

    fn set_system_av_info(&mut self, info: &AvInfo) -> bool {
        self.calls.push("set_system_av_info");
        self.av_infos.push(*info);
        true
    }

    fn options_updated(&mut self) -> bool {
        std::mem::take(&mut self.options_dirty)
    }

    fn option_value(&mut self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    fn save_directory(&mut self) -> Option<PathBuf> {
        self.save_dir.clone()
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        self.system_dir.clone()
    }
}

/// What the scripted engine does during one `iterate`.
#[derive(Clone, Debug)]
pub struct Script {
    pub width: u16,
    pub height: u16,
    pub fm_frames: usize,
    pub psg_samples: usize,
    pub pcm_frames: usize,
    pub cdda_frames: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            width: 320,
            height: 224,
            fm_frames: 0,
            psg_samples: 0,
            pcm_frames: 0,
            cdda_frames: 0,
        }
    }
}

/// A deterministic stand-in for the emulator.
///
/// `state[0]` counts frames and seeds every output, `state[1]` counts frames
/// on which player 1 held Start. Pixels on line `y`, column `x` use palette
/// index `(x + frame) % 16`, and palette entry `i` is set to `i * 0x111 + frame`.
/// Work RAM is the first [`SAVE_RAM_START`] bytes of the state block and save
/// RAM the rest, so both travel with snapshots.
pub struct ScriptedEngine {
    pub state: Vec<u8>,
    pub config: EngineConfig,
    pub script: Script,
    pub resets: Vec<bool>,
}

pub const SAVE_RAM_START: usize = 48;

impl ScriptedEngine {
    pub fn frame(&self) -> u8 {
        self.state[0]
    }
}

impl Engine for ScriptedEngine {
    fn new(config: &EngineConfig) -> Self {
        Self {
            state: vec![0; 64],
            config: config.clone(),
            script: Script::default(),
            resets: Vec::new(),
        }
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.config = config.clone();
    }

    fn reset(&mut self, cd_boot: bool, _callbacks: &mut dyn EngineCallbacks) {
        self.resets.push(cd_boot);
        self.state.fill(0);
    }

    fn iterate(&mut self, cb: &mut dyn EngineCallbacks) {
        let frame = self.state[0];
        let script = self.script.clone();

        for i in 0..16u16 {
            cb.color_updated(i, (i * 0x111).wrapping_add(frame as u16) & 0xFFF);
        }
        if cb.input_requested(0, Button::Start) {
            self.state[1] = self.state[1].wrapping_add(1);
        }

        let pixels: Vec<u8> = (0..script.width)
            .map(|x| ((x as u8).wrapping_add(frame)) % 16)
            .collect();
        for y in 0..script.height {
            cb.scanline_rendered(y, &pixels, 0, script.width, script.width, script.height);
        }

        let level = frame as i16 * 100;
        if script.fm_frames > 0 {
            cb.fm_audio_to_be_generated(script.fm_frames, &mut |buf| buf.fill(level));
        }
        if script.psg_samples > 0 {
            cb.psg_audio_to_be_generated(script.psg_samples, &mut |buf| buf.fill(level));
        }
        if script.pcm_frames > 0 {
            cb.pcm_audio_to_be_generated(script.pcm_frames, &mut |buf| {
                for (i, s) in buf.iter_mut().enumerate() {
                    *s = level.wrapping_add(i as i16);
                }
            });
        }
        if script.cdda_frames > 0 {
            let frames = script.cdda_frames;
            let mut disc_audio = vec![0i16; frames * 2];
            cb.cd_audio_read(&mut disc_audio, frames);
            cb.cdda_audio_to_be_generated(frames, &mut |buf| buf.copy_from_slice(&disc_audio));
        }

        self.state[0] = frame.wrapping_add(1);
    }

    fn state(&self) -> &[u8] {
        &self.state
    }

    fn state_mut(&mut self) -> &mut [u8] {
        &mut self.state
    }

    fn memory_region(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        match region {
            MemoryRegion::SaveRam => Some(&mut self.state[SAVE_RAM_START..]),
            MemoryRegion::WorkRam => Some(&mut self.state[..SAVE_RAM_START]),
            MemoryRegion::VideoRam => None,
        }
    }
}

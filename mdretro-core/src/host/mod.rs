//! The frontend as seen from the bridge.
//!
//! [`Host`] is everything the session needs from whatever is playing the
//! emulated console back: pixel format negotiation, an optional host-owned
//! framebuffer, input, audio/video sinks, geometry announcements and option
//! values. The libretro adapter implements it over the C callbacks; tests use
//! an in-memory implementation.

use crate::av::PixelFormat;
use crate::input::JoypadButton;
use std::path::PathBuf;
use std::ptr::NonNull;

/// A framebuffer lent by the host for the duration of one frame.
#[derive(Copy, Clone, Debug)]
pub struct HostFramebuffer {
    pub data: NonNull<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub pitch: usize,
    pub format: PixelFormat,
}

impl HostFramebuffer {
    /// Total writable bytes, saturating.
    pub fn byte_len(&self) -> usize {
        (self.height as usize).saturating_mul(self.pitch)
    }
}

/// A finished frame ready for presentation.
#[derive(Copy, Clone, Debug)]
pub struct VideoFrame<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

/// Display geometry announced to the host.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

/// Geometry plus timing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AvInfo {
    pub geometry: Geometry,
    pub fps: f64,
    pub sample_rate: f64,
}

pub trait Host {
    /// Ask the host to accept `format` for frames it does not own.
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool;

    /// Borrow a host-owned framebuffer of at least `width` x `height`.
    ///
    /// The returned memory must stay valid for writes of
    /// [`HostFramebuffer::byte_len`] bytes, and must not be touched by the host,
    /// until the next [`Host::video_refresh`] call.
    fn software_framebuffer(&mut self, width: u32, height: u32) -> Option<HostFramebuffer>;

    fn poll_input(&mut self);

    fn joypad_pressed(&mut self, port: u32, button: JoypadButton) -> bool;

    fn video_refresh(&mut self, frame: VideoFrame<'_>);

    /// `samples` holds `frames` interleaved stereo frames.
    fn audio_batch(&mut self, samples: &[i16], frames: usize);

    fn set_geometry(&mut self, geometry: &Geometry) -> bool;

    fn set_system_av_info(&mut self, info: &AvInfo) -> bool;

    /// Whether option values changed since the last call.
    fn options_updated(&mut self) -> bool;

    fn option_value(&mut self, key: &str) -> Option<String>;

    fn save_directory(&mut self) -> Option<PathBuf>;

    fn system_directory(&mut self) -> Option<PathBuf>;
}

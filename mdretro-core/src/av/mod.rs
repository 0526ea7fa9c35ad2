//! Audio/Video bridging for mdretro-core.
//!
//! This module implements the "engine pushes, host presents" model.
//!
//! - Video: the engine reports palette writes and finished scanlines of
//!   palette indices. [`PixelPipeline`] converts them into whichever pixel
//!   format the frontend accepted and writes them into the host framebuffer
//!   for this frame, or into an internal fallback buffer.
//!
//! - Audio: each generator family asks for an exactly-sized buffer, fills it
//!   at its native rate, and [`Mixer::end_frame`] resamples and sums all of
//!   them into one interleaved stereo stream per frame.
//!
//! Notes / limitations (current):
//! - Only the three libretro software pixel formats are supported.
//! - Output audio is fixed to 48 kHz interleaved stereo i16.

pub mod audio;
pub mod geometry;
pub mod graphics;
mod utils;

#[cfg(test)]
mod tests;

pub use audio::{AudioTiming, Family, Mixer};
pub use geometry::GeometryState;
pub use graphics::{PaletteTable, PixelPipeline, PixelStrategy};

/// Pixel formats the bridge can write.
///
/// Discriminants are the libretro `PIXEL_FORMAT_*` values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum PixelFormat {
    /// 0RGB1555, the frontend's default when nothing else is negotiated.
    Rgb1555 = 0,
    Xrgb8888 = 1,
    Rgb565 = 2,
}

impl PixelFormat {
    /// Preference order used during negotiation.
    pub const PREFERENCE: [PixelFormat; 3] = [
        PixelFormat::Rgb565,
        PixelFormat::Xrgb8888,
        PixelFormat::Rgb1555,
    ];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb565 | PixelFormat::Rgb1555 => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(PixelFormat::Rgb1555),
            1 => Some(PixelFormat::Xrgb8888),
            2 => Some(PixelFormat::Rgb565),
            _ => None,
        }
    }

    /// The conversion strategy that writes this format.
    pub fn strategy(self) -> &'static dyn PixelStrategy {
        match self {
            PixelFormat::Rgb565 => &graphics::Rgb565,
            PixelFormat::Xrgb8888 => &graphics::Xrgb8888,
            PixelFormat::Rgb1555 => &graphics::Rgb1555,
        }
    }
}

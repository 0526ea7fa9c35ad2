//! Scanline conversion into the frontend's pixel format.

use super::PixelFormat;
use super::geometry::{GeometryState, MAX_HEIGHT, MAX_WIDTH};
use super::utils::{split_0bgr4444, widen_channel};
use crate::host::{Host, HostFramebuffer, VideoFrame};

/// 16 colours x 4 palette lines x 3 brightness levels (normal, shadow, highlight).
pub const PALETTE_SIZE: usize = 16 * 4 * 3;

/// Converts engine colours and palette-indexed scanlines into one pixel format.
pub trait PixelStrategy: Sync {
    fn format(&self) -> PixelFormat;

    fn bytes_per_pixel(&self) -> usize {
        self.format().bytes_per_pixel()
    }

    /// Convert a 0BGR4444 colour into a packed pixel value.
    fn convert_color(&self, raw: u16) -> u32;

    /// Write one pixel per `src` index into `dst`, looking colours up in `palette`.
    ///
    /// Stops at whichever of `src` and `dst` runs out first. Indices outside
    /// the palette produce black.
    fn convert_scanline(&self, palette: &[u32; PALETTE_SIZE], src: &[u8], dst: &mut [u8]);
}

#[inline]
fn lookup(palette: &[u32; PALETTE_SIZE], index: u8) -> u32 {
    palette.get(index as usize).copied().unwrap_or(0)
}

fn write_16bpp(palette: &[u32; PALETTE_SIZE], src: &[u8], dst: &mut [u8]) {
    for (&index, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
        out.copy_from_slice(&(lookup(palette, index) as u16).to_ne_bytes());
    }
}

/// RGB565.
pub struct Rgb565;

impl PixelStrategy for Rgb565 {
    fn format(&self) -> PixelFormat {
        PixelFormat::Rgb565
    }

    fn convert_color(&self, raw: u16) -> u32 {
        let (r, g, b) = split_0bgr4444(raw);
        (widen_channel(r, 5) << 11) | (widen_channel(g, 6) << 5) | widen_channel(b, 5)
    }

    fn convert_scanline(&self, palette: &[u32; PALETTE_SIZE], src: &[u8], dst: &mut [u8]) {
        write_16bpp(palette, src, dst);
    }
}

/// XRGB8888.
pub struct Xrgb8888;

impl PixelStrategy for Xrgb8888 {
    fn format(&self) -> PixelFormat {
        PixelFormat::Xrgb8888
    }

    fn convert_color(&self, raw: u16) -> u32 {
        let (r, g, b) = split_0bgr4444(raw);
        (widen_channel(r, 8) << 16) | (widen_channel(g, 8) << 8) | widen_channel(b, 8)
    }

    fn convert_scanline(&self, palette: &[u32; PALETTE_SIZE], src: &[u8], dst: &mut [u8]) {
        for (&index, out) in src.iter().zip(dst.chunks_exact_mut(4)) {
            out.copy_from_slice(&lookup(palette, index).to_ne_bytes());
        }
    }
}

/// 0RGB1555.
pub struct Rgb1555;

impl PixelStrategy for Rgb1555 {
    fn format(&self) -> PixelFormat {
        PixelFormat::Rgb1555
    }

    fn convert_color(&self, raw: u16) -> u32 {
        let (r, g, b) = split_0bgr4444(raw);
        (widen_channel(r, 5) << 10) | (widen_channel(g, 5) << 5) | widen_channel(b, 5)
    }

    fn convert_scanline(&self, palette: &[u32; PALETTE_SIZE], src: &[u8], dst: &mut [u8]) {
        write_16bpp(palette, src, dst);
    }
}

/// The colour table, kept in the format of the active display target.
///
/// Raw colours are retained so that switching format reconverts every entry.
#[derive(Clone, Debug)]
pub struct PaletteTable {
    raw: [u16; PALETTE_SIZE],
    converted: [u32; PALETTE_SIZE],
    format: PixelFormat,
}

impl PaletteTable {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            raw: [0; PALETTE_SIZE],
            converted: [0; PALETTE_SIZE],
            format,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Store a colour. Returns false for indices outside the table.
    pub fn set(&mut self, index: u16, raw: u16) -> bool {
        let index = index as usize;
        if index >= PALETTE_SIZE {
            return false;
        }
        self.raw[index] = raw;
        self.converted[index] = self.format.strategy().convert_color(raw);
        true
    }

    /// Reconvert every entry if `format` differs from the current one.
    pub fn reformat(&mut self, format: PixelFormat) {
        if format == self.format {
            return;
        }
        let strategy = format.strategy();
        for (out, &raw) in self.converted.iter_mut().zip(self.raw.iter()) {
            *out = strategy.convert_color(raw);
        }
        self.format = format;
    }

    pub fn entries(&self) -> &[u32; PALETTE_SIZE] {
        &self.converted
    }
}

#[derive(Copy, Clone, Debug)]
enum DisplayTarget {
    Host(HostFramebuffer),
    Fallback,
}

/// Writes engine scanlines into the frame the host will present.
pub struct PixelPipeline {
    fallback_format: PixelFormat,
    strategy: &'static dyn PixelStrategy,
    palette: PaletteTable,
    fallback: Vec<u8>,
    target: DisplayTarget,
    width: u32,
    height: u32,
}

impl Default for PixelPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelPipeline {
    pub fn new() -> Self {
        let format = PixelFormat::Rgb1555;
        Self {
            fallback_format: format,
            strategy: format.strategy(),
            palette: PaletteTable::new(format),
            fallback: vec![0; MAX_WIDTH as usize * MAX_HEIGHT as usize * 4],
            target: DisplayTarget::Fallback,
            width: MAX_WIDTH,
            height: super::geometry::DEFAULT_HEIGHT,
        }
    }

    /// Pick the fallback format: the first of RGB565, XRGB8888, 0RGB1555 the host accepts.
    pub fn negotiate_format(&mut self, host: &mut dyn Host) -> PixelFormat {
        let format = PixelFormat::PREFERENCE
            .into_iter()
            .find(|&f| host.set_pixel_format(f))
            .unwrap_or(PixelFormat::Rgb1555);
        log::info!("pixel format negotiated: {format:?}");

        self.fallback_format = format;
        if let DisplayTarget::Fallback = self.target {
            self.use_fallback();
        }
        format
    }

    pub fn fallback_format(&self) -> PixelFormat {
        self.fallback_format
    }

    /// Format of the buffer currently being written.
    pub fn active_format(&self) -> PixelFormat {
        self.strategy.format()
    }

    pub fn palette(&self) -> &PaletteTable {
        &self.palette
    }

    pub fn is_using_host_framebuffer(&self) -> bool {
        matches!(self.target, DisplayTarget::Host(_))
    }

    /// Drop any host framebuffer from the previous frame.
    pub fn begin_frame(&mut self) {
        self.use_fallback();
    }

    pub fn color_updated(&mut self, index: u16, raw: u16) {
        self.palette.set(index, raw);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn scanline_rendered(
        &mut self,
        host: &mut dyn Host,
        geometry: &mut GeometryState,
        scanline: u16,
        pixels: &[u8],
        left: u16,
        right: u16,
        screen_width: u16,
        screen_height: u16,
    ) {
        if scanline == 0 {
            self.width = (screen_width as u32).min(MAX_WIDTH);
            self.height = (screen_height as u32).min(MAX_HEIGHT);
            geometry.latch(self.width, self.height);
            self.select_target(host);
        }

        let (rows, row_pixels, pitch) = self.target_dims();
        let y = scanline as usize;
        if y >= self.height as usize || y >= rows {
            return;
        }

        let left = left as usize;
        let right = (right as usize)
            .min(row_pixels)
            .min(self.width as usize)
            .min(pixels.len());
        if left >= right {
            return;
        }

        let bpp = self.strategy.bytes_per_pixel();
        let start = y * pitch + left * bpp;
        let end = start + (right - left) * bpp;
        let src = &pixels[left..right];
        let palette = self.palette.entries();
        let strategy = self.strategy;

        match self.target {
            DisplayTarget::Host(fb) => {
                // SAFETY: the host guarantees `byte_len` writable bytes until the next
                // video refresh, and `end <= rows * pitch <= byte_len`.
                let buffer =
                    unsafe { std::slice::from_raw_parts_mut(fb.data.as_ptr(), fb.byte_len()) };
                if let Some(dst) = buffer.get_mut(start..end) {
                    strategy.convert_scanline(palette, src, dst);
                }
            }
            DisplayTarget::Fallback => {
                if let Some(dst) = self.fallback.get_mut(start..end) {
                    strategy.convert_scanline(palette, src, dst);
                }
            }
        }
    }

    /// The frame written so far.
    pub fn frame(&self) -> VideoFrame<'_> {
        let (rows, row_pixels, pitch) = self.target_dims();
        let width = (self.width as usize).min(row_pixels) as u32;
        let height = (self.height as usize).min(rows) as u32;
        let pixels: &[u8] = match self.target {
            // SAFETY: see `scanline_rendered`; the host has not refreshed yet.
            DisplayTarget::Host(fb) => unsafe {
                std::slice::from_raw_parts(fb.data.as_ptr(), fb.byte_len())
            },
            DisplayTarget::Fallback => {
                let len = (height as usize * pitch).min(self.fallback.len());
                &self.fallback[..len]
            }
        };
        VideoFrame {
            pixels,
            width,
            height,
            pitch,
        }
    }

    fn select_target(&mut self, host: &mut dyn Host) {
        match host.software_framebuffer(self.width, self.height) {
            Some(fb) if self.fits(&fb) => {
                self.target = DisplayTarget::Host(fb);
                self.strategy = fb.format.strategy();
                self.palette.reformat(fb.format);
            }
            _ => self.use_fallback(),
        }
    }

    fn fits(&self, fb: &HostFramebuffer) -> bool {
        fb.width >= self.width
            && fb.height >= self.height
            && fb.pitch >= self.width as usize * fb.format.bytes_per_pixel()
    }

    fn use_fallback(&mut self) {
        self.target = DisplayTarget::Fallback;
        self.strategy = self.fallback_format.strategy();
        self.palette.reformat(self.fallback_format);
    }

    /// (rows, pixels per row, pitch in bytes) of the active target.
    fn target_dims(&self) -> (usize, usize, usize) {
        match self.target {
            DisplayTarget::Host(fb) => {
                let bpp = fb.format.bytes_per_pixel();
                (fb.height as usize, fb.pitch / bpp, fb.pitch)
            }
            DisplayTarget::Fallback => {
                let bpp = self.fallback_format.bytes_per_pixel();
                (
                    MAX_HEIGHT as usize,
                    MAX_WIDTH as usize,
                    MAX_WIDTH as usize * bpp,
                )
            }
        }
    }
}

//! Screen size tracking and aspect ratio.

use crate::host::Geometry;

pub const MAX_WIDTH: u32 = 320;
pub const MAX_HEIGHT: u32 = 480;
pub const DEFAULT_WIDTH: u32 = 320;
pub const DEFAULT_HEIGHT: u32 = 224;

/// Interlaced modes at or above this height are displayed at double width.
const TALL_THRESHOLD: u32 = 448;

#[derive(Clone, Debug, PartialEq)]
pub struct GeometryState {
    width: u32,
    height: u32,
    tall_interlace: bool,
    dirty: bool,
}

impl Default for GeometryState {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tall_interlace: false,
            dirty: false,
        }
    }
}

impl GeometryState {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Record the resolution reported at the start of a frame.
    pub fn latch(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.dirty = true;
        }
    }

    pub fn set_tall_interlace(&mut self, tall: bool) {
        if tall != self.tall_interlace {
            self.tall_interlace = tall;
            self.dirty = true;
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        let ratio = MAX_WIDTH as f32 / self.height.max(1) as f32;
        if !self.tall_interlace && self.height >= TALL_THRESHOLD {
            ratio * 2.0
        } else {
            ratio
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            base_width: self.width,
            base_height: self.height,
            max_width: MAX_WIDTH,
            max_height: MAX_HEIGHT,
            aspect_ratio: self.aspect_ratio(),
        }
    }

    /// Returns whether the geometry changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

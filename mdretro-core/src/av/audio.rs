//! Per-frame audio mixing.
//!
//! The engine's four generator families run at their own native rates. Each
//! one asks for a buffer of exactly the size it is about to fill; at the end of
//! the frame every buffer is resampled to [`OUTPUT_RATE`] and summed.
//!
//! Each family keeps a [`Playhead`] between frames: the fractional resample
//! position and the last source frame, so interpolation runs across frame
//! boundaries instead of restarting at every buffer.

use super::utils::sat_add_i16;
use crate::abi::TvStandard;

pub const OUTPUT_RATE: u32 = 48_000;

/// 1.0 in 16.16 fixed point.
const ONE: u64 = 1 << 16;

const PCM_CLOCK: f64 = 12_500_000.0;
const CDDA_RATE: f64 = 44_100.0;

/// Generator families, in mixing order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Family {
    Fm,
    Psg,
    Pcm,
    Cdda,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::Fm, Family::Psg, Family::Pcm, Family::Cdda];

    /// Samples per frame produced by this family.
    pub fn channels(self) -> usize {
        match self {
            Family::Psg => 1,
            Family::Fm | Family::Pcm | Family::Cdda => 2,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Native sample rates of every family, plus the output rate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AudioTiming {
    pub fm: f64,
    pub psg: f64,
    pub pcm: f64,
    pub cdda: f64,
    pub output: u32,
}

impl AudioTiming {
    pub fn for_standard(standard: TvStandard) -> Self {
        let master = standard.master_clock() as f64;
        Self {
            fm: master / 7.0 / 144.0,
            psg: master / 15.0 / 16.0,
            pcm: PCM_CLOCK / 384.0,
            cdda: CDDA_RATE,
            output: OUTPUT_RATE,
        }
    }

    pub fn rate(&self, family: Family) -> f64 {
        match family {
            Family::Fm => self.fm,
            Family::Psg => self.psg,
            Family::Pcm => self.pcm,
            Family::Cdda => self.cdda,
        }
    }

    /// Output frames corresponding to `frames` at the family's native rate.
    fn output_frames(&self, family: Family, frames: usize) -> usize {
        let rate = self.rate(family);
        if frames == 0 || rate <= 0.0 {
            return 0;
        }
        (frames as f64 * self.output as f64 / rate).round() as usize
    }

    /// Source advance per output frame in 16.16 fixed point.
    fn step(&self, family: Family) -> u64 {
        (self.rate(family) / self.output as f64 * 65536.0).round() as u64
    }
}

/// Resampler state carried from one frame to the next.
///
/// Positions index a virtual source where frame 0 is the previous buffer's
/// last frame and frame `n` is the current buffer's frame `n - 1`.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Playhead {
    pos: u64,
    prev: [i16; 2],
}

impl Default for Playhead {
    fn default() -> Self {
        // Start on the first frame of the first buffer.
        Self {
            pos: ONE,
            prev: [0; 2],
        }
    }
}

#[derive(Debug)]
pub struct Mixer {
    timing: AudioTiming,
    buffers: [Vec<i16>; 4],
    playheads: [Playhead; 4],
    out: Vec<i16>,
}

impl Mixer {
    pub fn new(standard: TvStandard) -> Self {
        Self::with_timing(AudioTiming::for_standard(standard))
    }

    pub fn with_timing(timing: AudioTiming) -> Self {
        Self {
            timing,
            buffers: Default::default(),
            playheads: Default::default(),
            out: Vec::new(),
        }
    }

    pub fn timing(&self) -> &AudioTiming {
        &self.timing
    }

    /// Switch to the rates of another TV standard. Pending samples are discarded.
    pub fn reinit(&mut self, standard: TvStandard) {
        self.timing = AudioTiming::for_standard(standard);
        self.restart();
        self.begin_frame();
    }

    /// Forget the resample state carried between frames, for when the audio
    /// stream jumps (a loaded save state).
    pub fn restart(&mut self) {
        self.playheads = Default::default();
    }

    pub fn begin_frame(&mut self) {
        for buf in &mut self.buffers {
            buf.clear();
        }
    }

    /// Hand out a zeroed slice for `count` frames of `family`.
    ///
    /// Later requests in the same frame are appended after earlier ones.
    pub fn allocate(&mut self, family: Family, count: usize) -> &mut [i16] {
        let buf = &mut self.buffers[family.slot()];
        let start = buf.len();
        buf.resize(start + count * family.channels(), 0);
        &mut buf[start..]
    }

    /// Frames requested by `family` so far this frame.
    pub fn frames(&self, family: Family) -> usize {
        self.buffers[family.slot()].len() / family.channels()
    }

    /// Mix everything generated this frame and pass it to `emit` as
    /// interleaved stereo along with its frame count. `emit` is always called once.
    pub fn end_frame<F>(&mut self, emit: F)
    where
        F: FnOnce(&[i16], usize),
    {
        let out_frames = Family::ALL
            .iter()
            .map(|&family| self.timing.output_frames(family, self.frames(family)))
            .max()
            .unwrap_or(0);

        self.out.clear();
        self.out.resize(out_frames * 2, 0);

        for family in Family::ALL {
            let slot = family.slot();
            if self.frames(family) == 0 {
                // A family that fell silent starts afresh when it resumes.
                self.playheads[slot] = Playhead::default();
                continue;
            }
            mix_into(
                &mut self.out,
                &self.buffers[slot],
                family.channels(),
                self.timing.step(family),
                &mut self.playheads[slot],
            );
        }

        log::trace!("audio frame: {out_frames} output frames");
        emit(&self.out, out_frames);
    }
}

/// Resample `src` by linear interpolation and add it into stereo `out`,
/// continuing from `head` and leaving it where the next buffer picks up.
fn mix_into(out: &mut [i16], src: &[i16], channels: usize, step: u64, head: &mut Playhead) {
    let frames = src.len() / channels;
    let prev = head.prev;
    let at = |index: usize, ch: usize| -> i64 {
        match index {
            0 => prev[ch] as i64,
            _ => src[(index - 1) * channels + ch] as i64,
        }
    };

    // Past the newest frame the last sample is held.
    let last = frames;
    let mut pos = head.pos;
    for dst in out.chunks_exact_mut(2) {
        let index = ((pos >> 16) as usize).min(last);
        let next = (index + 1).min(last);
        let frac = (pos & 0xFFFF) as i64;
        for (c, sample) in dst.iter_mut().enumerate() {
            let ch = c.min(channels - 1);
            let s0 = at(index, ch);
            let s1 = at(next, ch);
            let value = s0 + (((s1 - s0) * frac) >> 16);
            *sample = sat_add_i16(*sample, value as i16);
        }
        pos += step;
    }

    // Source this frame never reached is dropped; time spent holding the last
    // sample beyond one step is not owed to the next buffer.
    let consumed = (frames as u64) << 16;
    head.pos = pos.saturating_sub(consumed).min(ONE + step);
    head.prev = [at(last, 0) as i16, at(last, channels - 1) as i16];
}

use super::audio::{AudioTiming, OUTPUT_RATE};
use super::geometry::{GeometryState, MAX_HEIGHT, MAX_WIDTH};
use super::graphics::{PALETTE_SIZE, PaletteTable, PixelPipeline};
use super::utils::sat_add_i16;
use super::{Family, Mixer, PixelFormat};
use crate::testing::{LentBuffer, MockHost};

fn expand(c: u32, bits: u32) -> u32 {
    // Top bits repeated into the low bits.
    (c << (bits - 4)) | (c >> (8 - bits))
}

fn reference(format: PixelFormat, raw: u16) -> u32 {
    let r = (raw & 0xF) as u32;
    let g = ((raw >> 4) & 0xF) as u32;
    let b = ((raw >> 8) & 0xF) as u32;
    match format {
        PixelFormat::Rgb565 => (expand(r, 5) << 11) | (expand(g, 6) << 5) | expand(b, 5),
        PixelFormat::Xrgb8888 => (expand(r, 8) << 16) | (expand(g, 8) << 8) | expand(b, 8),
        PixelFormat::Rgb1555 => (expand(r, 5) << 10) | (expand(g, 5) << 5) | expand(b, 5),
    }
}

#[test]
fn every_colour_converts_in_every_format() {
    for format in PixelFormat::PREFERENCE {
        let strategy = format.strategy();
        assert_eq!(strategy.format(), format);
        for raw in 0..0x1000u16 {
            assert_eq!(
                strategy.convert_color(raw),
                reference(format, raw),
                "{format:?} {raw:#05x}"
            );
        }
    }
}

/// Reads pixel `x` of the first row of a frame in `format`.
fn first_row_pixel(pixels: &[u8], x: usize, format: PixelFormat) -> u32 {
    let bpp = format.bytes_per_pixel();
    let px = &pixels[x * bpp..(x + 1) * bpp];
    match bpp {
        2 => u16::from_ne_bytes([px[0], px[1]]) as u32,
        _ => u32::from_ne_bytes([px[0], px[1], px[2], px[3]]),
    }
}

#[test]
fn every_colour_reaches_the_frame_in_every_format() {
    let indices: Vec<u8> = (0..PALETTE_SIZE as u8).collect();
    let colours: Vec<u16> = (0..0x1000).collect();
    for format in PixelFormat::PREFERENCE {
        let mut pipeline = PixelPipeline::new();
        let mut host = MockHost::accepting(&[format]);
        assert_eq!(pipeline.negotiate_format(&mut host), format);

        for batch in colours.chunks(PALETTE_SIZE) {
            for (index, &raw) in batch.iter().enumerate() {
                pipeline.color_updated(index as u16, raw);
            }
            let line = (0, &indices[..], 0, batch.len() as u16);
            render(&mut pipeline, &mut host, &[line], 320, 224);

            let frame = pipeline.frame();
            for (x, &raw) in batch.iter().enumerate() {
                assert_eq!(
                    first_row_pixel(frame.pixels, x, format),
                    reference(format, raw),
                    "{format:?} {raw:#05x}"
                );
            }
        }
    }
}

#[test]
fn extremes_map_to_black_and_white() {
    assert_eq!(PixelFormat::Rgb565.strategy().convert_color(0xFFF), 0xFFFF);
    assert_eq!(PixelFormat::Xrgb8888.strategy().convert_color(0xFFF), 0x00FF_FFFF);
    assert_eq!(PixelFormat::Rgb1555.strategy().convert_color(0xFFF), 0x7FFF);
    for format in PixelFormat::PREFERENCE {
        assert_eq!(format.strategy().convert_color(0), 0);
    }
}

#[test]
fn palette_reconverts_on_format_switch() {
    let mut palette = PaletteTable::new(PixelFormat::Rgb565);
    assert!(palette.set(5, 0x0F0));
    assert!(!palette.set(PALETTE_SIZE as u16, 0xFFF));

    palette.reformat(PixelFormat::Xrgb8888);
    assert_eq!(palette.entries()[5], 0x0000_FF00);
    palette.reformat(PixelFormat::Rgb1555);
    assert_eq!(palette.entries()[5], 0x1F << 5);
}

#[test]
fn negotiation_prefers_rgb565_then_xrgb8888() {
    let mut pipeline = PixelPipeline::new();
    let mut host = MockHost::accepting(&[PixelFormat::Rgb1555, PixelFormat::Xrgb8888]);
    assert_eq!(pipeline.negotiate_format(&mut host), PixelFormat::Xrgb8888);

    let mut host = MockHost::accepting(&PixelFormat::PREFERENCE);
    assert_eq!(pipeline.negotiate_format(&mut host), PixelFormat::Rgb565);

    let mut host = MockHost::accepting(&[]);
    assert_eq!(pipeline.negotiate_format(&mut host), PixelFormat::Rgb1555);
    assert_eq!(pipeline.active_format(), PixelFormat::Rgb1555);
}

/// Feeds `lines` through the pipeline as one frame.
fn render(
    pipeline: &mut PixelPipeline,
    host: &mut MockHost,
    lines: &[(u16, &[u8], u16, u16)],
    width: u16,
    height: u16,
) {
    let mut geometry = GeometryState::default();
    pipeline.begin_frame();
    for &(y, pixels, left, right) in lines {
        pipeline.scanline_rendered(host, &mut geometry, y, pixels, left, right, width, height);
    }
}

#[test]
fn only_the_dirty_span_is_written() {
    let mut pipeline = PixelPipeline::new();
    let mut host = MockHost::accepting(&[PixelFormat::Xrgb8888]);
    pipeline.negotiate_format(&mut host);
    pipeline.color_updated(1, 0xFFF);

    let pixels = [1u8; 320];
    render(&mut pipeline, &mut host, &[(0, &pixels[..], 10, 20)], 320, 224);

    let frame = pipeline.frame();
    let row = &frame.pixels[..frame.pitch];
    let white = 0x00FF_FFFFu32.to_ne_bytes();
    assert!(row[..40].iter().all(|&b| b == 0));
    assert!(row[40..80].chunks_exact(4).all(|p| p == white));
    assert!(row[80..].iter().all(|&b| b == 0));
}

#[test]
fn adversarial_scanlines_stay_in_bounds() {
    let mut pipeline = PixelPipeline::new();
    let mut host = MockHost::accepting(&[PixelFormat::Rgb565]);
    pipeline.negotiate_format(&mut host);
    pipeline.color_updated(2, 0xFFF);

    let full = [2u8; 400];
    let short = [2u8; 8];
    let lines: [(u16, &[u8], u16, u16); 6] = [
        (0, &full[..], 0, u16::MAX),
        (223, &full[..], 300, 1000),
        (224, &full[..], 0, 320),
        (u16::MAX, &full[..], 0, 320),
        (5, &short[..], 0, 320),
        (6, &full[..], 200, 100),
    ];
    render(&mut pipeline, &mut host, &lines, 320, 224);

    let frame = pipeline.frame();
    assert_eq!((frame.width, frame.height), (320, 224));
    assert_eq!(frame.pixels.len(), 224 * frame.pitch);

    let row = |y: usize| &frame.pixels[y * frame.pitch..(y + 1) * frame.pitch];
    assert!(row(0).iter().all(|&b| b == 0xFF));
    assert!(row(223)[600..].iter().all(|&b| b == 0xFF));
    assert!(row(5)[..16].iter().all(|&b| b == 0xFF));
    assert!(row(5)[16..].iter().all(|&b| b == 0));
    assert!(row(6).iter().all(|&b| b == 0));
}

#[test]
fn oversized_screen_is_clamped_to_maximum() {
    let mut pipeline = PixelPipeline::new();
    let mut host = MockHost::accepting(&[PixelFormat::Xrgb8888]);
    pipeline.negotiate_format(&mut host);

    let pixels = vec![0u8; 1024];
    let lines: Vec<(u16, &[u8], u16, u16)> = (0..600).map(|y| (y, &pixels[..], 0, 1024)).collect();
    render(&mut pipeline, &mut host, &lines, 1024, 600);

    let frame = pipeline.frame();
    assert_eq!((frame.width, frame.height), (MAX_WIDTH, MAX_HEIGHT));
}

#[test]
fn host_buffer_in_other_format_gets_its_own_strategy() {
    let mut pipeline = PixelPipeline::new();
    let mut host = MockHost::accepting(&[PixelFormat::Rgb565]);
    pipeline.negotiate_format(&mut host);
    pipeline.color_updated(0, 0x00F);
    host.lent = Some(LentBuffer::new(320, 240, PixelFormat::Rgb1555));

    let pixels = [0u8; 320];
    render(&mut pipeline, &mut host, &[(0, &pixels[..], 0, 320)], 320, 224);
    assert!(pipeline.is_using_host_framebuffer());
    assert_eq!(pipeline.active_format(), PixelFormat::Rgb1555);
    assert_eq!(pipeline.palette().format(), PixelFormat::Rgb1555);

    let lent = host.lent.as_ref().unwrap();
    let first = u16::from_ne_bytes([lent.bytes[0], lent.bytes[1]]);
    assert_eq!(first, 0x1F << 10);

    // The next frame starts on the fallback target again.
    pipeline.begin_frame();
    assert!(!pipeline.is_using_host_framebuffer());
    assert_eq!(pipeline.palette().format(), PixelFormat::Rgb565);
}

#[test]
fn sat_add_i16_clamps() {
    assert_eq!(sat_add_i16(i16::MAX, 1), i16::MAX);
    assert_eq!(sat_add_i16(i16::MIN, -1), i16::MIN);
    assert_eq!(sat_add_i16(100, -50), 50);
}

fn timing_at_output_rate() -> AudioTiming {
    let rate = OUTPUT_RATE as f64;
    AudioTiming {
        fm: rate,
        psg: rate,
        pcm: rate,
        cdda: rate,
        output: OUTPUT_RATE,
    }
}

#[test]
fn mixer_passes_native_rate_audio_through_unchanged() {
    let mut mixer = Mixer::with_timing(timing_at_output_rate());
    mixer.begin_frame();
    let input: Vec<i16> = (0..800).map(|i| (i * 37 % 2000 - 1000) as i16).collect();
    mixer.allocate(Family::Pcm, 400).copy_from_slice(&input);

    let mut emitted = None;
    mixer.end_frame(|samples, frames| emitted = Some((samples.to_vec(), frames)));
    assert_eq!(emitted, Some((input, 400)));
}

#[test]
fn mixer_emits_once_with_no_audio() {
    let mut mixer = Mixer::new(crate::abi::TvStandard::Ntsc);
    mixer.begin_frame();
    let mut calls = 0;
    mixer.end_frame(|samples, frames| {
        calls += 1;
        assert!(samples.is_empty());
        assert_eq!(frames, 0);
    });
    assert_eq!(calls, 1);
}

#[test]
fn psg_is_duplicated_and_families_saturate() {
    let mut mixer = Mixer::with_timing(timing_at_output_rate());
    mixer.begin_frame();
    mixer.allocate(Family::Psg, 4).copy_from_slice(&[1, 2, 3, 4]);
    mixer.allocate(Family::Fm, 4).fill(i16::MAX);

    let mut out = Vec::new();
    mixer.end_frame(|samples, _| out = samples.to_vec());
    assert_eq!(out, vec![i16::MAX; 8]);

    mixer.begin_frame();
    mixer.allocate(Family::Psg, 2).copy_from_slice(&[-5, 7]);
    mixer.end_frame(|samples, _| out = samples.to_vec());
    assert_eq!(out, vec![-5, -5, 7, 7]);
}

#[test]
fn allocations_append_within_a_frame() {
    let mut mixer = Mixer::with_timing(timing_at_output_rate());
    mixer.begin_frame();
    assert_eq!(mixer.allocate(Family::Cdda, 3).len(), 6);
    assert_eq!(mixer.allocate(Family::Cdda, 2).len(), 4);
    assert_eq!(mixer.allocate(Family::Psg, 5).len(), 5);
    assert_eq!(mixer.frames(Family::Cdda), 5);

    mixer.begin_frame();
    assert_eq!(mixer.frames(Family::Cdda), 0);
}

#[test]
fn slower_sources_are_stretched_to_the_longest() {
    let mut timing = timing_at_output_rate();
    timing.cdda = OUTPUT_RATE as f64 / 2.0;
    let mut mixer = Mixer::with_timing(timing);
    mixer.begin_frame();
    mixer
        .allocate(Family::Cdda, 2)
        .copy_from_slice(&[0, 0, 1000, -1000]);

    let mut out = Vec::new();
    let mut count = 0;
    mixer.end_frame(|samples, frames| {
        out = samples.to_vec();
        count = frames;
    });
    assert_eq!(count, 4);
    // Linear interpolation between the two source frames, holding the last.
    assert_eq!(out, vec![0, 0, 500, -500, 1000, -1000, 1000, -1000]);
}

#[test]
fn resampling_carries_its_position_across_frames() {
    let mut timing = timing_at_output_rate();
    timing.pcm = OUTPUT_RATE as f64 * 1.5;
    let mut mixer = Mixer::with_timing(timing);

    let mut left = Vec::new();
    for first in [0i16, 400] {
        mixer.begin_frame();
        let ramp = mixer.allocate(Family::Pcm, 4);
        for (i, frame) in ramp.chunks_exact_mut(2).enumerate() {
            frame.fill(first + 100 * i as i16);
        }
        mixer.end_frame(|samples, frames| {
            assert_eq!(frames, 3);
            left.extend(samples.iter().step_by(2).copied());
        });
    }
    // Output frame n samples source frame 1.5 * n. The last one lies past
    // everything generated so far and holds the newest sample.
    assert_eq!(left, [0, 150, 300, 450, 600, 700]);
}

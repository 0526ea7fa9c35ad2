//! One emulation session: the engine plus every bridge it talks to.
//!
//! [`Session::run_frame`] drives one frontend iteration:
//! options -> input poll -> engine iterate (re-entering the bridges through
//! [`FrameContext`]) -> audio -> geometry -> video.
//!
//! Nothing here is global. The libretro adapter keeps one `Session` behind its
//! instance lock; tests create as many as they like.

use crate::abi::{
    Button, CddaMode, Engine, EngineCallbacks, MemoryRegion, SECTOR_WORDS, TvStandard,
};
use crate::av::audio::OUTPUT_RATE;
use crate::av::{Family, GeometryState, Mixer, PixelFormat, PixelPipeline};
use crate::host::{AvInfo, Host};
use crate::input::{self, PLAYERS};
use crate::loader::Content;
use crate::options::{SCHEMA, Settings};
use crate::state::{self, SnapshotError};
use crate::storage::{self, OpticalMedia, SaveMemory, Vfs};
use std::path::{Path, PathBuf};
use std::rc::Rc;


pub struct Session<E: Engine> {
    engine: E,
    pipeline: PixelPipeline,
    geometry: GeometryState,
    mixer: Mixer,
    save: SaveMemory,
    media: OpticalMedia,
    vfs: Rc<dyn Vfs>,
    rom: Vec<u8>,
    save_dir: PathBuf,
    settings: Settings,
    cd_boot: bool,
}

impl<E: Engine> Session<E> {
    pub fn new(vfs: Rc<dyn Vfs>) -> Self {
        let settings = SCHEMA.defaults();
        let mut geometry = GeometryState::default();
        geometry.set_tall_interlace(settings.tall_interlace);
        geometry.take_dirty();
        Self {
            engine: E::new(&settings.engine),
            pipeline: PixelPipeline::new(),
            geometry,
            mixer: Mixer::new(settings.engine.tv_standard),
            save: SaveMemory::new(vfs.clone()),
            media: OpticalMedia::default(),
            vfs,
            rom: Vec::new(),
            save_dir: PathBuf::new(),
            settings,
            cd_boot: false,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vfs(&self) -> &dyn Vfs {
        self.vfs.as_ref()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pipeline.fallback_format()
    }

    /// Geometry and timing as they stand, without touching the host.
    pub fn current_av_info(&self) -> AvInfo {
        AvInfo {
            geometry: self.geometry.geometry(),
            fps: self.settings.engine.tv_standard.frame_rate(),
            sample_rate: OUTPUT_RATE as f64,
        }
    }

    /// Negotiate the pixel format and report geometry and timing.
    pub fn av_info(&mut self, host: &mut dyn Host) -> AvInfo {
        self.pipeline.negotiate_format(host);
        self.current_av_info()
    }

    /// Start `content` from power-on.
    pub fn load(&mut self, host: &mut dyn Host, content: Content) {
        self.update_options(host, true);
        self.save_dir = storage::save_directory(host);
        match content {
            Content::Cartridge(rom) => {
                self.rom = rom;
                self.media.eject();
                self.cd_boot = false;
            }
            Content::Disc(disc) => {
                self.rom.clear();
                self.media.insert(disc);
                self.cd_boot = true;
            }
        }
        log::info!(
            "session loaded ({}), saves in {:?}",
            if self.cd_boot { "disc" } else { "cartridge" },
            self.save_dir
        );
        self.reset(host);
    }

    pub fn unload(&mut self) {
        self.save.close();
        self.media.eject();
        self.rom = Vec::new();
        self.cd_boot = false;
    }

    pub fn is_loaded(&self) -> bool {
        !self.rom.is_empty() || self.media.has_disc()
    }

    pub fn reset(&mut self, host: &mut dyn Host) {
        let (engine, mut ctx) = self.split(host);
        let cd_boot = ctx.cd_boot;
        engine.reset(cd_boot, &mut ctx);
    }

    /// Re-read every option from the host and apply it.
    ///
    /// With `only_flags`, a TV standard change is not announced to the host
    /// (used while loading, before the host has asked for AV info).
    pub fn update_options(&mut self, host: &mut dyn Host, only_flags: bool) {
        let settings = Settings::read(&SCHEMA, host);
        let standard_changed = settings.engine.tv_standard != self.settings.engine.tv_standard;

        self.geometry.set_tall_interlace(settings.tall_interlace);
        self.engine.configure(&settings.engine);
        self.settings = settings;

        if standard_changed {
            log::info!("tv standard now {:?}", self.settings.engine.tv_standard);
            self.mixer.reinit(self.settings.engine.tv_standard);
            if !only_flags {
                host.set_system_av_info(&self.current_av_info());
            }
        }
    }

    pub fn run_frame(&mut self, host: &mut dyn Host) {
        if host.options_updated() {
            self.update_options(host, false);
        }
        host.poll_input();

        self.mixer.begin_frame();
        self.pipeline.begin_frame();
        {
            let (engine, mut ctx) = self.split(host);
            engine.iterate(&mut ctx);
        }

        self.mixer
            .end_frame(|samples, frames| host.audio_batch(samples, frames));
        if self.geometry.take_dirty() {
            host.set_geometry(&self.geometry.geometry());
        }
        host.video_refresh(self.pipeline.frame());
    }

    pub fn snapshot_size(&self) -> usize {
        state::snapshot_size(&self.engine)
    }

    pub fn capture(&self, dest: &mut [u8]) -> Result<(), SnapshotError> {
        state::capture(&self.engine, &self.media, dest)
    }

    pub fn restore(&mut self, src: &[u8]) -> Result<(), SnapshotError> {
        state::restore(&mut self.engine, &mut self.media, src)?;
        self.mixer.restart();
        Ok(())
    }

    pub fn memory(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        self.engine.memory_region(region)
    }

    /// The TV standard currently emulated.
    pub fn region(&self) -> TvStandard {
        self.settings.engine.tv_standard
    }

    pub fn is_pal(&self) -> bool {
        self.settings.pal()
    }

    fn split<'a>(&'a mut self, host: &'a mut dyn Host) -> (&'a mut E, FrameContext<'a>) {
        let ctx = FrameContext {
            host,
            pipeline: &mut self.pipeline,
            geometry: &mut self.geometry,
            mixer: &mut self.mixer,
            save: &mut self.save,
            media: &mut self.media,
            rom: &self.rom,
            save_dir: &self.save_dir,
            cd_boot: self.cd_boot,
        };
        (&mut self.engine, ctx)
    }
}

/// The bridges as seen by the engine during one call.
pub struct FrameContext<'a> {
    host: &'a mut dyn Host,
    pipeline: &'a mut PixelPipeline,
    geometry: &'a mut GeometryState,
    mixer: &'a mut Mixer,
    save: &'a mut SaveMemory,
    media: &'a mut OpticalMedia,
    rom: &'a [u8],
    save_dir: &'a Path,
    cd_boot: bool,
}

impl FrameContext<'_> {
    fn generate(&mut self, family: Family, count: usize, generate: &mut dyn FnMut(&mut [i16])) {
        generate(self.mixer.allocate(family, count));
    }
}

impl EngineCallbacks for FrameContext<'_> {
    fn cartridge_read(&mut self, address: u32) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(0)
    }

    fn cartridge_written(&mut self, _address: u32, _value: u8) {}

    fn color_updated(&mut self, index: u16, colour: u16) {
        self.pipeline.color_updated(index, colour);
    }

    fn scanline_rendered(
        &mut self,
        scanline: u16,
        pixels: &[u8],
        left: u16,
        right: u16,
        screen_width: u16,
        screen_height: u16,
    ) {
        self.pipeline.scanline_rendered(
            self.host,
            self.geometry,
            scanline,
            pixels,
            left,
            right,
            screen_width,
            screen_height,
        );
    }

    fn input_requested(&mut self, player: u8, button: Button) -> bool {
        let port = player as u32;
        port < PLAYERS && self.host.joypad_pressed(port, input::map_button(button))
    }

    fn fm_audio_to_be_generated(
        &mut self,
        total_frames: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    ) {
        self.generate(Family::Fm, total_frames, generate);
    }

    fn psg_audio_to_be_generated(
        &mut self,
        total_samples: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    ) {
        self.generate(Family::Psg, total_samples, generate);
    }

    fn pcm_audio_to_be_generated(
        &mut self,
        total_frames: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    ) {
        self.generate(Family::Pcm, total_frames, generate);
    }

    fn cdda_audio_to_be_generated(
        &mut self,
        total_frames: usize,
        generate: &mut dyn FnMut(&mut [i16]),
    ) {
        self.generate(Family::Cdda, total_frames, generate);
    }

    fn cd_seeked(&mut self, sector: u32) {
        self.media.seek_to_sector(sector);
    }

    fn cd_sector_read(&mut self, buffer: &mut [u16; SECTOR_WORDS]) {
        self.media.read_sector(buffer);
    }

    fn cd_track_seeked(&mut self, track: u16, mode: CddaMode) -> bool {
        self.media.seek_track(track, mode)
    }

    fn cd_audio_read(&mut self, buffer: &mut [i16], total_frames: usize) -> usize {
        self.media.read_audio(buffer, total_frames)
    }

    fn save_file_opened_for_reading(&mut self, name: &str) -> bool {
        self.save.open_for_reading(self.save_dir, name)
    }

    fn save_file_read(&mut self) -> Option<u8> {
        self.save.read_byte()
    }

    fn save_file_opened_for_writing(&mut self, name: &str) -> bool {
        self.save.open_for_writing(self.save_dir, name)
    }

    fn save_file_written(&mut self, byte: u8) {
        self.save.write_byte(byte);
    }

    fn save_file_closed(&mut self) {
        self.save.close();
    }

    fn save_file_removed(&mut self, name: &str) -> bool {
        self.save.remove(self.save_dir, name)
    }

    fn save_file_size_obtained(&mut self, name: &str) -> Option<u64> {
        self.save.size_of(self.save_dir, name)
    }
}

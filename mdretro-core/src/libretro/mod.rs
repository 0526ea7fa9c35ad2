//! libretro C ABI adapter.
//!
//! An engine crate builds its libretro core (a `cdylib`) with one line:
//!
//! ```ignore
//! mdretro_core::mdretro_core!(MyEngine);
//! ```
//!
//! The macro emits every `retro_*` symbol. Each one locks a static
//! [`Instance`] and forwards to the [`Session`] it owns, with a
//! [`RetroHost`] built from the callbacks the frontend handed over.
//!
//! Notes:
//! - The instance lock is taken once per entry point. Code the engine reaches
//!   through its callbacks never takes it.
//! - Options (core options v2, v1 or plain variables, whichever the frontend
//!   supports), input descriptors and the log interface are exchanged in
//!   `retro_set_environment`, the VFS and serialisation quirks in `retro_init`.

pub mod ffi;
mod host;
mod logger;
mod vfs;

pub use host::{Callbacks, RetroHost};
pub use libretro_sys as sys;
pub use vfs::RetroVfs;

use crate::abi::{Engine, MemoryRegion, TvStandard};
use crate::av::GeometryState;
use crate::av::audio::OUTPUT_RATE;
use crate::host::AvInfo;
use crate::input::{self, DESCRIPTORS, PLAYERS};
use crate::loader::{self, Content};
use crate::options::SCHEMA;
use crate::session::Session;
use crate::storage::{StdVfs, Vfs};
use anyhow::Context;
use crate::options::OptionDef;
use ffi::{
    AudioSampleBatchFn, ContentInfoOverride, CoreOptionDefinition, CoreOptionV2Category,
    CoreOptionV2Definition, CoreOptionValue, CoreOptionsV2, ENVIRONMENT_GET_CORE_OPTIONS_VERSION,
    ENVIRONMENT_SET_CONTENT_INFO_OVERRIDE, ENVIRONMENT_SET_CORE_OPTIONS,
    ENVIRONMENT_SET_CORE_OPTIONS_V2, ENVIRONMENT_SET_SERIALIZATION_QUIRKS, EnvironmentFn,
    InputDescriptor, InputPollFn, InputStateFn, LogCallback, LogPrintfFn,
    NUM_CORE_OPTION_VALUES_MAX, SERIALIZATION_QUIRK_ENDIAN_DEPENDENT,
    SERIALIZATION_QUIRK_PLATFORM_DEPENDENT, Variable, VideoRefreshFn,
};
use std::ffi::{CStr, CString, c_char, c_uint, c_void};
use std::path::Path;
use std::ptr;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const API_VERSION: c_uint = 1;

const LIBRARY_NAME: &CStr = c"mdretro";
const LIBRARY_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
const VALID_EXTENSIONS: &CStr = c"bin|md|gen|cue|iso";
/// Cartridge images may be handed over in memory so the frontend can soft-patch them.
const PATCHABLE_EXTENSIONS: &CStr = c"bin|md|gen";

pub fn system_info() -> sys::SystemInfo {
    sys::SystemInfo {
        library_name: LIBRARY_NAME.as_ptr(),
        library_version: LIBRARY_VERSION.as_ptr().cast(),
        valid_extensions: VALID_EXTENSIONS.as_ptr(),
        need_fullpath: true,
        block_extract: false,
    }
}

fn region_id(standard: TvStandard) -> c_uint {
    match standard {
        TvStandard::Pal => sys::Region::PAL as c_uint,
        TvStandard::Ntsc => sys::Region::NTSC as c_uint,
    }
}

fn memory_region(id: c_uint) -> Option<MemoryRegion> {
    match id {
        sys::MEMORY_SAVE_RAM => Some(MemoryRegion::SaveRam),
        sys::MEMORY_SYSTEM_RAM => Some(MemoryRegion::WorkRam),
        sys::MEMORY_VIDEO_RAM => Some(MemoryRegion::VideoRam),
        _ => None,
    }
}

fn open_content(vfs: &dyn Vfs, path: Option<&Path>, data: Option<&[u8]>) -> anyhow::Result<Content> {
    let content = loader::load(vfs, path, data).with_context(|| match path {
        Some(path) if data.is_none() => format!("failed to load {}", path.display()),
        _ => "failed to load content from memory".to_string(),
    })?;
    Ok(content)
}

struct Frontend<E: Engine> {
    callbacks: Callbacks,
    session: Option<Session<E>>,
    /// Strings handed to the frontend in `retro_set_environment`.
    registered: Vec<CString>,
}

// SAFETY: libretro drives a core from a single thread. The session's `Rc`s and
// any lent framebuffer pointer are only touched under the instance lock.
unsafe impl<E: Engine> Send for Frontend<E> {}

impl<E: Engine> Frontend<E> {
    fn host(&self) -> RetroHost {
        RetroHost::new(self.callbacks)
    }

    fn log_interface(&self) -> Option<LogPrintfFn> {
        let mut callback = LogCallback { log: None };
        // SAFETY: GET_LOG_INTERFACE takes a `struct retro_log_callback *`.
        let ok = unsafe {
            self.callbacks
                .environment(sys::ENVIRONMENT_GET_LOG_INTERFACE, &mut callback)
        };
        if ok { callback.log } else { None }
    }

    fn keep(&mut self, text: &str) -> Option<*const c_char> {
        let text = CString::new(text).ok()?;
        let ptr = text.as_ptr();
        self.registered.push(text);
        Some(ptr)
    }

    /// Like [`Frontend::keep`], null for strings that cannot be handed over.
    fn text(&mut self, text: &str) -> *const c_char {
        self.keep(text).unwrap_or(ptr::null())
    }

    fn optional_text(&mut self, text: Option<&str>) -> *const c_char {
        match text {
            Some(text) => self.text(text),
            None => ptr::null(),
        }
    }

    fn option_values(&mut self, option: &OptionDef) -> [CoreOptionValue; NUM_CORE_OPTION_VALUES_MAX] {
        let mut values = [CoreOptionValue::END; NUM_CORE_OPTION_VALUES_MAX];
        // The last slot is always the terminator.
        let slots = &mut values[..NUM_CORE_OPTION_VALUES_MAX - 1];
        for (slot, value) in slots.iter_mut().zip(&option.values) {
            *slot = CoreOptionValue {
                value: self.text(&value.value),
                label: self.optional_text(value.label.as_deref()),
            };
        }
        values
    }

    fn core_options_version(&self) -> c_uint {
        let mut version: c_uint = 0;
        // SAFETY: GET_CORE_OPTIONS_VERSION takes an `unsigned *`.
        let ok = unsafe {
            self.callbacks
                .environment(ENVIRONMENT_GET_CORE_OPTIONS_VERSION, &mut version)
        };
        if ok { version } else { 0 }
    }

    /// Register the option table through the richest interface the frontend
    /// supports: core options v2 (with categories), v1, then plain variables.
    fn register_options(&mut self) {
        let version = self.core_options_version();
        let registered = (version >= 2 && self.register_options_v2())
            || (version >= 1 && self.register_options_v1());
        if !registered {
            self.register_variables();
        }
    }

    fn register_options_v2(&mut self) -> bool {
        let mut categories = Vec::with_capacity(SCHEMA.categories.len() + 1);
        for category in &SCHEMA.categories {
            categories.push(CoreOptionV2Category {
                key: self.text(&category.key),
                desc: self.text(&category.label),
                info: self.text(&category.info),
            });
        }
        categories.push(CoreOptionV2Category {
            key: ptr::null(),
            desc: ptr::null(),
            info: ptr::null(),
        });

        let mut definitions = Vec::with_capacity(SCHEMA.options.len() + 1);
        for option in &SCHEMA.options {
            definitions.push(CoreOptionV2Definition {
                key: self.text(&option.key),
                desc: self.text(&option.label),
                desc_categorized: self.text(option.categorised_label()),
                info: self.optional_text(option.info.as_deref()),
                info_categorized: ptr::null(),
                category_key: self.text(&option.category),
                values: self.option_values(option),
                default_value: self.text(&option.default),
            });
        }
        definitions.push(CoreOptionV2Definition {
            key: ptr::null(),
            desc: ptr::null(),
            desc_categorized: ptr::null(),
            info: ptr::null(),
            info_categorized: ptr::null(),
            category_key: ptr::null(),
            values: [CoreOptionValue::END; NUM_CORE_OPTION_VALUES_MAX],
            default_value: ptr::null(),
        });

        let mut options = CoreOptionsV2 {
            categories: categories.as_mut_ptr(),
            definitions: definitions.as_mut_ptr(),
        };
        // SAFETY: SET_CORE_OPTIONS_V2 takes a `struct retro_core_options_v2 *`
        // whose arrays are terminated by a null key.
        unsafe {
            self.callbacks
                .environment(ENVIRONMENT_SET_CORE_OPTIONS_V2, &mut options)
        }
    }

    fn register_options_v1(&mut self) -> bool {
        let mut definitions = Vec::with_capacity(SCHEMA.options.len() + 1);
        for option in &SCHEMA.options {
            definitions.push(CoreOptionDefinition {
                key: self.text(&option.key),
                desc: self.text(&option.label),
                info: self.optional_text(option.info.as_deref()),
                values: self.option_values(option),
                default_value: self.text(&option.default),
            });
        }
        definitions.push(CoreOptionDefinition {
            key: ptr::null(),
            desc: ptr::null(),
            info: ptr::null(),
            values: [CoreOptionValue::END; NUM_CORE_OPTION_VALUES_MAX],
            default_value: ptr::null(),
        });
        // SAFETY: SET_CORE_OPTIONS takes a null-key-terminated
        // `struct retro_core_option_definition` array.
        unsafe {
            self.callbacks
                .environment(ENVIRONMENT_SET_CORE_OPTIONS, definitions.as_mut_ptr())
        }
    }

    fn register_variables(&mut self) {
        let mut variables = Vec::with_capacity(SCHEMA.options.len() + 1);
        for option in &SCHEMA.options {
            let key = self.keep(&option.key);
            let value = self.keep(&option.variable_description());
            match (key, value) {
                (Some(key), Some(value)) => variables.push(Variable { key, value }),
                _ => log::warn!("option {:?} cannot be registered", option.key),
            }
        }
        variables.push(Variable {
            key: ptr::null(),
            value: ptr::null(),
        });
        // SAFETY: SET_VARIABLES takes a NULL-terminated `struct retro_variable` array.
        unsafe {
            self.callbacks
                .environment(sys::ENVIRONMENT_SET_VARIABLES, variables.as_mut_ptr())
        };
    }

    fn register_input_descriptors(&mut self) {
        let mut descriptors = Vec::with_capacity(PLAYERS as usize * DESCRIPTORS.len() + 1);
        for port in 0..PLAYERS {
            for (button, name) in DESCRIPTORS {
                let Some(description) = self.keep(name) else {
                    continue;
                };
                descriptors.push(InputDescriptor {
                    port,
                    device: sys::DEVICE_JOYPAD,
                    index: 0,
                    id: input::map_button(button) as c_uint,
                    description,
                });
            }
        }
        descriptors.push(InputDescriptor {
            port: 0,
            device: 0,
            index: 0,
            id: 0,
            description: ptr::null(),
        });
        // SAFETY: SET_INPUT_DESCRIPTORS takes a terminated `struct retro_input_descriptor` array.
        unsafe {
            self.callbacks
                .environment(sys::ENVIRONMENT_SET_INPUT_DESCRIPTORS, descriptors.as_mut_ptr())
        };
    }

    fn register_content_overrides(&self) {
        let mut overrides = [
            ContentInfoOverride {
                extensions: PATCHABLE_EXTENSIONS.as_ptr(),
                need_fullpath: false,
                persistent_data: true,
            },
            ContentInfoOverride {
                extensions: ptr::null(),
                need_fullpath: false,
                persistent_data: false,
            },
        ];
        // SAFETY: the command takes a terminated `struct retro_system_content_info_override` array.
        unsafe {
            self.callbacks
                .environment(ENVIRONMENT_SET_CONTENT_INFO_OVERRIDE, overrides.as_mut_ptr())
        };
    }
}

/// The one core instance behind the `retro_*` symbols.
pub struct Instance<E: Engine> {
    frontend: Mutex<Frontend<E>>,
}

impl<E: Engine> Default for Instance<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Instance<E> {
    pub const fn new() -> Self {
        Self {
            frontend: Mutex::new(Frontend {
                callbacks: Callbacks::new(),
                session: None,
                registered: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frontend<E>> {
        self.frontend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<R>(&self, otherwise: R, f: impl FnOnce(&mut Session<E>, &mut RetroHost) -> R) -> R {
        let mut frontend = self.lock();
        let mut host = frontend.host();
        match frontend.session.as_mut() {
            Some(session) => f(session, &mut host),
            None => {
                log::warn!("libretro entry point called outside retro_init/retro_deinit");
                otherwise
            }
        }
    }

    pub fn set_environment(&self, environment: Option<EnvironmentFn>) {
        let mut frontend = self.lock();
        frontend.callbacks.environment = environment;
        logger::install(frontend.log_interface());

        frontend.registered.clear();
        frontend.register_options();
        frontend.register_input_descriptors();
        frontend.register_content_overrides();
    }

    pub fn set_video_refresh(&self, callback: Option<VideoRefreshFn>) {
        self.lock().callbacks.video_refresh = callback;
    }

    pub fn set_audio_sample_batch(&self, callback: Option<AudioSampleBatchFn>) {
        self.lock().callbacks.audio_batch = callback;
    }

    pub fn set_input_poll(&self, callback: Option<InputPollFn>) {
        self.lock().callbacks.input_poll = callback;
    }

    pub fn set_input_state(&self, callback: Option<InputStateFn>) {
        self.lock().callbacks.input_state = callback;
    }

    pub fn init(&self) {
        let mut frontend = self.lock();
        let vfs: Rc<dyn Vfs> = match RetroVfs::from_frontend(&frontend.callbacks) {
            Some(vfs) => {
                log::info!("using the frontend's file system");
                Rc::new(vfs)
            }
            None => Rc::new(StdVfs),
        };

        let mut quirks = SERIALIZATION_QUIRK_ENDIAN_DEPENDENT | SERIALIZATION_QUIRK_PLATFORM_DEPENDENT;
        // SAFETY: SET_SERIALIZATION_QUIRKS takes a `uint64_t *`.
        unsafe {
            frontend
                .callbacks
                .environment(ENVIRONMENT_SET_SERIALIZATION_QUIRKS, &mut quirks)
        };

        let mut session = Session::new(vfs);
        session.update_options(&mut frontend.host(), true);
        frontend.session = Some(session);
    }

    pub fn deinit(&self) {
        self.lock().session = None;
    }

    pub fn system_av_info(&self) -> sys::SystemAvInfo {
        let fallback = AvInfo {
            geometry: GeometryState::default().geometry(),
            fps: TvStandard::default().frame_rate(),
            sample_rate: OUTPUT_RATE as f64,
        };
        let info = self.with_session(fallback, |session, host| session.av_info(host));
        host::system_av_info(&info)
    }

    pub fn set_controller_port_device(&self, port: c_uint, device: c_uint) {
        log::debug!("device {device} plugged into port {port}; only joypads are supported");
    }

    pub fn reset(&self) {
        self.with_session((), |session, host| session.reset(host));
    }

    pub fn run(&self) {
        self.with_session((), |session, host| session.run_frame(host));
    }

    pub fn serialize_size(&self) -> usize {
        self.with_session(0, |session, _| session.snapshot_size())
    }

    pub fn serialize(&self, dest: &mut [u8]) -> bool {
        self.with_session(false, |session, _| match session.capture(dest) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("save state not written: {e}");
                false
            }
        })
    }

    pub fn unserialize(&self, src: &[u8]) -> bool {
        self.with_session(false, |session, _| match session.restore(src) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("save state not loaded: {e}");
                false
            }
        })
    }

    pub fn load_game(&self, path: Option<&Path>, data: Option<&[u8]>) -> bool {
        self.with_session(false, |session, host| {
            match open_content(session.vfs(), path, data) {
                Ok(content) => {
                    session.load(host, content);
                    true
                }
                Err(e) => {
                    log::error!("{e:#}");
                    false
                }
            }
        })
    }

    /// [`Instance::load_game`] from a `struct retro_game_info`.
    ///
    /// # Safety
    ///
    /// `info` must be null or point to a valid `retro_game_info` whose `path`
    /// and `data` are null or valid.
    pub unsafe fn load_game_info(&self, info: *const sys::GameInfo) -> bool {
        // SAFETY: guaranteed by the caller.
        let Some(info) = (unsafe { info.as_ref() }) else {
            log::error!("retro_load_game called without content");
            return false;
        };
        let path = (!info.path.is_null())
            // SAFETY: guaranteed by the caller.
            .then(|| unsafe { CStr::from_ptr(info.path) }.to_string_lossy().into_owned());
        let data = (!info.data.is_null() && info.size > 0)
            // SAFETY: guaranteed by the caller.
            .then(|| unsafe { std::slice::from_raw_parts(info.data.cast::<u8>(), info.size) });
        self.load_game(path.as_deref().map(Path::new), data)
    }

    pub fn unload_game(&self) {
        self.with_session((), |session, _| session.unload());
    }

    pub fn region(&self) -> c_uint {
        self.with_session(sys::Region::NTSC as c_uint, |session, _| region_id(session.region()))
    }

    /// Pointer to and length of a memory region, or null and zero.
    pub fn memory(&self, id: c_uint) -> (*mut c_void, usize) {
        let Some(region) = memory_region(id) else {
            return (ptr::null_mut(), 0);
        };
        self.with_session((ptr::null_mut(), 0), |session, _| {
            match session.memory(region) {
                Some(memory) => (memory.as_mut_ptr().cast(), memory.len()),
                None => (ptr::null_mut(), 0),
            }
        })
    }
}

/// Emit the libretro C ABI for an [`Engine`] type.
///
/// Use once, in the crate that builds the core's `cdylib`.
#[macro_export]
macro_rules! mdretro_core {
    ($engine:ty) => {
        static MDRETRO_INSTANCE: $crate::libretro::Instance<$engine> =
            $crate::libretro::Instance::new();

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_environment(
            callback: ::std::option::Option<$crate::libretro::ffi::EnvironmentFn>,
        ) {
            MDRETRO_INSTANCE.set_environment(callback);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_video_refresh(
            callback: ::std::option::Option<$crate::libretro::ffi::VideoRefreshFn>,
        ) {
            MDRETRO_INSTANCE.set_video_refresh(callback);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_audio_sample(
            _callback: ::std::option::Option<$crate::libretro::ffi::AudioSampleFn>,
        ) {
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_audio_sample_batch(
            callback: ::std::option::Option<$crate::libretro::ffi::AudioSampleBatchFn>,
        ) {
            MDRETRO_INSTANCE.set_audio_sample_batch(callback);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_input_poll(
            callback: ::std::option::Option<$crate::libretro::ffi::InputPollFn>,
        ) {
            MDRETRO_INSTANCE.set_input_poll(callback);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_input_state(
            callback: ::std::option::Option<$crate::libretro::ffi::InputStateFn>,
        ) {
            MDRETRO_INSTANCE.set_input_state(callback);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_init() {
            MDRETRO_INSTANCE.init();
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_deinit() {
            MDRETRO_INSTANCE.deinit();
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_api_version() -> ::std::ffi::c_uint {
            $crate::libretro::API_VERSION
        }

        /// # Safety
        ///
        /// `info` must be null or writable.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn retro_get_system_info(info: *mut $crate::libretro::sys::SystemInfo) {
            if let Some(info) = unsafe { info.as_mut() } {
                *info = $crate::libretro::system_info();
            }
        }

        /// # Safety
        ///
        /// `info` must be null or writable.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn retro_get_system_av_info(
            info: *mut $crate::libretro::sys::SystemAvInfo,
        ) {
            if let Some(info) = unsafe { info.as_mut() } {
                *info = MDRETRO_INSTANCE.system_av_info();
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_set_controller_port_device(
            port: ::std::ffi::c_uint,
            device: ::std::ffi::c_uint,
        ) {
            MDRETRO_INSTANCE.set_controller_port_device(port, device);
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_reset() {
            MDRETRO_INSTANCE.reset();
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_run() {
            MDRETRO_INSTANCE.run();
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_serialize_size() -> usize {
            MDRETRO_INSTANCE.serialize_size()
        }

        /// # Safety
        ///
        /// `data` must be null or valid for `size` bytes of writes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn retro_serialize(data: *mut ::std::ffi::c_void, size: usize) -> bool {
            if data.is_null() {
                return false;
            }
            let dest = unsafe { ::std::slice::from_raw_parts_mut(data.cast::<u8>(), size) };
            MDRETRO_INSTANCE.serialize(dest)
        }

        /// # Safety
        ///
        /// `data` must be null or valid for `size` bytes of reads.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn retro_unserialize(data: *const ::std::ffi::c_void, size: usize) -> bool {
            if data.is_null() {
                return false;
            }
            let src = unsafe { ::std::slice::from_raw_parts(data.cast::<u8>(), size) };
            MDRETRO_INSTANCE.unserialize(src)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_cheat_reset() {}

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_cheat_set(
            _index: ::std::ffi::c_uint,
            _enabled: bool,
            _code: *const ::std::ffi::c_char,
        ) {
        }

        /// # Safety
        ///
        /// `info` must be null or point to a valid `retro_game_info`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn retro_load_game(info: *const $crate::libretro::sys::GameInfo) -> bool {
            unsafe { MDRETRO_INSTANCE.load_game_info(info) }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_load_game_special(
            _game_type: ::std::ffi::c_uint,
            _info: *const $crate::libretro::sys::GameInfo,
            _num_info: usize,
        ) -> bool {
            false
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_unload_game() {
            MDRETRO_INSTANCE.unload_game();
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_get_region() -> ::std::ffi::c_uint {
            MDRETRO_INSTANCE.region()
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_get_memory_data(id: ::std::ffi::c_uint) -> *mut ::std::ffi::c_void {
            MDRETRO_INSTANCE.memory(id).0
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn retro_get_memory_size(id: ::std::ffi::c_uint) -> usize {
            MDRETRO_INSTANCE.memory(id).1
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use std::cell::RefCell;

    /// What a fake frontend saw of option registration.
    #[derive(Default)]
    struct OptionsFrontend {
        version: Option<c_uint>,
        accepts_v2: bool,
        commands: Vec<c_uint>,
        /// (key, description, value labels) from SET_CORE_OPTIONS.
        definitions: Vec<(String, String, Vec<String>)>,
        /// (key, value) from SET_VARIABLES.
        variables: Vec<(String, String)>,
    }

    thread_local! {
        static OPTIONS_FRONTEND: RefCell<OptionsFrontend> = RefCell::default();
    }

    fn text(ptr: *const c_char) -> String {
        if ptr.is_null() {
            return String::new();
        }
        // SAFETY: the core hands over NUL-terminated strings.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    unsafe extern "C" fn options_environment(cmd: c_uint, data: *mut c_void) -> bool {
        OPTIONS_FRONTEND.with_borrow_mut(|frontend| {
            frontend.commands.push(cmd);
            match cmd {
                ENVIRONMENT_GET_CORE_OPTIONS_VERSION => match frontend.version {
                    Some(version) => {
                        unsafe { *data.cast::<c_uint>() = version };
                        true
                    }
                    None => false,
                },
                ENVIRONMENT_SET_CORE_OPTIONS_V2 => frontend.accepts_v2,
                ENVIRONMENT_SET_CORE_OPTIONS => {
                    let mut definition = data.cast::<CoreOptionDefinition>().cast_const();
                    while let Some(d) = unsafe { definition.as_ref() }.filter(|d| !d.key.is_null()) {
                        let labels = d
                            .values
                            .iter()
                            .take_while(|v| !v.value.is_null())
                            .map(|v| text(v.label))
                            .collect();
                        frontend.definitions.push((text(d.key), text(d.desc), labels));
                        definition = unsafe { definition.add(1) };
                    }
                    true
                }
                sys::ENVIRONMENT_SET_VARIABLES => {
                    let mut variable = data.cast::<Variable>().cast_const();
                    while let Some(v) = unsafe { variable.as_ref() }.filter(|v| !v.key.is_null()) {
                        frontend.variables.push((text(v.key), text(v.value)));
                        variable = unsafe { variable.add(1) };
                    }
                    true
                }
                _ => false,
            }
        })
    }

    /// Hand a fresh instance to a frontend with the given options support.
    fn register(version: Option<c_uint>, accepts_v2: bool) -> OptionsFrontend {
        OPTIONS_FRONTEND.set(OptionsFrontend {
            version,
            accepts_v2,
            ..OptionsFrontend::default()
        });
        let instance = Instance::<ScriptedEngine>::new();
        instance.set_environment(Some(options_environment));
        OPTIONS_FRONTEND.take()
    }

    fn option_commands(frontend: &OptionsFrontend) -> Vec<c_uint> {
        let option_commands = [
            ENVIRONMENT_SET_CORE_OPTIONS_V2,
            ENVIRONMENT_SET_CORE_OPTIONS,
            sys::ENVIRONMENT_SET_VARIABLES,
        ];
        frontend
            .commands
            .iter()
            .copied()
            .filter(|cmd| option_commands.contains(cmd))
            .collect()
    }

    #[test]
    fn version_1_frontends_get_labelled_definitions() {
        let frontend = register(Some(1), false);
        assert_eq!(option_commands(&frontend), [ENVIRONMENT_SET_CORE_OPTIONS]);
        assert_eq!(frontend.definitions.len(), SCHEMA.options.len());
        let (key, desc, labels) = &frontend.definitions[0];
        assert_eq!(key, "mdretro_tv_standard");
        assert_eq!(desc, "Console > TV Standard");
        assert_eq!(labels, &["NTSC (59.94Hz)", "PAL (50Hz)"]);
    }

    #[test]
    fn rejected_v2_registration_falls_back_to_v1() {
        let frontend = register(Some(2), false);
        assert_eq!(
            option_commands(&frontend),
            [ENVIRONMENT_SET_CORE_OPTIONS_V2, ENVIRONMENT_SET_CORE_OPTIONS]
        );
    }

    #[test]
    fn frontends_without_core_options_get_variables() {
        let frontend = register(None, false);
        assert_eq!(option_commands(&frontend), [sys::ENVIRONMENT_SET_VARIABLES]);
        assert_eq!(frontend.variables.len(), SCHEMA.options.len());
        assert_eq!(
            frontend.variables[0],
            (
                "mdretro_tv_standard".to_string(),
                "Console > TV Standard; ntsc|pal".to_string()
            )
        );
    }

    #[test]
    fn system_info_names_the_core() {
        let info = system_info();
        // SAFETY: the pointers come from static C strings.
        let (name, version, extensions) = unsafe {
            (
                CStr::from_ptr(info.library_name),
                CStr::from_ptr(info.library_version),
                CStr::from_ptr(info.valid_extensions),
            )
        };
        assert_eq!(name, c"mdretro");
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(extensions, c"bin|md|gen|cue|iso");
        assert!(info.need_fullpath);
    }

    #[test]
    fn memory_ids_map_to_regions() {
        assert_eq!(memory_region(sys::MEMORY_SAVE_RAM), Some(MemoryRegion::SaveRam));
        assert_eq!(memory_region(sys::MEMORY_SYSTEM_RAM), Some(MemoryRegion::WorkRam));
        assert_eq!(memory_region(sys::MEMORY_VIDEO_RAM), Some(MemoryRegion::VideoRam));
        assert_eq!(memory_region(1), None);
        assert_eq!(region_id(TvStandard::Pal), sys::Region::PAL as c_uint);
        assert_eq!(region_id(TvStandard::Ntsc), sys::Region::NTSC as c_uint);
    }

    #[test]
    fn load_errors_carry_context() {
        let err = open_content(&StdVfs, Some(Path::new("/nonexistent/game.md")), None).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("failed to load /nonexistent/game.md"), "{message}");
    }
}

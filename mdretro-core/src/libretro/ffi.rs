//! libretro C declarations used by the adapter.
//!
//! `libretro-sys` covers the core structs (system info, AV info, game info)
//! and the classic environment commands. The callback types and the newer
//! interfaces (software framebuffer, VFS, log, serialisation quirks, core
//! options v1/v2) are declared here.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ptr;

pub type EnvironmentFn = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub type VideoRefreshFn =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: usize);
pub type AudioSampleFn = unsafe extern "C" fn(left: i16, right: i16);
pub type AudioSampleBatchFn = unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;
pub type InputPollFn = unsafe extern "C" fn();
pub type InputStateFn =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

const ENVIRONMENT_EXPERIMENTAL: c_uint = 0x10000;

pub const ENVIRONMENT_GET_CURRENT_SOFTWARE_FRAMEBUFFER: c_uint = 40 | ENVIRONMENT_EXPERIMENTAL;
pub const ENVIRONMENT_SET_SERIALIZATION_QUIRKS: c_uint = 44;
pub const ENVIRONMENT_GET_VFS_INTERFACE: c_uint = 45 | ENVIRONMENT_EXPERIMENTAL;
pub const ENVIRONMENT_GET_CORE_OPTIONS_VERSION: c_uint = 52;
pub const ENVIRONMENT_SET_CORE_OPTIONS: c_uint = 53;
pub const ENVIRONMENT_SET_CONTENT_INFO_OVERRIDE: c_uint = 65;
pub const ENVIRONMENT_SET_CORE_OPTIONS_V2: c_uint = 67;

pub const SERIALIZATION_QUIRK_ENDIAN_DEPENDENT: u64 = 1 << 5;
pub const SERIALIZATION_QUIRK_PLATFORM_DEPENDENT: u64 = 1 << 6;

pub const MEMORY_ACCESS_WRITE: c_uint = 1 << 0;

#[repr(C)]
#[derive(Debug)]
pub struct Framebuffer {
    pub data: *mut c_void,
    pub width: c_uint,
    pub height: c_uint,
    pub pitch: usize,
    /// `enum retro_pixel_format`.
    pub format: c_uint,
    pub access_flags: c_uint,
    pub memory_flags: c_uint,
}

#[repr(C)]
pub struct Variable {
    pub key: *const c_char,
    pub value: *const c_char,
}

pub const NUM_CORE_OPTION_VALUES_MAX: usize = 128;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct CoreOptionValue {
    pub value: *const c_char,
    /// Null to show `value` as is.
    pub label: *const c_char,
}

impl CoreOptionValue {
    pub const END: Self = Self {
        value: ptr::null(),
        label: ptr::null(),
    };
}

/// `struct retro_core_option_definition` (core options v1).
#[repr(C)]
pub struct CoreOptionDefinition {
    pub key: *const c_char,
    pub desc: *const c_char,
    pub info: *const c_char,
    pub values: [CoreOptionValue; NUM_CORE_OPTION_VALUES_MAX],
    pub default_value: *const c_char,
}

#[repr(C)]
pub struct CoreOptionV2Category {
    pub key: *const c_char,
    pub desc: *const c_char,
    pub info: *const c_char,
}

#[repr(C)]
pub struct CoreOptionV2Definition {
    pub key: *const c_char,
    pub desc: *const c_char,
    pub desc_categorized: *const c_char,
    pub info: *const c_char,
    pub info_categorized: *const c_char,
    pub category_key: *const c_char,
    pub values: [CoreOptionValue; NUM_CORE_OPTION_VALUES_MAX],
    pub default_value: *const c_char,
}

/// Both arrays end with an entry whose `key` is null.
#[repr(C)]
pub struct CoreOptionsV2 {
    pub categories: *mut CoreOptionV2Category,
    pub definitions: *mut CoreOptionV2Definition,
}

#[repr(C)]
pub struct InputDescriptor {
    pub port: c_uint,
    pub device: c_uint,
    pub index: c_uint,
    pub id: c_uint,
    pub description: *const c_char,
}

#[repr(C)]
pub struct ContentInfoOverride {
    pub extensions: *const c_char,
    pub need_fullpath: bool,
    pub persistent_data: bool,
}

pub const LOG_DEBUG: c_uint = 0;
pub const LOG_INFO: c_uint = 1;
pub const LOG_WARN: c_uint = 2;
pub const LOG_ERROR: c_uint = 3;

pub type LogPrintfFn = unsafe extern "C" fn(level: c_uint, fmt: *const c_char, ...);

#[repr(C)]
pub struct LogCallback {
    pub log: Option<LogPrintfFn>,
}

pub const VFS_FILE_ACCESS_READ: c_uint = 1 << 0;
pub const VFS_FILE_ACCESS_WRITE: c_uint = 1 << 1;
pub const VFS_FILE_ACCESS_HINT_NONE: c_uint = 0;

pub const VFS_SEEK_POSITION_START: c_int = 0;
pub const VFS_SEEK_POSITION_CURRENT: c_int = 1;
pub const VFS_SEEK_POSITION_END: c_int = 2;

/// Opaque frontend file handle.
#[repr(C)]
pub struct VfsFileHandle {
    _private: [u8; 0],
}

pub type VfsGetPathFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> *const c_char;
pub type VfsOpenFn =
    unsafe extern "C" fn(path: *const c_char, mode: c_uint, hints: c_uint) -> *mut VfsFileHandle;
pub type VfsCloseFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> c_int;
pub type VfsSizeFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> i64;
pub type VfsTellFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> i64;
pub type VfsSeekFn =
    unsafe extern "C" fn(stream: *mut VfsFileHandle, offset: i64, seek_position: c_int) -> i64;
pub type VfsReadFn = unsafe extern "C" fn(stream: *mut VfsFileHandle, s: *mut c_void, len: u64) -> i64;
pub type VfsWriteFn =
    unsafe extern "C" fn(stream: *mut VfsFileHandle, s: *const c_void, len: u64) -> i64;
pub type VfsFlushFn = unsafe extern "C" fn(stream: *mut VfsFileHandle) -> c_int;
pub type VfsRemoveFn = unsafe extern "C" fn(path: *const c_char) -> c_int;
pub type VfsRenameFn = unsafe extern "C" fn(old_path: *const c_char, new_path: *const c_char) -> c_int;

/// Version 1 of `struct retro_vfs_interface`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct VfsInterface {
    pub get_path: Option<VfsGetPathFn>,
    pub open: Option<VfsOpenFn>,
    pub close: Option<VfsCloseFn>,
    pub size: Option<VfsSizeFn>,
    pub tell: Option<VfsTellFn>,
    pub seek: Option<VfsSeekFn>,
    pub read: Option<VfsReadFn>,
    pub write: Option<VfsWriteFn>,
    pub flush: Option<VfsFlushFn>,
    pub remove: Option<VfsRemoveFn>,
    pub rename: Option<VfsRenameFn>,
}

#[repr(C)]
pub struct VfsInterfaceInfo {
    pub required_interface_version: u32,
    pub iface: *const VfsInterface,
}

use super::ffi::{
    AudioSampleBatchFn, ENVIRONMENT_GET_CURRENT_SOFTWARE_FRAMEBUFFER, EnvironmentFn, Framebuffer,
    InputPollFn, InputStateFn, MEMORY_ACCESS_WRITE, Variable, VideoRefreshFn,
};
use crate::av::PixelFormat;
use crate::host::{AvInfo, Geometry, Host, HostFramebuffer, VideoFrame};
use crate::input::JoypadButton;
use std::ffi::{CStr, CString, c_char, c_uint, c_void};
use std::path::PathBuf;
use std::ptr::{self, NonNull};

/// The frontend callbacks handed over through the `retro_set_*` entry points.
#[derive(Copy, Clone, Default)]
pub struct Callbacks {
    pub environment: Option<EnvironmentFn>,
    pub video_refresh: Option<VideoRefreshFn>,
    pub audio_batch: Option<AudioSampleBatchFn>,
    pub input_poll: Option<InputPollFn>,
    pub input_state: Option<InputStateFn>,
}

impl Callbacks {
    pub const fn new() -> Self {
        Self {
            environment: None,
            video_refresh: None,
            audio_batch: None,
            input_poll: None,
            input_state: None,
        }
    }

    /// Issue an environment command. False when no environment callback is set.
    ///
    /// # Safety
    ///
    /// `data` must be valid for whatever the frontend reads or writes for `cmd`.
    pub unsafe fn environment<T>(&self, cmd: c_uint, data: *mut T) -> bool {
        match self.environment {
            Some(environment) => unsafe { environment(cmd, data.cast()) },
            None => false,
        }
    }

    fn directory(&self, cmd: c_uint) -> Option<PathBuf> {
        let mut path: *const c_char = ptr::null();
        // SAFETY: directory queries take a `const char **`.
        if !unsafe { self.environment(cmd, &mut path) } || path.is_null() {
            return None;
        }
        // SAFETY: the frontend returns a NUL-terminated string it keeps alive.
        let path = unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

pub(crate) fn game_geometry(geometry: &Geometry) -> libretro_sys::GameGeometry {
    libretro_sys::GameGeometry {
        base_width: geometry.base_width,
        base_height: geometry.base_height,
        max_width: geometry.max_width,
        max_height: geometry.max_height,
        aspect_ratio: geometry.aspect_ratio,
    }
}

pub(crate) fn system_av_info(info: &AvInfo) -> libretro_sys::SystemAvInfo {
    libretro_sys::SystemAvInfo {
        geometry: game_geometry(&info.geometry),
        timing: libretro_sys::SystemTiming {
            fps: info.fps,
            sample_rate: info.sample_rate,
        },
    }
}

/// [`Host`] on top of the libretro callbacks.
pub struct RetroHost {
    callbacks: Callbacks,
}

impl RetroHost {
    pub fn new(callbacks: Callbacks) -> Self {
        Self { callbacks }
    }
}

impl Host for RetroHost {
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        let mut value = format as c_uint;
        // SAFETY: SET_PIXEL_FORMAT takes an `enum retro_pixel_format *`.
        unsafe {
            self.callbacks
                .environment(libretro_sys::ENVIRONMENT_SET_PIXEL_FORMAT, &mut value)
        }
    }

    fn software_framebuffer(&mut self, width: u32, height: u32) -> Option<HostFramebuffer> {
        let mut fb = Framebuffer {
            data: ptr::null_mut(),
            width,
            height,
            pitch: 0,
            format: 0,
            access_flags: MEMORY_ACCESS_WRITE,
            memory_flags: 0,
        };
        // SAFETY: the command takes a `struct retro_framebuffer *`.
        let ok = unsafe {
            self.callbacks
                .environment(ENVIRONMENT_GET_CURRENT_SOFTWARE_FRAMEBUFFER, &mut fb)
        };
        if !ok {
            return None;
        }
        let format = PixelFormat::from_u32(fb.format)?;
        Some(HostFramebuffer {
            data: NonNull::new(fb.data.cast())?,
            width: fb.width,
            height: fb.height,
            pitch: fb.pitch,
            format,
        })
    }

    fn poll_input(&mut self) {
        if let Some(poll) = self.callbacks.input_poll {
            // SAFETY: frontend callback, no arguments.
            unsafe { poll() };
        }
    }

    fn joypad_pressed(&mut self, port: u32, button: JoypadButton) -> bool {
        let Some(state) = self.callbacks.input_state else {
            return false;
        };
        // SAFETY: frontend callback taking plain integers.
        unsafe { state(port, libretro_sys::DEVICE_JOYPAD, 0, button as c_uint) != 0 }
    }

    fn video_refresh(&mut self, frame: VideoFrame<'_>) {
        if let Some(refresh) = self.callbacks.video_refresh {
            // SAFETY: `pixels` holds `height` rows of `pitch` bytes and outlives the call.
            unsafe {
                refresh(
                    frame.pixels.as_ptr().cast::<c_void>(),
                    frame.width,
                    frame.height,
                    frame.pitch,
                )
            };
        }
    }

    fn audio_batch(&mut self, samples: &[i16], frames: usize) {
        let Some(batch) = self.callbacks.audio_batch else {
            return;
        };
        let frames = frames.min(samples.len() / 2);
        let mut sent = 0;
        while sent < frames {
            let rest = &samples[sent * 2..frames * 2];
            // SAFETY: `rest` holds `frames - sent` interleaved stereo frames.
            let taken = unsafe { batch(rest.as_ptr(), frames - sent) };
            if taken == 0 {
                log::debug!("frontend dropped {} audio frames", frames - sent);
                break;
            }
            sent += taken.min(frames - sent);
        }
    }

    fn set_geometry(&mut self, geometry: &Geometry) -> bool {
        let mut geometry = game_geometry(geometry);
        // SAFETY: SET_GEOMETRY takes a `struct retro_game_geometry *`.
        unsafe {
            self.callbacks
                .environment(libretro_sys::ENVIRONMENT_SET_GEOMETRY, &mut geometry)
        }
    }

    fn set_system_av_info(&mut self, info: &AvInfo) -> bool {
        let mut info = system_av_info(info);
        // SAFETY: SET_SYSTEM_AV_INFO takes a `struct retro_system_av_info *`.
        unsafe {
            self.callbacks
                .environment(libretro_sys::ENVIRONMENT_SET_SYSTEM_AV_INFO, &mut info)
        }
    }

    fn options_updated(&mut self) -> bool {
        let mut updated = false;
        // SAFETY: GET_VARIABLE_UPDATE takes a `bool *`.
        let ok = unsafe {
            self.callbacks
                .environment(libretro_sys::ENVIRONMENT_GET_VARIABLE_UPDATE, &mut updated)
        };
        ok && updated
    }

    fn option_value(&mut self, key: &str) -> Option<String> {
        let key = CString::new(key).ok()?;
        let mut variable = Variable {
            key: key.as_ptr(),
            value: ptr::null(),
        };
        // SAFETY: GET_VARIABLE takes a `struct retro_variable *`.
        let ok = unsafe {
            self.callbacks
                .environment(libretro_sys::ENVIRONMENT_GET_VARIABLE, &mut variable)
        };
        if !ok || variable.value.is_null() {
            return None;
        }
        // SAFETY: the frontend returns a NUL-terminated string.
        let value = unsafe { CStr::from_ptr(variable.value) };
        Some(value.to_string_lossy().into_owned())
    }

    fn save_directory(&mut self) -> Option<PathBuf> {
        self.callbacks
            .directory(libretro_sys::ENVIRONMENT_GET_SAVE_DIRECTORY)
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        self.callbacks
            .directory(libretro_sys::ENVIRONMENT_GET_SYSTEM_DIRECTORY)
    }
}

//! `log` records forwarded to the frontend's log interface.

use super::ffi::{LOG_DEBUG, LOG_ERROR, LOG_INFO, LOG_WARN, LogPrintfFn};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::ffi::CString;
use std::sync::{Mutex, PoisonError};

struct FrontendLogger {
    print: Mutex<Option<LogPrintfFn>>,
}

static LOGGER: FrontendLogger = FrontendLogger {
    print: Mutex::new(None),
};

/// Route `log` output to `print`, or to stderr when the frontend has no log interface.
///
/// May be called again whenever the frontend hands over a new environment.
pub fn install(print: Option<LogPrintfFn>) {
    *LOGGER.print.lock().unwrap_or_else(PoisonError::into_inner) = print;
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

fn level(level: Level) -> u32 {
    match level {
        Level::Error => LOG_ERROR,
        Level::Warn => LOG_WARN,
        Level::Info => LOG_INFO,
        Level::Debug | Level::Trace => LOG_DEBUG,
    }
}

impl Log for FrontendLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[mdretro] {}\n", record.args());
        let print = *self.print.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(print) = print else {
            eprint!("{message}");
            return;
        };
        let Ok(message) = CString::new(message.replace('\0', " ")) else {
            return;
        };
        // SAFETY: "%s" consumes exactly one NUL-terminated string argument.
        unsafe { print(level(record.level()), c"%s".as_ptr(), message.as_ptr()) };
    }

    fn flush(&self) {}
}

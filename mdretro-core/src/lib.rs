//! mdretro-core: a libretro bridge for a cycle-stepped Mega Drive / Mega CD engine.
//!
//! The engine does the emulation. This crate turns what it produces into what
//! a libretro frontend consumes:
//! - indexed scanlines into frames in whatever pixel format the frontend accepts,
//!   written straight into a frontend-owned framebuffer when one is lent
//! - four families of raw audio at native rates into one 48 kHz stereo stream
//! - byte-wise save file requests and CD sector/track requests into file access
//!   through the frontend's VFS
//! - the engine's state block plus the disc position into a save state
//!
//! The engine contract lives in [`abi`], the frontend contract in [`host`].
//! [`session::Session`] ties them together; [`libretro`] exposes it over the C ABI
//! through [`mdretro_core!`].

pub mod abi;
pub mod av;
pub mod disc;
pub mod host;
pub mod input;
pub mod libretro;
pub mod loader;
pub mod options;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use abi::{Engine, EngineCallbacks, EngineConfig, MemoryRegion};
pub use host::Host;
pub use session::Session;

//! Save-state snapshots.
//!
//! A snapshot is the engine's state block followed by the optical drive's
//! [`MediaPosition`], both copied verbatim. Nothing is versioned or
//! byte-swapped, so snapshots only load on the platform that wrote them; the
//! libretro adapter reports this to the frontend through serialization quirks.

use crate::abi::Engine;
use crate::storage::{MediaPosition, OpticalMedia};
use std::mem::size_of;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot buffer is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub fn snapshot_size(engine: &dyn Engine) -> usize {
    engine.state().len() + size_of::<MediaPosition>()
}

fn check_len(engine: &dyn Engine, actual: usize) -> Result<usize, SnapshotError> {
    let expected = snapshot_size(engine);
    if actual != expected {
        return Err(SnapshotError::SizeMismatch { expected, actual });
    }
    Ok(engine.state().len())
}

/// Write the snapshot into `dest`, which must be exactly [`snapshot_size`] bytes.
pub fn capture(
    engine: &dyn Engine,
    media: &OpticalMedia,
    dest: &mut [u8],
) -> Result<(), SnapshotError> {
    let split = check_len(engine, dest.len())?;
    let (state, position) = dest.split_at_mut(split);
    state.copy_from_slice(engine.state());
    position.copy_from_slice(bytemuck::bytes_of(&media.position()));
    Ok(())
}

/// Load a snapshot produced by [`capture`].
pub fn restore(
    engine: &mut dyn Engine,
    media: &mut OpticalMedia,
    src: &[u8],
) -> Result<(), SnapshotError> {
    let split = check_len(engine, src.len())?;
    let (state, position) = src.split_at(split);
    engine.state_mut().copy_from_slice(state);
    // `src` carries no alignment guarantee.
    let position: MediaPosition = bytemuck::pod_read_unaligned(position);
    media.set_position(&position);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::EngineConfig;
    use crate::testing::ScriptedEngine;

    fn engine() -> ScriptedEngine {
        let mut engine = ScriptedEngine::new(&EngineConfig::default());
        for (i, byte) in engine.state.iter_mut().enumerate() {
            *byte = i as u8;
        }
        engine
    }

    #[test]
    fn state_is_followed_by_the_media_position() {
        let engine = engine();
        let mut media = OpticalMedia::default();
        media.set_position(&MediaPosition {
            sector: 7,
            track: 2,
            audio_frame: 588,
            ..MediaPosition::default()
        });

        let mut blob = vec![0u8; snapshot_size(&engine)];
        assert_eq!(blob.len(), 64 + 20);
        capture(&engine, &media, &mut blob).unwrap();
        assert_eq!(&blob[..64], engine.state.as_slice());
        assert_eq!(&blob[64..68], 7u32.to_ne_bytes());

        let mut other = ScriptedEngine::new(&EngineConfig::default());
        let mut fresh = OpticalMedia::default();
        // Offset by one byte so the position record is unaligned.
        let mut shifted = vec![0u8; blob.len() + 1];
        shifted[1..].copy_from_slice(&blob);
        restore(&mut other, &mut fresh, &shifted[1..]).unwrap();
        assert_eq!(other.state, engine.state);
        assert_eq!(fresh.position(), media.position());
    }

    #[test]
    fn wrong_lengths_leave_everything_untouched() {
        let mut engine = engine();
        let mut media = OpticalMedia::default();
        let size = snapshot_size(&engine);

        let mut short = vec![0u8; size - 1];
        assert_eq!(
            capture(&engine, &media, &mut short),
            Err(SnapshotError::SizeMismatch {
                expected: size,
                actual: size - 1
            })
        );
        assert!(short.iter().all(|&b| b == 0));

        let long = vec![0xFFu8; size + 1];
        assert!(restore(&mut engine, &mut media, &long).is_err());
        assert_eq!(engine.state[5], 5);
        assert_eq!(media.position(), MediaPosition::default());
    }
}

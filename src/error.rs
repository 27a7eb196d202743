//! Error types for startup and collaborator setup.
//!
//! The per-frame path never fails: calibration mistakes are ignored and
//! missing calibration just skips detection. Everything here happens before
//! the loop starts (or when a collaborator cannot be opened).

use std::path::PathBuf;
use thiserror::Error;

pub type DrumResult<T> = Result<T, DrumError>;

#[derive(Debug, Error)]
pub enum DrumError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid kit file {path:?}: {source}")]
    KitParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid kit: {0}")]
    InvalidKit(String),

    #[error("failed to decode sound {path:?}: {source}")]
    Sound {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("failed to load frame {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame {path:?} is {got_w}x{got_h}, session is {want_w}x{want_h}")]
    FrameSize {
        path: PathBuf,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },

    #[error("no frames found in {0:?}")]
    NoFrames(PathBuf),

    #[error("pointer script line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("audio output: {0}")]
    Audio(String),

    #[error("display: {0}")]
    Display(String),
}

//! Frame preparation for Seq2Anim
//!
//! Collects an image sequence, normalizes every frame to one output size and
//! thins the sequence out to the requested frame rate.

pub mod downsample;
pub mod frame;
pub mod sequence;

pub use downsample::{downsample, stride, FrameRate, OUTPUT_FPS_MAX, SOURCE_FPS_MAX};
pub use frame::{RasterFrame, Rasterizer};
pub use sequence::{natural_cmp, preview, probe_dimensions, Sequence, SequenceEntry};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame rate {fps} out of range 1..={max}")]
    InvalidFrameRate { fps: u32, max: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("No frames in sequence")]
    NoFrames,
}

pub type FrameResult<T> = Result<T, FrameError>;

/// Progress callback type, called with a fraction in `0.0..=1.0`
pub type ProgressCallback = Box<dyn Fn(f32) + Send>;

/// Output canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> FrameResult<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Clamp a requested size to the original frame size, never below 1x1.
    pub fn clamp_to(&self, original: Dimensions) -> Dimensions {
        Dimensions {
            width: self.width.clamp(1, original.width),
            height: self.height.clamp(1, original.height),
        }
    }

    /// Byte length of one tightly packed RGBA8 frame
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

//! Export module for Seq2Anim
//!
//! Encodes normalized RGBA frames into animated GIF, WebP or APNG.

mod apng;
mod dispatch;
mod gif;
mod webp;

pub use apng::encode_apng;
pub use dispatch::{dispatch, EncodeJob, EncodeOutcome};
pub use gif::{encode_gif, GifExportConfig, GifExporter};
pub use webp::encode_webp;

use frames::{FrameRate, RasterFrame};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GIF encoding error: {0}")]
    GifEncode(String),

    #[error("WebP encoding error: {0}")]
    WebPEncode(String),

    #[error("APNG encoding error: {0}")]
    ApngEncode(String),

    #[error("Invalid encode request: {0}")]
    InvalidRequest(String),

    #[error("No frames to export")]
    NoFrames,

    #[error("Encoder worker panicked")]
    WorkerPanicked,
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Gif,
    WebP,
    Apng,
}

impl ExportFormat {
    /// File extension of the encoded output
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Gif => "gif",
            ExportFormat::WebP => "webp",
            ExportFormat::Apng => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Gif => "image/gif",
            ExportFormat::WebP => "image/webp",
            ExportFormat::Apng => "image/png",
        }
    }

    /// Default download name, `output.<ext>`
    pub fn default_file_name(&self) -> String {
        format!("output.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(ExportFormat::Gif),
            "webp" => Ok(ExportFormat::WebP),
            "apng" | "png" => Ok(ExportFormat::Apng),
            other => Err(format!("unknown format '{other}', expected gif, webp or apng")),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Gif => "gif",
            ExportFormat::WebP => "webp",
            ExportFormat::Apng => "apng",
        };
        f.write_str(name)
    }
}

/// Encoder quality, `1..=100`. 100 selects lossless output where the
/// format has a lossless mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u8) -> ExportResult<Self> {
        if (1..=100).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ExportError::InvalidRequest(format!(
                "quality {value} out of range 1..=100"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_lossless(self) -> bool {
        self.0 == 100
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::MAX
    }
}

/// Everything an encoder needs for one conversion
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub format: ExportFormat,
    pub frames: Vec<RasterFrame>,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub output_fps: FrameRate,
}

impl EncodeRequest {
    /// Check that every frame matches the declared canvas
    pub fn validate(&self) -> ExportResult<()> {
        if self.frames.is_empty() {
            return Err(ExportError::NoFrames);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::InvalidRequest(format!(
                "invalid dimensions {}x{}",
                self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize * 4;
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.width != self.width || frame.height != self.height {
                return Err(ExportError::InvalidRequest(format!(
                    "frame {i} is {}x{}, expected {}x{}",
                    frame.width, frame.height, self.width, self.height
                )));
            }
            if frame.data.len() != expected {
                return Err(ExportError::InvalidRequest(format!(
                    "frame {i} holds {} bytes, expected {expected}",
                    frame.data.len()
                )));
            }
        }
        Ok(())
    }

    /// Presentation time of frame `index` in milliseconds
    pub(crate) fn timestamp_ms(&self, index: usize) -> f64 {
        index as f64 * self.output_fps.frame_delay_ms()
    }
}

/// Encode a request on the calling thread
pub fn encode(request: EncodeRequest) -> ExportResult<Vec<u8>> {
    request.validate()?;

    info!(
        format = %request.format,
        frames = request.frames.len(),
        width = request.width,
        height = request.height,
        quality = request.quality.get(),
        fps = request.output_fps.get(),
        "Encoding animation"
    );

    match request.format {
        ExportFormat::Gif => encode_gif(request),
        ExportFormat::WebP => encode_webp(&request),
        ExportFormat::Apng => encode_apng(&request),
    }
}

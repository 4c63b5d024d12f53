//! Frame decoding and normalization

use crate::{Dimensions, FrameError, FrameResult, ProgressCallback};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw RGBA8 frame at the output size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterFrame {
    /// Wrap a tightly packed RGBA8 buffer
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> FrameResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
        }
    }

    /// Convert to an `image::RgbaImage`
    pub fn to_rgba_image(&self) -> FrameResult<RgbaImage> {
        ImageBuffer::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::BufferSize {
                expected: self.dimensions().rgba_len(),
                actual: self.data.len(),
            },
        )
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Decodes images and stretches them onto a fixed-size canvas
pub struct Rasterizer {
    dimensions: Dimensions,
    frame_count: usize,
}

impl Rasterizer {
    /// Create a new rasterizer for the given output size
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            frame_count: 0,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Decode one image and redraw it at the output size.
    ///
    /// The whole source is stretched to fill the canvas; nothing is cropped
    /// and the aspect ratio is not preserved. Alpha is kept as decoded.
    pub fn rasterize(&mut self, path: &Path) -> FrameResult<RasterFrame> {
        let decoded = image::open(path).map_err(|source| FrameError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = self.normalize(decoded.to_rgba8());
        self.frame_count += 1;
        Ok(frame)
    }

    /// Stretch an already decoded image onto the canvas
    pub fn normalize(&self, img: RgbaImage) -> RasterFrame {
        let Dimensions { width, height } = self.dimensions;
        if img.dimensions() == (width, height) {
            return RasterFrame::from_rgba_image(img);
        }

        debug!(
            from = %format!("{}x{}", img.width(), img.height()),
            to = %self.dimensions,
            "resizing frame"
        );
        RasterFrame::from_rgba_image(imageops::resize(&img, width, height, FilterType::Triangle))
    }

    /// Rasterize every path in order
    pub fn rasterize_all(
        &mut self,
        paths: &[PathBuf],
        progress: Option<ProgressCallback>,
    ) -> FrameResult<Vec<RasterFrame>> {
        if paths.is_empty() {
            return Err(FrameError::NoFrames);
        }

        let total = paths.len();
        let mut frames = Vec::with_capacity(total);

        for (i, path) in paths.iter().enumerate() {
            frames.push(self.rasterize(path)?);

            if let Some(ref cb) = progress {
                cb((i + 1) as f32 / total as f32);
            }
        }

        Ok(frames)
    }

    /// Get number of frames rasterized so far
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

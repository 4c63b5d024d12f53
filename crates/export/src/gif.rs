//! GIF export using gifski

use crate::{EncodeRequest, ExportError, ExportResult};
use crossbeam_channel::{bounded, Receiver, Sender};
use frames::RasterFrame;
use gifski::{Collector, Settings, Writer};
use imgref::ImgVec;
use rgb::RGBA8;
use std::thread;
use tracing::debug;

/// GIF export configuration
#[derive(Debug, Clone)]
pub struct GifExportConfig {
    pub fps: u32,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
}

/// Convert a raw RGBA frame to imgref::ImgVec<RGBA8>
fn raster_frame_to_imgvec(frame: RasterFrame) -> ImgVec<RGBA8> {
    let width = frame.width as usize;
    let height = frame.height as usize;

    let pixels: Vec<RGBA8> = frame
        .data
        .chunks_exact(4)
        .map(|chunk| RGBA8::new(chunk[0], chunk[1], chunk[2], chunk[3]))
        .collect();

    ImgVec::new(pixels, width, height)
}

/// Frame data for GIF export
struct GifFrame {
    image: ImgVec<RGBA8>,
    timestamp: f64,
}

/// GIF exporter using gifski
///
/// Frames are pushed through a bounded channel to a collector thread while
/// a writer thread drains gifski's output into memory.
pub struct GifExporter {
    config: GifExportConfig,
    frame_sender: Option<Sender<GifFrame>>,
    collector_handle: Option<thread::JoinHandle<ExportResult<()>>>,
    writer_handle: Option<thread::JoinHandle<ExportResult<Vec<u8>>>>,
    frame_count: usize,
}

impl GifExporter {
    /// Create a new GIF exporter
    pub fn new(config: GifExportConfig) -> ExportResult<Self> {
        if config.fps == 0 {
            return Err(ExportError::InvalidRequest("fps must be at least 1".to_string()));
        }
        Ok(Self {
            config,
            frame_sender: None,
            collector_handle: None,
            writer_handle: None,
            frame_count: 0,
        })
    }

    /// Start the export process
    pub fn start(&mut self) -> ExportResult<()> {
        let settings = Settings {
            width: Some(self.config.width),
            height: Some(self.config.height),
            quality: self.config.quality,
            repeat: gifski::Repeat::Infinite,
            ..Default::default()
        };

        let (collector, writer) =
            gifski::new(settings).map_err(|e| ExportError::GifEncode(e.to_string()))?;

        let (frame_tx, frame_rx): (Sender<GifFrame>, Receiver<GifFrame>) = bounded(16);
        self.frame_sender = Some(frame_tx);

        // Collector thread
        let collector_handle = thread::spawn(move || Self::collector_thread(collector, frame_rx));
        self.collector_handle = Some(collector_handle);

        // Writer thread
        let writer_handle = thread::spawn(move || Self::writer_thread(writer));
        self.writer_handle = Some(writer_handle);

        Ok(())
    }

    fn collector_thread(collector: Collector, frame_rx: Receiver<GifFrame>) -> ExportResult<()> {
        for (index, frame) in frame_rx.into_iter().enumerate() {
            collector
                .add_frame_rgba(index, frame.image, frame.timestamp)
                .map_err(|e| ExportError::GifEncode(e.to_string()))?;
        }
        Ok(())
    }

    fn writer_thread(writer: Writer) -> ExportResult<Vec<u8>> {
        let mut buffer = Vec::new();
        writer
            .write(&mut buffer, &mut gifski::progress::NoProgress {})
            .map_err(|e| ExportError::GifEncode(e.to_string()))?;
        Ok(buffer)
    }

    /// Add a frame to the GIF
    pub fn add_frame(&mut self, frame: RasterFrame) -> ExportResult<()> {
        let sender = self
            .frame_sender
            .as_ref()
            .ok_or_else(|| ExportError::GifEncode("Exporter not started".to_string()))?;

        let timestamp = self.frame_count as f64 / self.config.fps as f64;
        let image = raster_frame_to_imgvec(frame);

        sender
            .send(GifFrame { image, timestamp })
            .map_err(|_| ExportError::GifEncode("Failed to send frame".to_string()))?;

        self.frame_count += 1;
        Ok(())
    }

    /// Finish the export and return the encoded GIF
    pub fn finish(mut self) -> ExportResult<Vec<u8>> {
        if self.frame_count == 0 {
            return Err(ExportError::NoFrames);
        }

        // Drop sender to signal completion
        drop(self.frame_sender.take());

        // Wait for collector
        if let Some(handle) = self.collector_handle.take() {
            handle
                .join()
                .map_err(|_| ExportError::GifEncode("Collector thread panicked".to_string()))??;
        }

        // Wait for writer
        let handle = self
            .writer_handle
            .take()
            .ok_or_else(|| ExportError::GifEncode("Exporter not started".to_string()))?;
        let gif = handle
            .join()
            .map_err(|_| ExportError::GifEncode("Writer thread panicked".to_string()))??;

        debug!(frames = self.frame_count, bytes = gif.len(), "GIF written");
        Ok(gif)
    }
}

/// Encode a whole request as an infinitely looping GIF
pub fn encode_gif(request: EncodeRequest) -> ExportResult<Vec<u8>> {
    let config = GifExportConfig {
        fps: request.output_fps.get(),
        quality: request.quality.get(),
        width: request.width,
        height: request.height,
    };

    let mut exporter = GifExporter::new(config)?;
    exporter.start()?;
    for frame in request.frames {
        exporter.add_frame(frame)?;
    }
    exporter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::solid_request;
    use crate::ExportFormat;

    fn config(fps: u32) -> GifExportConfig {
        GifExportConfig {
            fps,
            quality: 90,
            width: 4,
            height: 3,
        }
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(matches!(
            GifExporter::new(config(0)),
            Err(ExportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn finish_without_frames_fails() {
        let mut exporter = GifExporter::new(config(10)).unwrap();
        exporter.start().unwrap();
        assert!(matches!(exporter.finish(), Err(ExportError::NoFrames)));
    }

    #[test]
    fn frames_before_start_are_rejected() {
        let mut exporter = GifExporter::new(config(10)).unwrap();
        let frame = RasterFrame::from_raw(4, 3, vec![0; 48]).unwrap();
        assert!(exporter.add_frame(frame).is_err());
    }

    #[test]
    fn output_uses_configured_size() {
        let gif = encode_gif(solid_request(ExportFormat::Gif, 3)).unwrap();
        assert_eq!(&gif[..6], b"GIF89a");
        // Logical screen width and height follow the header
        assert_eq!(u16::from_le_bytes([gif[6], gif[7]]), 4);
        assert_eq!(u16::from_le_bytes([gif[8], gif[9]]), 3);
    }
}

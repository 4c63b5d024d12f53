//! Conversion pipeline: sequence -> normalized frames -> encode worker

use crate::config::ConvertOptions;
use anyhow::{anyhow, bail, Context};
use export::{dispatch, EncodeRequest, ExportFormat};
use frames::{downsample, stride, Dimensions, ProgressCallback, Rasterizer, Sequence};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Encoded animation ready to be presented
#[derive(Debug)]
pub struct Conversion {
    pub format: ExportFormat,
    pub dimensions: Dimensions,
    pub frame_count: usize,
    pub bytes: Vec<u8>,
}

/// Build a sequence from the command-line inputs.
///
/// A single directory contributes every image inside it; otherwise each
/// input is taken as an image file.
pub fn load_sequence(inputs: &[PathBuf], exclude: &[String]) -> anyhow::Result<Sequence> {
    let mut sequence = match inputs {
        [dir] if dir.is_dir() => Sequence::from_dir(dir)
            .with_context(|| format!("read directory '{}'", dir.display()))?,
        _ => {
            if let Some(dir) = inputs.iter().find(|p| p.is_dir()) {
                bail!("'{}' is a directory; pass a single directory or image files", dir.display());
            }
            Sequence::from_paths(inputs.iter().cloned())
        }
    };

    for name in exclude {
        if !sequence.remove(name) {
            warn!("'{}' is not part of the sequence", name);
        }
    }
    Ok(sequence)
}

/// Output size: the requested size clamped to the first frame, or the
/// first frame's size when nothing was requested.
pub fn output_dimensions(
    original: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
) -> Dimensions {
    let requested = Dimensions {
        width: width.unwrap_or(original.width),
        height: height.unwrap_or(original.height),
    };
    let clamped = requested.clamp_to(original);
    if clamped != requested {
        warn!("Output size {} limited to {}", requested, clamped);
    }
    clamped
}

/// Run the whole pipeline and wait for the encoder
pub fn convert(sequence: &Sequence, options: &ConvertOptions) -> anyhow::Result<Conversion> {
    if sequence.is_empty() {
        bail!("no frames to convert");
    }

    let original = sequence.original_dimensions()?;
    let dimensions = output_dimensions(original, options.width, options.height);

    let output_fps = options.output_fps.limit_to(options.source_fps);
    if output_fps != options.output_fps {
        warn!(
            "Output rate {} limited to source rate {}",
            options.output_fps, options.source_fps
        );
    }

    let step = stride(options.source_fps, output_fps);
    let paths = downsample(sequence.paths(), options.source_fps, output_fps);
    info!(
        "Using {} of {} frames (every {}), {} -> {}",
        paths.len(),
        sequence.len(),
        step,
        options.source_fps,
        output_fps
    );

    let progress: ProgressCallback = Box::new(|fraction| {
        debug!("Rasterized {:.0}%", fraction * 100.0);
    });
    let mut rasterizer = Rasterizer::new(dimensions);
    let frames = rasterizer.rasterize_all(&paths, Some(progress))?;
    let frame_count = frames.len();

    let request = EncodeRequest {
        format: options.format,
        frames,
        width: dimensions.width,
        height: dimensions.height,
        quality: options.quality,
        output_fps,
    };

    let bytes = dispatch(request)?
        .wait()
        .into_result()
        .map_err(|message| anyhow!("conversion error: {message}"))?;

    Ok(Conversion {
        format: options.format,
        dimensions,
        frame_count,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use export::Quality;
    use frames::FrameRate;
    use image::{Rgba, RgbaImage};
    use std::fs;

    fn fixture_sequence(name: &str, count: u32) -> PathBuf {
        let dir = PathBuf::from("target").join("app_tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            let shade = (i * 20) as u8;
            RgbaImage::from_pixel(20, 10, Rgba([shade, 0, 255 - shade, 255]))
                .save(dir.join(format!("frame{}.png", i + 1)))
                .unwrap();
        }
        dir
    }

    fn options(format: ExportFormat) -> ConvertOptions {
        ConvertOptions {
            format,
            width: None,
            height: None,
            quality: Quality::new(80).unwrap(),
            source_fps: FrameRate::source(30).unwrap(),
            output_fps: FrameRate::output(10).unwrap(),
        }
    }

    #[test]
    fn dimensions_default_to_first_frame() {
        let original = Dimensions::new(640, 480).unwrap();
        assert_eq!(output_dimensions(original, None, None), original);
        assert_eq!(
            output_dimensions(original, Some(320), None),
            Dimensions::new(320, 480).unwrap()
        );
        assert_eq!(
            output_dimensions(original, Some(1000), Some(100)),
            Dimensions::new(640, 100).unwrap()
        );
    }

    #[test]
    fn directory_input_is_naturally_sorted() {
        let dir = fixture_sequence("load_dir", 12);
        let seq = load_sequence(&[dir], &["frame5.png".to_string()]).unwrap();
        let names: Vec<_> = seq.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "frame1.png");
        assert_eq!(names[1], "frame2.png");
        assert_eq!(names[10], "frame12.png");
        assert!(!names.contains(&"frame5.png".to_string()));
    }

    #[test]
    fn mixing_directory_and_files_is_rejected() {
        let dir = fixture_sequence("mixed", 1);
        let file = dir.join("frame1.png");
        assert!(load_sequence(&[file, dir], &[]).is_err());
    }

    #[test]
    fn converts_downsampled_sequence() {
        let dir = fixture_sequence("convert_apng", 9);
        let seq = load_sequence(&[dir], &[]).unwrap();
        let mut opts = options(ExportFormat::Apng);
        opts.width = Some(8);

        let conversion = convert(&seq, &opts).unwrap();
        // 30 -> 10 fps keeps frames 1, 4 and 7
        assert_eq!(conversion.frame_count, 3);
        assert_eq!(conversion.dimensions, Dimensions::new(8, 10).unwrap());
        assert!(conversion.bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn empty_sequence_is_an_error() {
        assert!(convert(&Sequence::default(), &options(ExportFormat::Gif)).is_err());
    }
}

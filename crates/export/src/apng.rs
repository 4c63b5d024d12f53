//! APNG export
//!
//! Quality 100 writes lossless RGBA frames. Lower qualities quantize every
//! frame against one shared palette and write indexed frames.

use crate::{EncodeRequest, ExportError, ExportResult};
use imagequant::RGBA;
use png::{BitDepth, ColorType, Encoder};
use tracing::debug;

/// Dithering applied when remapping frames onto the shared palette
const DITHERING_LEVEL: f32 = 1.0;

fn apng_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::ApngEncode(e.to_string())
}

/// Frame delay in milliseconds, `round(1000 / fps)`
fn frame_delay_ms(request: &EncodeRequest) -> u16 {
    request.output_fps.frame_delay_ms().round() as u16
}

/// Encode a request as an infinitely looping APNG
pub fn encode_apng(request: &EncodeRequest) -> ExportResult<Vec<u8>> {
    let apng = if request.quality.is_lossless() {
        encode_rgba(request)?
    } else {
        encode_indexed(request)?
    };
    debug!(frames = request.frames.len(), bytes = apng.len(), "APNG written");
    Ok(apng)
}

fn encode_rgba(request: &EncodeRequest) -> ExportResult<Vec<u8>> {
    let frames: Vec<&[u8]> = request.frames.iter().map(|f| f.data.as_slice()).collect();
    write_apng(request, ColorType::Rgba, None, &frames)
}

fn encode_indexed(request: &EncodeRequest) -> ExportResult<Vec<u8>> {
    let width = request.width as usize;
    let height = request.height as usize;

    let mut attr = imagequant::new();
    attr.set_quality(0, request.quality.get()).map_err(apng_error)?;

    // One palette for the whole animation, built from every frame
    let mut histogram = imagequant::Histogram::new(&attr);
    for frame in &request.frames {
        let pixels: &[RGBA] = rgb::FromSlice::as_rgba(&frame.data[..]);
        let mut image = imagequant::Image::new_borrowed(&attr, pixels, width, height, 0.0)
            .map_err(apng_error)?;
        histogram.add_image(&attr, &mut image).map_err(apng_error)?;
    }

    let mut res = histogram.quantize(&attr).map_err(apng_error)?;
    res.set_dithering_level(DITHERING_LEVEL).map_err(apng_error)?;

    let mut palette: Vec<RGBA> = Vec::new();
    let mut indexed: Vec<Vec<u8>> = Vec::with_capacity(request.frames.len());
    for frame in &request.frames {
        let pixels: &[RGBA] = rgb::FromSlice::as_rgba(&frame.data[..]);
        let mut image = imagequant::Image::new_borrowed(&attr, pixels, width, height, 0.0)
            .map_err(apng_error)?;
        let (frame_palette, frame_pixels) = res.remapped(&mut image).map_err(apng_error)?;
        if palette.is_empty() {
            palette = frame_palette;
        }
        indexed.push(frame_pixels);
    }

    let mut rgb_palette = Vec::with_capacity(palette.len() * 3);
    let mut trns = Vec::with_capacity(palette.len());
    for c in &palette {
        rgb_palette.extend_from_slice(&[c.r, c.g, c.b]);
        trns.push(c.a);
    }

    let frames: Vec<&[u8]> = indexed.iter().map(Vec::as_slice).collect();
    write_apng(request, ColorType::Indexed, Some((rgb_palette, trns)), &frames)
}

fn write_apng(
    request: &EncodeRequest,
    color: ColorType,
    palette: Option<(Vec<u8>, Vec<u8>)>,
    frames: &[&[u8]],
) -> ExportResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, request.width, request.height);
        encoder.set_color(color);
        encoder.set_depth(BitDepth::Eight);
        if let Some((rgb_palette, trns)) = palette {
            encoder.set_palette(rgb_palette);
            encoder.set_trns(trns);
        }
        encoder
            .set_animated(frames.len() as u32, 0)
            .map_err(apng_error)?;

        let delay = frame_delay_ms(request);
        let mut writer = encoder.write_header().map_err(apng_error)?;
        for data in frames {
            writer.set_frame_delay(delay, 1000).map_err(apng_error)?;
            writer.write_image_data(data).map_err(apng_error)?;
        }
        writer.finish().map_err(apng_error)?;
    }
    Ok(buffer)
}

//! Animated WebP export using libwebp

use crate::{EncodeRequest, ExportError, ExportResult};
use tracing::debug;
use webp_animation::{Encoder, EncoderOptions, EncodingConfig, EncodingType};

fn webp_error(e: webp_animation::Error) -> ExportError {
    ExportError::WebPEncode(format!("{e:?}"))
}

/// Encode a request as an infinitely looping animated WebP.
///
/// Quality 100 produces lossless frames, anything lower lossy frames at
/// that quality.
pub fn encode_webp(request: &EncodeRequest) -> ExportResult<Vec<u8>> {
    let quality = request.quality.get() as f32;
    let encoding_config = if request.quality.is_lossless() {
        EncodingConfig {
            encoding_type: EncodingType::Lossless,
            quality,
            method: 4,
        }
    } else {
        EncodingConfig::new_lossy(quality)
    };

    let mut encoder = Encoder::new_with_options(
        (request.width, request.height),
        EncoderOptions {
            encoding_config: Some(encoding_config),
            ..Default::default()
        },
    )
    .map_err(webp_error)?;

    for (i, frame) in request.frames.iter().enumerate() {
        let timestamp = request.timestamp_ms(i).round() as i32;
        encoder.add_frame(&frame.data, timestamp).map_err(webp_error)?;
    }

    let end = request.timestamp_ms(request.frames.len()).round() as i32;
    let webp = encoder.finalize(end).map_err(webp_error)?;

    debug!(frames = request.frames.len(), bytes = webp.len(), "WebP written");
    Ok(webp.to_vec())
}

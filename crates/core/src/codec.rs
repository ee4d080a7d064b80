//! Image codecs: HEIC decoding and PNG encoding.
//!
//! Decoding sits behind the [`ImageDecoder`] trait so the conversion
//! pipeline can be driven by any bitmap source. The libheif-backed decoder
//! is compiled in with the `libheif` feature, which is on by default.

use crate::config::CompressionPolicy;
use crate::error::{DecodeError, EncodeError};
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::sync::Arc;

/// Turns encoded image bytes into an in-memory bitmap.
pub trait ImageDecoder: Send + Sync {
    /// Decode a complete encoded image.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError>;
}

/// The decoder used when none is supplied explicitly.
pub fn default_decoder() -> Arc<dyn ImageDecoder> {
    #[cfg(feature = "libheif")]
    {
        Arc::new(LibHeifDecoder::new())
    }
    #[cfg(not(feature = "libheif"))]
    {
        Arc::new(UnsupportedDecoder)
    }
}

/// Decoder for builds without HEIC support (`--no-default-features`).
/// Rejects every input.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDecoder;

impl ImageDecoder for UnsupportedDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        Err(DecodeError(
            "HEIC support not compiled in (rebuild with the `libheif` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "libheif")]
pub use heif::LibHeifDecoder;

#[cfg(feature = "libheif")]
mod heif {
    use super::ImageDecoder;
    use crate::error::DecodeError;
    use image::{DynamicImage, RgbImage, RgbaImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    /// HEIC/HEIF decoder backed by the system libheif.
    pub struct LibHeifDecoder {
        lib: LibHeif,
    }

    impl LibHeifDecoder {
        pub fn new() -> Self {
            Self { lib: LibHeif::new() }
        }
    }

    impl Default for LibHeifDecoder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ImageDecoder for LibHeifDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
            let ctx = HeifContext::read_from_bytes(bytes)
                .map_err(|e| DecodeError(format!("not a HEIF container: {}", e)))?;
            let handle = ctx
                .primary_image_handle()
                .map_err(|e| DecodeError(format!("no primary image: {}", e)))?;

            let has_alpha = handle.has_alpha_channel();
            let (chroma, channels) = if has_alpha {
                (RgbChroma::Rgba, 4)
            } else {
                (RgbChroma::Rgb, 3)
            };

            let image = self
                .lib
                .decode(&handle, ColorSpace::Rgb(chroma), None)
                .map_err(|e| DecodeError(format!("failed to decode image: {}", e)))?;

            let planes = image.planes();
            let plane = planes
                .interleaved
                .ok_or_else(|| DecodeError("decoder returned no interleaved plane".to_string()))?;

            // Rows may be padded; copy only the visible pixels.
            let width = plane.width;
            let height = plane.height;
            let row_len = width as usize * channels;
            let mut pixels = Vec::with_capacity(row_len * height as usize);
            for row in plane.data.chunks(plane.stride).take(height as usize) {
                let visible = row
                    .get(..row_len)
                    .ok_or_else(|| DecodeError("truncated pixel row".to_string()))?;
                pixels.extend_from_slice(visible);
            }

            let bitmap = if has_alpha {
                RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
            } else {
                RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
            };
            bitmap.ok_or_else(|| DecodeError("pixel buffer size mismatch".to_string()))
        }
    }
}

/// PNG encoder with a configurable compression trade-off.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder {
    compression: CompressionPolicy,
}

impl PngEncoder {
    /// Create an encoder with the given compression policy.
    pub fn new(compression: CompressionPolicy) -> Self {
        Self { compression }
    }

    /// The configured compression policy.
    pub fn compression(&self) -> CompressionPolicy {
        self.compression
    }

    /// Encode `image` as PNG into `writer`.
    pub fn encode_to<W: Write>(&self, image: &DynamicImage, writer: W) -> Result<(), EncodeError> {
        let (color, data): (png::ColorType, std::borrow::Cow<'_, [u8]>) = match image {
            DynamicImage::ImageLuma8(img) => (png::ColorType::Grayscale, img.as_raw().into()),
            DynamicImage::ImageLumaA8(img) => {
                (png::ColorType::GrayscaleAlpha, img.as_raw().into())
            }
            DynamicImage::ImageRgb8(img) => (png::ColorType::Rgb, img.as_raw().into()),
            DynamicImage::ImageRgba8(img) => (png::ColorType::Rgba, img.as_raw().into()),
            other if other.color().has_alpha() => {
                (png::ColorType::Rgba, other.to_rgba8().into_raw().into())
            }
            other => (png::ColorType::Rgb, other.to_rgb8().into_raw().into()),
        };

        let mut encoder = png::Encoder::new(writer, image.width(), image.height());
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(self.compression.to_png());

        let mut writer = encoder
            .write_header()
            .map_err(|e| EncodeError(format!("Failed to write PNG header: {}", e)))?;

        writer
            .write_image_data(&data)
            .map_err(|e| EncodeError(format!("Failed to write PNG data: {}", e)))?;

        writer
            .finish()
            .map_err(|e| EncodeError(format!("Failed to finish PNG stream: {}", e)))
    }

    /// Encode `image` to an in-memory PNG.
    pub fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = Cursor::new(Vec::new());
        self.encode_to(image, &mut buffer)?;
        Ok(buffer.into_inner())
    }
}

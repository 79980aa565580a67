//! Wraps a libjpeg-style encoder. Encodes an `rgb24` or `gray8`
//! [`Image`] into a caller-supplied growable buffer, growing it as needed.
//! The encoder owns codec state and is not internally synchronized;
//! callers (the capture engine's `encode_latest`) serialize access with
//! their own mutex.

use mozjpeg::{ColorSpace, Compress};

use super::error::{CamError, Result};
use super::image::{Image, PixelFormat};

/// Quality and speed knobs for [`JpegEncoder::encode_into`].
pub struct JpegEncoder {
    quality: u8,
    faster_compression: bool,
}

impl JpegEncoder {
    /// `quality` must be in `[1, 100]`; values outside that range are
    /// rejected rather than silently clamped.
    pub fn new(quality: u8, faster_compression: bool) -> Result<Self> {
        if quality == 0 || quality > 100 {
            return Err(CamError::InvalidPropertyValue);
        }
        Ok(JpegEncoder {
            quality,
            faster_compression,
        })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn set_quality(&mut self, quality: u8) -> Result<()> {
        if quality == 0 || quality > 100 {
            return Err(CamError::InvalidPropertyValue);
        }
        self.quality = quality;
        Ok(())
    }

    pub fn faster_compression(&self) -> bool {
        self.faster_compression
    }

    pub fn set_faster_compression(&mut self, faster: bool) {
        self.faster_compression = faster;
    }

    /// Encode `image` (must be `gray8` or `rgb24`) into `out`, replacing its
    /// contents. Growing `out` is handled by `Vec`'s own reallocation.
    pub fn encode_into(&self, image: &Image<'_>, out: &mut Vec<u8>) -> Result<()> {
        let color_space = match image.format() {
            PixelFormat::Rgb24 => ColorSpace::JCS_RGB,
            PixelFormat::Gray8 => ColorSpace::JCS_GRAYSCALE,
            _ => return Err(CamError::UnsupportedPixelFormat),
        };
        if image.data().is_empty() || image.width() == 0 || image.height() == 0 {
            return Err(CamError::NullPointer);
        }

        let mut compress = Compress::new(color_space);
        if self.faster_compression {
            compress.set_fastest_defaults();
        }
        compress.set_quality(self.quality as f32);
        compress.set_size(image.width() as usize, image.height() as usize);
        compress.set_mem_dest();
        compress
            .start_compress()
            .map_err(|_| CamError::ImageEncodingFailed)?;

        let bpp = image.format().bytes_per_pixel();
        let stride = image.stride() as usize;
        let width_bytes = image.width() as usize * bpp;
        for row in 0..image.height() as usize {
            let start = row * stride;
            let line = &image.data()[start..start + width_bytes];
            if !compress.write_scanlines(line) {
                return Err(CamError::ImageEncodingFailed);
            }
        }
        if !compress.finish_compress() {
            return Err(CamError::ImageEncodingFailed);
        }
        let data = compress
            .data_to_vec()
            .map_err(|_| CamError::ImageEncodingFailed)?;
        out.clear();
        out.extend_from_slice(&data);
        Ok(())
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        JpegEncoder {
            quality: 85,
            faster_compression: false,
        }
    }
}

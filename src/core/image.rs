//! Typed pixel buffer, either owned or borrowed, expressed as two variants
//! of the backing storage rather than an "own memory" boolean flag.

use super::error::{CamError, Result};

/// Pixel format of an [`Image`]. For `Jpeg`, `width` holds the encoded byte
/// length rather than a pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Unknown,
    Gray8,
    Rgb24,
    Rgba32,
    Jpeg,
}

impl PixelFormat {
    /// Bytes per pixel for uncompressed formats; `0` for `Jpeg`/`Unknown`,
    /// which do not have a fixed per-pixel stride.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
            PixelFormat::Jpeg => 0,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }
}

#[derive(Debug, Clone)]
enum Storage<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl<'a> Storage<'a> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            Storage::Borrowed(s) => s,
        }
    }
}

/// A contiguous pixel buffer with explicit shape metadata. The `'a` lifetime
/// is only meaningful for the [`Image::wrap`] (borrowed) construction path;
/// owned images are `'static`.
#[derive(Debug, Clone)]
pub struct Image<'a> {
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    data: Storage<'a>,
}

/// Round `value` up to the next 4-byte boundary, the row-padding rule
/// uncompressed formats require.
fn pad4(value: u32) -> u32 {
    (value + 3) & !3
}

impl Image<'static> {
    /// Allocate an owned buffer large enough for `width x height` pixels of
    /// `format`, with `stride` padded to a 4-byte boundary. When
    /// `zero_initialize` is false the buffer is left uninitialized and must
    /// be fully written before being read.
    pub fn allocate(
        width: u32,
        height: u32,
        format: PixelFormat,
        zero_initialize: bool,
    ) -> Result<Self> {
        if format.is_compressed() {
            return Err(CamError::UnsupportedPixelFormat);
        }
        let bpp = format.bytes_per_pixel() as u32;
        if bpp == 0 {
            return Err(CamError::UnsupportedPixelFormat);
        }
        let stride = pad4(width * bpp);
        let len = (stride as usize)
            .checked_mul(height as usize)
            .ok_or(CamError::OutOfMemory)?;
        let data = if zero_initialize {
            vec![0u8; len]
        } else {
            let mut v = Vec::with_capacity(len);
            // SAFETY: capacity was just reserved and every byte is
            // overwritten by the producer before being read.
            #[allow(clippy::uninit_vec)]
            unsafe {
                v.set_len(len);
            }
            v
        };
        Ok(Image {
            width,
            height,
            stride,
            format,
            data: Storage::Owned(data),
        })
    }

    /// Allocate an owned buffer for an already-encoded JPEG of `byte_len`
    /// bytes; `width` stores the byte length, by convention, for compressed
    /// formats.
    pub fn allocate_jpeg(byte_len: u32) -> Result<Self> {
        Ok(Image {
            width: byte_len,
            height: 1,
            stride: byte_len,
            format: PixelFormat::Jpeg,
            data: Storage::Owned(vec![0u8; byte_len as usize]),
        })
    }

    /// Take ownership of an existing `Vec<u8>` as image data, validating
    /// that `data.len()` matches the dimensions and format given.
    pub fn from_owned(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        validate_shape(data.len(), width, height, stride, format)?;
        Ok(Image {
            width,
            height,
            stride,
            format,
            data: Storage::Owned(data),
        })
    }
}

impl<'a> Image<'a> {
    /// Wrap existing memory without copying it. The caller must not let the
    /// returned `Image` outlive `data` (enforced here by the `'a` lifetime).
    pub fn wrap(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        validate_shape(data.len(), width, height, stride, format)?;
        Ok(Image {
            width,
            height,
            stride,
            format,
            data: Storage::Borrowed(data),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Mutable access to the backing bytes, available only for owned
    /// images.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            Storage::Owned(v) => Some(v.as_mut_slice()),
            Storage::Borrowed(_) => None,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self.data, Storage::Owned(_))
    }

    /// Produce an owned, `'static` clone of this image regardless of storage
    /// kind.
    pub fn clone_owned(&self) -> Image<'static> {
        Image {
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: self.format,
            data: Storage::Owned(self.data.as_slice().to_vec()),
        }
    }

    /// Copy this image's pixels into `dst`, requiring matching shape: same
    /// height and format always; same width for uncompressed formats;
    /// `dst.stride >= self.stride` for JPEG.
    pub fn copy_into(&self, dst: &mut Image<'static>) -> Result<()> {
        if self.format != dst.format || self.height != dst.height {
            return Err(CamError::ImageParametersMismatch);
        }
        if self.format.is_compressed() {
            if dst.stride < self.stride {
                return Err(CamError::ImageParametersMismatch);
            }
        } else if self.width != dst.width {
            return Err(CamError::ImageParametersMismatch);
        }
        let dst_data = match &mut dst.data {
            Storage::Owned(v) => v,
            Storage::Borrowed(_) => return Err(CamError::ImageParametersMismatch),
        };
        let src = self.data.as_slice();
        let n = src.len().min(dst_data.len());
        dst_data[..n].copy_from_slice(&src[..n]);
        if self.format.is_compressed() {
            dst.width = self.width;
        }
        Ok(())
    }

    /// Replace `dst` with a fresh clone if the shapes disagree, otherwise
    /// behave like [`Image::copy_into`].
    pub fn copy_or_clone(&self, dst: &mut Image<'static>) {
        let shapes_match = self.format == dst.format
            && self.height == dst.height
            && dst.is_owned()
            && (self.format.is_compressed() || self.width == dst.width)
            && (!self.format.is_compressed() || dst.stride >= self.stride);
        if shapes_match {
            let _ = self.copy_into(dst);
        } else {
            *dst = self.clone_owned();
        }
    }
}

fn validate_shape(
    len: usize,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
) -> Result<()> {
    if format.is_compressed() {
        if stride < width {
            return Err(CamError::ImageParametersMismatch);
        }
    } else {
        let bpp = format.bytes_per_pixel() as u32;
        if bpp == 0 || stride < width * bpp {
            return Err(CamError::ImageParametersMismatch);
        }
    }
    let required = (stride as usize)
        .checked_mul(height as usize)
        .ok_or(CamError::ImageParametersMismatch)?;
    if required > len {
        return Err(CamError::ImageParametersMismatch);
    }
    Ok(())
}

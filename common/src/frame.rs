use image::RgbaImage;

/// Bytes per pixel for the only supported layout.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel layout of a camera frame.
///
/// Only 32-bit interleaved BGRA is produced by the capture layer, so this
/// is a single-variant enum kept for explicitness at API boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 4 bytes per pixel, channel order B, G, R, A.
    #[default]
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => BYTES_PER_PIXEL,
        }
    }
}

/// Width, height and row stride of a frame.
///
/// Only built by [`FrameView::new`], so `height * bytes_per_row` is known
/// to fit in `usize`. Two frames are comparable only when all three match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    width: usize,
    height: usize,
    /// Byte distance between consecutive rows. May exceed `width * 4`.
    bytes_per_row: usize,
}

impl Geometry {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of bytes a buffer with this geometry occupies.
    pub fn buffer_len(&self) -> usize {
        self.height * self.bytes_per_row
    }
}

/// A borrowed, validated view over caller-owned BGRA pixels.
///
/// The capture layer hands these to the engine for the duration of a
/// single call; anything the engine keeps is copied into a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    geometry: Geometry,
    data: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap a raw BGRA buffer.
    ///
    /// Bytes past `height * bytes_per_row` are ignored.
    pub fn new(
        width: usize,
        height: usize,
        bytes_per_row: usize,
        data: &'a [u8],
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyGeometry { width, height });
        }
        let overflow = FrameError::GeometryOverflow {
            width,
            height,
            bytes_per_row,
        };
        let min_stride = width.checked_mul(BYTES_PER_PIXEL).ok_or(overflow.clone())?;
        if bytes_per_row < min_stride {
            return Err(FrameError::StrideTooSmall {
                bytes_per_row,
                expected: min_stride,
            });
        }
        let needed = height.checked_mul(bytes_per_row).ok_or(overflow)?;
        let geometry = Geometry {
            width,
            height,
            bytes_per_row,
        };
        if data.len() < needed {
            return Err(FrameError::BufferTooShort {
                got: data.len(),
                expected: needed,
            });
        }
        Ok(Self {
            geometry,
            data: &data[..needed],
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.geometry.bytes_per_row
    }

    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Bgra8
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Pixel bytes of row `y`, without trailing stride padding.
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.geometry.bytes_per_row;
        &self.data[start..start + self.geometry.width * BYTES_PER_PIXEL]
    }

    pub fn same_geometry(&self, other: &FrameView<'_>) -> bool {
        self.geometry == other.geometry
    }

    /// Copy the viewed pixels into an owned frame.
    pub fn to_owned_frame(&self) -> Frame {
        Frame {
            geometry: self.geometry,
            data: self.data.to_vec(),
        }
    }
}

/// An owned BGRA frame, used for every reference slot the engine retains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: Geometry,
    data: Vec<u8>,
}

impl Frame {
    /// Take ownership of a raw buffer, validating it the same way as
    /// [`FrameView::new`]. Excess trailing bytes are truncated.
    pub fn from_bytes(
        width: usize,
        height: usize,
        bytes_per_row: usize,
        mut data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let geometry = FrameView::new(width, height, bytes_per_row, &data)?.geometry();
        data.truncate(geometry.buffer_len());
        Ok(Self { geometry, data })
    }

    /// A uniform frame where every pixel is `bgra`. Row padding is zeroed.
    pub fn solid(
        width: usize,
        height: usize,
        bytes_per_row: usize,
        bgra: [u8; 4],
    ) -> Result<Self, FrameError> {
        let len = height
            .checked_mul(bytes_per_row)
            .ok_or(FrameError::GeometryOverflow {
                width,
                height,
                bytes_per_row,
            })?;
        let mut data = vec![0u8; len];
        let pixel_bytes = width.saturating_mul(BYTES_PER_PIXEL);
        for row in data.chunks_exact_mut(bytes_per_row.max(1)) {
            let end = pixel_bytes.min(row.len());
            for px in row[..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&bgra);
            }
        }
        Self::from_bytes(width, height, bytes_per_row, data)
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            geometry: self.geometry,
            data: &self.data,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.geometry.bytes_per_row
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw buffer, padding included.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Render as a displayable RGBA image, dropping row padding.
    ///
    /// Returns `None` when a dimension does not fit the image crate's `u32`.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let width = u32::try_from(self.geometry.width).ok()?;
        let height = u32::try_from(self.geometry.height).ok()?;
        let view = self.view();
        let mut pixels = Vec::with_capacity(self.geometry.pixel_count() * BYTES_PER_PIXEL);
        for y in 0..self.geometry.height {
            for px in view.row(y).chunks_exact(BYTES_PER_PIXEL) {
                pixels.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        RgbaImage::from_raw(width, height, pixels)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has empty geometry: {width}x{height}")]
    EmptyGeometry { width: usize, height: usize },
    #[error("row stride too small: got {bytes_per_row} bytes, expected at least {expected}")]
    StrideTooSmall { bytes_per_row: usize, expected: usize },
    #[error("frame buffer too short: got {got} bytes, expected at least {expected}")]
    BufferTooShort { got: usize, expected: usize },
    #[error("frame geometry overflows: {width}x{height}, {bytes_per_row} bytes per row")]
    GeometryOverflow {
        width: usize,
        height: usize,
        bytes_per_row: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_empty_geometry() {
        let err = FrameView::new(0, 4, 16, &[0; 64]).unwrap_err();
        assert_eq!(err, FrameError::EmptyGeometry { width: 0, height: 4 });
    }

    #[test]
    fn view_rejects_small_stride() {
        let err = FrameView::new(4, 4, 12, &[0; 64]).unwrap_err();
        assert_eq!(
            err,
            FrameError::StrideTooSmall {
                bytes_per_row: 12,
                expected: 16
            }
        );
    }

    #[test]
    fn view_rejects_short_buffer() {
        let err = FrameView::new(4, 4, 16, &[0; 63]).unwrap_err();
        assert_eq!(err, FrameError::BufferTooShort { got: 63, expected: 64 });
    }

    #[test]
    fn view_rejects_overflowing_stride() {
        let err = FrameView::new(1, 4, 1usize << 62, &[0u8; 64]).unwrap_err();
        assert_eq!(
            err,
            FrameError::GeometryOverflow {
                width: 1,
                height: 4,
                bytes_per_row: 1usize << 62
            }
        );
    }

    #[test]
    fn view_rejects_overflowing_width() {
        let err = FrameView::new(usize::MAX / 2, 1, usize::MAX, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, FrameError::GeometryOverflow { .. }));
    }

    #[test]
    fn solid_rejects_overflowing_geometry() {
        let err = Frame::solid(1, usize::MAX, 8, [0, 0, 0, 255]).unwrap_err();
        assert!(matches!(err, FrameError::GeometryOverflow { .. }));
    }

    #[test]
    fn solid_fills_pixels_with_padded_stride() {
        let frame = Frame::solid(3, 2, 20, [7, 8, 9, 255]).unwrap();
        assert_eq!(frame.data().len(), 40);
        assert_eq!(frame.view().row(1), &[7, 8, 9, 255, 7, 8, 9, 255, 7, 8, 9, 255]);
        assert_eq!(&frame.data()[12..20], &[0; 8]);
    }

    #[test]
    fn view_ignores_trailing_bytes() {
        let data = vec![1u8; 100];
        let view = FrameView::new(4, 4, 16, &data).unwrap();
        assert_eq!(view.data().len(), 64);
        assert_eq!(view.to_owned_frame().data().len(), 64);
    }

    #[test]
    fn row_excludes_padding() {
        let frame = Frame::solid(2, 3, 12, [10, 20, 30, 255]).unwrap();
        let view = frame.view();
        assert_eq!(view.row(1), &[10, 20, 30, 255, 10, 20, 30, 255]);
        // padding stays zeroed
        assert_eq!(&frame.data()[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn geometry_comparison_includes_stride() {
        let a = Frame::solid(4, 4, 16, [0, 0, 0, 255]).unwrap();
        let b = Frame::solid(4, 4, 32, [0, 0, 0, 255]).unwrap();
        assert!(!a.view().same_geometry(&b.view()));
        assert!(a.view().same_geometry(&a.clone().view()));
    }

    #[test]
    fn rgba_image_swizzles_channels() {
        let frame = Frame::solid(3, 2, 16, [1, 2, 3, 4]).unwrap();
        let img = frame.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [3, 2, 1, 4]);
    }
}

use crate::error::ConvertError;

/// Decoded source pixels as handed over by the image/video decoders.
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use af_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer noir transparent aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Wrap existing RGBA bytes.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if the image has a zero
    /// dimension or `data` is not `width × height × 4` bytes long.
    ///
    /// # Example
    /// ```
    /// use af_core::frame::FrameBuffer;
    /// assert!(FrameBuffer::from_rgba(1, 1, vec![0, 0, 0, 255]).is_ok());
    /// assert!(FrameBuffer::from_rgba(0, 1, vec![]).is_err());
    /// ```
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidInput(format!(
                "image de dimensions nulles ({width}×{height})"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ConvertError::InvalidInput(format!(
                "buffer RGBA de {} octets, attendu {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Uniform opaque image, mostly for tests and placeholders.
    ///
    /// # Example
    /// ```
    /// use af_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::filled(2, 2, (255, 255, 255));
    /// assert_eq!(fb.pixel(1, 1), (255, 255, 255, 255));
    /// ```
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: (u8, u8, u8)) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }
}

/// Single-channel luminance samples (0–255), one per glyph cell.
///
/// # Example
/// ```
/// use af_core::frame::LumaFrame;
/// let frame = LumaFrame::new(3, 2);
/// assert_eq!(frame.data.len(), 6);
/// assert_eq!(frame.get(2, 1), 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LumaFrame {
    /// Samples, row-major.
    pub data: Vec<u8>,
    /// Width in samples.
    pub width: u32,
    /// Height in samples.
    pub height: u32,
}

impl LumaFrame {
    /// Zeroed (black) frame.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Sample at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Glyph indices into a [`GlyphPalette`](crate::charset::GlyphPalette),
/// same dimensions as the [`LumaFrame`] they were quantized from.
///
/// # Example
/// ```
/// use af_core::frame::GlyphGrid;
/// let mut grid = GlyphGrid::new(4, 2);
/// grid.set(3, 1, 7);
/// assert_eq!(grid.get(3, 1), 7);
/// assert_eq!(grid.get(0, 0), 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphGrid {
    /// Flat array of palette indices, row-major.
    pub indices: Vec<usize>,
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
}

impl GlyphGrid {
    /// Grid filled with index 0.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            indices: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Set the glyph index of cell (x, y).
    #[inline(always)]
    pub fn set(&mut self, x: u32, y: u32, index: usize) {
        self.indices[y as usize * self.width as usize + x as usize] = index;
    }

    /// Glyph index of cell (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> usize {
        self.indices[y as usize * self.width as usize + x as usize]
    }

    /// Iterate over rows of indices.
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.chunks_exact(self.width.max(1) as usize)
    }
}

/// Final monochrome raster: white glyphs on a black background.
///
/// One byte per pixel (gray), row-major. Size is always a whole number of
/// glyph cells.
///
/// # Example
/// ```
/// use af_core::frame::RenderedFrame;
/// let frame = RenderedFrame::new(20, 10);
/// assert_eq!(frame.data.len(), 200);
/// assert_eq!(frame.dimensions(), (20, 10));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Gray pixels, row-major, 1 byte par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RenderedFrame {
    /// Black canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Wrap existing gray bytes.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if `data` is not
    /// `width × height` bytes long.
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ConvertError> {
        if data.len() != width as usize * height as usize {
            return Err(ConvertError::InvalidInput(format!(
                "buffer gris de {} octets pour {width}×{height}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// `(width, height)` in pixels.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel value at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Copy of the `size × size` block whose top-left corner is (x, y).
    #[must_use]
    pub fn block(&self, x: u32, y: u32, size: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(size as usize * size as usize);
        for py in y..(y + size).min(self.height) {
            for px in x..(x + size).min(self.width) {
                out.push(self.pixel(px, py));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_rejects_short_buffer() {
        assert!(matches!(
            FrameBuffer::from_rgba(2, 2, vec![0; 15]),
            Err(ConvertError::InvalidInput(_))
        ));
    }

    #[test]
    fn glyph_grid_rows_have_grid_width() {
        let grid = GlyphGrid::new(3, 4);
        assert_eq!(grid.rows().count(), 4);
        assert!(grid.rows().all(|row| row.len() == 3));
    }

    #[test]
    fn rendered_block_is_clipped_to_canvas() {
        let frame = RenderedFrame::new(5, 5);
        assert_eq!(frame.block(0, 0, 3).len(), 9);
        assert_eq!(frame.block(3, 3, 3).len(), 4);
    }
}

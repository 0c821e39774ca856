use af_core::charset::GlyphPalette;
use af_core::error::ConvertError;
use af_core::frame::{GlyphGrid, LumaFrame};

/// Lookup table luminance [0..255] → index de glyphe.
///
/// `index = min(floor(level / bucket_width), palette.len() - 1)` where
/// `level` is the luminance (or `255 - luminance` when inverted). Luminance 0
/// lands on index 0, the densest glyph. Pre-computed once, O(1) par pixel.
///
/// # Example
/// ```
/// use af_core::charset::GlyphPalette;
/// use af_ascii::quantize::Quantizer;
/// let q = Quantizer::new(21.0, &GlyphPalette::default(), false).unwrap();
/// assert_eq!(q.index(0), 0);
/// assert_eq!(q.index(255), 9);
/// assert_eq!(q.index(42), 2);
/// ```
#[derive(Clone)]
pub struct Quantizer {
    lut: [usize; 256],
}

impl Quantizer {
    /// Build the table for a palette of `palette.len()` glyphs.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] if `bucket_width` is not a
    /// positive finite number.
    pub fn new(bucket_width: f32, palette: &GlyphPalette, invert: bool) -> Result<Self, ConvertError> {
        if !(bucket_width.is_finite() && bucket_width > 0.0) {
            return Err(ConvertError::InvalidConfig(format!(
                "bucket_width doit être > 0 (reçu {bucket_width})"
            )));
        }
        let last = palette.last_index();
        let mut lut = [0usize; 256];
        for (luma, slot) in lut.iter_mut().enumerate() {
            let level = if invert { 255 - luma } else { luma };
            // Saturating float→int cast: a tiny bucket width still clamps to `last`.
            let bucket = (level as f32 / bucket_width).floor() as usize;
            *slot = bucket.min(last);
        }
        log::trace!(
            "Quantizer : bucket {bucket_width}, {} glyphes, inversé={invert}, lut[255]={}",
            palette.len(),
            lut[255]
        );
        Ok(Self { lut })
    }

    /// Glyph index for one luminance sample. Always `< palette.len()`.
    #[inline(always)]
    #[must_use]
    pub fn index(&self, luma: u8) -> usize {
        self.lut[luma as usize]
    }

    /// Map every sample of `frame` to a glyph index.
    #[must_use]
    pub fn quantize(&self, frame: &LumaFrame) -> GlyphGrid {
        GlyphGrid {
            indices: frame.data.iter().map(|&v| self.index(v)).collect(),
            width: frame.width,
            height: frame.height,
        }
    }
}

/// One-shot quantization of `frame` with the darkest sample on glyph 0.
///
/// # Errors
/// Returns [`ConvertError::InvalidConfig`] if `bucket_width <= 0`; no grid is
/// produced in that case.
///
/// # Example
/// ```
/// use af_core::charset::GlyphPalette;
/// use af_core::frame::LumaFrame;
/// use af_ascii::quantize::quantize;
/// let frame = LumaFrame::new(2, 2);
/// let grid = quantize(&frame, 21.0, &GlyphPalette::default()).unwrap();
/// assert!(grid.indices.iter().all(|&i| i == 0));
/// assert!(quantize(&frame, 0.0, &GlyphPalette::default()).is_err());
/// ```
pub fn quantize(
    frame: &LumaFrame,
    bucket_width: f32,
    palette: &GlyphPalette,
) -> Result<GlyphGrid, ConvertError> {
    Ok(Quantizer::new(bucket_width, palette, false)?.quantize(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_always_in_range() {
        let palette = GlyphPalette::default();
        for bw in [0.001_f32, 0.5, 1.0, 7.3, 21.0, 25.5, 27.0, 255.0, 1000.0, 1e-30] {
            for invert in [false, true] {
                let q = Quantizer::new(bw, &palette, invert).unwrap();
                for v in 0..=255u8 {
                    assert!(q.index(v) < palette.len(), "bw={bw} v={v}");
                }
            }
        }
    }

    #[test]
    fn small_bucket_width_clamps_to_last_glyph() {
        // 255 / 1.0 ≫ 9 : sans clamp l'index déborderait.
        let palette = GlyphPalette::default();
        let q = Quantizer::new(1.0, &palette, false).unwrap();
        assert_eq!(q.index(9), 9);
        assert_eq!(q.index(200), palette.last_index());
    }

    #[test]
    fn extremes_map_to_ends_of_palette() {
        let palette = GlyphPalette::default();
        let q = Quantizer::new(21.0, &palette, false).unwrap();
        assert_eq!(palette.glyph(q.index(0)), '@');
        assert_eq!(palette.glyph(q.index(255)), ' ');
    }

    #[test]
    fn invert_flips_the_ramp() {
        let palette = GlyphPalette::default();
        let q = Quantizer::new(21.0, &palette, true).unwrap();
        assert_eq!(q.index(255), 0);
        assert_eq!(q.index(0), palette.last_index());
    }

    #[test]
    fn index_is_monotonic() {
        let q = Quantizer::new(20.0, &GlyphPalette::default(), false).unwrap();
        let mut prev = 0;
        for v in 0..=255u8 {
            assert!(q.index(v) >= prev);
            prev = q.index(v);
        }
    }

    #[test]
    fn non_positive_bucket_width_is_invalid_config() {
        let palette = GlyphPalette::default();
        for bw in [0.0_f32, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                Quantizer::new(bw, &palette, false),
                Err(ConvertError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn grid_keeps_frame_dimensions() {
        let mut frame = LumaFrame::new(3, 2);
        frame.data = vec![0, 21, 42, 63, 84, 255];
        let grid = quantize(&frame, 21.0, &GlyphPalette::default()).unwrap();
        assert_eq!((grid.width, grid.height), (3, 2));
        assert_eq!(grid.indices, vec![0, 1, 2, 3, 4, 9]);
    }
}

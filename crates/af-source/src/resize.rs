use af_core::error::ConvertError;
use af_core::frame::FrameBuffer;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};

/// Grid size for a `src_width × src_height` source rendered `target_width`
/// glyphs wide: `(target_width, round(target_width × H / W))`, at least one row.
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] for a zero-dimension source and
/// [`ConvertError::InvalidConfig`] for `target_width == 0`.
///
/// # Example
/// ```
/// use af_source::resize::grid_dimensions;
/// assert_eq!(grid_dimensions(1920, 1080, 100).unwrap(), (100, 56));
/// assert_eq!(grid_dimensions(2, 2, 2).unwrap(), (2, 2));
/// ```
pub fn grid_dimensions(
    src_width: u32,
    src_height: u32,
    target_width: u32,
) -> Result<(u32, u32), ConvertError> {
    if src_width == 0 || src_height == 0 {
        return Err(ConvertError::InvalidInput(format!(
            "image source de dimensions nulles ({src_width}×{src_height})"
        )));
    }
    if target_width < 1 {
        return Err(ConvertError::InvalidConfig(
            "target_width doit être ≥ 1".into(),
        ));
    }
    let height = (f64::from(target_width) * f64::from(src_height) / f64::from(src_width)).round();
    Ok((target_width, (height as u32).max(1)))
}

/// Resizer réutilisable wrappant fast_image_resize (filtre bilinéaire).
///
/// Garde ses buffers entre deux frames ; le résultat ne dépend que de l'entrée.
///
/// # Example
/// ```
/// use af_source::resize::Resizer;
/// use af_core::frame::FrameBuffer;
/// let mut r = Resizer::new();
/// let small = r.downscale(&FrameBuffer::new(400, 200), 100).unwrap();
/// assert_eq!((small.width, small.height), (100, 50));
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Scratch image for source (owned buffer to avoid the mut borrow issue).
    src_buf: Vec<u8>,
}

impl Resizer {
    /// Create a new resizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new()
                .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
                .use_alpha(false),
            src_buf: Vec::new(),
        }
    }

    /// Resize `src` to `target_width` columns, keeping its aspect ratio.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] for a zero-dimension source,
    /// [`ConvertError::InvalidConfig`] for `target_width == 0`.
    pub fn downscale(
        &mut self,
        src: &FrameBuffer,
        target_width: u32,
    ) -> Result<FrameBuffer, ConvertError> {
        let (width, height) = grid_dimensions(src.width, src.height, target_width)?;
        let mut dst = FrameBuffer::new(width, height);
        self.resize_into(src, &mut dst)?;
        Ok(dst)
    }

    /// Resize `src` into `dst`. Dimensions of `dst` determine output size.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if either buffer does not
    /// match its declared dimensions.
    pub fn resize_into(&mut self, src: &FrameBuffer, dst: &mut FrameBuffer) -> Result<(), ConvertError> {
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        // R1: forced copy by fast_image_resize API (requires &mut on source)
        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x4)
                .map_err(|e| ConvertError::InvalidInput(format!("buffer source invalide : {e}")))?;

        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x4)
                .map_err(|e| ConvertError::InvalidInput(format!("buffer cible invalide : {e}")))?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| ConvertError::codec("redimensionnement", e))?;

        Ok(())
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_within_one_pixel() {
        for &(w, h) in &[(1, 1), (3, 7), (640, 480), (1920, 1080), (1000, 1), (1, 1000), (17, 33)] {
            for &tw in &[1u32, 2, 10, 80, 100, 333] {
                let (gw, gh) = grid_dimensions(w, h, tw).unwrap();
                assert_eq!(gw, tw);
                let exact = f64::from(tw) * f64::from(h) / f64::from(w);
                assert!(
                    (f64::from(gh) - exact).abs() <= 1.0,
                    "{w}×{h} → {tw}: hauteur {gh}, exacte {exact}"
                );
            }
        }
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            grid_dimensions(0, 10, 10),
            Err(ConvertError::InvalidInput(_))
        ));
        assert!(matches!(
            grid_dimensions(10, 10, 0),
            Err(ConvertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn same_size_is_a_copy() {
        let src = FrameBuffer::filled(2, 2, (10, 20, 30));
        let out = Resizer::new().downscale(&src, 2).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let src = FrameBuffer::filled(64, 32, (200, 200, 200));
        let out = Resizer::new().downscale(&src, 8).unwrap();
        assert_eq!((out.width, out.height), (8, 4));
        for y in 0..out.height {
            for x in 0..out.width {
                let (r, g, b, _) = out.pixel(x, y);
                assert!(r.abs_diff(200) <= 1 && g.abs_diff(200) <= 1 && b.abs_diff(200) <= 1);
            }
        }
    }

    #[test]
    fn downscale_is_deterministic() {
        let mut src = FrameBuffer::new(50, 30);
        for (i, px) in src.data.iter_mut().enumerate() {
            *px = (i * 37 % 251) as u8;
        }
        let a = Resizer::new().downscale(&src, 13).unwrap();
        let mut reused = Resizer::new();
        let _ = reused.downscale(&FrameBuffer::new(9, 9), 4).unwrap();
        let b = reused.downscale(&src, 13).unwrap();
        assert_eq!(a, b);
    }
}

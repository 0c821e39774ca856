use af_ascii::luminance;
use af_ascii::quantize::Quantizer;
use af_core::config::ConvertConfig;
use af_core::error::ConvertError;
use af_core::frame::{FrameBuffer, RenderedFrame};
use af_export::rasterizer::{GlyphFace, Rasterizer};
use af_source::resize::Resizer;

/// Downscale → luminance → quantize → rasterize, with every stage's state
/// built once per conversion.
///
/// Rendering is referentially transparent: the same frame through the same
/// pipeline always yields byte-identical output. A failing stage aborts the
/// frame; no partial frame is returned.
///
/// # Example
/// ```
/// use af_app::pipeline::FramePipeline;
/// use af_core::config::ConvertConfig;
/// use af_core::frame::FrameBuffer;
///
/// let mut config = ConvertConfig::default();
/// config.quantization.target_width = 2;
/// let mut pipeline = FramePipeline::new(&config).unwrap();
/// let frame = pipeline.render(&FrameBuffer::new(2, 2)).unwrap();
/// assert_eq!(frame.dimensions(), (20, 20));
/// ```
pub struct FramePipeline {
    target_width: u32,
    resizer: Resizer,
    quantizer: Quantizer,
    rasterizer: Rasterizer,
}

impl FramePipeline {
    /// Validate `config` and pre-build the glyph atlas.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] for a bad parameter and
    /// [`ConvertError::InvalidInput`] if the configured font cannot be loaded.
    pub fn new(config: &ConvertConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        let q = &config.quantization;
        let palette = config.glyph_palette()?;
        let face = GlyphFace::load(config.font.as_deref())?;

        let quantizer = Quantizer::new(q.bucket_width, &palette, config.invert)?;
        let rasterizer = Rasterizer::new(&face, &palette, q.glyph_cell_size)?;

        log::debug!(
            "Pipeline : largeur {} | bucket {} | cellule {}px | {} glyphes",
            q.target_width,
            q.bucket_width,
            q.glyph_cell_size,
            palette.len()
        );

        Ok(Self {
            target_width: q.target_width,
            resizer: Resizer::new(),
            quantizer,
            rasterizer,
        })
    }

    /// Glyph rasterizer in use (cell size, atlas).
    #[must_use]
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Convert one decoded frame into a rendered ASCII frame.
    ///
    /// # Errors
    /// Propagates the first failing stage's error unchanged.
    pub fn render(&mut self, source: &FrameBuffer) -> Result<RenderedFrame, ConvertError> {
        let small = self.resizer.downscale(source, self.target_width)?;
        let luma = luminance::reduce(&small);
        let grid = self.quantizer.quantize(&luma);
        self.rasterizer.render(&grid)
    }
}

/// One-shot rendering of a single frame.
///
/// # Errors
/// See [`FramePipeline::new`] and [`FramePipeline::render`].
pub fn render(source: &FrameBuffer, config: &ConvertConfig) -> Result<RenderedFrame, ConvertError> {
    FramePipeline::new(config)?.render(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> ConvertConfig {
        let mut config = ConvertConfig::default();
        config.quantization.target_width = 2;
        config.quantization.bucket_width = 21.0;
        config.quantization.glyph_cell_size = 10;
        config
    }

    #[test]
    fn black_square_renders_dense_glyphs() {
        let mut pipeline = FramePipeline::new(&tiny_config()).unwrap();
        let frame = pipeline
            .render(&FrameBuffer::filled(2, 2, (0, 0, 0)))
            .unwrap();
        assert_eq!(frame.dimensions(), (20, 20));

        let at = pipeline.rasterizer().glyph_mask(0).to_vec();
        assert!(at.iter().any(|&v| v > 0));
        for (x, y) in [(0, 0), (10, 0), (0, 10), (10, 10)] {
            assert_eq!(frame.block(x, y, 10), at, "cellule ({x}, {y})");
        }
    }

    #[test]
    fn white_square_renders_blank_canvas() {
        let frame = render(&FrameBuffer::filled(2, 2, (255, 255, 255)), &tiny_config()).unwrap();
        assert_eq!(frame.dimensions(), (20, 20));
        assert!(frame.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn render_is_deterministic() {
        let mut src = FrameBuffer::new(37, 23);
        for (i, px) in src.data.chunks_exact_mut(4).enumerate() {
            let v = u8::try_from(i % 256).unwrap();
            px.copy_from_slice(&[v, v.wrapping_mul(3), 255 - v, 255]);
        }
        let mut config = ConvertConfig::default();
        config.quantization.target_width = 12;
        let a = render(&src, &config).unwrap();
        let b = render(&src, &config).unwrap();
        assert_eq!(a, b);

        let mut pipeline = FramePipeline::new(&config).unwrap();
        assert_eq!(pipeline.render(&src).unwrap(), a);
        assert_eq!(pipeline.render(&src).unwrap(), a);
    }

    #[test]
    fn output_size_follows_grid_and_cell() {
        let mut config = ConvertConfig::default();
        config.quantization.target_width = 8;
        config.quantization.glyph_cell_size = 3;
        let frame = render(&FrameBuffer::new(64, 32), &config).unwrap();
        assert_eq!(frame.dimensions(), (24, 12));
    }

    #[test]
    fn non_positive_bucket_width_is_rejected() {
        for bw in [0.0, -5.0] {
            let mut config = tiny_config();
            config.quantization.bucket_width = bw;
            assert!(matches!(
                FramePipeline::new(&config),
                Err(ConvertError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn canvas_overflow_is_invalid_config() {
        let mut config = ConvertConfig::default();
        config.quantization.target_width = 1 << 20;
        config.quantization.glyph_cell_size = 4096;
        config.palette = " ".into();
        let err = render(&FrameBuffer::filled(1 << 20, 1, (255, 255, 255)), &config).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn empty_source_is_invalid_input() {
        let err = render(&FrameBuffer::new(0, 0), &tiny_config()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));
    }
}

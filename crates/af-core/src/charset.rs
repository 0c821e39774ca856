use crate::error::ConvertError;

/// 10 caractères — la rampe par défaut, du plus dense au vide.
pub const PALETTE_DEFAULT: &str = "@%#*+=-:. ";

/// 70 caractères — Paul Bourke, résolution maximale (dense→clair).
pub const PALETTE_FULL: &str =
    "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

/// Blocs Unicode — pseudo-pixels.
pub const PALETTE_BLOCKS: &str = "█▓▒░ ";

/// Minimal — haut contraste.
pub const PALETTE_MINIMAL: &str = "@#:. ";

/// Ordered glyph ramp used by the quantizer and the rasterizer.
///
/// Index 0 is the darkest/most opaque glyph, the last index the lightest
/// (usually a space). The order defines the luminance→glyph mapping.
///
/// # Example
/// ```
/// use af_core::charset::GlyphPalette;
/// let palette = GlyphPalette::default();
/// assert_eq!(palette.len(), 10);
/// assert_eq!(palette.glyph(0), '@');
/// assert_eq!(palette.glyph(palette.last_index()), ' ');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphPalette {
    glyphs: Vec<char>,
}

impl GlyphPalette {
    /// Build a palette from a string ordered densest→lightest.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] if `glyphs` is empty.
    ///
    /// # Example
    /// ```
    /// use af_core::charset::GlyphPalette;
    /// assert!(GlyphPalette::new("#. ").is_ok());
    /// assert!(GlyphPalette::new("").is_err());
    /// ```
    pub fn new(glyphs: &str) -> Result<Self, ConvertError> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "la palette de glyphes est vide".into(),
            ));
        }
        Ok(Self { glyphs })
    }

    /// Resolve a preset name (`default`, `full`, `blocks`, `minimal`).
    ///
    /// # Example
    /// ```
    /// use af_core::charset::GlyphPalette;
    /// assert_eq!(GlyphPalette::preset("minimal").map(|p| p.len()), Some(5));
    /// assert!(GlyphPalette::preset("nope").is_none());
    /// ```
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let glyphs = match name.to_ascii_lowercase().as_str() {
            "default" => PALETTE_DEFAULT,
            "full" => PALETTE_FULL,
            "blocks" => PALETTE_BLOCKS,
            "minimal" => PALETTE_MINIMAL,
            _ => return None,
        };
        Some(Self {
            glyphs: glyphs.chars().collect(),
        })
    }

    /// Number of glyphs. Never zero.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always `false`; kept for API symmetry with slices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Index of the lightest glyph.
    #[inline]
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.glyphs.len() - 1
    }

    /// Glyph at `index`, clamped to the last glyph.
    #[inline(always)]
    #[must_use]
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.last_index())]
    }

    /// All glyphs, densest first.
    #[must_use]
    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }
}

impl Default for GlyphPalette {
    fn default() -> Self {
        Self {
            glyphs: PALETTE_DEFAULT.chars().collect(),
        }
    }
}

impl std::fmt::Display for GlyphPalette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in &self.glyphs {
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

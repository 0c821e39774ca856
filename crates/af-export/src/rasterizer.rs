use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, point};
use af_core::charset::GlyphPalette;
use af_core::error::ConvertError;
use af_core::frame::{GlyphGrid, RenderedFrame};
use font8x8::{BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, LATIN_FONTS, UnicodeFonts};
use rayon::prelude::*;

/// Côté de la face bitmap embarquée.
const BUILTIN_GLYPH_SIZE: u32 = 8;

/// Source of glyph shapes.
pub enum GlyphFace {
    /// font8x8, étiré au plus proche voisin sur la cellule.
    Builtin,
    /// User-supplied TrueType/OpenType font, pixel height = cell size.
    TrueType(FontVec),
}

impl GlyphFace {
    /// Load a font file, or the built-in face when `path` is `None`.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if the file cannot be read or is
    /// not a font.
    pub fn load(path: Option<&Path>) -> Result<Self, ConvertError> {
        let Some(path) = path else {
            return Ok(Self::Builtin);
        };
        let data = std::fs::read(path).map_err(|e| {
            ConvertError::InvalidInput(format!("police illisible {} : {e}", path.display()))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            ConvertError::InvalidInput(format!("police invalide {} : {e}", path.display()))
        })?;
        log::debug!("Police chargée : {}", path.display());
        Ok(Self::TrueType(font))
    }

    /// Coverage mask (`cell × cell`, row-major) of `ch`, `None` if the face
    /// has no such glyph.
    fn mask(&self, ch: char, cell: u32) -> Option<Vec<u8>> {
        match self {
            Self::Builtin => builtin_mask(ch, cell),
            Self::TrueType(font) => truetype_mask(font, ch, cell),
        }
    }
}

fn builtin_mask(ch: char, cell: u32) -> Option<Vec<u8>> {
    let rows = BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BLOCK_FONTS.get(ch))
        .or_else(|| BOX_FONTS.get(ch))?;

    let mut mask = vec![0u8; cell as usize * cell as usize];
    for y in 0..cell {
        let row = rows[(y * BUILTIN_GLYPH_SIZE / cell) as usize];
        for x in 0..cell {
            // bit 0 = pixel le plus à gauche
            let bit = x * BUILTIN_GLYPH_SIZE / cell;
            if (row >> bit) & 1 == 1 {
                mask[(y * cell + x) as usize] = 255;
            }
        }
    }
    Some(mask)
}

fn truetype_mask(font: &FontVec, ch: char, cell: u32) -> Option<Vec<u8>> {
    // glyph_id 0 = .notdef : on évite les boîtes "?" dans la sortie.
    let gid = font.glyph_id(ch);
    if gid.0 == 0 {
        return None;
    }

    let scale = PxScale::from(cell as f32);
    let ascent_px = font.ascent_unscaled() * scale.y / font.height_unscaled();
    let glyph = gid.with_scale_and_position(scale, point(0.0, ascent_px));

    let mut mask = vec![0u8; cell as usize * cell as usize];
    if let Some(outline) = font.outline_glyph(glyph) {
        let bounds = outline.px_bounds();
        #[allow(clippy::cast_possible_wrap)]
        outline.draw(|x, y, v| {
            let px = x as i32 + bounds.min.x as i32;
            let py = y as i32 + bounds.min.y as i32;
            if px >= 0 && py >= 0 && (px as u32) < cell && (py as u32) < cell {
                let idx = (py as u32 * cell + px as u32) as usize;
                mask[idx] = mask[idx].max((v * 255.0).round() as u8);
            }
        });
    }
    Some(mask)
}

/// Convertit une GlyphGrid en raster monochrome : glyphes blancs sur fond noir.
///
/// Atlas pré-calculé par palette : une cellule par index, aucune
/// rasterisation dans le hot-loop.
///
/// # Example
/// ```
/// use af_core::charset::GlyphPalette;
/// use af_core::frame::GlyphGrid;
/// use af_export::rasterizer::{GlyphFace, Rasterizer};
///
/// let palette = GlyphPalette::default();
/// let rasterizer = Rasterizer::new(&GlyphFace::Builtin, &palette, 10).unwrap();
/// let frame = rasterizer.render(&GlyphGrid::new(3, 2)).unwrap();
/// assert_eq!(frame.dimensions(), (30, 20));
/// ```
pub struct Rasterizer {
    cell: u32,
    /// One `cell × cell` coverage mask per palette index.
    atlas: Vec<Vec<u8>>,
    /// Pre-allocated fallback glyph (all zeros).
    empty_glyph: Vec<u8>,
}

impl Rasterizer {
    /// Pre-rasterize every glyph of `palette` at `cell_size` pixels.
    ///
    /// Glyphs missing from the face render blank (one warning each).
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] if `cell_size == 0`.
    pub fn new(face: &GlyphFace, palette: &GlyphPalette, cell_size: u32) -> Result<Self, ConvertError> {
        if cell_size < 1 {
            return Err(ConvertError::InvalidConfig(
                "glyph_cell_size doit être ≥ 1".into(),
            ));
        }
        let empty_glyph = vec![0u8; cell_size as usize * cell_size as usize];
        let atlas = palette
            .glyphs()
            .iter()
            .map(|&ch| {
                face.mask(ch, cell_size).unwrap_or_else(|| {
                    log::warn!("Glyphe absent de la police : {ch:?} (rendu vide)");
                    empty_glyph.clone()
                })
            })
            .collect();

        Ok(Self {
            cell: cell_size,
            atlas,
            empty_glyph,
        })
    }

    /// Coverage mask stamped for palette `index`.
    #[must_use]
    pub fn glyph_mask(&self, index: usize) -> &[u8] {
        self.atlas.get(index).unwrap_or(&self.empty_glyph)
    }

    /// Calcule les dimensions du raster pour une grille donnée.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] if the canvas would not fit in
    /// `u32` pixels per side or in addressable memory.
    pub fn target_dimensions(&self, grid_w: u32, grid_h: u32) -> Result<(u32, u32), ConvertError> {
        let too_large = || {
            ConvertError::InvalidConfig(format!(
                "canvas trop grand : grille {grid_w}×{grid_h}, cellule {}px",
                self.cell
            ))
        };
        let width = grid_w.checked_mul(self.cell).ok_or_else(too_large)?;
        let height = grid_h.checked_mul(self.cell).ok_or_else(too_large)?;
        (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(too_large)?;
        Ok((width, height))
    }

    /// Stamp every cell of `grid` onto a fresh black canvas.
    ///
    /// Glyph (col, row) has its drawing origin at `(col × cell, row × cell)`
    /// and never leaves its cell. Parallélisé par rangée de cellules.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] for an empty grid and
    /// [`ConvertError::InvalidConfig`] if the canvas size overflows.
    pub fn render(&self, grid: &GlyphGrid) -> Result<RenderedFrame, ConvertError> {
        if grid.width == 0 || grid.height == 0 {
            return Err(ConvertError::InvalidInput(format!(
                "grille de glyphes vide ({}×{})",
                grid.width, grid.height
            )));
        }
        let (width, height) = self.target_dimensions(grid.width, grid.height)?;
        let mut frame = RenderedFrame::new(width, height);

        let cell = self.cell as usize;
        let stride = width as usize;
        let band_size = stride * cell;

        frame
            .data
            .par_chunks_exact_mut(band_size)
            .zip(grid.rows().collect::<Vec<_>>())
            .for_each(|(band, row)| {
                for (gx, &index) in row.iter().enumerate() {
                    let mask = self.glyph_mask(index);
                    let x0 = gx * cell;
                    for cy in 0..cell {
                        let dst = &mut band[cy * stride + x0..cy * stride + x0 + cell];
                        dst.copy_from_slice(&mask[cy * cell..(cy + 1) * cell]);
                    }
                }
            });

        Ok(frame)
    }
}

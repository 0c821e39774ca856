use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::charset::{GlyphPalette, PALETTE_DEFAULT};
use crate::error::ConvertError;

/// Parameters of the luminance → glyph mapping.
///
/// # Example
/// ```
/// use af_core::config::QuantizationConfig;
/// let q = QuantizationConfig::default();
/// assert_eq!(q.target_width, 100);
/// assert_eq!(q.glyph_cell_size, 10);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct QuantizationConfig {
    /// Largeur de la grille de glyphes, en colonnes.
    pub target_width: u32,
    /// Largeur d'un palier de luminance. `floor(luma / bucket_width)` donne l'index.
    pub bucket_width: f32,
    /// Côté d'une cellule de glyphe, en pixels de sortie.
    pub glyph_cell_size: u32,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            target_width: 100,
            bucket_width: 21.0,
            glyph_cell_size: 10,
        }
    }
}

/// Where collected video frames wait until the sequence is finalized.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Staging {
    /// Frames are kept in memory.
    Memory,
    /// Frames are written as PNG into a temporary directory removed on drop.
    #[default]
    Disk,
}

impl std::str::FromStr for Staging {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            other => Err(ConvertError::InvalidConfig(format!(
                "staging inconnu : {other} (memory | disk)"
            ))),
        }
    }
}

/// Complete configuration of one conversion call.
///
/// Every field has a sane default; nothing here is global state.
///
/// # Example
/// ```
/// use af_core::config::ConvertConfig;
/// let config = ConvertConfig::default();
/// assert_eq!(config.fps, 30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ConvertConfig {
    /// Grid width, bucket width and cell size.
    pub quantization: QuantizationConfig,
    /// Palette du plus dense au plus clair.
    pub palette: String,
    /// Inverse la rampe : les zones claires reçoivent les glyphes denses.
    pub invert: bool,
    /// Images par seconde de la vidéo produite.
    pub fps: u32,
    /// TrueType/OpenType font used for glyphs. `None` = built-in 8×8 face.
    pub font: Option<PathBuf>,
    /// Staging of video frames before muxing.
    pub staging: Staging,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quantization: QuantizationConfig::default(),
            palette: PALETTE_DEFAULT.to_string(),
            invert: false,
            fps: 30,
            font: None,
            staging: Staging::default(),
        }
    }
}

impl ConvertConfig {
    /// Check every numeric parameter and the palette.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] naming the first bad field.
    ///
    /// # Example
    /// ```
    /// use af_core::config::ConvertConfig;
    /// let mut config = ConvertConfig::default();
    /// config.quantization.bucket_width = 0.0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConvertError> {
        let q = &self.quantization;
        if q.target_width < 1 {
            return Err(ConvertError::InvalidConfig(
                "target_width doit être ≥ 1".into(),
            ));
        }
        if q.glyph_cell_size < 1 {
            return Err(ConvertError::InvalidConfig(
                "glyph_cell_size doit être ≥ 1".into(),
            ));
        }
        if !(q.bucket_width.is_finite() && q.bucket_width > 0.0) {
            return Err(ConvertError::InvalidConfig(format!(
                "bucket_width doit être > 0 (reçu {})",
                q.bucket_width
            )));
        }
        if self.fps < 1 {
            return Err(ConvertError::InvalidConfig("fps doit être ≥ 1".into()));
        }
        self.glyph_palette().map(|_| ())
    }

    /// Parse the palette string.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] if the palette is empty.
    pub fn glyph_palette(&self) -> Result<GlyphPalette, ConvertError> {
        GlyphPalette::new(&self.palette)
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    quantization: Option<QuantizationSection>,
    output: Option<OutputSection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct QuantizationSection {
    target_width: Option<u32>,
    bucket_width: Option<f32>,
    glyph_cell_size: Option<u32>,
    palette: Option<String>,
    invert: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputSection {
    fps: Option<u32>,
    font: Option<PathBuf>,
    staging: Option<Staging>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns [`ConvertError::InvalidConfig`] if the TOML is malformed.
///
/// # Example
/// ```
/// use af_core::config::parse_config;
/// let config = parse_config("[quantization]\ntarget_width = 40\n").unwrap();
/// assert_eq!(config.quantization.target_width, 40);
/// assert_eq!(config.fps, 30);
/// ```
pub fn parse_config(content: &str) -> Result<ConvertConfig, ConvertError> {
    let file: ConfigFile = toml::from_str(content)
        .map_err(|e| ConvertError::InvalidConfig(format!("erreur de parsing TOML : {e}")))?;

    let mut config = ConvertConfig::default();

    if let Some(q) = file.quantization {
        if let Some(v) = q.target_width {
            config.quantization.target_width = v;
        }
        if let Some(v) = q.bucket_width {
            config.quantization.bucket_width = v;
        }
        if let Some(v) = q.glyph_cell_size {
            config.quantization.glyph_cell_size = v;
        }
        if let Some(v) = q.palette {
            config.palette = v;
        }
        if let Some(v) = q.invert {
            config.invert = v;
        }
    }

    if let Some(o) = file.output {
        if let Some(v) = o.fps {
            config.fps = v;
        }
        if o.font.is_some() {
            config.font = o.font;
        }
        if let Some(v) = o.staging {
            config.staging = v;
        }
    }

    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// The result is not validated; call [`ConvertConfig::validate`] once CLI
/// overrides have been applied.
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] if the file cannot be read and
/// [`ConvertError::InvalidConfig`] if it cannot be parsed.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ConvertError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConvertError::InvalidInput(format!("impossible de lire {} : {e}", path.display()))
    })?;
    let config = parse_config(&content)?;
    log::debug!("Configuration chargée depuis {}", path.display());
    Ok(config)
}

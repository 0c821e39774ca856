use std::path::PathBuf;

use af_core::charset::GlyphPalette;
use af_core::config::{ConvertConfig, Staging};
use clap::Parser;

/// asciify — convertit images et vidéos en art ASCII (PNG / MP4).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source : image (PNG, JPEG, BMP, GIF) → image ASCII.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Source : vidéo lisible par ffmpeg → MP4 ASCII. Requiert --features video.
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Source : dossier de frames déjà rendues, muxées telles quelles en MP4.
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Fichier de sortie (.png/.jpg/.bmp pour une image, .mp4 sinon).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Fichier de configuration TOML ([quantization], [output]).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Largeur de la grille, en glyphes.
    #[arg(long)]
    pub width: Option<u32>,

    /// Largeur d'un palier de luminance (> 0).
    #[arg(long, allow_negative_numbers = true)]
    pub bucket_width: Option<f32>,

    /// Côté d'une cellule de glyphe, en pixels.
    #[arg(long)]
    pub cell_size: Option<u32>,

    /// FPS de la vidéo produite.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Palette : preset (default, full, blocks, minimal) ou glyphes dense→clair.
    #[arg(long)]
    pub palette: Option<String>,

    /// Glyphes denses sur les zones claires.
    #[arg(long, default_value_t = false)]
    pub invert: bool,

    /// Police TrueType/OpenType pour les glyphes (défaut : face 8×8 intégrée).
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Staging des frames vidéo : memory ou disk.
    #[arg(long)]
    pub staging: Option<Staging>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or more than one source is specified.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        let count = usize::from(self.image.is_some())
            + usize::from(self.video.is_some())
            + usize::from(self.frames.is_some());

        if count == 0 {
            anyhow::bail!("Aucune source spécifiée. Utilisez --image, --video ou --frames.");
        }
        if count > 1 {
            anyhow::bail!("Une seule source à la fois. Spécifiez --image, --video OU --frames.");
        }
        Ok(())
    }

    /// Apply command-line overrides on top of `config`.
    pub fn apply_overrides(&self, config: &mut ConvertConfig) {
        if let Some(width) = self.width {
            config.quantization.target_width = width;
        }
        if let Some(bw) = self.bucket_width {
            config.quantization.bucket_width = bw;
        }
        if let Some(cell) = self.cell_size {
            config.quantization.glyph_cell_size = cell;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(ref palette) = self.palette {
            config.palette =
                GlyphPalette::preset(palette).map_or_else(|| palette.clone(), |p| p.to_string());
        }
        if self.invert {
            config.invert = true;
        }
        if let Some(ref font) = self.font {
            config.font = Some(font.clone());
        }
        if let Some(staging) = self.staging {
            config.staging = staging;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asciify").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn exactly_one_source() {
        assert!(parse(&["--image", "a.png", "-o", "b.png"]).validate_source().is_ok());
        assert!(parse(&["-o", "b.png"]).validate_source().is_err());
        assert!(
            parse(&["--image", "a.png", "--frames", "dir", "-o", "b.mp4"])
                .validate_source()
                .is_err()
        );
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["asciify", "--image", "a.png"]).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = parse(&[
            "--video", "in.mp4", "-o", "out.mp4", "--width", "40", "--bucket-width", "-1",
            "--fps", "24", "--palette", "minimal", "--staging", "memory", "--invert",
        ]);
        let mut config = ConvertConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.quantization.target_width, 40);
        assert!((config.quantization.bucket_width + 1.0).abs() < f32::EPSILON);
        assert_eq!(config.fps, 24);
        assert_eq!(config.palette, "@#:. ");
        assert_eq!(config.staging, Staging::Memory);
        assert!(config.invert);
        assert!(config.validate().is_err());
    }

    #[test]
    fn literal_palette_is_kept() {
        let cli = parse(&["--image", "a.png", "-o", "b.png", "--palette", "#o. "]);
        let mut config = ConvertConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.palette, "#o. ");
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use af_core::error::ConvertError;
use af_core::frame::RenderedFrame;
use af_core::process::StderrTail;
use af_core::traits::FrameSink;

/// Fichier temporaire voisin de `output` : `.<stem>.partial.<ext>`.
///
/// Same directory (so the final rename is atomic), same extension (so ffmpeg
/// picks the same container).
///
/// # Example
/// ```
/// use af_export::muxer::partial_path;
/// use std::path::Path;
/// assert_eq!(partial_path(Path::new("out/clip.mp4")), Path::new("out/.clip.partial.mp4"));
/// ```
#[must_use]
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = output
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("mp4");
    output.with_file_name(format!(".{stem}.partial.{ext}"))
}

/// Encode des frames grises dans un fichier MP4 avec ffmpeg (lossless).
///
/// ffmpeg écrit dans un fichier `.partial` ; `finish()` le renomme vers la
/// destination. Dropped without `finish()` (error, cancel), the encoder is
/// killed and the partial file removed: no truncated container is left behind.
pub struct Mp4Muxer {
    ffmpeg_child: Option<Child>,
    stderr: Option<StderrTail>,
    width: u32,
    height: u32,
    frames_written: usize,
    partial: PathBuf,
    output: PathBuf,
}

impl Mp4Muxer {
    /// Crée un Muxer vidéo.
    /// Utilise x264 RGB avec `-crf 0` (lossless : les frames décodées sont
    /// identiques aux frames rendues).
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] for zero dimensions or fps and
    /// [`ConvertError::Codec`] if ffmpeg is missing or fails to start.
    pub fn new(output: &Path, width: u32, height: u32, fps: u32) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 || fps == 0 {
            return Err(ConvertError::InvalidConfig(format!(
                "muxer {width}×{height} @ {fps}fps"
            )));
        }
        let partial = partial_path(output);
        let partial_str = partial
            .to_str()
            .ok_or_else(|| ConvertError::InvalidInput("chemin de sortie non-UTF8".into()))?;

        let mut command = Command::new("ffmpeg");
        command.args([
            "-y",
            "-f",
            "rawvideo",
            "-vcodec",
            "rawvideo",
            "-s",
            &format!("{width}x{height}"),
            "-pix_fmt",
            "gray",
            "-r",
            &fps.to_string(),
            "-i",
            "-",
            "-c:v",
            "libx264rgb",
            "-crf",
            "0",
            "-preset",
            "veryslow",
            "-pix_fmt",
            "rgb24",
            "-color_range",
            "pc",
            "-hide_banner",
            "-loglevel",
            "error",
            partial_str,
        ]);

        let muxer = Self::start(command, output, partial, width, height)?;
        log::debug!(
            "Mp4Muxer: {width}x{height} @ {fps}fps → {}",
            output.display()
        );
        Ok(muxer)
    }

    /// Spawn `command` as the encoder: raw frames on stdin, container written
    /// to `partial`.
    fn start(
        mut command: Command,
        output: &Path,
        partial: PathBuf,
        width: u32,
        height: u32,
    ) -> Result<Self, ConvertError> {
        let child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConvertError::codec(
                    "échec de l'initialisation de l'encodeur vidéo ffmpeg (est-il dans PATH ?)",
                    e,
                )
            })?;

        let mut muxer = Self {
            ffmpeg_child: Some(child),
            stderr: None,
            width,
            height,
            frames_written: 0,
            partial,
            output: output.to_path_buf(),
        };
        // En cas d'échec, Drop tue l'encodeur.
        if let Some(child) = muxer.ffmpeg_child.as_mut() {
            muxer.stderr = Some(StderrTail::spawn(child, "af-mux-stderr")?);
        }
        Ok(muxer)
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.ffmpeg_child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if self.partial.exists()
            && let Err(e) = std::fs::remove_file(&self.partial)
        {
            log::warn!("Impossible de supprimer {} : {e}", self.partial.display());
        }
    }
}

impl FrameSink for Mp4Muxer {
    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), ConvertError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(ConvertError::DimensionMismatch {
                index: self.frames_written,
                width: frame.width,
                height: frame.height,
                expected_width: self.width,
                expected_height: self.height,
            });
        }
        let stdin = self
            .ffmpeg_child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| ConvertError::Codec("flux ffmpeg déjà fermé".into()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| ConvertError::codec("écriture vers ffmpeg", e))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<(), ConvertError> {
        let Some(mut child) = self.ffmpeg_child.take() else {
            return Err(ConvertError::Codec("flux ffmpeg déjà fermé".into()));
        };
        drop(child.stdin.take());

        let status = child
            .wait()
            .map_err(|e| ConvertError::codec("attente de ffmpeg", e))?;
        let stderr = self.stderr.take().map(StderrTail::collect).unwrap_or_default();
        if !status.success() {
            // Drop supprime le fichier partiel.
            return Err(ConvertError::Codec(format!(
                "ffmpeg encoder error: {stderr}"
            )));
        }

        std::fs::rename(&self.partial, &self.output).map_err(|e| {
            ConvertError::codec(&format!("renommage vers {}", self.output.display()), e)
        })?;
        log::info!(
            "Vidéo finalisée : {} ({} frames)",
            self.output.display(),
            self.frames_written
        );
        Ok(())
    }
}

impl Drop for Mp4Muxer {
    fn drop(&mut self) {
        self.abort();
    }
}

// DEVIATION: R9 — décodage via ffmpeg en subprocess (std::process::Command),
// pas de binding natif. Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`       : interroge ffprobe (width/height/fps/nb_frames)
//   - `spawn_ffmpeg_pipe` : lance ffmpeg → flux raw RGBA sur stdout
//   - `VideoSource`       : thread de décodage dédié, frames via canal flume borné

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use af_core::error::ConvertError;
use af_core::frame::FrameBuffer;
use af_core::process::StderrTail;
use af_core::traits::Source;
use flume::{Receiver, Sender};

/// Capacité du canal décodeur → pipeline.
const CHANNEL_CAPACITY: usize = 3;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
    /// Frame count declared by the container, when present.
    pub frame_count: Option<u64>,
}

/// Parse `key=value` lines printed by `ffprobe -of default=noprint_wrappers=1`.
fn parse_probe_output(text: &str) -> (Option<u32>, Option<u32>, Option<f64>, Option<u64>) {
    let mut width = None;
    let mut height = None;
    let mut fps = None;
    let mut frames = None;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: Option<f64> = parts.next().and_then(|s| s.parse().ok());
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if let Some(num) = num
                && den > 0.0
            {
                fps = Some(num / den);
            }
        } else if let Some(val) = line
            .strip_prefix("nb_read_frames=")
            .or_else(|| line.strip_prefix("nb_frames="))
        {
            frames = val.trim().parse().ok();
        }
    }
    (width, height, fps, frames)
}

fn run_ffprobe(path: &Path, extra: &[&str], entries: &str) -> Result<String, ConvertError> {
    if !path.is_file() {
        return Err(ConvertError::InvalidInput(format!(
            "vidéo introuvable : {}",
            path.display()
        )));
    }
    let path_str = path
        .to_str()
        .ok_or_else(|| ConvertError::InvalidInput("chemin vidéo invalide (non-UTF8)".into()))?;

    let mut args = vec!["-v", "error", "-select_streams", "v:0"];
    args.extend_from_slice(extra);
    args.extend_from_slice(&[
        "-show_entries",
        entries,
        "-of",
        "default=noprint_wrappers=1",
        "-i",
        path_str,
    ]);

    let output = Command::new("ffprobe")
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ConvertError::codec("impossible de lancer ffprobe (PATH ?)", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::InvalidInput(format!(
            "ffprobe ne peut pas lire {} : {}",
            path.display(),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] if the file is missing or has no
/// decodable video stream, [`ConvertError::Codec`] if `ffprobe` cannot run.
pub fn probe_video(path: &Path) -> Result<VideoInfo, ConvertError> {
    let text = run_ffprobe(path, &[], "stream=width,height,r_frame_rate,nb_frames")?;
    let (width, height, fps, frame_count) = parse_probe_output(&text);

    let (Some(width), Some(height)) = (width, height) else {
        return Err(ConvertError::InvalidInput(format!(
            "ffprobe n'a trouvé aucun flux vidéo dans {}",
            path.display()
        )));
    };
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidInput(format!(
            "flux vidéo de dimensions nulles dans {}",
            path.display()
        )));
    }
    let fps = fps.unwrap_or(30.0);

    log::info!(
        "probe_video: {width}x{height} @ {fps:.3}fps — {}",
        path.display()
    );

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Decode the whole stream and count its frames (slow, exact).
///
/// # Errors
/// Same as [`probe_video`]; also fails if no count is reported.
pub fn count_frames(path: &Path) -> Result<u64, ConvertError> {
    let text = run_ffprobe(path, &["-count_frames"], "stream=nb_read_frames")?;
    let (_, _, _, frames) = parse_probe_output(&text);
    frames.ok_or_else(|| {
        ConvertError::codec("ffprobe -count_frames", format!("aucun compte pour {}", path.display()))
    })
}

/// Lance un processus `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `w × h × 4` bytes (RGBA row-major, sans padding), à la
/// résolution native : le redimensionnement reste dans le pipeline.
/// `-an` supprime l'audio.
///
/// # Errors
/// Returns [`ConvertError::Codec`] if `ffmpeg` cannot be spawned.
pub fn spawn_ffmpeg_pipe(path: &Path) -> Result<Child, ConvertError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ConvertError::InvalidInput("chemin vidéo invalide (non-UTF8)".into()))?;

    let child = Command::new("ffmpeg")
        .args([
            "-i",
            path_str,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-an",
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ConvertError::codec("impossible de lancer ffmpeg (PATH ?)", e))?;

    log::debug!("ffmpeg spawné pour {}", path.display());
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion.
///
/// # Errors
/// Propagates any I/O error other than `Interrupted`.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Frames d'une vidéo, décodées sur un thread dédié, dans l'ordre de présentation.
///
/// Dropping the source stops the decoder and reaps the ffmpeg process.
pub struct VideoSource {
    info: VideoInfo,
    frame_rx: Option<Receiver<Result<FrameBuffer, ConvertError>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl VideoSource {
    /// Probe `path` and start decoding it.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] for an unreadable video and
    /// [`ConvertError::Codec`] if ffmpeg/ffprobe cannot be started.
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let info = probe_video(path)?;
        let child = spawn_ffmpeg_pipe(path)?;
        let (frame_tx, frame_rx) = flume::bounded(CHANNEL_CAPACITY);
        let source_path = path.to_path_buf();

        let handle = thread::Builder::new()
            .name("af-video".to_string())
            .spawn(move || decode_loop(&source_path, child, &info, &frame_tx))
            .map_err(|e| ConvertError::codec("impossible de spawner le thread vidéo", e))?;

        Ok(Self {
            info,
            frame_rx: Some(frame_rx),
            handle: Some(handle),
        })
    }

    /// Stream metadata.
    #[must_use]
    pub fn info(&self) -> VideoInfo {
        self.info
    }
}

impl Source for VideoSource {
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>> {
        self.frame_rx.as_ref()?.recv().ok()
    }

    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn native_fps(&self) -> Option<f64> {
        Some(self.info.fps)
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        // Receiver fermé → le prochain send échoue → le thread tue ffmpeg.
        drop(self.frame_rx.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("Thread vidéo terminé par un panic");
        }
    }
}

/// Boucle du thread de décodage.
fn decode_loop(
    path: &Path,
    mut child: Child,
    info: &VideoInfo,
    frame_tx: &Sender<Result<FrameBuffer, ConvertError>>,
) {
    let frame_bytes = info.width as usize * info.height as usize * 4;
    // stderr vidé en parallèle : un pipe plein bloquerait ffmpeg (et stdout).
    let stderr = match StderrTail::spawn(&mut child, "af-video-stderr") {
        Ok(tail) => tail,
        Err(e) => {
            let _ = frame_tx.send(Err(e));
            let _ = child.kill();
            let _ = child.wait();
            return;
        }
    };
    let Some(mut stdout) = child.stdout.take() else {
        let _ = frame_tx.send(Err(ConvertError::Codec("stdout ffmpeg indisponible".into())));
        let _ = child.kill();
        let _ = child.wait();
        return;
    };

    let mut decoded = 0u64;
    loop {
        let mut data = vec![0u8; frame_bytes];
        match read_exact_or_eof(&mut stdout, &mut data) {
            Ok(true) => {
                let frame = FrameBuffer {
                    data,
                    width: info.width,
                    height: info.height,
                };
                if frame_tx.send(Ok(frame)).is_err() {
                    log::debug!("Thread vidéo: consommateur parti, arrêt.");
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                decoded += 1;
            }
            Ok(false) => break,
            Err(e) => {
                let _ = frame_tx.send(Err(ConvertError::codec("lecture du pipe ffmpeg", e)));
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        }
    }

    let status = child.wait();
    let stderr_text = stderr.collect();
    match status {
        Ok(status) if status.success() => {
            log::info!("Thread vidéo: EOF après {decoded} frames ({}).", path.display());
        }
        Ok(status) => {
            let _ = frame_tx.send(Err(ConvertError::Codec(format!(
                "ffmpeg decoder error ({status}): {stderr_text}"
            ))));
        }
        Err(e) => {
            let _ = frame_tx.send(Err(ConvertError::codec("attente de ffmpeg", e)));
        }
    }
}

/// `true` if both `ffmpeg` and `ffprobe` answer `-version`.
#[must_use]
pub fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|bin| {
        Command::new(bin)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    })
}

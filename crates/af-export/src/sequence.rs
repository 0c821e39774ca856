use std::path::{Path, PathBuf};

use af_core::config::Staging;
use af_core::error::ConvertError;
use af_core::frame::RenderedFrame;
use af_core::traits::FrameSink;
use image::ExtendedColorType;
use tempfile::TempDir;

use crate::muxer::Mp4Muxer;

/// Observable phase of a [`SequenceAssembler`].
///
/// `Finalized` is terminal: `finalize*` consumes the assembler, so no frame
/// can be pushed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblerState {
    /// No frame accepted yet.
    Idle,
    /// At least one frame accepted; dimensions are locked.
    Collecting,
}

/// Stockage des frames en attente du muxage.
enum FrameStore {
    Memory(Vec<RenderedFrame>),
    /// PNG numérotés dans un répertoire temporaire, supprimé au drop.
    Disk(TempDir),
}

impl FrameStore {
    fn frame_path(dir: &TempDir, index: usize) -> PathBuf {
        dir.path().join(format!("frame_{index:06}.png"))
    }
}

/// Collecte une séquence ordonnée de frames rendues, puis la muxe.
///
/// Frames are written in the exact order they were pushed. Every frame must
/// match the first one's dimensions.
///
/// # Example
/// ```
/// use af_core::config::Staging;
/// use af_core::frame::RenderedFrame;
/// use af_export::sequence::{AssemblerState, SequenceAssembler};
///
/// let mut assembler = SequenceAssembler::new(30, Staging::Memory).unwrap();
/// assert_eq!(assembler.state(), AssemblerState::Idle);
/// assembler.push(RenderedFrame::new(20, 20)).unwrap();
/// assert_eq!(assembler.state(), AssemblerState::Collecting);
/// assert!(assembler.push(RenderedFrame::new(10, 20)).is_err());
/// ```
pub struct SequenceAssembler {
    fps: u32,
    store: FrameStore,
    dims: Option<(u32, u32)>,
    count: usize,
}

impl SequenceAssembler {
    /// Assembler for an `fps` stream. Disk staging creates its temporary
    /// directory now, before the first frame is generated.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] for `fps == 0` and
    /// [`ConvertError::Codec`] if the staging directory cannot be created.
    pub fn new(fps: u32, staging: Staging) -> Result<Self, ConvertError> {
        if fps == 0 {
            return Err(ConvertError::InvalidConfig("fps doit être ≥ 1".into()));
        }
        let store = match staging {
            Staging::Memory => FrameStore::Memory(Vec::new()),
            Staging::Disk => {
                let dir = tempfile::Builder::new()
                    .prefix("af-frames-")
                    .tempdir()
                    .map_err(|e| ConvertError::codec("répertoire de staging", e))?;
                log::debug!("Staging des frames dans {}", dir.path().display());
                FrameStore::Disk(dir)
            }
        };
        Ok(Self {
            fps,
            store,
            dims: None,
            count: 0,
        })
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> AssemblerState {
        if self.count == 0 {
            AssemblerState::Idle
        } else {
            AssemblerState::Collecting
        }
    }

    /// Frames accepted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// `true` while no frame has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dimensions locked by the first frame.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dims
    }

    /// Staging directory, for disk staging.
    #[must_use]
    pub fn staging_dir(&self) -> Option<&Path> {
        match &self.store {
            FrameStore::Memory(_) => None,
            FrameStore::Disk(dir) => Some(dir.path()),
        }
    }

    /// Accept the next frame in temporal order.
    ///
    /// # Errors
    /// Returns [`ConvertError::DimensionMismatch`] if `frame` differs in size
    /// from the first frame (the caller must abort the conversion), or
    /// [`ConvertError::Codec`] if disk staging fails.
    pub fn push(&mut self, frame: RenderedFrame) -> Result<(), ConvertError> {
        let (width, height) = frame.dimensions();
        match self.dims {
            None => self.dims = Some((width, height)),
            Some((expected_width, expected_height))
                if (width, height) != (expected_width, expected_height) =>
            {
                return Err(ConvertError::DimensionMismatch {
                    index: self.count,
                    width,
                    height,
                    expected_width,
                    expected_height,
                });
            }
            Some(_) => {}
        }

        match &mut self.store {
            FrameStore::Memory(frames) => frames.push(frame),
            FrameStore::Disk(dir) => {
                let path = FrameStore::frame_path(dir, self.count);
                image::save_buffer(&path, &frame.data, width, height, ExtendedColorType::L8)
                    .map_err(|e| ConvertError::codec("écriture de la frame de staging", e))?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Open a sink with the first frame's dimensions and the configured fps,
    /// write every frame in order, then finish the sink.
    ///
    /// Returns the number of frames written.
    ///
    /// # Errors
    /// Returns [`ConvertError::EmptySequence`] if no frame was pushed (the sink
    /// is never opened), or whatever the sink or staging reports.
    pub fn finalize_with<S, F>(self, open: F) -> Result<usize, ConvertError>
    where
        S: FrameSink,
        F: FnOnce(u32, u32, u32) -> Result<S, ConvertError>,
    {
        let Some((width, height)) = self.dims else {
            return Err(ConvertError::EmptySequence);
        };
        let mut sink = open(width, height, self.fps)?;

        match self.store {
            FrameStore::Memory(frames) => {
                for (i, frame) in frames.iter().enumerate() {
                    sink.write_frame(frame)?;
                    log::debug!("Frame muxée {}/{}", i + 1, self.count);
                }
            }
            FrameStore::Disk(dir) => {
                for i in 0..self.count {
                    let frame = read_staged(&FrameStore::frame_path(&dir, i))?;
                    sink.write_frame(&frame)?;
                    log::debug!("Frame muxée {}/{}", i + 1, self.count);
                }
                // dir dropped here: staging removed once muxing is done.
            }
        }

        sink.finish()?;
        Ok(self.count)
    }

    /// Mux into an MP4 file at `output` via ffmpeg.
    ///
    /// # Errors
    /// Same as [`finalize_with`](Self::finalize_with); no file is left at
    /// `output` on failure.
    pub fn finalize(self, output: &Path) -> Result<usize, ConvertError> {
        log::info!(
            "Création de la vidéo à partir de {} frames ASCII...",
            self.count
        );
        self.finalize_with(|w, h, fps| Mp4Muxer::new(output, w, h, fps))
    }
}

fn read_staged(path: &Path) -> Result<RenderedFrame, ConvertError> {
    let img = image::open(path)
        .map_err(|e| ConvertError::codec(&format!("relecture de {}", path.display()), e))?
        .to_luma8();
    let (width, height) = img.dimensions();
    RenderedFrame::from_gray(width, height, img.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records everything it receives.
    #[derive(Default)]
    struct Recorder {
        frames: Vec<RenderedFrame>,
        opened_with: Option<(u32, u32, u32)>,
    }

    struct RecorderSink<'a>(&'a mut Recorder);

    impl FrameSink for RecorderSink<'_> {
        fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), ConvertError> {
            self.0.frames.push(frame.clone());
            Ok(())
        }

        fn finish(self) -> Result<(), ConvertError> {
            Ok(())
        }
    }

    fn numbered(i: u8) -> RenderedFrame {
        let mut frame = RenderedFrame::new(4, 3);
        frame.data[0] = i;
        frame
    }

    fn roundtrip(staging: Staging) {
        let mut assembler = SequenceAssembler::new(24, staging).unwrap();
        for i in 0..5 {
            assembler.push(numbered(i * 10)).unwrap();
        }
        assert_eq!(assembler.len(), 5);

        let mut rec = Recorder::default();
        let rec_ref = &mut rec;
        let written = assembler
            .finalize_with(move |w, h, fps| {
                rec_ref.opened_with = Some((w, h, fps));
                Ok(RecorderSink(rec_ref))
            })
            .unwrap();

        assert_eq!(written, 5);
        assert_eq!(rec.opened_with, Some((4, 3, 24)));
        let firsts: Vec<u8> = rec.frames.iter().map(|f| f.data[0]).collect();
        assert_eq!(firsts, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn memory_staging_keeps_order() {
        roundtrip(Staging::Memory);
    }

    #[test]
    fn disk_staging_keeps_order() {
        roundtrip(Staging::Disk);
    }

    #[test]
    fn empty_sequence_never_opens_sink() {
        let assembler = SequenceAssembler::new(30, Staging::Memory).unwrap();
        let mut opened = false;
        let mut rec = Recorder::default();
        let (opened_ref, rec_ref) = (&mut opened, &mut rec);
        let err = assembler
            .finalize_with(move |_, _, _| {
                *opened_ref = true;
                Ok(RecorderSink(rec_ref))
            })
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptySequence));
        assert!(!opened);
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let mut assembler = SequenceAssembler::new(30, Staging::Memory).unwrap();
        assembler.push(RenderedFrame::new(20, 20)).unwrap();
        let err = assembler.push(RenderedFrame::new(20, 30)).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::DimensionMismatch {
                index: 1,
                width: 20,
                height: 30,
                expected_width: 20,
                expected_height: 20,
            }
        ));
        assert_eq!(assembler.len(), 1);
    }

    #[test]
    fn staging_dir_is_removed_on_drop() {
        let mut assembler = SequenceAssembler::new(30, Staging::Disk).unwrap();
        assembler.push(RenderedFrame::new(8, 8)).unwrap();
        let dir = assembler.staging_dir().unwrap().to_path_buf();
        assert!(dir.join("frame_000000.png").exists());
        drop(assembler);
        assert!(!dir.exists());
    }

    #[test]
    fn staging_dir_is_removed_after_failed_finalize() {
        let mut assembler = SequenceAssembler::new(30, Staging::Disk).unwrap();
        assembler.push(RenderedFrame::new(8, 8)).unwrap();
        let dir = assembler.staging_dir().unwrap().to_path_buf();
        let result = assembler.finalize_with(|_, _, _| {
            Err::<RecorderSink<'static>, _>(ConvertError::Codec("encodeur indisponible".into()))
        });
        assert!(matches!(result, Err(ConvertError::Codec(_))));
        assert!(!dir.exists());
    }

    #[test]
    fn zero_fps_is_invalid_config() {
        assert!(matches!(
            SequenceAssembler::new(0, Staging::Memory),
            Err(ConvertError::InvalidConfig(_))
        ));
    }
}

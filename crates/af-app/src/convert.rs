use std::path::Path;

use af_ascii::luminance;
use af_core::cancel::CancelToken;
use af_core::config::ConvertConfig;
use af_core::error::ConvertError;
use af_core::frame::{FrameBuffer, RenderedFrame};
use af_core::traits::{FrameSink, Source};
use af_export::image_out;
use af_export::muxer::Mp4Muxer;
use af_export::sequence::SequenceAssembler;
use af_source::folder::FolderSource;
use af_source::image::ImageSource;

use crate::pipeline::FramePipeline;

/// Image → image ASCII.
///
/// Nothing is written at `output` unless the whole conversion succeeds.
///
/// # Errors
/// Returns [`ConvertError::InvalidConfig`] for a bad configuration,
/// [`ConvertError::InvalidInput`] for an undecodable input or unsupported
/// output extension, [`ConvertError::Codec`] if the image cannot be written.
pub fn convert_image(input: &Path, output: &Path, config: &ConvertConfig) -> Result<(), ConvertError> {
    let mut pipeline = FramePipeline::new(config)?;
    // Rejeter l'extension avant tout décodage.
    image_out::output_format(output)?;

    let mut source = ImageSource::new(input)?;
    let frame = source
        .next_frame()
        .ok_or_else(|| ConvertError::InvalidInput(format!("{} : aucune image", input.display())))??;
    let rendered = pipeline.render(&frame)?;
    image_out::save_frame(&rendered, output)
}

/// Render every frame of `source` and hand the sequence to the sink built by
/// `open(width, height, fps)`.
///
/// `expected_frames` is only used for progress logs. Returns the number of
/// frames written.
///
/// # Errors
/// Returns [`ConvertError::Cancelled`] once `cancel` is tripped, the first
/// source or stage error otherwise. The sink is opened only after every frame
/// has been rendered, and never for an empty source
/// ([`ConvertError::EmptySequence`]).
pub fn convert_source<S, K, F>(
    source: &mut S,
    config: &ConvertConfig,
    cancel: &CancelToken,
    expected_frames: Option<u64>,
    open: F,
) -> Result<usize, ConvertError>
where
    S: Source,
    K: FrameSink,
    F: FnOnce(u32, u32, u32) -> Result<K, ConvertError>,
{
    let mut pipeline = FramePipeline::new(config)?;
    if let Some(native) = source.native_fps()
        && (native - f64::from(config.fps)).abs() > 0.01
    {
        log::warn!(
            "fps de sortie {} ≠ fps source {native:.3} : la durée de la vidéo changera",
            config.fps
        );
    }

    let assembler = collect_frames(source, config, cancel, expected_frames, |frame| {
        pipeline.render(frame)
    })?;
    finalize(assembler, cancel, open)
}

/// Vidéo → vidéo ASCII (MP4).
///
/// # Errors
/// See [`convert_source`]; the source must be a video ffprobe can read.
#[cfg(feature = "video")]
pub fn convert_video(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
    cancel: &CancelToken,
) -> Result<usize, ConvertError> {
    // Valider avant de lancer le décodeur.
    config.validate()?;
    let mut source = af_source::video::VideoSource::open(input)?;
    let expected = source.info().frame_count;
    convert_source(&mut source, config, cancel, expected, |w, h, fps| {
        Mp4Muxer::new(output, w, h, fps)
    })
}

/// Mux a folder of already-rendered frame images into a video.
///
/// Frames are taken in file-name order and only reduced to grayscale: no
/// resizing, no glyph rendering. All frames must share one size.
///
/// # Errors
/// Returns [`ConvertError::EmptySequence`] for a folder without frames,
/// [`ConvertError::DimensionMismatch`] if a frame differs in size from the
/// first one, and the usual decode/codec errors.
pub fn assemble_folder(
    folder: &Path,
    output: &Path,
    config: &ConvertConfig,
    cancel: &CancelToken,
) -> Result<usize, ConvertError> {
    config.validate()?;
    let mut source = FolderSource::new(folder)?;
    let expected = u64::try_from(source.len()).ok();
    let assembler = collect_frames(&mut source, config, cancel, expected, |frame| {
        let luma = luminance::reduce(frame);
        RenderedFrame::from_gray(luma.width, luma.height, luma.data)
    })?;
    finalize(assembler, cancel, |w, h, fps| Mp4Muxer::new(output, w, h, fps))
}

/// Pull frames from `source` until exhausted, checking `cancel` between frames.
fn collect_frames<S, R>(
    source: &mut S,
    config: &ConvertConfig,
    cancel: &CancelToken,
    expected_frames: Option<u64>,
    mut render: R,
) -> Result<SequenceAssembler, ConvertError>
where
    S: Source,
    R: FnMut(&FrameBuffer) -> Result<RenderedFrame, ConvertError>,
{
    let mut assembler = SequenceAssembler::new(config.fps, config.staging)?;
    let total = expected_frames.map_or_else(|| "?".to_string(), |n| n.to_string());

    loop {
        cancel.check()?;
        let Some(frame) = source.next_frame() else {
            break;
        };
        let rendered = frame
            .and_then(|f| render(&f))
            .map_err(|e| interrupted_or(cancel, e))?;
        assembler.push(rendered)?;
        log::info!("Frame {}/{total}", assembler.len());
    }

    log::info!("{} frames générées", assembler.len());
    Ok(assembler)
}

fn finalize<K, F>(
    assembler: SequenceAssembler,
    cancel: &CancelToken,
    open: F,
) -> Result<usize, ConvertError>
where
    K: FrameSink,
    F: FnOnce(u32, u32, u32) -> Result<K, ConvertError>,
{
    cancel.check()?;
    assembler
        .finalize_with(open)
        .map_err(|e| interrupted_or(cancel, e))
}

/// Ctrl-C atteint aussi les ffmpeg enfants : leur échec est alors une annulation.
fn interrupted_or(cancel: &CancelToken, err: ConvertError) -> ConvertError {
    if cancel.is_cancelled() {
        ConvertError::Cancelled
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use af_core::config::Staging;

    /// Frames fournies depuis un Vec.
    struct VecSource {
        frames: std::vec::IntoIter<Result<FrameBuffer, ConvertError>>,
        fps: Option<f64>,
    }

    impl VecSource {
        fn new(frames: Vec<FrameBuffer>) -> Self {
            Self {
                frames: frames.into_iter().map(Ok).collect::<Vec<_>>().into_iter(),
                fps: None,
            }
        }
    }

    impl Source for VecSource {
        fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>> {
            self.frames.next()
        }

        fn native_size(&self) -> (u32, u32) {
            (2, 2)
        }

        fn native_fps(&self) -> Option<f64> {
            self.fps
        }
    }

    #[derive(Default)]
    struct Recording {
        opened_with: Option<(u32, u32, u32)>,
        frames: Vec<RenderedFrame>,
        finished: bool,
    }

    struct RecordingSink(Rc<RefCell<Recording>>);

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), ConvertError> {
            self.0.borrow_mut().frames.push(frame.clone());
            Ok(())
        }

        fn finish(self) -> Result<(), ConvertError> {
            self.0.borrow_mut().finished = true;
            Ok(())
        }
    }

    fn recorder() -> (
        Rc<RefCell<Recording>>,
        impl FnOnce(u32, u32, u32) -> Result<RecordingSink, ConvertError>,
    ) {
        let rec = Rc::new(RefCell::new(Recording::default()));
        let handle = Rc::clone(&rec);
        let open = move |w, h, fps| {
            handle.borrow_mut().opened_with = Some((w, h, fps));
            Ok(RecordingSink(handle))
        };
        (rec, open)
    }

    fn tiny_config(staging: Staging) -> ConvertConfig {
        let mut config = ConvertConfig::default();
        config.quantization.target_width = 2;
        config.staging = staging;
        config
    }

    fn black() -> FrameBuffer {
        FrameBuffer::filled(2, 2, (0, 0, 0))
    }

    #[test]
    fn five_black_frames_are_written_in_order() {
        for staging in [Staging::Memory, Staging::Disk] {
            let config = tiny_config(staging);
            let expected = crate::pipeline::render(&black(), &config).unwrap();
            let mut source = VecSource::new(vec![black(); 5]);
            let (rec, open) = recorder();

            let written =
                convert_source(&mut source, &config, &CancelToken::new(), Some(5), open).unwrap();

            let rec = rec.borrow();
            assert_eq!(written, 5);
            assert_eq!(rec.opened_with, Some((20, 20, 30)));
            assert_eq!(rec.frames.len(), 5);
            assert!(rec.frames.iter().all(|f| *f == expected));
            assert!(rec.finished);
        }
    }

    #[test]
    fn frames_keep_source_order() {
        let config = tiny_config(Staging::Memory);
        let shades = [0u8, 255, 0, 255];
        let frames = shades.iter().map(|&v| FrameBuffer::filled(2, 2, (v, v, v))).collect();
        let (rec, open) = recorder();
        convert_source(&mut VecSource::new(frames), &config, &CancelToken::new(), None, open)
            .unwrap();

        let blank: Vec<bool> = rec
            .borrow()
            .frames
            .iter()
            .map(|f| f.data.iter().all(|&v| v == 0))
            .collect();
        assert_eq!(blank, vec![false, true, false, true]);
    }

    #[test]
    fn changing_aspect_ratio_aborts() {
        let config = tiny_config(Staging::Memory);
        let mut source = VecSource::new(vec![black(), FrameBuffer::filled(2, 4, (0, 0, 0))]);
        let (rec, open) = recorder();
        let err =
            convert_source(&mut source, &config, &CancelToken::new(), None, open).unwrap_err();
        assert!(matches!(err, ConvertError::DimensionMismatch { index: 1, .. }));
        assert!(rec.borrow().opened_with.is_none());
    }

    #[test]
    fn empty_source_is_empty_sequence() {
        let (rec, open) = recorder();
        let err = convert_source(
            &mut VecSource::new(vec![]),
            &tiny_config(Staging::Memory),
            &CancelToken::new(),
            None,
            open,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::EmptySequence));
        assert!(rec.borrow().opened_with.is_none());
    }

    #[test]
    fn cancelled_conversion_never_opens_sink() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (rec, open) = recorder();
        let err = convert_source(
            &mut VecSource::new(vec![black(); 3]),
            &tiny_config(Staging::Disk),
            &cancel,
            None,
            open,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::Cancelled));
        assert!(rec.borrow().opened_with.is_none());
    }

    #[test]
    fn decode_error_is_propagated() {
        let mut source = VecSource::new(vec![black()]);
        source.frames = vec![
            Ok(black()),
            Err(ConvertError::InvalidInput("frame corrompue".into())),
            Ok(black()),
        ]
        .into_iter();
        let (rec, open) = recorder();
        let err = convert_source(
            &mut source,
            &tiny_config(Staging::Memory),
            &CancelToken::new(),
            None,
            open,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));
        assert!(rec.borrow().frames.is_empty());
    }

    #[test]
    fn fps_mismatch_is_not_an_error() {
        let mut source = VecSource::new(vec![black()]);
        source.fps = Some(24.0);
        let (rec, open) = recorder();
        convert_source(&mut source, &tiny_config(Staging::Memory), &CancelToken::new(), None, open)
            .unwrap();
        assert_eq!(rec.borrow().opened_with, Some((20, 20, 30)));
    }

    #[test]
    fn convert_image_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("out.png");

        convert_image(&input, &output, &tiny_config(Staging::Memory)).unwrap();

        let back = image::open(&output).unwrap().to_luma8();
        assert_eq!(back.dimensions(), (20, 20));
        assert!(back.pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn invalid_bucket_width_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("out.png");
        let mut config = tiny_config(Staging::Memory);
        config.quantization.bucket_width = 0.0;

        let err = convert_image(&input, &output, &config).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_input_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let err = convert_image(&dir.path().join("absent.png"), &output, &ConvertConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));
        assert!(!output.exists());
    }

    #[test]
    fn folder_without_frames_is_empty_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let err =
            assemble_folder(dir.path(), &output, &ConvertConfig::default(), &CancelToken::new())
                .unwrap_err();
        assert!(matches!(err, ConvertError::EmptySequence));
        assert!(!output.exists());
    }

    #[cfg(feature = "video")]
    #[test]
    fn black_frames_survive_a_real_mp4() {
        use af_source::video::{VideoSource, count_frames, ffmpeg_available};

        if !ffmpeg_available() {
            eprintln!("ffmpeg absent : test ignoré");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ascii.mp4");
        let config = tiny_config(Staging::Disk);
        let expected = crate::pipeline::render(&black(), &config).unwrap();

        let written = convert_source(
            &mut VecSource::new(vec![black(); 5]),
            &config,
            &CancelToken::new(),
            Some(5),
            |w, h, fps| Mp4Muxer::new(&output, w, h, fps),
        )
        .unwrap();
        assert_eq!(written, 5);
        assert_eq!(count_frames(&output).unwrap(), 5);

        let mut decoded = VideoSource::open(&output).unwrap();
        assert_eq!(decoded.native_size(), (20, 20));
        let mut n = 0;
        while let Some(frame) = decoded.next_frame() {
            let frame = frame.unwrap();
            for (px, &want) in frame.data.chunks_exact(4).zip(&expected.data) {
                // Encre claire reste claire, fond noir reste noir.
                assert_eq!(px[0] > 127, want > 127);
            }
            n += 1;
        }
        assert_eq!(n, 5);
        assert!(!af_export::muxer::partial_path(&output).exists());
    }
}

use crate::error::ConvertError;
use crate::frame::{FrameBuffer, RenderedFrame};

/// Fournit des frames décodées au pipeline, dans l'ordre de présentation.
///
/// Implémenté par : `ImageSource`, `VideoSource`, `FolderSource`.
///
/// # Example
/// ```
/// use af_core::traits::Source;
/// use af_core::frame::FrameBuffer;
/// use af_core::error::ConvertError;
///
/// struct Once(Option<FrameBuffer>);
/// impl Source for Once {
///     fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>> {
///         self.0.take().map(Ok)
///     }
///     fn native_size(&self) -> (u32, u32) { (1, 1) }
/// }
///
/// let mut src = Once(Some(FrameBuffer::new(1, 1)));
/// assert!(src.next_frame().is_some());
/// assert!(src.next_frame().is_none());
/// ```
pub trait Source {
    /// Retourne la prochaine frame, ou `None` quand la source est épuisée.
    ///
    /// A decode failure is yielded as `Some(Err(_))`; callers abort on it.
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>>;

    /// Dimensions natives de la source (avant resize).
    fn native_size(&self) -> (u32, u32);

    /// Source frame rate, when the container declares one.
    fn native_fps(&self) -> Option<f64> {
        None
    }
}

/// Consomme des frames rendues dans l'ordre, puis finalise le flux.
///
/// `Mp4Muxer` is the production sink; tests record frames instead.
///
/// # Example
/// ```
/// use af_core::traits::FrameSink;
/// use af_core::frame::RenderedFrame;
/// use af_core::error::ConvertError;
///
/// #[derive(Default)]
/// struct Count(usize);
/// impl FrameSink for Count {
///     fn write_frame(&mut self, _frame: &RenderedFrame) -> Result<(), ConvertError> {
///         self.0 += 1;
///         Ok(())
///     }
///     fn finish(self) -> Result<(), ConvertError> { Ok(()) }
/// }
///
/// let mut sink = Count::default();
/// sink.write_frame(&RenderedFrame::new(2, 2)).unwrap();
/// assert_eq!(sink.0, 1);
/// ```
pub trait FrameSink {
    /// Append one frame to the stream.
    ///
    /// # Errors
    /// Returns [`ConvertError::Codec`] if the encoder rejects the frame.
    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), ConvertError>;

    /// Flush and close the stream.
    ///
    /// # Errors
    /// Returns [`ConvertError::Codec`] if the encoder reports a failure.
    fn finish(self) -> Result<(), ConvertError>
    where
        Self: Sized;
}

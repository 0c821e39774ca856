use std::path::Path;

use af_core::error::ConvertError;
use af_core::frame::FrameBuffer;
use af_core::traits::Source;

/// Source d'image statique. Produit une seule frame puis s'épuise.
///
/// # Example
/// ```no_run
/// use af_source::image::ImageSource;
/// use std::path::Path;
/// let source = ImageSource::new(Path::new("test.png")).unwrap();
/// ```
pub struct ImageSource {
    frame: Option<FrameBuffer>,
    size: (u32, u32),
}

impl ImageSource {
    /// Load an image from disk and create a source.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if the image cannot be loaded.
    pub fn new(path: &Path) -> Result<Self, ConvertError> {
        let frame = load_image(path)?;
        Ok(Self {
            size: (frame.width, frame.height),
            frame: Some(frame),
        })
    }
}

impl Source for ImageSource {
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>> {
        self.frame.take().map(Ok)
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Décode une image (PNG, JPEG, BMP, GIF) en RGBA.
///
/// A missing file, an undecodable file and a zero-dimension image are all
/// reported; nothing is skipped silently.
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] naming the path.
///
/// # Example
/// ```no_run
/// use af_source::image::load_image;
/// use std::path::Path;
/// let frame = load_image(Path::new("test.png")).unwrap();
/// ```
pub fn load_image(path: &Path) -> Result<FrameBuffer, ConvertError> {
    let img = image::open(path).map_err(|e| {
        ConvertError::InvalidInput(format!("impossible de charger {} : {e}", path.display()))
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Image chargée : {} ({width}×{height})", path.display());
    FrameBuffer::from_rgba(width, height, rgba.into_raw())
}

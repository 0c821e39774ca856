use std::fs;
use std::path::{Path, PathBuf};

use af_core::error::ConvertError;
use af_core::frame::FrameBuffer;
use af_core::traits::Source;

use crate::image::load_image;

/// Extensions image reconnues.
const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frames stored as image files in one folder, played in file-name order.
///
/// Only the folder itself is scanned (no recursion). Every file is decoded
/// lazily; a file that fails to decode aborts the sequence.
pub struct FolderSource {
    files: Vec<PathBuf>,
    next_idx: usize,
    size: (u32, u32),
}

impl FolderSource {
    /// Scan `folder` for frame images.
    ///
    /// # Errors
    /// Returns [`ConvertError::InvalidInput`] if the folder cannot be read or
    /// its first frame cannot be decoded.
    pub fn new(folder: &Path) -> Result<Self, ConvertError> {
        let files = scan_dir(folder)?;
        let size = match files.first() {
            Some(first) => {
                let fb = load_image(first)?;
                (fb.width, fb.height)
            }
            None => {
                log::warn!("Aucune image de frame dans {}", folder.display());
                (0, 0)
            }
        };
        log::info!("{} frames trouvées dans {}", files.len(), folder.display());
        Ok(Self {
            files,
            next_idx: 0,
            size,
        })
    }

    /// Number of frame files found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` if the folder holds no frame image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Source for FolderSource {
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, ConvertError>> {
        let path = self.files.get(self.next_idx)?;
        self.next_idx += 1;
        Some(load_image(path))
    }

    fn native_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Fichiers image du dossier, triés par nom.
fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ConvertError::InvalidInput(format!("dossier illisible {} : {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ConvertError::InvalidInput(format!("{} : {e}", dir.display())))?
            .path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| IMAGE_EXTS.contains(&ext.to_lowercase().as_str()));
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

use std::io::{BufWriter, Write};
use std::path::Path;

use af_core::error::ConvertError;
use af_core::frame::RenderedFrame;
use image::{ExtendedColorType, ImageFormat};

/// Format de sortie déduit de l'extension (PNG sans extension).
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] for an extension we cannot encode.
pub fn output_format(path: &Path) -> Result<ImageFormat, ConvertError> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Ok(ImageFormat::Png);
    };
    match ext.to_ascii_lowercase().as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "bmp" => Ok(ImageFormat::Bmp),
        other => Err(ConvertError::InvalidInput(format!(
            "format d'image de sortie non supporté : .{other}"
        ))),
    }
}

/// Write `frame` as a grayscale image at `path`.
///
/// The image is encoded next to `path` and renamed into place, so a failed
/// write never leaves a partial file at the destination.
///
/// # Errors
/// Returns [`ConvertError::InvalidInput`] for an unsupported extension and
/// [`ConvertError::Codec`] if encoding or writing fails.
pub fn save_frame(frame: &RenderedFrame, path: &Path) -> Result<(), ConvertError> {
    let format = output_format(path)?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| ConvertError::codec(&format!("fichier temporaire dans {}", parent.display()), e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        image::write_buffer_with_format(
            &mut writer,
            &frame.data,
            frame.width,
            frame.height,
            ExtendedColorType::L8,
            format,
        )
        .map_err(|e| ConvertError::codec("encodage de l'image", e))?;
        writer.flush()?;
    }
    tmp.persist(path)
        .map_err(|e| ConvertError::codec(&format!("écriture de {}", path.display()), e.error))?;

    log::info!(
        "Image ASCII enregistrée : {} ({}×{})",
        path.display(),
        frame.width,
        frame.height
    );
    Ok(())
}

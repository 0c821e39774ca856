/// Decoded visual sources for asciify (image, frames folder, video) and the
/// aspect-preserving downscaler.

pub mod folder;
pub mod image;
pub mod resize;

#[cfg(feature = "video")]
pub mod video;

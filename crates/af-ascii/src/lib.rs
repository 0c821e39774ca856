/// ASCII conversion engine for asciify.
///
/// Reduces pixel frames to luminance, then quantizes luminance to glyph indices.
pub mod luminance;
pub mod quantize;

pub use luminance::{luma, reduce};
pub use quantize::Quantizer;

/// Output side of asciify: glyph rasterization, image persistence, frame
/// sequencing and MP4 muxing.

pub mod image_out;
pub mod muxer;
pub mod rasterizer;
pub mod sequence;

pub use muxer::Mp4Muxer;
pub use rasterizer::{GlyphFace, Rasterizer};
pub use sequence::{AssemblerState, SequenceAssembler};

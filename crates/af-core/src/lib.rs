/// Configuration, types, and shared structures for asciify.
///
/// This crate contains the frame types, the glyph palette, the conversion
/// configuration and the error type shared across the workspace.

pub mod cancel;
pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod process;
pub mod traits;

pub use cancel::CancelToken;
pub use charset::GlyphPalette;
pub use config::{ConvertConfig, QuantizationConfig, Staging};
pub use error::ConvertError;
pub use frame::{FrameBuffer, GlyphGrid, LumaFrame, RenderedFrame};

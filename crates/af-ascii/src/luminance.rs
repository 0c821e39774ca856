use af_core::frame::{FrameBuffer, LumaFrame};
use rayon::prelude::*;

/// Luminance perceptuelle BT.601, virgule fixe arrondie.
///
/// `Y = 0.299 R + 0.587 G + 0.114 B`. Les poids somment à 1000, donc le
/// blanc donne exactement 255 et le noir 0.
///
/// # Example
/// ```
/// use af_ascii::luminance::luma;
/// assert_eq!(luma(0, 0, 0), 0);
/// assert_eq!(luma(255, 255, 255), 255);
/// assert_eq!(luma(255, 0, 0), 76);
/// ```
#[inline(always)]
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}

/// Convert an RGBA frame to one luminance sample per pixel. Alpha is ignored.
///
/// # Example
/// ```
/// use af_core::frame::FrameBuffer;
/// use af_ascii::luminance::reduce;
/// let gray = reduce(&FrameBuffer::filled(3, 2, (255, 255, 255)));
/// assert_eq!((gray.width, gray.height), (3, 2));
/// assert!(gray.data.iter().all(|&v| v == 255));
/// ```
#[must_use]
pub fn reduce(frame: &FrameBuffer) -> LumaFrame {
    let data = frame
        .data
        .par_chunks_exact(4)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    LumaFrame {
        data,
        width: frame.width,
        height: frame.height,
    }
}

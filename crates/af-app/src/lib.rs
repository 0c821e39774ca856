//! asciify : pipeline de conversion image/vidéo → art ASCII.
//!
//! [`pipeline`] turns one decoded frame into a rendered ASCII frame;
//! [`convert`] drives whole conversions (image, video, frames folder).

pub mod convert;
pub mod pipeline;

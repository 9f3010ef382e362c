//! Pixel and audio merging of decoded clip frames.

pub mod blend;
pub mod frame;
pub mod layer;
pub mod viewport;

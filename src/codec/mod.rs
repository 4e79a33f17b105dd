//! Binary codecs: the PNG encoder, the snapshot format and their helpers

pub mod bytes;
pub mod checksum;
pub mod color;
pub mod png;
pub mod snapshot;

pub use color::Rgba;
pub use png::EncodedImage;

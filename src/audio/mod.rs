//! Audio decoding: submitted bytes to mono 16kHz working samples.

pub mod decode;

pub use decode::decode_audio;

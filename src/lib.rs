//! AIFF/AIFC container decoder
//!
//! Parses the FORM header and chunk stream of AIFF and AIFF-C files and
//! exposes the sound data as a seekable [`Clip`](sound::Clip).

pub mod config;
pub mod logging;
pub mod sound;

pub use config::{load_config, DecoderConfig};
pub use logging::{init_logging, LogLevel};
pub use sound::{decode, AiffClip, Clip, DecodeError, DecodeResult, Decoder, FrameInfo};

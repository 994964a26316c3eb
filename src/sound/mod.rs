//! Sound container decoding
//!
//! # Architecture
//!
//! - `Clip` is the contract every decoded region satisfies
//! - `FrameInfo` describes its sample layout
//! - `ieee` converts 80-bit extended sample rates
//! - `aiff` decodes AIFF and AIFF-C containers

pub mod aiff;
pub mod decoder;
pub mod formats;
pub mod ieee;

pub use aiff::{decode, AiffClip, Decoder};
pub use decoder::{Clip, DecodeError, DecodeResult};
pub use formats::FrameInfo;
pub use ieee::ieee_float_to_int;

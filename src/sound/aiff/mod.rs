//! AIFF/AIFC container decoding
//!
//! - `header` validates the FORM envelope
//! - `chunk` reads chunk headers and skips payloads
//! - `comm` parses the COMM chunk
//! - `traversal` reconciles COMM and SSND in either order
//! - `stream` hands other chunks to an external consumer
//! - `clip` exposes the sound data as a [`Clip`](crate::sound::Clip)

pub mod chunk;
pub mod clip;
pub mod comm;
pub mod decoder;
pub mod header;
pub mod stream;
pub mod traversal;

pub use chunk::{ChunkHeader, ChunkId};
pub use clip::{AiffClip, SoundDataHeader};
pub use comm::{CommonChunk, Compression, CompressionType};
pub use decoder::{decode, ChunkSummary, Decoder};
pub use header::{ContainerHeader, FormType};
pub use stream::{chunk_channel, Chunk, ChunkReceiver, ChunkSender};
pub use traversal::SoundDataExtent;

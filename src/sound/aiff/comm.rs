//! COMM chunk parsing
//!
//! The common chunk describes the sample layout: channels, frame count,
//! sample size and the extended-precision sample rate. AIFC files extend it
//! with a compression type and a Pascal-style description string.

use std::fmt;
use std::io::Read;

use super::chunk::{read_array, read_be_u16, read_be_u32, read_u8, skip_bytes, ChunkId};
use super::header::FormType;
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::FrameInfo;
use crate::sound::ieee::ieee_float_to_int;

/// Fixed COMM fields shared by AIFF and AIFC
pub const AIFF_COMM_SIZE: u64 = 18;

/// Compression type for AIFF-C files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Uncompressed big-endian PCM ("NONE")
    None,
    /// Uncompressed little-endian PCM ("sowt")
    Sowt,
    /// 32-bit float ("fl32")
    Float32,
    /// 64-bit float ("fl64")
    Float64,
    /// mu-law ("ulaw")
    ULaw,
    /// A-law ("alaw")
    ALaw,
    /// SDX2 ADPCM ("SDX2")
    Sdx2,
    /// Any other compression code
    Other(ChunkId),
}

impl From<ChunkId> for CompressionType {
    fn from(code: ChunkId) -> Self {
        match &code.0 {
            b"NONE" => CompressionType::None,
            b"sowt" => CompressionType::Sowt,
            b"fl32" | b"FL32" => CompressionType::Float32,
            b"fl64" | b"FL64" => CompressionType::Float64,
            b"ulaw" | b"ULAW" => CompressionType::ULaw,
            b"alaw" | b"ALAW" => CompressionType::ALaw,
            b"SDX2" => CompressionType::Sdx2,
            _ => CompressionType::Other(code),
        }
    }
}

/// AIFC compression information from the extended COMM chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compression {
    /// The 4-byte compression code
    pub code: ChunkId,
    /// Human readable name of the compression scheme
    pub name: String,
}

impl Compression {
    /// Classify the compression code
    pub fn kind(&self) -> CompressionType {
        CompressionType::from(self.code)
    }
}

/// COMM chunk data
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommonChunk {
    pub channels: u16,
    pub sample_frames: u32,
    pub sample_size: u16,
    pub sample_rate: u32,
    /// Only present in AIFC files
    pub compression: Option<Compression>,
}

impl CommonChunk {
    /// Parse a COMM chunk whose header has just been read
    ///
    /// Returns the chunk together with the number of payload bytes the
    /// reader advanced. Trailing bytes inside the declared size are skipped;
    /// a declared size smaller than the fields is tolerated.
    pub fn read<R: Read + ?Sized>(
        reader: &mut R,
        size: u32,
        form_type: FormType,
    ) -> DecodeResult<(Self, u64)> {
        let channels = read_be_u16(reader, "channel count")?;
        let sample_frames = read_be_u32(reader, "sample frame count")?;
        let sample_size = read_be_u16(reader, "sample size")?;
        let rate_bytes: [u8; 10] = read_array(reader, "sample rate")?;
        let sample_rate = ieee_float_to_int(rate_bytes);
        let mut consumed = AIFF_COMM_SIZE;

        let compression = match form_type {
            FormType::Aiff => None,
            FormType::Aifc => {
                let code = ChunkId(read_array(reader, "AIFC compression type")?);
                let len = read_u8(reader, "AIFC compression name length")?;
                let mut name = vec![0u8; len as usize];
                reader
                    .read_exact(&mut name)
                    .map_err(|e| DecodeError::field("AIFC compression name", e))?;
                consumed += 4 + 1 + u64::from(len);
                Some(Compression {
                    code,
                    name: String::from_utf8_lossy(&name).into_owned(),
                })
            }
        };

        let declared = u64::from(size);
        if declared > consumed {
            skip_bytes(reader, declared - consumed)
                .map_err(|e| DecodeError::field("COMM trailing bytes", e))?;
            consumed = declared;
        }

        let comm = CommonChunk {
            channels,
            sample_frames,
            sample_size,
            sample_rate,
            compression,
        };
        log::debug!("COMM: {}", comm);
        Ok((comm, consumed))
    }

    /// Frame-level information for the produced clip
    pub fn frame_info(&self) -> FrameInfo {
        FrameInfo::new(self.channels, self.sample_size, self.sample_rate)
    }

    /// Name of the compression scheme, AIFC only
    pub fn encoding_name(&self) -> Option<&str> {
        self.compression.as_ref().map(|c| c.name.as_str())
    }
}

impl fmt::Display for CommonChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels @ {} / {} bits, {} frames",
            self.channels, self.sample_rate, self.sample_size, self.sample_frames
        )?;
        if let Some(c) = &self.compression {
            write!(f, ", compression {} ({})", c.code, c.name)?;
        }
        Ok(())
    }
}

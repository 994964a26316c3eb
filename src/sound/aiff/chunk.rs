//! Chunk identifiers and the low-level chunk primitives
//!
//! Every AIFF chunk starts with a 4-byte identifier and a big-endian 32-bit
//! payload size. The size excludes the 8-byte header and the pad byte that
//! follows odd-sized payloads.

use std::fmt;
use std::io::{self, Read};

use crate::sound::decoder::{DecodeError, DecodeResult};

/// Size of a chunk header on disk (id + size)
pub const CHUNK_HEADER_SIZE: u64 = 8;

/// A four-character chunk identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    pub const FORM: ChunkId = ChunkId(*b"FORM");
    pub const AIFF: ChunkId = ChunkId(*b"AIFF");
    pub const AIFC: ChunkId = ChunkId(*b"AIFC");
    pub const COMM: ChunkId = ChunkId(*b"COMM");
    pub const SSND: ChunkId = ChunkId(*b"SSND");

    /// Returns the raw identifier bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId(\"{}\")", self)
    }
}

impl From<[u8; 4]> for ChunkId {
    fn from(bytes: [u8; 4]) -> Self {
        ChunkId(bytes)
    }
}

/// Generic chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: ChunkId,
    pub size: u32,
}

impl ChunkHeader {
    /// Bytes the payload occupies in the stream, including the pad byte
    /// when `pad_odd` is set and the size is odd
    pub fn stored_size(&self, pad_odd: bool) -> u64 {
        stored_size(self.size, pad_odd)
    }
}

/// Bytes a payload of `size` occupies, optionally rounded up to even
pub fn stored_size(size: u32, pad_odd: bool) -> u64 {
    let size = u64::from(size);
    if pad_odd && size % 2 != 0 {
        size + 1
    } else {
        size
    }
}

/// Read exactly `N` bytes, naming `field` on failure
pub fn read_array<R: Read + ?Sized, const N: usize>(
    reader: &mut R,
    field: &'static str,
) -> DecodeResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| DecodeError::field(field, e))?;
    Ok(buf)
}

/// Read a single byte
pub fn read_u8<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> DecodeResult<u8> {
    let [b] = read_array::<R, 1>(reader, field)?;
    Ok(b)
}

/// Read a big-endian u16
pub fn read_be_u16<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> DecodeResult<u16> {
    Ok(u16::from_be_bytes(read_array(reader, field)?))
}

/// Read a big-endian u32
pub fn read_be_u32<R: Read + ?Sized>(reader: &mut R, field: &'static str) -> DecodeResult<u32> {
    Ok(u32::from_be_bytes(read_array(reader, field)?))
}

/// Read the next chunk header
///
/// Returns `Ok(None)` when the stream ends on a chunk boundary. A partial
/// header (a stray trailing byte or two) is also treated as the end of the
/// chunk stream.
pub fn read_chunk_header<R: Read + ?Sized>(reader: &mut R) -> DecodeResult<Option<ChunkHeader>> {
    let mut buf = [0u8; CHUNK_HEADER_SIZE as usize];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled == 0 {
        return Ok(None);
    }
    if filled < buf.len() {
        log::warn!(
            "Ignoring {} trailing byte(s) after the last chunk",
            filled
        );
        return Ok(None);
    }

    let id = ChunkId([buf[0], buf[1], buf[2], buf[3]]);
    let size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    Ok(Some(ChunkHeader { id, size }))
}

/// Advance the reader by exactly `count` bytes
///
/// Fails if the stream ends first, since every later chunk would then be
/// misread.
pub fn skip_bytes<R: Read + ?Sized>(reader: &mut R, count: u64) -> io::Result<()> {
    if count == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut reader.take(count), &mut io::sink())?;
    if skipped < count {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended after {} of {} bytes", skipped, count),
        ));
    }
    Ok(())
}

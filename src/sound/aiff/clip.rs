//! The decoded AIFF clip
//!
//! Reads and seeks are confined to the SSND payload. The payload keeps its
//! 8-byte offset/block-size prefix, so `size()` equals the declared SSND
//! size; [`AiffClip::read_sound_data_header`] reads that prefix.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::comm::CommonChunk;
use super::stream::SharedStream;
use super::traversal::SoundDataExtent;
use crate::sound::decoder::{Clip, DecodeError, DecodeResult};
use crate::sound::formats::FrameInfo;

/// Size of the offset/block-size prefix of the SSND payload
pub const AIFF_SSND_SIZE: u64 = 8;

/// SSND chunk prefix
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SoundDataHeader {
    /// Bytes to skip after the prefix before the first sample frame
    pub offset: u32,
    /// Block alignment of the sample data, usually 0
    pub block_size: u32,
}

/// AIFF sound data exposed as a [`Clip`]
pub struct AiffClip<R: Read + Seek> {
    stream: SharedStream<R>,
    extent: SoundDataExtent,
    pos: u64,
    common: CommonChunk,
}

impl<R: Read + Seek> AiffClip<R> {
    pub(crate) fn new(stream: SharedStream<R>, extent: SoundDataExtent, common: CommonChunk) -> Self {
        Self {
            stream,
            extent,
            pos: 0,
            common,
        }
    }

    /// The COMM chunk describing this clip
    pub fn common(&self) -> &CommonChunk {
        &self.common
    }

    /// Where the SSND payload sits in the underlying stream
    pub fn extent(&self) -> SoundDataExtent {
        self.extent
    }

    /// Current position within the clip
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read the SSND offset/block-size prefix
    ///
    /// Leaves the clip positioned right after the prefix.
    pub fn read_sound_data_header(&mut self) -> DecodeResult<SoundDataHeader> {
        self.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; AIFF_SSND_SIZE as usize];
        self.read_exact(&mut buf)
            .map_err(|e| DecodeError::field("SSND offset and block size", e))?;
        Ok(SoundDataHeader {
            offset: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            block_size: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Recover the underlying stream if no chunk consumer still holds it
    pub fn into_inner(self) -> Result<R, Self> {
        let AiffClip {
            stream,
            extent,
            pos,
            common,
        } = self;
        Arc::try_unwrap(stream)
            .map(|m| m.into_inner())
            .map_err(|stream| AiffClip {
                stream,
                extent,
                pos,
                common,
            })
    }
}

impl<R: Read + Seek> Read for AiffClip<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = u64::from(self.extent.size);
        if self.pos >= size || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min((size - self.pos).min(usize::MAX as u64) as usize);

        let mut stream = self.stream.lock();
        // The stream is shared, so make sure nobody moved the cursor.
        let want = self.extent.offset + self.pos;
        if stream.stream_position()? != want {
            stream.seek(SeekFrom::Start(want))?;
        }
        let n = stream.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for AiffClip<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = u64::from(self.extent.size) as i128;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
            SeekFrom::End(d) => size + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        let target = u64::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek position overflow"))?;

        self.stream
            .lock()
            .seek(SeekFrom::Start(self.extent.offset.saturating_add(target)))?;
        self.pos = target;
        Ok(target)
    }
}

impl<R: Read + Seek> Clip for AiffClip<R> {
    fn frame_info(&self) -> FrameInfo {
        self.common.frame_info()
    }

    fn size(&self) -> u64 {
        u64::from(self.extent.size)
    }
}

impl<R: Read + Seek> std::fmt::Debug for AiffClip<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiffClip")
            .field("extent", &self.extent)
            .field("pos", &self.pos)
            .field("common", &self.common)
            .finish()
    }
}

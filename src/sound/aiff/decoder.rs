//! AIFF/AIFC decoder
//!
//! Validates the FORM header, then walks the chunk stream to find the COMM
//! and SSND chunks in whatever order they appear. The result is an
//! [`AiffClip`] positioned over the sound data; no sample bytes are copied.
//!
//! Chunks the decoder does not consume itself can be handed to a consumer
//! thread one at a time:
//!
//! ```no_run
//! use std::fs::File;
//! use aiff_decoder::sound::aiff::{chunk_channel, Decoder};
//!
//! let file = File::open("song.aiff").unwrap();
//! let (tx, rx) = chunk_channel();
//! let consumer = std::thread::spawn(move || {
//!     for mut chunk in rx {
//!         let payload = chunk.read_payload().unwrap();
//!         println!("{}: {} bytes", chunk.id(), payload.len());
//!         chunk.done();
//!     }
//! });
//! let mut decoder = Decoder::new(file).with_chunk_sender(tx);
//! let summary = decoder.read_chunks().unwrap();
//! drop(decoder);
//! consumer.join().unwrap();
//! println!("{:?}", summary.sound_data);
//! ```

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::chunk::ChunkHeader;
use super::clip::AiffClip;
use super::comm::CommonChunk;
use super::header::{ContainerHeader, FormType};
use super::stream::{ChunkSender, SharedStream};
use super::traversal::{
    SoundDataExtent, Traversal, TraversalMode, TraversalOutcome, TraversalState,
};
use crate::config::DecoderConfig;
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::FrameInfo;

/// Result of a full chunk scan
#[derive(Debug, Clone)]
pub struct ChunkSummary {
    /// The validated FORM header
    pub header: ContainerHeader,
    /// The COMM chunk, if the file has one
    pub common: Option<CommonChunk>,
    /// The SSND payload location, if the file has one
    pub sound_data: Option<SoundDataExtent>,
    /// Every chunk header in file order
    pub chunks: Vec<ChunkHeader>,
    /// Number of chunks the consumer took
    pub dispatched: usize,
}

/// AIFF/AIFC decoder
///
/// Each call to [`decode`](Decoder::decode) or
/// [`read_chunks`](Decoder::read_chunks) starts again from the position the
/// stream had when the decoder first touched it.
pub struct Decoder<R: Read + Seek> {
    stream: SharedStream<R>,
    config: DecoderConfig,
    sender: Option<ChunkSender<R>>,
    origin: Option<u64>,
    header: Option<ContainerHeader>,
    common: Option<CommonChunk>,
}

impl<R: Read + Seek> Decoder<R> {
    /// Create a decoder with the default configuration
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    /// Create a decoder with the given configuration
    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            stream: Arc::new(Mutex::new(reader)),
            config,
            sender: None,
            origin: None,
            header: None,
            common: None,
        }
    }

    /// Register a consumer for the chunks the decoder does not use itself
    ///
    /// Use [`chunk_channel`](super::stream::chunk_channel) to create the
    /// channel; the receiving side must run on another thread.
    pub fn with_chunk_sender(mut self, sender: ChunkSender<R>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// The FORM header, once read
    pub fn header(&self) -> Option<&ContainerHeader> {
        self.header.as_ref()
    }

    /// The COMM chunk, once parsed
    pub fn common(&self) -> Option<&CommonChunk> {
        self.common.as_ref()
    }

    /// Sample layout from the COMM chunk, once parsed
    pub fn format(&self) -> Option<FrameInfo> {
        self.common.as_ref().map(CommonChunk::frame_info)
    }

    /// Decode the container and return a clip over the sound data
    pub fn decode(&mut self) -> DecodeResult<AiffClip<R>> {
        let outcome = self.traverse(TraversalMode::Clip)?;

        match (outcome.state, outcome.comm, outcome.sound) {
            (TraversalState::Resolved, Some(common), Some(extent)) => {
                log::debug!(
                    "Sound data at offset {} ({} bytes)",
                    extent.offset,
                    extent.size
                );
                Ok(AiffClip::new(Arc::clone(&self.stream), extent, common))
            }
            (_, None, _) => Err(DecodeError::field(
                "COMM chunk",
                "not found before end of stream",
            )),
            _ => Err(DecodeError::field(
                "SSND chunk",
                "not found before end of stream",
            )),
        }
    }

    /// Walk every chunk, handing the unconsumed ones to the registered
    /// consumer
    pub fn read_chunks(&mut self) -> DecodeResult<ChunkSummary> {
        let outcome = self.traverse(TraversalMode::Scan)?;
        let header = self.header.ok_or(DecodeError::NotInitialized)?;
        Ok(ChunkSummary {
            header,
            common: outcome.comm,
            sound_data: outcome.sound,
            chunks: outcome.chunks,
            dispatched: outcome.dispatched,
        })
    }

    /// Playing time computed from the COMM frame count and sample rate
    pub fn duration(&self) -> DecodeResult<Duration> {
        let common = self.common.as_ref().ok_or(DecodeError::NotInitialized)?;
        if common.sample_rate == 0 {
            return Err(DecodeError::NotInitialized);
        }
        Ok(Duration::from_secs_f64(
            f64::from(common.sample_frames) / f64::from(common.sample_rate),
        ))
    }

    fn traverse(&mut self, mode: TraversalMode) -> DecodeResult<TraversalOutcome> {
        let form_type = self.start_session()?;
        let outcome = Traversal::new(
            &self.stream,
            &self.config,
            &mut self.sender,
            form_type,
            mode,
        )
        .run()?;
        if outcome.comm.is_some() {
            self.common = outcome.comm.clone();
        }
        Ok(outcome)
    }

    /// Seek back to where the first session started and validate the header
    fn start_session(&mut self) -> DecodeResult<FormType> {
        let mut stream = self.stream.lock();
        match self.origin {
            Some(origin) => {
                stream.seek(SeekFrom::Start(origin))?;
            }
            None => self.origin = Some(stream.stream_position()?),
        }
        self.header = None;
        self.common = None;

        let header = ContainerHeader::read(&mut *stream)?;
        self.header = Some(header);
        Ok(header.form_type)
    }
}

impl<R: Read + Seek> fmt::Display for Decoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.header {
            Some(header) => write!(f, "Format: {}", header.form_type)?,
            None => write!(f, "Format: unknown")?,
        }
        let Some(common) = &self.common else {
            return Ok(());
        };
        if let Some(name) = common.encoding_name() {
            write!(f, " - {}", name)?;
        }
        if common.sample_rate != 0 {
            write!(
                f,
                " - {} channels @ {} / {} bits",
                common.channels, common.sample_rate, common.sample_size
            )?;
            if let Ok(duration) = self.duration() {
                write!(f, " - Duration: {:.6} seconds", duration.as_secs_f64())?;
            }
        }
        Ok(())
    }
}

/// Decode an AIFF/AIFC stream with the default configuration
pub fn decode<R: Read + Seek>(reader: R) -> DecodeResult<AiffClip<R>> {
    Decoder::new(reader).decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::decoder::Clip;
    use std::io::Cursor;

    const RATE_22050: [u8; 10] = [0x40, 0x0D, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 != 0 {
            out.push(0);
        }
        out
    }

    fn form(form_type: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = Vec::new();
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(4 + body.len() as u32).to_be_bytes());
        out.extend_from_slice(form_type);
        out.extend(body);
        out
    }

    fn comm(frames: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u16.to_be_bytes());
        payload.extend_from_slice(&frames.to_be_bytes());
        payload.extend_from_slice(&8u16.to_be_bytes());
        payload.extend_from_slice(&RATE_22050);
        chunk(b"COMM", &payload)
    }

    fn ssnd(samples: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; 8];
        payload.extend_from_slice(samples);
        chunk(b"SSND", &payload)
    }

    #[test]
    fn test_decode_sets_metadata() {
        let data = form(b"AIFF", &[comm(441), ssnd(&[5; 441])]);
        let mut decoder = Decoder::new(Cursor::new(data));
        assert_eq!(decoder.format(), None);
        let clip = decoder.decode().unwrap();
        assert_eq!(clip.frame_info(), FrameInfo::new(1, 8, 22050));
        assert_eq!(decoder.format(), Some(clip.frame_info()));
        assert_eq!(clip.size(), 449);
        assert_eq!(decoder.header().unwrap().form_type, FormType::Aiff);
        let duration = decoder.duration().unwrap();
        assert!((duration.as_secs_f64() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_duration_before_decode_is_not_initialized() {
        let decoder = Decoder::new(Cursor::new(Vec::new()));
        assert_eq!(decoder.duration(), Err(DecodeError::NotInitialized));
    }

    #[test]
    fn test_duration_with_zero_rate_is_not_initialized() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u16.to_be_bytes());
        payload.extend_from_slice(&100u32.to_be_bytes());
        payload.extend_from_slice(&8u16.to_be_bytes());
        // Exponent 0x4000 with an all-zero mantissa decodes to 0
        payload.extend_from_slice(&[0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0, 0, 0, 0]);
        let data = form(b"AIFF", &[chunk(b"COMM", &payload), ssnd(&[0; 4])]);
        let mut decoder = Decoder::new(Cursor::new(data));
        decoder.decode().unwrap();
        assert_eq!(decoder.common().unwrap().sample_rate, 0);
        assert_eq!(decoder.duration(), Err(DecodeError::NotInitialized));
    }

    #[test]
    fn test_missing_comm_is_an_error() {
        let data = form(b"AIFF", &[ssnd(&[0; 4])]);
        let err = decode(Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldParse {
                field: "COMM chunk",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_ssnd_is_an_error() {
        let data = form(b"AIFF", &[comm(10)]);
        let err = decode(Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldParse {
                field: "SSND chunk",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_twice_restarts_from_origin() {
        let data = form(b"AIFF", &[comm(4), ssnd(&[1, 2, 3, 4])]);
        let mut decoder = Decoder::new(Cursor::new(data));
        let first = decoder.decode().unwrap().extent();
        let second = decoder.decode().unwrap().extent();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display() {
        let data = form(b"AIFF", &[comm(22050), ssnd(&[0; 2])]);
        let mut decoder = Decoder::new(Cursor::new(data));
        assert_eq!(decoder.to_string(), "Format: unknown");
        decoder.decode().unwrap();
        assert_eq!(
            decoder.to_string(),
            "Format: AIFF - 1 channels @ 22050 / 8 bits - Duration: 1.000000 seconds"
        );
    }

    #[test]
    fn test_display_aifc_includes_encoding_name() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.extend_from_slice(&22050u32.to_be_bytes());
        payload.extend_from_slice(&16u16.to_be_bytes());
        payload.extend_from_slice(&RATE_22050);
        payload.extend_from_slice(b"NONE");
        payload.push(14);
        payload.extend_from_slice(b"not compressed");
        payload.push(0);
        let data = form(b"AIFC", &[chunk(b"COMM", &payload), ssnd(&[0; 4])]);
        let mut decoder = Decoder::new(Cursor::new(data));
        decoder.decode().unwrap();
        assert_eq!(
            decoder.to_string(),
            "Format: AIFC - not compressed - 2 channels @ 22050 / 16 bits - Duration: 1.000000 seconds"
        );
    }
}

//! Chunk traversal
//!
//! Walks the chunk stream after the FORM header. COMM and SSND may appear in
//! either order. When SSND comes first its payload is skipped and every byte
//! the cursor moves afterwards is counted; once COMM has been parsed, one
//! backward seek of that many bytes lands on the SSND payload again.

use std::io::{Read, Seek, SeekFrom};

use super::chunk::{read_chunk_header, skip_bytes, ChunkHeader, ChunkId, CHUNK_HEADER_SIZE};
use super::comm::CommonChunk;
use super::header::FormType;
use super::stream::{hand_off, ChunkSender, Handoff, SharedStream};
use crate::config::DecoderConfig;
use crate::sound::decoder::{DecodeError, DecodeResult};

/// Where the SSND payload lives in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundDataExtent {
    /// Absolute stream position of the first payload byte
    pub offset: u64,
    /// Declared payload size
    pub size: u32,
}

/// Progress of COMM/SSND reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraversalState {
    /// Neither chunk seen yet
    AwaitingBoth,
    /// SSND was skipped; `rewind` bytes have been consumed since its payload
    CommPending { rewind: u64 },
    /// COMM parsed, SSND not reached
    SoundPending,
    /// Both chunks known
    Resolved,
}

/// How far to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraversalMode {
    /// Stop with the cursor on the SSND payload
    Clip,
    /// Visit every chunk up to the end of the stream
    Scan,
}

/// What a traversal found
#[derive(Debug, Clone)]
pub(crate) struct TraversalOutcome {
    pub state: TraversalState,
    pub comm: Option<CommonChunk>,
    pub sound: Option<SoundDataExtent>,
    pub chunks: Vec<ChunkHeader>,
    pub dispatched: usize,
}

/// Per-call traversal state
pub(crate) struct Traversal<'a, R: Read + Seek> {
    stream: &'a SharedStream<R>,
    config: &'a DecoderConfig,
    sender: &'a mut Option<ChunkSender<R>>,
    form_type: FormType,
    mode: TraversalMode,
    state: TraversalState,
    comm: Option<CommonChunk>,
    sound: Option<SoundDataExtent>,
    chunks: Vec<ChunkHeader>,
    dispatched: usize,
}

impl<'a, R: Read + Seek> Traversal<'a, R> {
    pub fn new(
        stream: &'a SharedStream<R>,
        config: &'a DecoderConfig,
        sender: &'a mut Option<ChunkSender<R>>,
        form_type: FormType,
        mode: TraversalMode,
    ) -> Self {
        Self {
            stream,
            config,
            sender,
            form_type,
            mode,
            state: TraversalState::AwaitingBoth,
            comm: None,
            sound: None,
            chunks: Vec::new(),
            dispatched: 0,
        }
    }

    /// Walk chunks until the mode's stopping point or the end of the stream
    pub fn run(mut self) -> DecodeResult<TraversalOutcome> {
        while !(self.mode == TraversalMode::Clip && self.state == TraversalState::Resolved) {
            let header = read_chunk_header(&mut *self.stream.lock())?;
            let Some(header) = header else {
                log::debug!("End of chunk stream in state {:?}", self.state);
                break;
            };
            log::debug!("Chunk '{}' ({} bytes)", header.id, header.size);
            self.chunks.push(header);

            match header.id {
                ChunkId::COMM => self.on_common(header)?,
                ChunkId::SSND => self.on_sound_data(header)?,
                _ => self.on_other(header)?,
            }
        }

        Ok(TraversalOutcome {
            state: self.state,
            comm: self.comm,
            sound: self.sound,
            chunks: self.chunks,
            dispatched: self.dispatched,
        })
    }

    fn on_common(&mut self, header: ChunkHeader) -> DecodeResult<()> {
        let mut stream = self.stream.lock();
        let (comm, consumed) = CommonChunk::read(&mut *stream, header.size, self.form_type)?;
        let pad = self.skip_pad(&mut *stream, header.size, consumed)?;
        if self.comm.is_some() {
            log::warn!("Duplicate COMM chunk; the later one takes effect");
        }
        self.comm = Some(comm);

        self.state = match self.state {
            TraversalState::AwaitingBoth | TraversalState::SoundPending => {
                TraversalState::SoundPending
            }
            TraversalState::CommPending { rewind } => {
                if self.mode == TraversalMode::Clip {
                    let total = rewind + CHUNK_HEADER_SIZE + consumed + pad;
                    let back = i64::try_from(total).map_err(|_| {
                        DecodeError::Io(format!("cannot rewind {} bytes", total))
                    })?;
                    stream.seek(SeekFrom::Current(-back))?;
                    log::debug!("Rewound {} bytes to the SSND payload", total);
                }
                TraversalState::Resolved
            }
            TraversalState::Resolved => TraversalState::Resolved,
        };
        Ok(())
    }

    fn on_sound_data(&mut self, header: ChunkHeader) -> DecodeResult<()> {
        let mut stream = self.stream.lock();
        let stored = header.stored_size(self.config.pad_odd_chunks);

        match self.state {
            TraversalState::AwaitingBoth => {
                let offset = stream.stream_position()?;
                self.sound = Some(SoundDataExtent {
                    offset,
                    size: header.size,
                });
                // Never offered to the consumer: this payload is replayed
                // once COMM turns up.
                skip_bytes(&mut *stream, stored)?;
                log::trace!("Skipped SSND payload ahead of COMM ({} bytes)", stored);
                self.state = TraversalState::CommPending { rewind: stored };
            }
            TraversalState::SoundPending => {
                let offset = stream.stream_position()?;
                self.sound = Some(SoundDataExtent {
                    offset,
                    size: header.size,
                });
                if self.mode == TraversalMode::Scan {
                    skip_bytes(&mut *stream, stored)?;
                }
                self.state = TraversalState::Resolved;
            }
            TraversalState::CommPending { rewind } => {
                log::warn!("Ignoring duplicate SSND chunk");
                skip_bytes(&mut *stream, stored)?;
                self.state = TraversalState::CommPending {
                    rewind: rewind + CHUNK_HEADER_SIZE + stored,
                };
            }
            TraversalState::Resolved => {
                log::warn!("Ignoring duplicate SSND chunk");
                skip_bytes(&mut *stream, stored)?;
            }
        }
        Ok(())
    }

    fn on_other(&mut self, header: ChunkHeader) -> DecodeResult<()> {
        let pad_odd = self.config.pad_odd_chunks;

        match self.sender.as_ref() {
            Some(sender) => {
                let outcome =
                    hand_off(sender, self.stream, header, self.config.handoff_timeout)?;
                if outcome == Handoff::Disconnected {
                    *self.sender = None;
                } else {
                    self.dispatched += 1;
                }
                let mut stream = self.stream.lock();
                self.skip_pad(&mut *stream, header.size, u64::from(header.size))?;
            }
            None => {
                log::trace!("Skipping chunk '{}'", header.id);
                skip_bytes(&mut *self.stream.lock(), header.stored_size(pad_odd))?;
            }
        }

        if let TraversalState::CommPending { rewind } = self.state {
            self.state = TraversalState::CommPending {
                rewind: rewind + CHUNK_HEADER_SIZE + header.stored_size(pad_odd),
            };
        }
        Ok(())
    }

    /// Skip the pad byte after an odd-sized chunk whose payload was read in
    /// full; returns the number of bytes skipped
    fn skip_pad(&self, stream: &mut R, size: u32, consumed: u64) -> DecodeResult<u64> {
        if self.config.pad_odd_chunks && size % 2 != 0 && consumed == u64::from(size) {
            skip_bytes(stream, 1)?;
            return Ok(1);
        }
        Ok(0)
    }
}

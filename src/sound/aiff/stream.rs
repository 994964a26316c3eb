//! Chunk handoff to an external consumer
//!
//! A consumer registers the sending half of a rendezvous channel. For every
//! chunk the traversal does not consume itself, it sends a [`Chunk`] and
//! blocks until the consumer finishes with it. At most one chunk is in
//! flight at a time, and the stream is never read by both sides at once.
//!
//! A `Chunk` is finished either by calling [`Chunk::done`] or by dropping
//! it. Finishing skips whatever part of the payload the consumer left
//! unread, so traversal always resumes at the next chunk header.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use parking_lot::Mutex;

use super::chunk::{skip_bytes, ChunkHeader, ChunkId};
use crate::sound::decoder::{DecodeError, DecodeResult};

/// Stream shared between the traversal and the chunk consumer
pub type SharedStream<R> = Arc<Mutex<R>>;

/// Sending half registered with a decoder
pub type ChunkSender<R> = Sender<Chunk<R>>;

/// Receiving half held by the consumer
pub type ChunkReceiver<R> = Receiver<Chunk<R>>;

/// Create a rendezvous channel for chunk handoff
pub fn chunk_channel<R: Read>() -> (ChunkSender<R>, ChunkReceiver<R>) {
    channel::bounded(0)
}

/// A chunk offered to the consumer
///
/// Reading from the chunk reads its payload from the shared stream and
/// never goes past the declared size.
pub struct Chunk<R: Read> {
    id: ChunkId,
    size: u32,
    remaining: u64,
    stream: SharedStream<R>,
    ack: Option<Sender<Result<(), String>>>,
}

impl<R: Read> Chunk<R> {
    /// Returns the chunk identifier
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Returns the declared payload size
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the number of payload bytes not read yet
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the rest of the payload
    pub fn read_payload(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.remaining.min(1 << 16) as usize);
        self.read_to_end(&mut buf)?;
        if self.remaining > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("chunk '{}' ended {} bytes early", self.id, self.remaining),
            ));
        }
        Ok(buf)
    }

    /// Skip the rest of the payload
    pub fn skip(&mut self) -> io::Result<()> {
        if self.remaining > 0 {
            let mut stream = self.stream.lock();
            skip_bytes(&mut *stream, self.remaining)?;
            self.remaining = 0;
        }
        Ok(())
    }

    /// Signal that the consumer is finished with this chunk
    pub fn done(self) {
        drop(self);
    }

    fn finish(&mut self) {
        if let Some(ack) = self.ack.take() {
            let outcome = self.skip().map_err(|e| e.to_string());
            // The traversal may already have given up waiting.
            let _ = ack.send(outcome);
        }
    }
}

impl<R: Read> Read for Chunk<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.stream.lock().read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl<R: Read> Drop for Chunk<R> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<R: Read> std::fmt::Debug for Chunk<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// Result of offering a chunk to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handoff {
    /// The consumer took the chunk and finished it
    Delivered,
    /// The consumer is gone; the chunk was skipped
    Disconnected,
}

/// Send one chunk and wait for the consumer to finish it
///
/// The caller must not hold the stream lock.
pub(crate) fn hand_off<R: Read>(
    sender: &ChunkSender<R>,
    stream: &SharedStream<R>,
    header: ChunkHeader,
    timeout: Option<Duration>,
) -> DecodeResult<Handoff> {
    let (ack_tx, ack_rx) = channel::bounded(1);
    let chunk = Chunk {
        id: header.id,
        size: header.size,
        remaining: u64::from(header.size),
        stream: Arc::clone(stream),
        ack: Some(ack_tx),
    };

    let timed_out = |waited: Duration| DecodeError::HandoffTimeout {
        id: header.id.to_string(),
        waited_ms: waited.as_millis() as u64,
    };

    let mut outcome = Handoff::Delivered;
    let sent = match timeout {
        Some(t) => sender.send_timeout(chunk, t).map_err(|e| match e {
            SendTimeoutError::Timeout(c) => (Some(t), c),
            SendTimeoutError::Disconnected(c) => (None, c),
        }),
        None => sender.send(chunk).map_err(|e| (None, e.0)),
    };
    if let Err((waited, unsent)) = sent {
        if let Some(t) = waited {
            // Nobody took the chunk; leave the stream untouched.
            let mut unsent = unsent;
            unsent.ack = None;
            return Err(timed_out(t));
        }
        log::warn!(
            "Chunk consumer disconnected; skipping '{}' and later chunks",
            header.id
        );
        // Dropping finishes the chunk, which skips its payload and acks.
        drop(unsent);
        outcome = Handoff::Disconnected;
    }

    let acked = match timeout {
        Some(t) => ack_rx.recv_timeout(t).map_err(|e| match e {
            RecvTimeoutError::Timeout => timed_out(t),
            RecvTimeoutError::Disconnected => {
                DecodeError::Handoff(format!("chunk '{}' was never finished", header.id))
            }
        }),
        None => ack_rx
            .recv()
            .map_err(|_| DecodeError::Handoff(format!("chunk '{}' was never finished", header.id))),
    }?;
    acked.map_err(|e| DecodeError::Handoff(format!("chunk '{}': {}", header.id, e)))?;

    log::trace!("Chunk '{}' handed off ({:?})", header.id, outcome);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::thread;

    fn shared(data: Vec<u8>) -> SharedStream<Cursor<Vec<u8>>> {
        Arc::new(Mutex::new(Cursor::new(data)))
    }

    fn header(id: &[u8; 4], size: u32) -> ChunkHeader {
        ChunkHeader {
            id: ChunkId(*id),
            size,
        }
    }

    #[test]
    fn test_consumer_reads_payload() {
        let stream = shared(b"hello world".to_vec());
        let (tx, rx) = chunk_channel();
        let consumer = thread::spawn(move || {
            let mut chunk = rx.recv().unwrap();
            assert_eq!(chunk.id(), ChunkId(*b"NAME"));
            assert_eq!(chunk.size(), 5);
            let payload = chunk.read_payload().unwrap();
            chunk.done();
            payload
        });

        let outcome = hand_off(&tx, &stream, header(b"NAME", 5), None).unwrap();
        assert_eq!(outcome, Handoff::Delivered);
        assert_eq!(consumer.join().unwrap(), b"hello".to_vec());
        assert_eq!(stream.lock().position(), 5);
    }

    #[test]
    fn test_unread_payload_is_skipped() {
        let stream = shared(vec![7u8; 32]);
        let (tx, rx) = chunk_channel();
        let consumer = thread::spawn(move || {
            let mut chunk = rx.recv().unwrap();
            let mut first = [0u8; 3];
            chunk.read_exact(&mut first).unwrap();
            assert_eq!(chunk.remaining(), 7);
            // dropped without done()
        });

        hand_off(&tx, &stream, header(b"APPL", 10), None).unwrap();
        consumer.join().unwrap();
        assert_eq!(stream.lock().position(), 10);
    }

    #[test]
    fn test_reads_are_bounded_by_chunk_size() {
        let stream = shared(vec![1u8; 32]);
        let (tx, rx) = chunk_channel();
        let consumer = thread::spawn(move || {
            let mut chunk = rx.recv().unwrap();
            let mut buf = [0u8; 16];
            let n = chunk.read(&mut buf).unwrap();
            let eof = chunk.read(&mut buf).unwrap();
            (n, eof)
        });

        hand_off(&tx, &stream, header(b"MARK", 4), None).unwrap();
        assert_eq!(consumer.join().unwrap(), (4, 0));
    }

    #[test]
    fn test_disconnected_consumer_skips_chunk() {
        let stream = shared(vec![0u8; 16]);
        let (tx, rx) = chunk_channel();
        drop(rx);
        let outcome = hand_off(&tx, &stream, header(b"ANNO", 6), None).unwrap();
        assert_eq!(outcome, Handoff::Disconnected);
        assert_eq!(stream.lock().position(), 6);
    }

    #[test]
    fn test_unreceived_chunk_times_out() {
        let stream = shared(vec![0u8; 16]);
        let (tx, _rx) = chunk_channel();
        let err = hand_off(
            &tx,
            &stream,
            header(b"ANNO", 6),
            Some(Duration::from_millis(20)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::HandoffTimeout {
                id: "ANNO".to_string(),
                waited_ms: 20
            }
        );
        assert_eq!(stream.lock().position(), 0);
    }

    #[test]
    fn test_unfinished_chunk_times_out() {
        let stream = shared(vec![0u8; 16]);
        let (tx, rx) = chunk_channel();
        let consumer = thread::spawn(move || {
            let chunk = rx.recv().unwrap();
            thread::sleep(Duration::from_millis(200));
            chunk.done();
        });
        let err = hand_off(
            &tx,
            &stream,
            header(b"COMT", 4),
            Some(Duration::from_millis(20)),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::HandoffTimeout { .. }));
        consumer.join().unwrap();
    }

    #[test]
    fn test_truncated_payload_reports_handoff_error() {
        let stream = shared(vec![0u8; 4]);
        let (tx, rx) = chunk_channel();
        let consumer = thread::spawn(move || {
            let chunk = rx.recv().unwrap();
            chunk.done();
        });
        let err = hand_off(&tx, &stream, header(b"APPL", 10), None).unwrap_err();
        assert!(matches!(err, DecodeError::Handoff(msg) if msg.contains("APPL")));
        consumer.join().unwrap();
    }
}

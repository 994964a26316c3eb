//! Decoder error type and the clip contract
//!
//! Defines the `Clip` trait that every decoded audio region satisfies, and
//! the `DecodeError` taxonomy shared by the container decoders.

use std::io::{Read, Seek};

use super::formats::FrameInfo;

/// Error type for decoder operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The form or format marker does not identify a supported file
    #[error("Unsupported format: {0}")]
    Format(String),

    /// A fixed-layout field could not be read
    #[error("Failed to parse {field}: {reason}")]
    FieldParse { field: &'static str, reason: String },

    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(String),

    /// Format information requested before the COMM chunk was parsed
    #[error("Decoder not initialized")]
    NotInitialized,

    /// The chunk consumer did not acknowledge a handoff in time
    #[error("Chunk consumer did not acknowledge '{id}' within {waited_ms} ms")]
    HandoffTimeout { id: String, waited_ms: u64 },

    /// The chunk consumer failed while finishing a chunk
    #[error("Chunk handoff failed: {0}")]
    Handoff(String),
}

impl DecodeError {
    /// Build a `FieldParse` error from the field name and the failure
    pub fn field(field: &'static str, reason: impl std::fmt::Display) -> Self {
        DecodeError::FieldParse {
            field,
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(err.to_string())
    }
}

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// A readable, seekable region of encoded audio
///
/// Players and transcoders depend only on this contract. `size` reports the
/// total number of bytes in the region, and reads never run past it.
pub trait Clip: Read + Seek {
    /// Returns the frame-level information of the clip
    fn frame_info(&self) -> FrameInfo;

    /// Returns the total number of bytes of the underlying audio data
    fn size(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Format("form marker is 'RIFF', expected 'FORM'".to_string());
        assert_eq!(
            format!("{}", err),
            "Unsupported format: form marker is 'RIFF', expected 'FORM'"
        );

        let err = DecodeError::field("channel count", "unexpected end of file");
        assert_eq!(
            format!("{}", err),
            "Failed to parse channel count: unexpected end of file"
        );

        let err = DecodeError::NotInitialized;
        assert_eq!(format!("{}", err), "Decoder not initialized");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: DecodeError = io.into();
        assert_eq!(err, DecodeError::Io("short read".to_string()));
    }

    #[test]
    fn test_decode_error_is_send() {
        fn assert_send<T: Send + Sync>() {}
        assert_send::<DecodeError>();
    }
}

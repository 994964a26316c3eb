//! FORM container header validation

use std::fmt;
use std::io::Read;

use super::chunk::{read_array, read_be_u32, ChunkId};
use crate::sound::decoder::{DecodeError, DecodeResult};

/// Size of the container header on disk
pub const CONTAINER_HEADER_SIZE: u64 = 12;

/// Form type carried by the FORM header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormType {
    /// Plain uncompressed AIFF
    Aiff,
    /// AIFF-C, whose COMM chunk carries a compression type
    Aifc,
}

impl FormType {
    /// Returns the marker this form type is stored as
    pub fn id(&self) -> ChunkId {
        match self {
            FormType::Aiff => ChunkId::AIFF,
            FormType::Aifc => ChunkId::AIFC,
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Validated container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Always `FORM`
    pub id: ChunkId,
    /// Declared size of the FORM data (form type plus chunks)
    pub size: u32,
    /// AIFF or AIFC
    pub form_type: FormType,
}

impl ContainerHeader {
    /// Read and validate the 12-byte FORM header
    ///
    /// Each marker is checked as soon as it is read, so a stream that is not
    /// a FORM file fails after its first 4 bytes.
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> DecodeResult<Self> {
        let id = ChunkId(read_array(reader, "form marker")?);
        if id != ChunkId::FORM {
            return Err(DecodeError::Format(format!(
                "form marker is '{}', expected 'FORM'",
                id
            )));
        }

        let size = read_be_u32(reader, "form size")?;

        let format = ChunkId(read_array(reader, "format marker")?);
        let form_type = match format {
            ChunkId::AIFF => FormType::Aiff,
            ChunkId::AIFC => FormType::Aifc,
            other => {
                return Err(DecodeError::Format(format!(
                    "format marker is '{}', expected 'AIFF' or 'AIFC'",
                    other
                )))
            }
        };

        log::debug!("FORM header: {} bytes, form type {}", size, form_type);
        Ok(ContainerHeader {
            id,
            size,
            form_type,
        })
    }
}

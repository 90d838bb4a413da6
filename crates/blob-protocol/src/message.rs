use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Largest data payload a single message may carry.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Bytes reserved per message for framing metadata. Chunk payloads are sized
/// `MAX_MESSAGE_SIZE - METADATA_SIZE_PER_MESSAGE`.
pub const METADATA_SIZE_PER_MESSAGE: usize = 5;

/// Largest encoded frame payload accepted by the codec: one full message
/// plus room for the bincode envelope.
pub const MAX_FRAME_SIZE: usize = MAX_MESSAGE_SIZE + 1024;

/// Status codes carried by [`BlobMessage::Error`].
pub mod status {
    /// Every service failure is reported with this coarse code; the message
    /// text carries the detail.
    pub const INTERNAL: u32 = 13;
    /// The server refused the connection because it is at capacity.
    pub const UNAVAILABLE: u32 = 14;
}

/// One frame of a put call. Each frame carries exactly one field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutRequest {
    ReverseIndex(String),
    ContentHash(String),
    DataChunk(Vec<u8>),
}

impl PutRequest {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ReverseIndex(_) => "reverseIndex",
            Self::ContentHash(_) => "contentHash",
            Self::DataChunk(_) => "dataChunk",
        }
    }
}

/// All message types in the blob protocol.
///
/// A put call is `PutOpen`, any number of `Put` frames, then `PutClose`; the
/// server answers `PutAck` or `Error`. A get call is a single `Get`; the
/// server answers with `GetChunk` frames followed by `GetDone`, or `Error`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobMessage {
    PutOpen,
    Put(PutRequest),
    PutClose,
    PutAck,
    Get { reverse_index: String },
    GetChunk { data_chunk: Vec<u8> },
    GetDone,
    Error { code: u32, message: String },
}

impl BlobMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::PutOpen => 1,
            Self::Put(_) => 2,
            Self::PutClose => 3,
            Self::PutAck => 4,
            Self::Get { .. } => 5,
            Self::GetChunk { .. } => 6,
            Self::GetDone => 7,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PutOpen => "PutOpen",
            Self::Put(_) => "Put",
            Self::PutClose => "PutClose",
            Self::PutAck => "PutAck",
            Self::Get { .. } => "Get",
            Self::GetChunk { .. } => "GetChunk",
            Self::GetDone => "GetDone",
            Self::Error { .. } => "Error",
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Error {
            code: status::INTERNAL,
            message: message.into(),
        }
    }
}

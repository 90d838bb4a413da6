//! Wire protocol for the blob service.
//!
//! Defines the framing, message types, and serialization format used between
//! blob clients and the server for the streaming put and get calls, plus a
//! small async [`BlobClient`].

pub mod client;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use client::BlobClient;
pub use codec::{read_frame, write_frame, BlobCodec};
pub use endpoint::{endpoints, HealthResponse, InfoResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    status, BlobMessage, PutRequest, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE,
    METADATA_SIZE_PER_MESSAGE, PROTOCOL_VERSION,
};

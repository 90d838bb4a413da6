use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use blob_database::TableNames;
use blob_protocol::{MAX_MESSAGE_SIZE, METADATA_SIZE_PER_MESSAGE};
use blob_storage::MIN_CHUNK_SIZE;

use crate::error::{ServerError, ServerResult};

/// Server configuration. Every field has a default, so a TOML file only
/// needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address of the streaming RPC listener.
    pub bind_addr: SocketAddr,
    /// Address of the admin HTTP listener.
    pub admin_addr: SocketAddr,
    /// Object store bucket holding blob bytes.
    pub bucket: String,
    pub tables: TableNames,
    /// Buffered bytes that trigger a multipart part flush during a put.
    pub min_chunk_size: usize,
    /// Upper bound on one wire message; get chunks are this minus the
    /// per-message metadata overhead.
    pub max_message_size: usize,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 50051)),
            admin_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 50052)),
            bucket: "commapp-blob".into(),
            tables: TableNames::default(),
            min_chunk_size: MIN_CHUNK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            max_connections: 256,
        }
    }
}

impl ServerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.bucket.is_empty() {
            return Err(ServerError::Config("bucket must not be empty".into()));
        }
        if self.tables.blob.is_empty() || self.tables.reverse_index.is_empty() {
            return Err(ServerError::Config("table names must not be empty".into()));
        }
        if self.min_chunk_size == 0 {
            return Err(ServerError::Config("min_chunk_size must be positive".into()));
        }
        if self.max_message_size <= METADATA_SIZE_PER_MESSAGE
            || self.max_message_size > MAX_MESSAGE_SIZE
        {
            return Err(ServerError::Config(format!(
                "max_message_size must be in ({METADATA_SIZE_PER_MESSAGE}, {MAX_MESSAGE_SIZE}]"
            )));
        }
        if self.max_connections == 0 {
            return Err(ServerError::Config("max_connections must be positive".into()));
        }
        Ok(())
    }

    /// Payload size of each chunk sent by a get call.
    pub fn get_chunk_size(&self) -> usize {
        self.max_message_size - METADATA_SIZE_PER_MESSAGE
    }
}

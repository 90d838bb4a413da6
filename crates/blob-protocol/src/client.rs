use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::codec::{read_frame, write_frame};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{BlobMessage, PutRequest, MAX_MESSAGE_SIZE, METADATA_SIZE_PER_MESSAGE};

/// Async client for the blob service.
///
/// Calls run one at a time over a single connection.
pub struct BlobClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    chunk_size: usize,
}

impl BlobClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> ProtocolResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: BufWriter::new(write),
            chunk_size: MAX_MESSAGE_SIZE - METADATA_SIZE_PER_MESSAGE,
        })
    }

    /// Override the size of the data chunks sent by [`put`](Self::put).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_MESSAGE_SIZE - METADATA_SIZE_PER_MESSAGE);
        self
    }

    /// Upload `data` under `reverse_index`, declaring `content_hash`.
    pub async fn put(
        &mut self,
        reverse_index: &str,
        content_hash: &str,
        data: &[u8],
    ) -> ProtocolResult<()> {
        let mut frames = vec![
            PutRequest::ReverseIndex(reverse_index.to_string()),
            PutRequest::ContentHash(content_hash.to_string()),
        ];
        frames.extend(
            data.chunks(self.chunk_size)
                .map(|chunk| PutRequest::DataChunk(chunk.to_vec())),
        );
        self.put_frames(frames).await
    }

    /// Send an arbitrary sequence of put frames as one call.
    pub async fn put_frames<I>(&mut self, frames: I) -> ProtocolResult<()>
    where
        I: IntoIterator<Item = PutRequest>,
    {
        write_frame(&mut self.writer, &BlobMessage::PutOpen).await?;
        let mut sent = 0usize;
        for frame in frames {
            write_frame(&mut self.writer, &BlobMessage::Put(frame)).await?;
            sent += 1;
        }
        write_frame(&mut self.writer, &BlobMessage::PutClose).await?;
        debug!(frames = sent, "put call sent");

        match self.next_message().await? {
            BlobMessage::PutAck => Ok(()),
            BlobMessage::Error { code, message } => Err(ProtocolError::RemoteError { code, message }),
            other => Err(ProtocolError::UnexpectedMessage {
                expected: "PutAck",
                got: other.type_name(),
            }),
        }
    }

    /// Download the blob referenced by `reverse_index` into memory.
    pub async fn get(&mut self, reverse_index: &str) -> ProtocolResult<Vec<u8>> {
        let mut data = Vec::new();
        self.get_into(reverse_index, &mut data).await?;
        Ok(data)
    }

    /// Stream the blob referenced by `reverse_index` into `out`. Returns the
    /// number of bytes written.
    pub async fn get_into<W>(&mut self, reverse_index: &str, out: &mut W) -> ProtocolResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let request = BlobMessage::Get {
            reverse_index: reverse_index.to_string(),
        };
        write_frame(&mut self.writer, &request).await?;

        let mut total = 0u64;
        loop {
            match self.next_message().await? {
                BlobMessage::GetChunk { data_chunk } => {
                    out.write_all(&data_chunk).await?;
                    total += data_chunk.len() as u64;
                }
                BlobMessage::GetDone => break,
                BlobMessage::Error { code, message } => {
                    return Err(ProtocolError::RemoteError { code, message })
                }
                other => {
                    return Err(ProtocolError::UnexpectedMessage {
                        expected: "GetChunk",
                        got: other.type_name(),
                    })
                }
            }
        }
        out.flush().await?;
        debug!(reverse_index, bytes = total, "get call complete");
        Ok(total)
    }

    async fn next_message(&mut self) -> ProtocolResult<BlobMessage> {
        read_frame(&mut self.reader)
            .await?
            .ok_or(ProtocolError::ConnectionClosed)
    }
}

impl std::fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobClient")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

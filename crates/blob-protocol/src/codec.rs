use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{BlobMessage, MAX_FRAME_SIZE};

/// Codec for encoding/decoding blob protocol messages.
pub struct BlobCodec;

impl BlobCodec {
    /// Encode a message with framing: [4 bytes len][1 byte tag][payload]
    pub fn encode(msg: &BlobMessage) -> ProtocolResult<Vec<u8>> {
        let payload = Self::encode_payload(msg)?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(BlobMessage, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = frame_len([data[0], data[1], data[2], data[3]])?;
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = Self::decode_tagged(data[4], &data[5..total])?;
        Ok((msg, total))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(msg: &BlobMessage) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<BlobMessage> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    fn decode_tagged(tag: u8, payload: &[u8]) -> ProtocolResult<BlobMessage> {
        let msg = Self::decode_payload(payload)?;
        if msg.type_tag() != tag {
            return Err(ProtocolError::InvalidMessageType(tag));
        }
        Ok(msg)
    }
}

/// Validate a frame header and return the length of tag plus payload.
fn frame_len(header: [u8; 4]) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len < 1 {
        return Err(ProtocolError::FramingError("zero-length frame".into()));
    }
    if len - 1 > MAX_FRAME_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len - 1,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(len)
}

/// Read one framed message.
///
/// Returns `Ok(None)` when the peer closed the stream before a new frame
/// started. A stream that ends inside a frame is an I/O error.
pub async fn read_frame<R>(reader: &mut R) -> ProtocolResult<Option<BlobMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = frame_len(header)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    BlobCodec::decode_tagged(body[0], &body[1..]).map(Some)
}

/// Write one framed message and flush the writer.
pub async fn write_frame<W>(writer: &mut W, msg: &BlobMessage) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = BlobCodec::encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

//! Length-prefixed frames for stream transports.
//!
//! Frame layout:
//! - 4 bytes: payload length (u32, big endian)
//! - payload: `bincode` encoding of a [`Message`]

use crate::{TransportError, TransportResult};
use causal_core::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted payload.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Encode a message into a complete frame.
pub fn encode_frame(message: &Message) -> TransportResult<Vec<u8>> {
    let payload = bincode::serialize(message)
        .map_err(|e| TransportError::codec(format!("Failed to serialize message: {e}")))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::codec(format!(
            "Frame of {} bytes exceeds {MAX_FRAME_LEN}",
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write one frame.
pub async fn write_frame<W>(writer: &mut W, message: &Message) -> TransportResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| TransportError::io("frame write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::io("frame flush", e))
}

/// Read one frame; `None` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> TransportResult<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::io("frame length read", e)),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::codec(format!(
            "Incoming frame of {len} bytes exceeds {MAX_FRAME_LEN}"
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| TransportError::io("frame payload read", e))?;

    bincode::deserialize(&payload)
        .map(Some)
        .map_err(|e| TransportError::codec(format!("Failed to deserialize message: {e}")))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed framing: a 4-byte big-endian length prefix followed by
//! a JSON payload. `encode`/`decode` handle the JSON side; `read_message`/
//! `write_message` handle the prefix and the socket I/O.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::query::Query;
use crate::response::Response;

/// A message larger than this is rejected rather than allocated, so a
/// corrupt or hostile length prefix can't be used to exhaust memory.
pub const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to serialize message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("message of {0} bytes exceeds the {1} byte limit")]
    MessageTooLarge(u32, u32),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes `value` to JSON. Returns the raw payload with no length
/// prefix; callers going over a stream should pass the result to
/// [`write_message`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserializes a JSON payload previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Writes `payload` to `writer` preceded by its 4-byte big-endian length.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| ProtocolError::MessageTooLarge(u32::MAX, MAX_MESSAGE_BYTES))?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge(len, MAX_MESSAGE_BYTES));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed payload from `reader`. Returns
/// [`ProtocolError::ConnectionClosed`] if the peer closes before a full
/// length prefix arrives (a clean EOF between messages, not mid-frame).
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtocolError::ConnectionClosed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge(len, MAX_MESSAGE_BYTES));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Reads and decodes one [`Query`] from `reader`.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Query, ProtocolError> {
    let payload = read_message(reader).await?;
    decode(&payload)
}

/// Encodes and writes one [`Response`] to `writer`.
pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<(), ProtocolError> {
    let payload = encode(response)?;
    write_message(writer, &payload).await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;

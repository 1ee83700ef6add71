//! Wire envelope and framing.
//!
//! A single self-describing value (`serde_json::Value`) carries arguments,
//! return values, and failure payloads. Because the envelope's own payload
//! fields are untyped `serde_json::Value`s, the envelope itself is encoded
//! with `serde_json` too — a non-self-describing format such as `bincode`
//! cannot deserialize a `Value`, whose `Deserialize` impl always asks the
//! deserializer for a self-describing `deserialize_any`. The envelope is
//! then length-prefixed on the wire with a 4-byte little-endian header,
//! the same framing shape the teacher uses around its own payload format.
//!
//! Exactly one [`Request`] travels client-to-server and exactly one
//! [`Response`] travels server-to-client per connection; the connection is
//! then closed.

use crate::error::{FailureValue, RmiError};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Largest envelope this runtime will read or write.
pub const MAX_ENVELOPE_SIZE: usize = 16 * 1024 * 1024;

/// A single remote method invocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method_name: String,
    pub parameter_type_names: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
    pub declared_return_type: String,
}

/// The outcome of dispatching a request, carried back to the stub.
///
/// The three wire-level shapes are `"success"`, `"void"` and `"failed"` —
/// a fixed, canonical set of status tags rather than ad hoc strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success { payload: serde_json::Value },
    Void,
    Failed { failure: FailureValue },
}

/// Either shape carried over the connection. Used for pure
/// encode/decode round-trip testing independent of the TCP transport; the
/// transport itself always knows statically which shape it expects to read
/// at a given point in the exchange and reads the concrete type directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    Request(Request),
    Response(Response),
}

/// Serializes a value with `serde_json`, with no I/O performed.
///
/// Non-serializable arguments are a type-system concern in Rust (anything
/// reaching this function already implements `Serialize`), so the only
/// failure mode here is an encoder error, always folded into
/// [`RmiError::Transport`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RmiError> {
    serde_json::to_vec(value).map_err(|e| RmiError::transport(format!("encode failed: {e}")))
}

/// Inverse of [`encode`].
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, RmiError> {
    serde_json::from_slice(bytes).map_err(|e| RmiError::transport(format!("decode failed: {e}")))
}

/// Writes a length-prefixed, `serde_json`-encoded envelope and flushes the
/// stream.
///
/// The write-then-flush-before-read discipline is what lets both endpoints
/// avoid a header-exchange deadlock: the client always finishes writing its
/// [`Request`] before it reads anything, and the server always finishes
/// writing its [`Response`] as its last action on the connection.
pub async fn write_framed<S, T>(stream: &mut S, value: &T) -> Result<()>
where
    S: tokio::io::AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(value)?;
    if bytes.len() > MAX_ENVELOPE_SIZE {
        return Err(anyhow!(
            "envelope too large: {} bytes (max {})",
            bytes.len(),
            MAX_ENVELOPE_SIZE
        ));
    }
    let len = bytes.len() as u32;
    stream.write_all(&len.to_le_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads a length-prefixed, `serde_json`-encoded envelope.
///
/// The server can read a [`Request`] without needing the client to
/// half-close the connection, since the length prefix tells it exactly how
/// many bytes to expect.
pub async fn read_framed<S, T>(stream: &mut S) -> Result<T>
where
    S: tokio::io::AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_ENVELOPE_SIZE {
        return Err(anyhow!(
            "envelope too large: {} bytes (max {})",
            len,
            MAX_ENVELOPE_SIZE
        ));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(serde_json::from_slice(&buf)?)
}

//! Codec trait for the bridge messages exchanged with the extension UI.
//!
//! The binary die protocol lives in [`crate::wire`] and has exactly one
//! encoding. The bridge messages (`{connect}`, `{showDice, ...}`, etc.)
//! are plain serde types, and the [`Codec`] trait decides how they become
//! bytes. The popup speaks JSON, so [`JsonCodec`] is the only codec.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// Codecs are shared across Tokio worker threads, hence the bounds.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use pixelroll_protocol::{BridgeCommand, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let cmd: BridgeCommand = codec
///     .decode(br#"{"action":"disconnectDie","name":"Red D20"}"#)
///     .unwrap();
/// assert_eq!(
///     cmd,
///     BridgeCommand::DisconnectDie { name: "Red D20".into() }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

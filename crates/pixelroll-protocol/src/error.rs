//! Error types for the protocol layer.
//!
//! Each crate in pixelroll defines its own error enum. A `ProtocolError`
//! always means "these bytes (or this string) could not be turned into a
//! typed value", never a Bluetooth or bookkeeping problem.

/// Errors that can occur while decoding notifications or encoding commands.
///
/// None of these are fatal. A notification that fails to decode is logged
/// and dropped; the die that sent it keeps its previous state.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A notification was empty or too short for its message kind.
    ///
    /// `kind` is the first byte of the payload (0 when the payload was
    /// empty), `len` is how many bytes actually arrived.
    #[error("malformed payload: kind {kind} with {len} bytes")]
    MalformedPayload { kind: u8, len: usize },

    /// An identity/info record (kind 2) was shorter than its fixed layout.
    ///
    /// The die stays registered; only its metadata stays unset.
    #[error("malformed info record: expected {expected} bytes, got {len}")]
    MalformedInfo { expected: usize, len: usize },

    /// A face mask string was not 32 binary digits.
    ///
    /// Face masks come from callers (animation presets, user input), so
    /// this is a caller error.
    #[error("invalid face mask {0:?}: expected 32 binary digits")]
    InvalidFaceMask(String),

    /// Serializing a bridge message failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing a bridge message failed.
    ///
    /// Common causes: unknown `action`, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

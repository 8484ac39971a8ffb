//! Unified error type for pixelroll.

use pixelroll_animation::AnimationError;
use pixelroll_die::DieError;
use pixelroll_protocol::ProtocolError;
use pixelroll_roll::RollError;
use pixelroll_transport::TransportError;

use crate::{ChatError, ConfigError};

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum PixelRollError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Die(#[from] DieError),

    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Roll(#[from] RollError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bridge task has stopped.
    #[error("bridge is not running")]
    BridgeUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionFailed {
            name: "Red".into(),
            attempts: 5,
            last: "gone".into(),
        };
        let wrapped: PixelRollError = err.into();
        assert!(matches!(wrapped, PixelRollError::Transport(_)));
        assert!(wrapped.to_string().contains("5 attempts"));
    }

    #[test]
    fn test_from_die_error() {
        let wrapped: PixelRollError =
            DieError::DuplicatePeripheral("Red".into()).into();
        assert!(matches!(wrapped, PixelRollError::Die(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let wrapped: PixelRollError =
            ProtocolError::InvalidFaceMask("101".into()).into();
        assert!(matches!(wrapped, PixelRollError::Protocol(_)));
    }

    #[test]
    fn test_from_chat_error() {
        let wrapped: PixelRollError = ChatError::MissingChatSurface.into();
        assert_eq!(wrapped.to_string(), "chat input or submit control not found");
    }
}

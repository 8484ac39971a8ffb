use uuid::Uuid;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No Bluetooth adapter is present or powered on.
    #[error("no bluetooth adapter available")]
    AdapterUnavailable,

    /// No peripheral advertising the service showed up in time.
    #[error("no device advertising service {service} found")]
    NoDevice { service: Uuid },

    /// The peripheral connected but does not expose the service.
    #[error("service {0} not found on peripheral")]
    ServiceNotFound(Uuid),

    /// A required characteristic is missing from the service.
    #[error("characteristic {0} not found on peripheral")]
    CharacteristicNotFound(Uuid),

    /// The link has no write characteristic (older firmware).
    #[error("link has no write characteristic")]
    WriteUnavailable,

    /// Every connection attempt failed.
    #[error("connection to {name} failed after {attempts} attempts: {last}")]
    ConnectionFailed {
        name: String,
        attempts: u32,
        last: String,
    },

    /// Writing to the die failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The link was already closed.
    #[error("link closed")]
    Closed,

    /// Any other error reported by the Bluetooth stack.
    #[cfg(feature = "ble")]
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
}

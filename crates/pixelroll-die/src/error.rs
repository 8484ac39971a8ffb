//! Error types for the die layer.

/// Errors that can occur while managing the die registry.
#[derive(Debug, thiserror::Error)]
pub enum DieError {
    /// A die with this name is already registered.
    ///
    /// The name is the only identity a die advertises, so a second
    /// peripheral with the same name is treated as the same die.
    #[error("die {0} is already connected")]
    DuplicatePeripheral(String),

    /// No die with this name is registered.
    #[error("no die named {0}")]
    NotFound(String),
}

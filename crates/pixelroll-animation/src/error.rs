//! Error types for the animation layer.

/// Errors returned by [`AnimationController::start`](crate::AnimationController::start).
///
/// Frame send failures are not reported here: the running task logs them
/// and stops.
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    /// Another animation is still running on this die.
    #[error("an animation is already running on this die")]
    Busy,

    /// The die has no write characteristic, so it cannot be lit.
    #[error("die does not accept commands")]
    WriteUnavailable,
}

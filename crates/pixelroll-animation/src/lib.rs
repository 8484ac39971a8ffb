//! Lighting animations for Pixels dice.
//!
//! An [`AnimationJob`] describes what to show (spin, pulse, sparkle,
//! wave, blink) and precomputes its frames as
//! [`LightingCommand`](pixelroll_protocol::LightingCommand)s. The
//! [`AnimationController`] plays one job at a time per die, one frame per
//! [`Ticker`] tick.
//!
//! # Integration
//!
//! ```ignore
//! let controller = AnimationController::new();
//! match controller.start(AnimationJob::spin(0x00FF_0000), Arc::clone(&link)) {
//!     Ok(_handle) => {}
//!     Err(AnimationError::Busy) => { /* already animating, dropped */ }
//!     Err(e) => tracing::warn!(error = %e, "animation not started"),
//! }
//! ```

mod controller;
mod error;
mod job;
mod ticker;

pub use controller::AnimationController;
pub use error::AnimationError;
pub use job::{AnimationJob, AnimationKind, FIELD_SIZE};
pub use ticker::Ticker;

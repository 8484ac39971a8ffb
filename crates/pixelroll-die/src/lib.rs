//! Die state for pixelroll.
//!
//! This crate holds everything the bridge knows about one physical die:
//!
//! 1. **Identity**: [`DieId`], name and formula token ([`derive_token`])
//! 2. **Roll state**: the [`RollTracker`] state machine fed by decoded
//!    roll events and user toggles
//! 3. **Registry**: [`DieRegistry`], every connected die in connection
//!    order
//!
//! # How it fits in the stack
//!
//! ```text
//! Roll layer (above)       ← reads dice, asks for "roll again"
//!     ↕
//! Die layer (this crate)   ← per-die state and registry
//!     ↕
//! Protocol layer (below)   ← RollEvent, DieInfo, BatteryStatus
//! ```

mod die;
mod error;
mod registry;
mod state;

pub use die::{Die, DieId, derive_token};
pub use error::DieError;
pub use registry::DieRegistry;
pub use state::{DieInput, RollState, RollTracker, StateChange};

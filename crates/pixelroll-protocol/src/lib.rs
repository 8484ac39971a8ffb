//! Wire protocols for pixelroll.
//!
//! This crate defines the "language" spoken on both sides of the bridge:
//!
//! - **Die wire** ([`decode_notification`], [`LightingCommand::encode`]):
//!   the binary notifications a Pixels die sends and the lighting
//!   commands it accepts. Pure functions, no state, no I/O.
//! - **Bridge wire** ([`BridgeCommand`], [`BridgeNotice`], [`Codec`]):
//!   the JSON messages exchanged with the extension popup.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (DieMessage) → Die state → Roll aggregation
//! ```

mod codec;
mod error;
mod types;
pub mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BatteryStatus, BridgeCommand, BridgeNotice, DieInfo, DieMessage,
    DieSummary, FaceMask, LightingCommand, RollEvent,
};
pub use wire::{decode_notification, encode_identify_request};

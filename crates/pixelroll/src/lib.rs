//! # Pixelroll
//!
//! Bridges Pixels smart dice to a tabletop chat.
//!
//! The [`Bridge`] connects dice over Bluetooth LE, decodes their roll
//! events, waits until every die the active formula cares about has
//! settled, and posts the formatted result to a [`ChatSink`]. The layers
//! underneath are separate crates and re-exported here:
//!
//! | crate                  | owns                                         |
//! |------------------------|----------------------------------------------|
//! | `pixelroll-protocol`   | die wire codec, bridge messages, JSON codec  |
//! | `pixelroll-transport`  | scanner/link traits, retry, btleplug backend |
//! | `pixelroll-die`        | die record, roll state machine, registry     |
//! | `pixelroll-animation`  | lighting animations                          |
//! | `pixelroll-roll`       | rollset, aggregation, message formatting     |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixelroll::prelude::*;
//! use pixelroll::transport::memory::{MemoryDie, MemoryScanner};
//!
//! # async fn demo() -> Result<(), PixelRollError> {
//! let scanner = MemoryScanner::new();
//! scanner.push(MemoryDie::new("Red D20"));
//!
//! let (chat, mut posts) = ChannelChat::new();
//! let (notices, _ui) = tokio::sync::mpsc::unbounded_channel();
//! let bridge = Bridge::spawn(BridgeConfig::default(), scanner, chat, notices);
//!
//! bridge.connect(None).await?;
//! bridge.set_enabled("Red D20", true).await?;
//! // ... roll the die ...
//! let message = posts.recv().await;
//! # Ok(())
//! # }
//! ```

mod bridge;
mod chat;
mod config;
mod error;

pub use bridge::{Bridge, BridgeHandle, BridgeSnapshot, DieSnapshot};
pub use chat::{ChannelChat, ChatError, ChatSink, ChatSurface, TextboxChat};
pub use config::{BridgeConfig, ConfigError};
pub use error::PixelRollError;

pub use pixelroll_animation as animation;
pub use pixelroll_die as die;
pub use pixelroll_protocol as protocol;
pub use pixelroll_roll as roll;
pub use pixelroll_transport as transport;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "pixelroll=info";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Meant for binaries; libraries never call it. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        Bridge, BridgeConfig, BridgeHandle, BridgeSnapshot, ChannelChat,
        ChatError, ChatSink, DieSnapshot, PixelRollError,
    };
    pub use pixelroll_die::RollState;
    pub use pixelroll_protocol::{BridgeCommand, BridgeNotice, DieSummary};
    pub use pixelroll_roll::{FormulaEntry, FormulaLibrary, RollSettings};
}

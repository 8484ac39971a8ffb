//! Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pixelroll_protocol::{FaceMask, ProtocolError};
use pixelroll_roll::RollSettings;
use pixelroll_transport::{GattIds, RetryPolicy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors loading a [`BridgeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for a config.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// `farewell_faces` is not a 32-digit binary mask.
    #[error("invalid farewell_faces: {0}")]
    FaceMask(#[from] ProtocolError),
}

/// Everything the bridge can be tuned with.
///
/// Every field has a default, so a config file only needs the fields it
/// changes. Durations are stored in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Service advertised by the dice.
    pub service_uuid: Uuid,
    /// Characteristic the dice notify on.
    pub notify_uuid: Uuid,
    /// Characteristic commands are written to.
    pub write_uuid: Uuid,

    /// Connection attempts per die, including the first.
    pub connect_attempts: u32,
    /// Pause between connection attempts.
    pub retry_backoff_ms: u64,
    /// How long a disconnecting die keeps its link so the farewell
    /// animation can play.
    pub disconnect_grace_ms: u64,
    /// How long to scan before giving up on a connect.
    pub scan_timeout_ms: u64,

    /// Whether a freshly connected die joins rolls right away.
    pub enable_on_connect: bool,
    /// Whether to spin a freshly connected die.
    pub connect_animation: bool,
    /// Faces lit by the farewell blink, as 32 binary digits, most
    /// significant face first. Spaces are allowed.
    pub farewell_faces: String,
    /// How many times the die repeats the farewell blink.
    pub farewell_loops: u8,

    /// Capacity of the bridge's command channel.
    pub command_channel_size: usize,

    /// Formula and modes in effect at startup.
    pub roll: RollSettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let ids = GattIds::PIXELS;
        let retry = RetryPolicy::default();
        Self {
            service_uuid: ids.service,
            notify_uuid: ids.notify,
            write_uuid: ids.write,
            connect_attempts: retry.attempts,
            retry_backoff_ms: duration_ms(retry.backoff),
            disconnect_grace_ms: 5_000,
            scan_timeout_ms: 10_000,
            enable_on_connect: false,
            connect_animation: true,
            farewell_faces: FaceMask::ALL.to_string(),
            farewell_loops: 1,
            command_channel_size: 64,
            roll: RollSettings::default(),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl BridgeConfig {
    /// Parses a config from JSON text.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::FaceMask`] for a bad `farewell_faces`.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.farewell_mask()?;
        Ok(config)
    }

    /// Loads a config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::from_json_str(&text)
    }

    pub fn gatt_ids(&self) -> GattIds {
        GattIds {
            service: self.service_uuid,
            notify: self.notify_uuid,
            write: self.write_uuid,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// # Errors
    /// Returns [`ProtocolError::InvalidFaceMask`] if `farewell_faces` is
    /// not a valid mask.
    pub fn farewell_mask(&self) -> Result<FaceMask, ProtocolError> {
        FaceMask::parse(&self.farewell_faces)
    }
}

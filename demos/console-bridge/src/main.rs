//! Console front end for the bridge.
//!
//! Reads one JSON command per line on stdin, for example
//!
//! ```text
//! {"action":"connect"}
//! {"action":"updateDieStatus","name":"Red D20","status":"ready"}
//! {"action":"setFormula","formula":"Attack: #face_value","sumRolls":true}
//! ```
//!
//! and prints chat posts and UI notices on stdout. Set `PIXELROLL_CONFIG`
//! or pass a path to load a config file; logging follows `RUST_LOG`.

use std::path::PathBuf;

use pixelroll::prelude::*;
use pixelroll_protocol::{Codec, JsonCodec};
use pixelroll_transport::BleScanner;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Prints roll messages instead of posting them to a web chat.
struct StdoutChat;

impl ChatSink for StdoutChat {
    fn post(&mut self, text: &str) -> Result<(), ChatError> {
        println!("chat> {text}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn load_config() -> Result<BridgeConfig, PixelRollError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIXELROLL_CONFIG").ok())
        .map(PathBuf::from);

    match path {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "loading config");
            Ok(BridgeConfig::from_json_file(&path)?)
        }
        Some(path) => {
            warn!(path = %path.display(), "config not found, using defaults");
            Ok(BridgeConfig::default())
        }
        None => Ok(BridgeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), PixelRollError> {
    pixelroll::init_tracing();

    let config = load_config()?;
    let scanner = BleScanner::new(config.gatt_ids(), config.scan_timeout()).await?;

    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let bridge = Bridge::spawn(config, scanner, StdoutChat, notice_tx);
    let codec = JsonCodec;

    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match codec.encode(&notice) {
                Ok(bytes) => println!("ui> {}", String::from_utf8_lossy(&bytes)),
                Err(e) => warn!(error = %e, "notice not encoded"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match codec.decode::<BridgeCommand>(line.as_bytes()) {
            Ok(command) => bridge.send(command).await?,
            Err(e) => warn!(error = %e, "ignoring line"),
        }
    }

    info!("shutting down");
    bridge.shutdown().await
}

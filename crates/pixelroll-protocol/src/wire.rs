//! Binary layout of the Pixels die protocol.
//!
//! Every notification starts with a one-byte message kind. Multi-byte
//! integers are little-endian.
//!
//! ```text
//! kind 2  identity/info (22 bytes)
//!   [0] kind  [1] led count  [2] design/color  [3] reserved
//!   [4..8] data-set hash  [8..12] pixel id  [12..14] free flash
//!   [14..18] build timestamp  [18] roll state  [19] face (0-based)
//!   [20] battery %  [21] charging flag
//!
//! kind 3  roll-state event (3 bytes)
//!   [0] kind  [1] event id  [2] face (0-based)
//!
//! kind 34 battery update (3 bytes)
//!   [0] kind  [1] battery %  [2] charging flag
//!
//! opcode 29 lighting command (15 bytes, host → die)
//!   [0] opcode  [1] blink count  [2..4] duration ms  [4..8] ARGB color
//!   [8..12] face mask  [12] fade  [13] loop count  [14] reserved
//! ```

use crate::{
    BatteryStatus, DieInfo, DieMessage, FaceMask, LightingCommand,
    ProtocolError, RollEvent,
};

/// "Who are you" request, host → die. The die answers with an info record.
pub const KIND_WHO_ARE_YOU: u8 = 1;
/// Identity/info record, die → host.
pub const KIND_INFO: u8 = 2;
/// Roll-state event, die → host.
pub const KIND_ROLL_STATE: u8 = 3;
/// Battery update, die → host.
pub const KIND_BATTERY: u8 = 34;
/// Lighting command opcode, host → die.
pub const OPCODE_LIGHTING: u8 = 29;

/// Size of a kind-2 info record.
pub const INFO_LEN: usize = 22;
/// Size of an encoded lighting command.
pub const LIGHTING_LEN: usize = 15;

const EVENT_SETTLED: u8 = 1;
const EVENT_MOVING: u8 = 3;
const EVENT_FORCED: u8 = 5;

/// Decodes one raw notification.
///
/// Returns `Ok(None)` for anything the bridge deliberately ignores:
/// unknown message kinds (newer firmware may send more) and roll-state
/// events with an event id other than 1, 3 or 5.
///
/// # Errors
/// - [`ProtocolError::MalformedPayload`] for an empty payload or a
///   roll-state/battery message that is too short.
/// - [`ProtocolError::MalformedInfo`] for a short info record.
pub fn decode_notification(
    data: &[u8],
) -> Result<Option<DieMessage>, ProtocolError> {
    let Some(&kind) = data.first() else {
        return Err(ProtocolError::MalformedPayload { kind: 0, len: 0 });
    };

    match kind {
        KIND_INFO => decode_info(data).map(|info| Some(DieMessage::Info(info))),
        KIND_ROLL_STATE => {
            let &[_, event_id, face, ..] = data else {
                return Err(ProtocolError::MalformedPayload {
                    kind,
                    len: data.len(),
                });
            };
            Ok(decode_roll_event(event_id, face).map(DieMessage::Roll))
        }
        KIND_BATTERY => {
            let &[_, level, charging, ..] = data else {
                return Err(ProtocolError::MalformedPayload {
                    kind,
                    len: data.len(),
                });
            };
            Ok(Some(DieMessage::Battery(BatteryStatus {
                level,
                charging: charging != 0,
            })))
        }
        _ => Ok(None),
    }
}

fn decode_roll_event(event_id: u8, face: u8) -> Option<RollEvent> {
    let face = face.saturating_add(1);
    match event_id {
        EVENT_SETTLED => Some(RollEvent::Settled { face }),
        EVENT_MOVING => Some(RollEvent::Moving { face }),
        EVENT_FORCED => Some(RollEvent::Forced { face }),
        _ => None,
    }
}

fn decode_info(data: &[u8]) -> Result<DieInfo, ProtocolError> {
    if data.len() < INFO_LEN {
        return Err(ProtocolError::MalformedInfo {
            expected: INFO_LEN,
            len: data.len(),
        });
    }

    let u16_at = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
    let u32_at = |i: usize| {
        u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
    };

    Ok(DieInfo {
        led_count: data[1],
        design_color: data[2],
        data_set_hash: u32_at(4),
        pixel_id: u32_at(8),
        available_flash: u16_at(12),
        build_timestamp: u32_at(14),
        roll_state: data[18],
        face: data[19].saturating_add(1),
        battery: BatteryStatus {
            level: data[20],
            charging: data[21] != 0,
        },
    })
}

/// Encodes the one-byte "who are you" request.
pub fn encode_identify_request() -> [u8; 1] {
    [KIND_WHO_ARE_YOU]
}

impl LightingCommand {
    /// Encodes the command into its fixed 15-byte wire form.
    pub fn encode(&self) -> [u8; LIGHTING_LEN] {
        let mut out = [0u8; LIGHTING_LEN];
        out[0] = OPCODE_LIGHTING;
        out[1] = self.blink_count;
        out[2..4].copy_from_slice(&self.duration_ms.to_le_bytes());
        out[4..8].copy_from_slice(&self.color.to_le_bytes());
        out[8..12].copy_from_slice(&self.faces.0.to_le_bytes());
        out[12] = self.fade;
        out[13] = self.loop_count;
        out
    }
}

impl FaceMask {
    /// Parses a 32-character binary string, most significant face first.
    ///
    /// Whitespace anywhere in the string is stripped first, so masks can
    /// be written in readable groups (`"0000 0000 ... 0001"`).
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidFaceMask`] unless exactly 32
    /// `0`/`1` characters remain.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let digits: String =
            text.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() != 32 || !digits.chars().all(|c| c == '0' || c == '1')
        {
            return Err(ProtocolError::InvalidFaceMask(text.to_string()));
        }
        u32::from_str_radix(&digits, 2)
            .map(FaceMask)
            .map_err(|_| ProtocolError::InvalidFaceMask(text.to_string()))
    }
}

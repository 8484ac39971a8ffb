//! Typed values carried by both protocols pixelroll speaks.
//!
//! Two very different "wires" meet in this crate:
//!
//! 1. **The die wire.** Binary notifications coming out of a Pixels die
//!    and lighting commands going back in. Their layouts are fixed by the
//!    die firmware, so the types here are plain Rust values and the byte
//!    layout is handled by [`crate::wire`].
//! 2. **The bridge wire.** JSON messages exchanged with the extension
//!    popup (`{connect}`, `{showDice, dice}` ...). These derive serde and
//!    their shape is controlled by the attributes below.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Die → host: decoded notifications
// ---------------------------------------------------------------------------

/// A roll-state event reported by a die (wire kind 3).
///
/// Faces here are already 1-based. The wire carries 0-based face
/// indices and [`crate::decode_notification`] converts them, so nothing
/// above the codec ever sees a 0-based face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollEvent {
    /// The die stopped moving and `face` is final (event id 1).
    Settled { face: u8 },

    /// The die started moving (event id 3).
    ///
    /// Dice repeat this event while they tumble. Edge detection
    /// ("only the first one counts") is the state machine's job, not
    /// the codec's.
    Moving { face: u8 },

    /// The die stopped but could not determine which face is up
    /// (event id 5), e.g. it landed crooked against something.
    Forced { face: u8 },
}

/// Battery level and charging flag (wire kind 34, also embedded in the
/// info record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level in percent (0–100 on healthy firmware).
    pub level: u8,
    /// `true` when the die sits on its charger.
    pub charging: bool,
}

/// The identity/info record a die sends after a "who are you" request
/// (wire kind 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieInfo {
    /// Number of LEDs on the die (20 for a d20).
    pub led_count: u8,
    /// Design and color code assigned at the factory.
    pub design_color: u8,
    /// Hash of the animation data set currently flashed on the die.
    pub data_set_hash: u32,
    /// Factory-unique identifier.
    pub pixel_id: u32,
    /// Free flash memory in bytes.
    pub available_flash: u16,
    /// Firmware build timestamp, Unix seconds.
    pub build_timestamp: u32,
    /// Raw roll-state code at the time of the report.
    pub roll_state: u8,
    /// Face currently up, 1-based.
    pub face: u8,
    /// Battery state at the time of the report.
    pub battery: BatteryStatus,
}

/// Every notification the codec understands.
///
/// Unknown message kinds never produce a value (see
/// [`crate::decode_notification`]), so this enum only lists what the
/// rest of the system actually reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieMessage {
    /// Identity/info record (kind 2).
    Info(DieInfo),
    /// Roll-state event (kind 3).
    Roll(RollEvent),
    /// Battery update (kind 34).
    Battery(BatteryStatus),
}

// ---------------------------------------------------------------------------
// Host → die: lighting commands
// ---------------------------------------------------------------------------

/// A 32-bit face mask: bit `N` set means face `N + 1` lights up.
///
/// Newtype over `u32` so a mask can't be confused with a color, which is
/// also a `u32` in the lighting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceMask(pub u32);

impl FaceMask {
    /// Every face lit.
    pub const ALL: FaceMask = FaceMask(u32::MAX);

    /// No face lit.
    pub const NONE: FaceMask = FaceMask(0);

    /// Mask with a single bit set for the given 0-based LED position.
    ///
    /// Positions past 31 are ignored (the mask has 32 slots).
    pub fn position(index: u32) -> Self {
        if index < 32 { FaceMask(1 << index) } else { FaceMask::NONE }
    }

    /// Union of two masks.
    pub fn with(self, other: FaceMask) -> Self {
        FaceMask(self.0 | other.0)
    }

    /// Faces lit in both masks.
    pub fn intersect(self, other: FaceMask) -> Self {
        FaceMask(self.0 & other.0)
    }

    /// Number of lit faces.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Display for FaceMask {
    /// Formats the mask the same way it is parsed: 32 binary digits,
    /// most significant face first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032b}", self.0)
    }
}

/// One lighting command (opcode 29 on the wire).
///
/// Colors are ARGB; the die ignores the alpha byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightingCommand {
    /// How many times to blink within `duration_ms`.
    pub blink_count: u8,
    /// Total duration of the effect on the die, in milliseconds.
    pub duration_ms: u16,
    /// ARGB color.
    pub color: u32,
    /// Which faces light up.
    pub faces: FaceMask,
    /// Fade amount, 0 (hard edges) to 255 (full fade in/out).
    pub fade: u8,
    /// How many times the die repeats the whole effect on its own.
    pub loop_count: u8,
}

impl Default for LightingCommand {
    fn default() -> Self {
        Self {
            blink_count: 1,
            duration_ms: 1000,
            color: 0xFFFF_FFFF,
            faces: FaceMask::ALL,
            fade: 0,
            loop_count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Bridge wire: extension popup ↔ bridge
// ---------------------------------------------------------------------------

/// Commands sent by the extension popup to the bridge.
///
/// `#[serde(tag = "action")]` produces the same shape the popup already
/// sends: `{ "action": "disconnectDie", "name": "Red D20" }`.
/// `rename_all_fields` camel-cases the field names so
/// `adv_disadvantage` travels as `advDisadvantage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum BridgeCommand {
    /// Pick a die advertising the Pixels service and connect to it.
    ///
    /// `name` optionally narrows the pick to one advertised name.
    Connect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Gracefully disconnect one die.
    DisconnectDie { name: String },

    /// Gracefully disconnect every die.
    DisconnectAll,

    /// Ask for a fresh `showDice` + `updateDiceData` broadcast.
    GetStatus,

    /// Activate a formula together with its roll modes.
    SetFormula {
        formula: String,
        #[serde(default)]
        adv_disadvantage: bool,
        #[serde(default)]
        sum_rolls: bool,
    },

    /// Change the roll modes without touching the formula.
    SetChecked {
        #[serde(default)]
        adv_disadvantage: bool,
        #[serde(default)]
        sum_rolls: bool,
    },

    /// Include or exclude a die (the popup's checkbox).
    /// `status == "disabled"` excludes, anything else includes.
    UpdateDieStatus { name: String, status: String },
}

/// One row of the popup's dice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieSummary {
    pub name: String,
    pub token: String,
    pub status: String,
}

/// Notifications sent by the bridge to the extension popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum BridgeNotice {
    /// The full list of connected dice, in connection order.
    ShowDice { dice: Vec<DieSummary> },

    /// One die's face and status changed.
    ///
    /// `face_value` is `null` when there is nothing to show; the popup
    /// renders that as "N/A".
    UpdateDiceData {
        dice_name: String,
        face_value: Option<u8>,
        status: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_mask_display_is_32_binary_digits() {
        let mask = FaceMask::position(0).with(FaceMask::position(19));
        let text = mask.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text, "00000000000010000000000000000001");
    }

    #[test]
    fn test_face_mask_position_out_of_range_is_empty() {
        assert_eq!(FaceMask::position(32), FaceMask::NONE);
        assert_eq!(FaceMask::position(31).count(), 1);
    }

    #[test]
    fn test_face_mask_intersect_keeps_shared_faces() {
        let a = FaceMask(0b0110);
        assert_eq!(a.intersect(FaceMask(0b0011)), FaceMask(0b0010));
        assert_eq!(FaceMask::ALL.intersect(a), a);
    }

    #[test]
    fn test_bridge_command_set_formula_uses_camel_case_fields() {
        let json = r##"{
            "action": "setFormula",
            "formula": "Attack: #face_value",
            "advDisadvantage": true,
            "sumRolls": false
        }"##;
        let cmd: BridgeCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            BridgeCommand::SetFormula {
                formula: "Attack: #face_value".into(),
                adv_disadvantage: true,
                sum_rolls: false,
            }
        );
    }

    #[test]
    fn test_bridge_command_connect_without_name() {
        let cmd: BridgeCommand =
            serde_json::from_str(r#"{"action":"connect"}"#).unwrap();
        assert_eq!(cmd, BridgeCommand::Connect { name: None });
    }

    #[test]
    fn test_bridge_command_set_checked_defaults_missing_flags() {
        let cmd: BridgeCommand =
            serde_json::from_str(r#"{"action":"setChecked","sumRolls":true}"#)
                .unwrap();
        assert_eq!(
            cmd,
            BridgeCommand::SetChecked {
                adv_disadvantage: false,
                sum_rolls: true,
            }
        );
    }

    #[test]
    fn test_bridge_command_unknown_action_is_error() {
        let result: Result<BridgeCommand, _> =
            serde_json::from_str(r#"{"action":"flyToMoon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_dice_data_json_shape() {
        let notice = BridgeNotice::UpdateDiceData {
            dice_name: "Blue".into(),
            face_value: Some(17),
            status: "rolled".into(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["action"], "updateDiceData");
        assert_eq!(json["diceName"], "Blue");
        assert_eq!(json["faceValue"], 17);
        assert_eq!(json["status"], "rolled");
    }

    #[test]
    fn test_update_dice_data_without_face_is_null() {
        let notice = BridgeNotice::UpdateDiceData {
            dice_name: "Blue".into(),
            face_value: None,
            status: "disabled".into(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert!(json["faceValue"].is_null());
    }
}

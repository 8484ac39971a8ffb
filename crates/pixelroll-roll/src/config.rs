//! Roll settings.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_FORMULA;

/// The active formula and roll modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollSettings {
    /// Message template. Blank means [`DEFAULT_FORMULA`].
    pub formula: String,

    /// Two-pass advantage/disadvantage rolling.
    pub advantage: bool,

    /// Substitute the sum of the faces instead of the list.
    pub sum: bool,
}

impl Default for RollSettings {
    fn default() -> Self {
        Self {
            formula: DEFAULT_FORMULA.to_owned(),
            advantage: false,
            sum: false,
        }
    }
}

impl RollSettings {
    /// The formula actually used for rolls.
    pub fn active_formula(&self) -> &str {
        if self.formula.trim().is_empty() {
            DEFAULT_FORMULA
        } else {
            &self.formula
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_settings_blank_formula_falls_back_to_default() {
        let settings = RollSettings {
            formula: "   ".into(),
            ..Default::default()
        };
        assert_eq!(settings.active_formula(), "ROLLED: #face_value");
    }

    #[test]
    fn test_roll_settings_deserialize_missing_fields_use_defaults() {
        let settings: RollSettings =
            serde_json::from_str(r#"{"sum":true}"#).unwrap();
        assert!(settings.sum);
        assert!(!settings.advantage);
        assert_eq!(settings.formula, DEFAULT_FORMULA);
    }
}

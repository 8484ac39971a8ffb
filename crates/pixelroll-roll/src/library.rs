//! Saved formulas.

use serde::{Deserialize, Serialize};

use crate::RollError;

/// One saved formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaEntry {
    pub name: String,
    pub formula: String,
}

/// Export envelope: `{"roll": {"name": ..., "formula": ...}}`.
#[derive(Serialize)]
struct Exported {
    roll: FormulaEntry,
}

/// Named formulas the user can pick from.
///
/// Serializes as a plain JSON array of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaLibrary {
    entries: Vec<FormulaEntry>,
}

impl FormulaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a formula, or replaces the one with the same name.
    pub fn upsert(&mut self, name: impl Into<String>, formula: impl Into<String>) {
        let name = name.into();
        let formula = formula.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.formula = formula,
            None => self.entries.push(FormulaEntry { name, formula }),
        }
    }

    /// Removes every entry with this formula text. Returns how many went.
    pub fn remove_formula(&mut self, formula: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.formula != formula);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn find(&self, name: &str) -> Option<&FormulaEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[FormulaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exports one entry as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`RollError::UnknownFormula`] if no entry has this name.
    pub fn export(&self, name: &str) -> Result<String, RollError> {
        let entry = self
            .find(name)
            .ok_or_else(|| RollError::UnknownFormula(name.to_owned()))?;
        let json = serde_json::to_string_pretty(&Exported {
            roll: entry.clone(),
        })?;
        Ok(json)
    }
}

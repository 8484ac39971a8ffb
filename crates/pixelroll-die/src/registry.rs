//! The die registry: every connected die, keyed by [`DieId`].
//!
//! Like the rest of the die layer this is plain data. The bridge actor
//! owns it (through the roll aggregator) and is the only task that
//! mutates it, so there is no locking here.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::{Die, DieError, DieId};

/// All connected dice, in connection order.
#[derive(Debug, Default)]
pub struct DieRegistry {
    /// `BTreeMap` so iteration follows id order, which is connection
    /// order.
    dice: BTreeMap<DieId, Die>,
    /// Name index kept in sync with `dice`.
    names: HashMap<String, DieId>,
    next_id: u64,
}

impl DieRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly connected die.
    ///
    /// # Errors
    /// Returns [`DieError::DuplicatePeripheral`] if a die with the same
    /// name is already registered.
    pub fn register(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<DieId, DieError> {
        if self.names.contains_key(name) {
            return Err(DieError::DuplicatePeripheral(name.to_owned()));
        }

        self.next_id += 1;
        let id = DieId::new(self.next_id);
        self.dice.insert(id, Die::new(id, name, enabled));
        self.names.insert(name.to_owned(), id);

        info!(die = %name, %id, "die registered");
        Ok(id)
    }

    /// Removes one die.
    pub fn remove(&mut self, id: DieId) -> Option<Die> {
        let die = self.dice.remove(&id)?;
        self.names.remove(die.name());
        info!(die = %die.name(), %id, "die removed");
        Some(die)
    }

    /// Removes every die at once and returns them in connection order.
    pub fn clear(&mut self) -> Vec<Die> {
        self.names.clear();
        let dice = std::mem::take(&mut self.dice);
        dice.into_values().collect()
    }

    pub fn get(&self, id: DieId) -> Option<&Die> {
        self.dice.get(&id)
    }

    pub fn get_mut(&mut self, id: DieId) -> Option<&mut Die> {
        self.dice.get_mut(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Die> {
        self.names.get(name).and_then(|id| self.dice.get(id))
    }

    /// # Errors
    /// Returns [`DieError::NotFound`] if no die has that name.
    pub fn id_of(&self, name: &str) -> Result<DieId, DieError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DieError::NotFound(name.to_owned()))
    }

    /// Dice in connection order.
    pub fn iter(&self) -> impl Iterator<Item = &Die> {
        self.dice.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Die> {
        self.dice.values_mut()
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_register_assigns_increasing_ids() {
        let mut reg = DieRegistry::new();
        let a = reg.register("A", true).unwrap();
        let b = reg.register("B", true).unwrap();
        assert!(a < b);
        let names: Vec<_> = reg.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn test_registry_duplicate_name_rejected() {
        let mut reg = DieRegistry::new();
        reg.register("A", true).unwrap();
        let result = reg.register("A", true);
        assert!(matches!(result, Err(DieError::DuplicatePeripheral(n)) if n == "A"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_registry_remove_frees_name() {
        let mut reg = DieRegistry::new();
        let a = reg.register("A", true).unwrap();
        assert!(reg.remove(a).is_some());
        assert!(reg.by_name("A").is_none());
        let again = reg.register("A", true).unwrap();
        assert_ne!(a, again);
    }

    #[test]
    fn test_registry_clear_empties_both_indexes() {
        let mut reg = DieRegistry::new();
        reg.register("A", true).unwrap();
        reg.register("B", false).unwrap();

        let removed = reg.clear();

        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].name(), "A");
        assert!(reg.is_empty());
        assert!(reg.register("A", true).is_ok());
    }

    #[test]
    fn test_registry_id_of_unknown_is_not_found() {
        let mut reg = DieRegistry::new();
        let a = reg.register("A", true).unwrap();
        assert_eq!(reg.id_of("A").unwrap(), a);
        assert_eq!(reg.by_name("A").map(Die::id), Some(a));
        assert!(matches!(reg.id_of("ghost"), Err(DieError::NotFound(_))));
    }
}

//! The roll aggregator: which dice roll, what they rolled, and when the
//! result is ready.
//!
//! # Lifecycle of a roll
//!
//! ```text
//! set_settings() ──→ rollset computed ──→ handle_event(Settled) × N
//!                                                │
//!                                    every rollset die settled?
//!                                                │
//!                    ┌──── advantage, pass 1 ────┴──── otherwise ────┐
//!                    ▼                                               ▼
//!         faces stashed, dice set to                        posts formatted,
//!         "roll again", pass 2 begins                       faces cleared
//! ```
//!
//! All methods are synchronous and return a [`RollReport`] saying which
//! dice changed and which chat posts are due. Sending them anywhere is
//! the caller's job.

use std::collections::HashMap;

use pixelroll_die::{
    Die, DieError, DieId, DieInput, DieRegistry, StateChange,
};
use pixelroll_protocol::{BatteryStatus, DieInfo, RollEvent};
use tracing::{debug, info};

use crate::{MessageContext, RollSettings, compute_rollset, format_message};

/// State of the roll currently being collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollSession {
    rollset: Vec<DieId>,
    /// Faces settled in the current pass.
    faces: HashMap<DieId, u8>,
    /// Pass-1 faces while an advantage roll waits for pass 2.
    first_pass: Option<HashMap<DieId, u8>>,
}

impl RollSession {
    /// Dice taking part, in connection order.
    pub fn rollset(&self) -> &[DieId] {
        &self.rollset
    }

    /// Face recorded for `id` in the current pass.
    pub fn face(&self, id: DieId) -> Option<u8> {
        self.faces.get(&id).copied()
    }

    /// Face recorded for `id` in pass 1 of an advantage roll.
    pub fn first_pass_face(&self, id: DieId) -> Option<u8> {
        self.first_pass.as_ref()?.get(&id).copied()
    }

    /// Current pass, 1 or 2.
    pub fn pass(&self) -> u8 {
        if self.first_pass.is_some() { 2 } else { 1 }
    }

    /// Every rollset die has settled in the current pass.
    ///
    /// An empty rollset is never complete.
    pub fn is_complete(&self) -> bool {
        !self.rollset.is_empty()
            && self.rollset.iter().all(|id| self.faces.contains_key(id))
    }

    fn reset(&mut self) {
        self.faces.clear();
        self.first_pass = None;
    }
}

/// Outcome of one aggregator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollReport {
    /// Chat posts to send, in order.
    pub posts: Vec<String>,
    /// Dice whose state or face changed, for status updates.
    pub changed: Vec<DieId>,
}

impl RollReport {
    fn touch(&mut self, id: DieId) {
        if !self.changed.contains(&id) {
            self.changed.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.changed.is_empty()
    }
}

/// Owns the connected dice and the roll in progress.
#[derive(Debug, Default)]
pub struct RollAggregator {
    dice: DieRegistry,
    settings: RollSettings,
    session: RollSession,
}

impl RollAggregator {
    pub fn new(settings: RollSettings) -> Self {
        Self {
            dice: DieRegistry::new(),
            settings,
            session: RollSession::default(),
        }
    }

    pub fn dice(&self) -> &DieRegistry {
        &self.dice
    }

    pub fn die(&self, id: DieId) -> Option<&Die> {
        self.dice.get(id)
    }

    pub fn settings(&self) -> &RollSettings {
        &self.settings
    }

    pub fn session(&self) -> &RollSession {
        &self.session
    }

    pub fn rollset(&self) -> &[DieId] {
        self.session.rollset()
    }

    /// Adds a freshly connected die.
    ///
    /// # Errors
    /// Returns [`DieError::DuplicatePeripheral`] if the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<DieId, DieError> {
        let id = self.dice.register(name, enabled)?;
        self.recompute();
        Ok(id)
    }

    /// Removes one die.
    ///
    /// The rollset shrinks, so the dice left in it may already have all
    /// settled; the report then carries the finished roll.
    pub fn remove(&mut self, id: DieId) -> Option<(Die, RollReport)> {
        let die = self.dice.remove(id)?;
        self.recompute();
        let mut report = RollReport::default();
        self.check_completion(&mut report);
        Some((die, report))
    }

    /// Removes every die and drops the roll in progress.
    pub fn clear(&mut self) -> Vec<Die> {
        let removed = self.dice.clear();
        self.session = RollSession::default();
        removed
    }

    /// Replaces formula and modes. The roll in progress starts over and
    /// dice waiting for a second advantage roll go back to ready.
    pub fn set_settings(&mut self, settings: RollSettings) -> RollReport {
        info!(
            formula = %settings.active_formula(),
            advantage = settings.advantage,
            sum = settings.sum,
            "roll settings changed"
        );
        self.settings = settings;
        self.session.reset();

        let mut report = RollReport::default();
        for die in self.dice.iter_mut() {
            if die.apply(DieInput::Reset) != StateChange::Ignored {
                report.touch(die.id());
            }
        }
        self.recompute();
        report
    }

    /// Changes the roll modes, keeping the formula.
    pub fn set_modes(&mut self, advantage: bool, sum: bool) -> RollReport {
        self.set_settings(RollSettings {
            advantage,
            sum,
            ..self.settings.clone()
        })
    }

    /// Includes or excludes a die.
    pub fn set_enabled(&mut self, id: DieId, enabled: bool) -> RollReport {
        let mut report = RollReport::default();
        let Some(die) = self.dice.get_mut(id) else {
            return report;
        };

        let input = if enabled {
            DieInput::Enable
        } else {
            DieInput::Disable
        };
        if die.apply(input) == StateChange::Ignored {
            return report;
        }
        info!(die = %die.name(), enabled, "die toggled");

        report.touch(id);
        self.recompute();
        self.check_completion(&mut report);
        report
    }

    /// Feeds one decoded roll event from die `id`.
    pub fn handle_event(&mut self, id: DieId, event: RollEvent) -> RollReport {
        let mut report = RollReport::default();
        let Some(die) = self.dice.get_mut(id) else {
            debug!(%id, "roll event for unknown die");
            return report;
        };

        let change = die.apply(DieInput::Roll(event));
        debug!(die = %die.name(), ?event, ?change, "roll event");

        let in_rollset = self.session.rollset.contains(&id);
        match change {
            StateChange::Ignored => return report,
            StateChange::Settled { face } if in_rollset => {
                self.session.faces.insert(id, face);
                report.touch(id);
                self.check_completion(&mut report);
            }
            StateChange::StartedRolling | StateChange::Forced { .. }
                if in_rollset =>
            {
                self.session.faces.remove(&id);
                report.touch(id);
            }
            _ => report.touch(id),
        }
        report
    }

    /// Stores an identity record. Returns `false` for an unknown die.
    pub fn update_info(&mut self, id: DieId, info: DieInfo) -> bool {
        let Some(die) = self.dice.get_mut(id) else {
            return false;
        };
        debug!(die = %die.name(), pixel_id = info.pixel_id, leds = info.led_count, "die info");
        die.set_info(info);
        true
    }

    /// Stores a battery update. Returns `false` for an unknown die.
    pub fn update_battery(&mut self, id: DieId, battery: BatteryStatus) -> bool {
        let Some(die) = self.dice.get_mut(id) else {
            return false;
        };
        debug!(die = %die.name(), level = battery.level, charging = battery.charging, "battery");
        die.set_battery(battery);
        true
    }

    fn recompute(&mut self) {
        let rollset =
            compute_rollset(self.settings.active_formula(), self.dice.iter());
        if rollset != self.session.rollset {
            debug!(rollset = ?rollset, "rollset changed");
        }
        self.session.faces.retain(|id, _| rollset.contains(id));
        if let Some(first) = &mut self.session.first_pass {
            first.retain(|id, _| rollset.contains(id));
        }
        self.session.rollset = rollset;
    }

    fn check_completion(&mut self, report: &mut RollReport) {
        if !self.session.is_complete() {
            return;
        }
        let faces = std::mem::take(&mut self.session.faces);

        let posts = if self.settings.advantage {
            let Some(first) = self.session.first_pass.take() else {
                info!(
                    dice = self.session.rollset.len(),
                    "first pass complete, roll again"
                );
                for &id in &self.session.rollset {
                    if let Some(die) = self.dice.get_mut(id) {
                        die.apply(DieInput::RollAgain);
                    }
                    report.touch(id);
                }
                self.session.first_pass = Some(faces);
                return;
            };
            self.advantage_posts(&first, &faces)
        } else {
            self.single_pass_posts(&faces)
        };

        info!(posts = posts.len(), "roll complete");
        report.posts.extend(posts);
    }

    fn single_pass_posts(&self, faces: &HashMap<DieId, u8>) -> Vec<String> {
        let entries = self.entries(&[faces]);
        format_message(
            self.settings.active_formula(),
            &self.context(&entries, self.settings.sum),
        )
    }

    fn advantage_posts(
        &self,
        first: &HashMap<DieId, u8>,
        second: &HashMap<DieId, u8>,
    ) -> Vec<String> {
        let formula = self.settings.active_formula();

        if self.settings.sum {
            return [first, second]
                .into_iter()
                .flat_map(|pass| {
                    let entries = self.entries(&[pass]);
                    format_message(formula, &self.context(&entries, true))
                })
                .collect();
        }

        // One post per die, each showing that die's two results.
        let entries = self.entries(&[first, second]);
        let shared = self.context(&entries, false);
        entries
            .iter()
            .filter_map(|(id, faces)| {
                let die = self.dice.get(*id)?;
                let mut ctx = shared.clone();
                ctx.set_wildcard(join_faces(faces));
                ctx.set_names(die.name());
                Some(format_message(formula, &ctx))
            })
            .flatten()
            .collect()
    }

    /// Rollset dice with their faces from each pass, in rollset order.
    fn entries(&self, passes: &[&HashMap<DieId, u8>]) -> Vec<(DieId, Vec<u8>)> {
        self.session
            .rollset
            .iter()
            .map(|&id| {
                let faces = passes
                    .iter()
                    .filter_map(|pass| pass.get(&id).copied())
                    .collect();
                (id, faces)
            })
            .collect()
    }

    fn context(&self, entries: &[(DieId, Vec<u8>)], sum: bool) -> MessageContext {
        let mut ctx = MessageContext::default();
        let mut names = Vec::with_capacity(entries.len());
        let mut all = Vec::new();

        for (id, faces) in entries {
            let Some(die) = self.dice.get(*id) else {
                continue;
            };
            names.push(die.name());
            all.extend_from_slice(faces);
            ctx = ctx.with_token(die.token(), join_faces(faces));
        }

        let wildcard = if sum {
            all.iter().map(|&f| u32::from(f)).sum::<u32>().to_string()
        } else {
            join_faces(&all)
        };
        ctx.set_wildcard(wildcard);
        ctx.set_names(names.join(", "));
        ctx
    }
}

fn join_faces(faces: &[u8]) -> String {
    faces
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelroll_die::RollState;

    fn settled(face: u8) -> RollEvent {
        RollEvent::Settled { face }
    }

    fn aggregator(formula: &str, advantage: bool, sum: bool) -> RollAggregator {
        RollAggregator::new(RollSettings {
            formula: formula.into(),
            advantage,
            sum,
        })
    }

    #[test]
    fn test_default_formula_lists_faces() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();

        assert!(agg.handle_event(a, settled(3)).posts.is_empty());
        let report = agg.handle_event(b, settled(5));

        assert_eq!(report.posts, ["ROLLED: 3 5"]);
        assert!(agg.session().face(a).is_none());
    }

    #[test]
    fn test_disabled_dice_are_not_in_rollset() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", false).unwrap();
        assert!(agg.rollset().is_empty());

        let report = agg.handle_event(a, settled(4));
        assert!(report.posts.is_empty());
        assert_eq!(report.changed, [a]);
        assert_eq!(agg.die(a).unwrap().state(), RollState::Disabled);
        assert_eq!(agg.die(a).unwrap().last_face(), Some(4));
    }

    #[test]
    fn test_token_formula_ignores_other_dice() {
        let mut agg = aggregator("Attack: #a", false, false);
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();
        assert_eq!(agg.rollset(), [a]);

        assert!(agg.handle_event(b, settled(20)).posts.is_empty());
        assert_eq!(agg.handle_event(a, settled(12)).posts, ["Attack: 12"]);
    }

    #[test]
    fn test_movement_clears_recorded_face() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();

        agg.handle_event(a, settled(2));
        agg.handle_event(a, RollEvent::Moving { face: 2 });
        assert!(agg.session().face(a).is_none());

        assert!(agg.handle_event(b, settled(6)).posts.is_empty());
        assert_eq!(agg.handle_event(a, settled(1)).posts, ["ROLLED: 1 6"]);
    }

    #[test]
    fn test_name_placeholder_joins_rollset_names() {
        let mut agg = aggregator("#die_name: #face_value", false, true);
        let a = agg.register("Red", true).unwrap();
        let b = agg.register("Blue", true).unwrap();

        agg.handle_event(a, settled(1));
        let report = agg.handle_event(b, settled(2));

        assert_eq!(report.posts, ["Red, Blue: 3"]);
    }

    #[test]
    fn test_set_settings_restarts_session() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", true).unwrap();
        let _b = agg.register("B", true).unwrap();
        agg.handle_event(a, settled(2));

        let report = agg.set_modes(false, true);

        assert!(report.is_empty());
        assert!(agg.session().face(a).is_none());
        assert!(agg.settings().sum);
        assert_eq!(agg.settings().formula, "ROLLED: #face_value");
    }

    #[test]
    fn test_set_settings_returns_needs_roll_dice_to_ready() {
        let mut agg = aggregator("#face_value", true, false);
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();
        agg.handle_event(a, settled(3));
        agg.handle_event(b, settled(5));
        assert_eq!(agg.die(a).unwrap().state(), RollState::NeedsRoll);

        let report = agg.set_modes(false, false);

        assert_eq!(report.changed, [a, b]);
        assert!(report.posts.is_empty());
        assert_eq!(agg.die(a).unwrap().state(), RollState::Ready);
        assert_eq!(agg.die(b).unwrap().state(), RollState::Ready);
        assert_eq!(agg.session().pass(), 1);
    }

    #[test]
    fn test_advantage_with_sum_posts_one_message_per_pass() {
        let mut agg = aggregator("Total #face_value", true, true);
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();

        agg.handle_event(a, settled(3));
        let first = agg.handle_event(b, settled(5));
        assert!(first.posts.is_empty());
        assert_eq!(agg.session().pass(), 2);
        assert_eq!(agg.session().first_pass_face(b), Some(5));

        agg.handle_event(a, settled(6));
        let second = agg.handle_event(b, settled(4));
        assert_eq!(second.posts, ["Total 8", "Total 10"]);
        assert_eq!(agg.session().pass(), 1);
    }

    #[test]
    fn test_empty_rollset_never_completes() {
        let mut agg = aggregator("Only #ghost", false, false);
        let a = agg.register("A", true).unwrap();
        assert!(agg.rollset().is_empty());
        assert!(agg.handle_event(a, settled(3)).posts.is_empty());
    }

    #[test]
    fn test_remove_drops_die_from_rollset() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();

        let (removed, report) = agg.remove(b).unwrap();
        assert_eq!(removed.name(), "B");
        assert!(report.is_empty());
        assert_eq!(agg.rollset(), [a]);
        assert_eq!(agg.handle_event(a, settled(9)).posts, ["ROLLED: 9"]);
    }

    #[test]
    fn test_remove_unsettled_die_completes_roll_of_the_rest() {
        let mut agg = aggregator("You rolled #face_value!", false, true);
        let a = agg.register("A", true).unwrap();
        let b = agg.register("B", true).unwrap();

        assert!(agg.handle_event(a, settled(4)).posts.is_empty());
        let (_, report) = agg.remove(b).unwrap();

        assert_eq!(report.posts, ["You rolled 4!"]);
        assert!(agg.session().face(a).is_none());
    }

    #[test]
    fn test_remove_last_die_posts_nothing() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", true).unwrap();
        agg.handle_event(a, settled(4));

        let (_, report) = agg.remove(a).unwrap();

        assert!(report.posts.is_empty());
        assert!(agg.rollset().is_empty());
    }

    #[test]
    fn test_update_info_seeds_face_for_display() {
        let mut agg = RollAggregator::default();
        let a = agg.register("A", false).unwrap();
        let info = DieInfo {
            led_count: 20,
            design_color: 1,
            data_set_hash: 0,
            pixel_id: 7,
            available_flash: 0,
            build_timestamp: 0,
            roll_state: 1,
            face: 11,
            battery: BatteryStatus {
                level: 55,
                charging: true,
            },
        };

        assert!(agg.update_info(a, info));
        assert_eq!(agg.die(a).unwrap().last_face(), Some(11));
        assert!(!agg.update_info(DieId::new(99), info));
    }
}

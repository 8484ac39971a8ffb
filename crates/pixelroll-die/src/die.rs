//! The die record: identity, roll state and lazily filled metadata.

use std::fmt;

use pixelroll_protocol::{BatteryStatus, DieInfo, DieSummary};

use crate::{DieInput, RollState, RollTracker, StateChange};

/// Registry key of a connected die.
///
/// Ids are handed out in increasing order, so sorting by id gives
/// connection order. A reconnect always gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DieId(u64);

impl DieId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "die-{}", self.0)
    }
}

/// Turns an advertised name into its formula placeholder.
///
/// Lowercases, collapses whitespace runs into `_` and drops anything
/// that is not `[a-z0-9_-]`, then prefixes `#`.
///
/// ```
/// assert_eq!(pixelroll_die::derive_token("Red D20"), "#red_d20");
/// assert_eq!(pixelroll_die::derive_token("  Lucky   #7!"), "#_lucky_7");
/// ```
pub fn derive_token(name: &str) -> String {
    let mut token = String::with_capacity(name.len() + 1);
    token.push('#');
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                token.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        for lower in c.to_lowercase() {
            if lower.is_ascii_alphanumeric() || lower == '_' || lower == '-' {
                token.push(lower);
            }
        }
    }
    token
}

/// One connected physical die.
#[derive(Debug, Clone)]
pub struct Die {
    id: DieId,
    name: String,
    token: String,
    tracker: RollTracker,
    info: Option<DieInfo>,
    battery: Option<BatteryStatus>,
}

impl Die {
    pub fn new(id: DieId, name: impl Into<String>, enabled: bool) -> Self {
        let name = name.into();
        Self {
            id,
            token: derive_token(&name),
            name,
            tracker: RollTracker::new(enabled),
            info: None,
            battery: None,
        }
    }

    pub fn id(&self) -> DieId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formula placeholder for this die, e.g. `#red_d20`.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> RollState {
        self.tracker.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.tracker.is_enabled()
    }

    /// Last face reported, 1-based.
    pub fn last_face(&self) -> Option<u8> {
        self.tracker.last_face()
    }

    pub fn info(&self) -> Option<&DieInfo> {
        self.info.as_ref()
    }

    pub fn battery(&self) -> Option<BatteryStatus> {
        self.battery
    }

    /// Feeds one input through the state machine.
    pub fn apply(&mut self, input: DieInput) -> StateChange {
        self.tracker.apply(input)
    }

    /// Stores an identity record.
    ///
    /// The embedded face only seeds `last_face` when the die has not
    /// reported one; the embedded battery replaces the current one.
    pub fn set_info(&mut self, info: DieInfo) {
        self.tracker.seed_face(info.face);
        self.battery = Some(info.battery);
        self.info = Some(info);
    }

    pub fn set_battery(&mut self, battery: BatteryStatus) {
        self.battery = Some(battery);
    }

    /// Row for the popup's dice list.
    pub fn summary(&self) -> DieSummary {
        DieSummary {
            name: self.name.clone(),
            token: self.token.clone(),
            status: self.state().as_str().to_owned(),
        }
    }
}

//! The per-die roll state machine.
//!
//! ```text
//!              enable                 movement
//!   Disabled ─────────→ Ready ───────────────────→ Rolling
//!      ↑                  ↑                         │   │
//!      │ disable          │                  settle │   │ forced
//!      │ (any state)      │                         ▼   ▼
//!      └──────────────────┴─── NeedsRoll ←── Rolled     Forced
//!                              (roll again)
//! ```
//!
//! [`RollTracker::apply`] is a pure transition: it takes one input and
//! reports what changed. It never talks to the transport or the
//! aggregator, so every sequence of events can be checked in isolation.

use std::fmt;

use pixelroll_protocol::RollEvent;

/// Logical state of one die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollState {
    /// Excluded from rolls by the user.
    Disabled,
    /// Included and waiting for a roll.
    Ready,
    /// Tumbling.
    Rolling,
    /// Settled on a face.
    Rolled,
    /// Stopped but the face could not be determined.
    Forced,
    /// Waiting for the second roll of an advantage session.
    NeedsRoll,
    /// The link is gone.
    Disconnected,
}

impl RollState {
    /// Status string shown by the popup.
    pub fn as_str(self) -> &'static str {
        match self {
            RollState::Disabled => "disabled",
            RollState::Ready => "ready",
            RollState::Rolling => "rolling",
            RollState::Rolled => "rolled",
            RollState::Forced => "forced",
            RollState::NeedsRoll => "needs-roll",
            RollState::Disconnected => "disconnected",
        }
    }

    /// States from which a movement event starts a roll.
    fn can_start_rolling(self) -> bool {
        matches!(
            self,
            RollState::Ready
                | RollState::Rolled
                | RollState::Forced
                | RollState::NeedsRoll
        )
    }
}

impl fmt::Display for RollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can drive a die's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieInput {
    /// A decoded roll-state event from the die.
    Roll(RollEvent),
    /// The user included the die.
    Enable,
    /// The user excluded the die.
    Disable,
    /// The aggregator asks for another roll (advantage pass 2).
    RollAgain,
    /// The roll in progress was abandoned.
    Reset,
    /// The link closed.
    Disconnect,
}

/// What [`RollTracker::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// The die settled on `face`.
    Settled { face: u8 },
    /// The die started tumbling.
    StartedRolling,
    /// The die stopped on an undetermined face.
    Forced { face: u8 },
    /// A disabled die reported a face; it was recorded, state unchanged.
    FaceRecorded { face: u8 },
    /// Disabled → Ready.
    Enabled,
    /// Any state → Disabled.
    Disabled,
    /// The die now waits for another roll.
    RollAgain,
    /// NeedsRoll → Ready.
    Reset,
    /// The link closed.
    Disconnected,
    /// The input had no effect.
    Ignored,
}

/// Roll state of one die plus the bits needed to drive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollTracker {
    state: RollState,
    moving: bool,
    last_face: Option<u8>,
}

impl RollTracker {
    /// Creates a tracker in `Ready` (enabled) or `Disabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: if enabled {
                RollState::Ready
            } else {
                RollState::Disabled
            },
            moving: false,
            last_face: None,
        }
    }

    pub fn state(&self) -> RollState {
        self.state
    }

    /// Last face reported by the die, 1-based.
    pub fn last_face(&self) -> Option<u8> {
        self.last_face
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, RollState::Disabled | RollState::Disconnected)
    }

    /// Seeds the face from an info record if the die has not reported
    /// one yet.
    pub fn seed_face(&mut self, face: u8) {
        if self.last_face.is_none() {
            self.last_face = Some(face);
        }
    }

    /// Applies one input and reports the resulting change.
    pub fn apply(&mut self, input: DieInput) -> StateChange {
        if self.state == RollState::Disconnected {
            return StateChange::Ignored;
        }

        match input {
            DieInput::Roll(RollEvent::Settled { face }) => {
                self.moving = false;
                self.last_face = Some(face);
                if self.state == RollState::Disabled {
                    return StateChange::FaceRecorded { face };
                }
                self.state = RollState::Rolled;
                StateChange::Settled { face }
            }
            DieInput::Roll(RollEvent::Moving { .. }) => {
                if self.moving || !self.state.can_start_rolling() {
                    return StateChange::Ignored;
                }
                self.moving = true;
                self.state = RollState::Rolling;
                StateChange::StartedRolling
            }
            DieInput::Roll(RollEvent::Forced { face }) => {
                self.moving = false;
                self.last_face = Some(face);
                if self.state == RollState::Disabled {
                    return StateChange::FaceRecorded { face };
                }
                self.state = RollState::Forced;
                StateChange::Forced { face }
            }
            DieInput::Enable => {
                if self.state != RollState::Disabled {
                    return StateChange::Ignored;
                }
                self.state = RollState::Ready;
                StateChange::Enabled
            }
            DieInput::Disable => {
                if self.state == RollState::Disabled {
                    return StateChange::Ignored;
                }
                self.moving = false;
                self.state = RollState::Disabled;
                StateChange::Disabled
            }
            DieInput::RollAgain => {
                if self.state == RollState::Disabled {
                    return StateChange::Ignored;
                }
                self.moving = false;
                self.state = RollState::NeedsRoll;
                StateChange::RollAgain
            }
            DieInput::Reset => {
                if self.state != RollState::NeedsRoll {
                    return StateChange::Ignored;
                }
                self.state = RollState::Ready;
                StateChange::Reset
            }
            DieInput::Disconnect => {
                self.moving = false;
                self.state = RollState::Disconnected;
                StateChange::Disconnected
            }
        }
    }
}

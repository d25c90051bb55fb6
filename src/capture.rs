//! Shot capture state machine.
//!
//! A shot is built from a floor tap, a goal tap and a handful of modifier
//! toggles before the outcome commits it to the [`EventLog`]. All in-progress
//! data lives in the phase that needs it, so leaving a phase drops it.
//!
//! ```text
//! AwaitingOrigin --origin--> AwaitingPlacement --placement--> AwaitingDetails
//!       ^                          |                               |
//!       +---------cancel-----------+--------cancel / outcome-------+
//! ```

use chrono::Utc;
use log::debug;
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::{self, ClockUnit, GameClock};
use crate::event_log::EventLog;
use crate::geometry::{FloorPoint, GoalPoint};
use crate::shot::{GameSituation, ShotEvent, ShotId, ShotOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureState {
    AwaitingOrigin,
    AwaitingPlacement,
    AwaitingDetails,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    PenaltyKill,
    Rebound,
    Controlled,
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pk" | "penalty_kill" => Ok(Self::PenaltyKill),
            "rebound" => Ok(Self::Rebound),
            "controlled" => Ok(Self::Controlled),
            other => Err(format!("unknown modifier: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    pub penalty_kill: bool,
    pub rebound: bool,
    pub controlled: bool,
}

impl Modifiers {
    pub fn toggle(&mut self, m: Modifier) {
        let flag = match m {
            Modifier::PenaltyKill => &mut self.penalty_kill,
            Modifier::Rebound => &mut self.rebound,
            Modifier::Controlled => &mut self.controlled,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureInput {
    Origin(FloorPoint),
    Placement(GoalPoint),
    Toggle(Modifier),
    AdjustClock(ClockUnit, i32),
    Outcome(ShotOutcome),
    Cancel,
}

impl CaptureInput {
    fn name(&self) -> &'static str {
        match self {
            Self::Origin(_) => "origin",
            Self::Placement(_) => "placement",
            Self::Toggle(_) => "toggle",
            Self::AdjustClock(..) => "clock",
            Self::Outcome(_) => "outcome",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("'{input}' is not accepted while {state}")]
    InvalidTransition {
        state: CaptureState,
        input: &'static str,
    },
    #[error("{0} cannot be recorded by capture")]
    UnsupportedOutcome(ShotOutcome),
}

/// Result of one accepted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved to a new state.
    Advanced(CaptureState),
    /// Pending data changed, state did not.
    Updated,
    Committed(ShotId),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    AwaitingOrigin,
    AwaitingPlacement {
        origin: FloorPoint,
    },
    AwaitingDetails {
        origin: FloorPoint,
        placement: GoalPoint,
        shot_time: GameClock,
        modifiers: Modifiers,
    },
}

/// Everything the capture flow needs between inputs: the in-progress shot,
/// the running game clock and the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureContext {
    phase: Phase,
    clock: GameClock,
    period: u32,
}

/// Read-only view of a shot under construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PendingShot {
    pub origin: Option<FloorPoint>,
    pub placement: Option<GoalPoint>,
    pub time_remaining: Option<GameClock>,
    pub modifiers: Modifiers,
}

impl CaptureContext {
    pub fn new(clock: GameClock) -> Self {
        Self {
            phase: Phase::AwaitingOrigin,
            clock,
            period: 1,
        }
    }

    pub fn state(&self) -> CaptureState {
        match self.phase {
            Phase::AwaitingOrigin => CaptureState::AwaitingOrigin,
            Phase::AwaitingPlacement { .. } => CaptureState::AwaitingPlacement,
            Phase::AwaitingDetails { .. } => CaptureState::AwaitingDetails,
        }
    }

    pub fn clock(&self) -> GameClock {
        self.clock
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Period is shared across shots and may change in any state.
    pub fn adjust_period(&mut self, delta: i32, max_period: u32) -> u32 {
        self.period = clock::step_period(self.period, delta, max_period);
        self.period
    }

    pub fn pending(&self) -> PendingShot {
        match self.phase {
            Phase::AwaitingOrigin => PendingShot {
                origin: None,
                placement: None,
                time_remaining: None,
                modifiers: Modifiers::default(),
            },
            Phase::AwaitingPlacement { origin } => PendingShot {
                origin: Some(origin),
                placement: None,
                time_remaining: None,
                modifiers: Modifiers::default(),
            },
            Phase::AwaitingDetails {
                origin,
                placement,
                shot_time,
                modifiers,
            } => PendingShot {
                origin: Some(origin),
                placement: Some(placement),
                time_remaining: Some(shot_time),
                modifiers,
            },
        }
    }

    /// Feed one input. Rejected inputs leave the context untouched.
    pub fn apply(&mut self, input: CaptureInput, log: &mut EventLog) -> Result<Step, CaptureError> {
        let invalid = CaptureError::InvalidTransition {
            state: self.state(),
            input: input.name(),
        };

        match (&mut self.phase, input) {
            (Phase::AwaitingOrigin, CaptureInput::Origin(origin)) => {
                self.phase = Phase::AwaitingPlacement { origin };
                Ok(Step::Advanced(CaptureState::AwaitingPlacement))
            }
            (Phase::AwaitingPlacement { origin }, CaptureInput::Placement(placement)) => {
                self.phase = Phase::AwaitingDetails {
                    origin: *origin,
                    placement,
                    shot_time: self.clock,
                    modifiers: Modifiers::default(),
                };
                Ok(Step::Advanced(CaptureState::AwaitingDetails))
            }
            (Phase::AwaitingDetails { placement, .. }, CaptureInput::Placement(refined)) => {
                *placement = refined;
                Ok(Step::Updated)
            }
            (Phase::AwaitingDetails { modifiers, .. }, CaptureInput::Toggle(m)) => {
                modifiers.toggle(m);
                Ok(Step::Updated)
            }
            (Phase::AwaitingDetails { shot_time, .. }, CaptureInput::AdjustClock(unit, delta)) => {
                shot_time.adjust(unit, delta);
                Ok(Step::Updated)
            }
            (Phase::AwaitingDetails { .. }, CaptureInput::Outcome(outcome)) => {
                self.commit(outcome, log).map(Step::Committed)
            }
            (
                Phase::AwaitingPlacement { .. } | Phase::AwaitingDetails { .. },
                CaptureInput::Cancel,
            ) => {
                self.phase = Phase::AwaitingOrigin;
                Ok(Step::Cancelled)
            }
            _ => Err(invalid),
        }
    }

    fn commit(&mut self, outcome: ShotOutcome, log: &mut EventLog) -> Result<ShotId, CaptureError> {
        if outcome == ShotOutcome::Miss {
            return Err(CaptureError::UnsupportedOutcome(outcome));
        }
        let Phase::AwaitingDetails {
            origin,
            placement,
            shot_time,
            modifiers,
        } = self.phase
        else {
            return Err(CaptureError::InvalidTransition {
                state: self.state(),
                input: "outcome",
            });
        };

        let now = Utc::now();
        let timestamp = log.last().map_or(now, |prev| prev.timestamp.max(now));
        let event = ShotEvent {
            id: Uuid::new_v4(),
            origin,
            placement: Some(placement),
            outcome,
            situation: GameSituation::from_penalty_kill(modifiers.penalty_kill),
            is_rebound: modifiers.rebound,
            is_controlled: modifiers.controlled,
            period: self.period,
            time_remaining: shot_time,
            timestamp,
        };
        let id = event.id;
        debug!(
            "commit {outcome} p{} {shot_time} ({} shots)",
            self.period,
            log.size() + 1
        );
        log.append(event);

        // next shot starts from the clock value just recorded
        self.clock = shot_time;
        self.phase = Phase::AwaitingOrigin;
        Ok(id)
    }
}

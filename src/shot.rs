//! Committed shot records and their vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::clock::GameClock;
use crate::geometry::{FloorPoint, GoalPoint};

pub type ShotId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotOutcome {
    Goal,
    Save,
    /// Part of the vocabulary, not produced by capture.
    Miss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameSituation {
    #[default]
    #[serde(rename = "EV")]
    EvenStrength,
    #[serde(rename = "PK")]
    PenaltyKill,
    /// Part of the vocabulary, not produced by capture.
    #[serde(rename = "PP")]
    PowerPlay,
}

impl GameSituation {
    pub fn from_penalty_kill(pk: bool) -> Self {
        if pk {
            Self::PenaltyKill
        } else {
            Self::EvenStrength
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Goal => "GOAL",
            Self::Save => "SAVE",
            Self::Miss => "MISS",
        })
    }
}

impl FromStr for ShotOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "goal" => Ok(Self::Goal),
            "save" => Ok(Self::Save),
            "miss" => Ok(Self::Miss),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

impl fmt::Display for GameSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EvenStrength => "EV",
            Self::PenaltyKill => "PK",
            Self::PowerPlay => "PP",
        })
    }
}

/// One recorded shot. Never edited after it enters an [`EventLog`].
///
/// [`EventLog`]: crate::event_log::EventLog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotEvent {
    pub id: ShotId,
    pub origin: FloorPoint,
    pub placement: Option<GoalPoint>,
    pub outcome: ShotOutcome,
    pub situation: GameSituation,
    pub is_rebound: bool,
    /// Only meaningful for saves.
    pub is_controlled: bool,
    pub period: u32,
    pub time_remaining: GameClock,
    pub timestamp: DateTime<Utc>,
}

impl ShotEvent {
    pub fn is_save(&self) -> bool {
        self.outcome == ShotOutcome::Save
    }

    pub fn is_goal(&self) -> bool {
        self.outcome == ShotOutcome::Goal
    }

    pub fn is_controlled_save(&self) -> bool {
        self.is_save() && self.is_controlled
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::shot;
    use super::*;

    #[test]
    fn test_situation_from_pk_flag() {
        assert_eq!(
            GameSituation::from_penalty_kill(true),
            GameSituation::PenaltyKill
        );
        assert_eq!(
            GameSituation::from_penalty_kill(false),
            GameSituation::EvenStrength
        );
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&ShotOutcome::Save).unwrap(), "\"SAVE\"");
        assert_eq!(
            serde_json::to_string(&GameSituation::PenaltyKill).unwrap(),
            "\"PK\""
        );
        assert_eq!("Goal".parse::<ShotOutcome>(), Ok(ShotOutcome::Goal));
    }

    #[test]
    fn test_event_json_field_names() {
        let mut e = shot(ShotOutcome::Save, 2);
        e.placement = None;
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["timeRemaining"], "15:00");
        assert_eq!(v["isControlled"], false);
        assert!(v["placement"].is_null());
        let back: ShotEvent = serde_json::from_value(v).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_controlled_only_counts_for_saves() {
        let mut goal = shot(ShotOutcome::Goal, 1);
        goal.is_controlled = true;
        assert!(!goal.is_controlled_save());
        let mut save = shot(ShotOutcome::Save, 1);
        save.is_controlled = true;
        assert!(save.is_controlled_save());
    }
}

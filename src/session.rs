//! Live games and finalized game sessions.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::{CaptureContext, CaptureError, CaptureInput, Step};
use crate::config::GameSettings;
use crate::event_log::EventLog;
use crate::stats::{self, OverallStats};

pub type SessionId = Uuid;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub opponent: String,
    pub location: String,
    pub date: NaiveDateTime,
}

impl GameMetadata {
    /// Fill blanks the way the setup screen does: placeholder opponent,
    /// default arena, local time now.
    pub fn with_defaults(
        opponent: Option<&str>,
        location: Option<&str>,
        date: Option<NaiveDateTime>,
        game: &GameSettings,
    ) -> Self {
        let opponent = match opponent.map(str::trim) {
            Some(o) if !o.is_empty() => o.to_string(),
            _ => game.opponent_placeholder.clone(),
        };
        let location = location
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| game.default_location.clone());
        let date = date.unwrap_or_else(local_now_minutes);
        Self {
            opponent,
            location,
            date,
        }
    }
}

fn local_now_minutes() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

pub fn parse_game_date(s: &str) -> Result<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
        .ok_or_else(|| anyhow!("invalid date '{s}', expected YYYY-MM-DDTHH:MM"))
}

/// A game being recorded. Owns the only mutable event log.
#[derive(Debug, Clone)]
pub struct LiveGame {
    id: SessionId,
    metadata: GameMetadata,
    log: EventLog,
    capture: CaptureContext,
}

impl LiveGame {
    pub fn start(metadata: GameMetadata, game: &GameSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            log: EventLog::new(),
            capture: CaptureContext::new(game.period_clock),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn metadata(&self) -> &GameMetadata {
        &self.metadata
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn capture(&self) -> &CaptureContext {
        &self.capture
    }

    pub fn apply(&mut self, input: CaptureInput) -> Result<Step, CaptureError> {
        self.capture.apply(input, &mut self.log)
    }

    pub fn adjust_period(&mut self, delta: i32, max_period: u32) -> u32 {
        self.capture.adjust_period(delta, max_period)
    }

    /// Freeze into a read-only session; any shot still in progress is dropped.
    pub fn finalize(self) -> GameSession {
        let summary_stats = stats::overall_stats(self.log.all());
        GameSession {
            id: self.id,
            metadata: self.metadata,
            events: self.log,
            summary_stats,
            finalized_at: Utc::now(),
        }
    }
}

/// A finished game. Nothing here can be changed after finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    id: SessionId,
    metadata: GameMetadata,
    events: EventLog,
    /// Snapshot taken at finalize time, not recomputed.
    summary_stats: OverallStats,
    finalized_at: DateTime<Utc>,
}

impl GameSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn metadata(&self) -> &GameMetadata {
        &self.metadata
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn summary_stats(&self) -> OverallStats {
        self.summary_stats
    }

    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }

    /// One line of the history list.
    pub fn listing(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "opponent": self.metadata.opponent,
            "location": self.metadata.location,
            "date": self.metadata.date,
            "shots": self.events.size(),
            "stats": self.summary_stats,
            "finalizedAt": self.finalized_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FloorPoint, GoalPoint};
    use crate::shot::ShotOutcome;

    fn settings() -> GameSettings {
        GameSettings::default()
    }

    #[test]
    fn test_metadata_defaults() {
        let m = GameMetadata::with_defaults(Some("   "), None, None, &settings());
        assert_eq!(m.opponent, "Unknown Opponent");
        assert_eq!(m.location, "Home Arena");
        assert_eq!(m.date.second(), 0);

        let date = parse_game_date("2026-10-19T19:30").unwrap();
        let m = GameMetadata::with_defaults(Some(" Northmen "), Some("Rock"), Some(date), &settings());
        assert_eq!(m.opponent, "Northmen");
        assert_eq!(m.location, "Rock");
        assert_eq!(m.date, date);
    }

    #[test]
    fn test_parse_game_date() {
        assert!(parse_game_date("2026-10-19T19:30:15").is_ok());
        assert!(parse_game_date("19/10/2026").is_err());
    }

    #[test]
    fn test_finalize_snapshots_stats() {
        let meta = GameMetadata::with_defaults(Some("A"), None, None, &settings());
        let mut g = LiveGame::start(meta, &settings());
        for outcome in [ShotOutcome::Save, ShotOutcome::Save, ShotOutcome::Goal] {
            g.apply(CaptureInput::Origin(FloorPoint::new(10.0, 10.0))).unwrap();
            g.apply(CaptureInput::Placement(GoalPoint::new(10.0, 10.0))).unwrap();
            g.apply(CaptureInput::Outcome(outcome)).unwrap();
        }
        // in-progress shot is not part of the session
        g.apply(CaptureInput::Origin(FloorPoint::new(1.0, 1.0))).unwrap();

        let id = g.id();
        let s = g.finalize();
        assert_eq!(s.id(), id);
        assert_eq!(s.events().size(), 3);
        assert_eq!(s.listing()["finalizedAt"], serde_json::json!(s.finalized_at()));
        assert_eq!(s.listing()["shots"], 3);
        assert_eq!(
            s.summary_stats(),
            OverallStats {
                total: 3,
                saves: 2,
                goals: 1,
                percentage: 67
            }
        );
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let meta = GameMetadata::with_defaults(Some("B"), Some("Away"), None, &settings());
        let mut g = LiveGame::start(meta, &settings());
        g.apply(CaptureInput::Origin(FloorPoint::new(0.1 + 0.2, 33.333333333333336)))
            .unwrap();
        g.apply(CaptureInput::Placement(GoalPoint::new(-4.25, 101.5)))
            .unwrap();
        g.apply(CaptureInput::Outcome(ShotOutcome::Goal)).unwrap();
        let s = g.finalize();

        let json = serde_json::to_string(&s).unwrap();
        let back: GameSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(json.contains("\"summaryStats\""));
        assert!(json.contains("\"finalizedAt\""));
    }
}

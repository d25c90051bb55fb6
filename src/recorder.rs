//! The daemon's single recording context: one live game, the stored
//! history, and an optional read-only session being viewed.

use chrono::NaiveDateTime;
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use thiserror::Error;

use crate::capture::{CaptureError, CaptureInput, Step};
use crate::config::Config;
use crate::density::{self, DensityBand};
use crate::event_log::EventLog;
use crate::geometry::{FloorPoint, GoalPoint, Point};
use crate::session::{GameMetadata, GameSession, LiveGame, SessionId};
use crate::shot::ShotEvent;
use crate::stats::{self, StatsReport};
use crate::store::SessionRepository;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("no game in progress; run `boxlax new` first")]
    NoLiveGame,
    #[error("viewing a stored session (read-only); run `boxlax close` first")]
    ReadOnly,
    #[error("a game with {0} shots is in progress; finish it or pass --force")]
    GameInProgress(usize),
    #[error("no stored session with id {0}")]
    UnknownSession(String),
}

pub struct Recorder<R: SessionRepository> {
    config: Config,
    repo: R,
    /// most recent first
    history: Vec<GameSession>,
    live: Option<LiveGame>,
    viewing: Option<GameSession>,
}

impl<R: SessionRepository> Recorder<R> {
    pub fn new(config: Config, repo: R) -> Self {
        let history = repo.load_all();
        Self {
            config,
            repo,
            history,
            live: None,
            viewing: None,
        }
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn status(&self) -> Value {
        let live = self.live.as_ref().map(|g| {
            json!({
                "id": g.id(),
                "opponent": g.metadata().opponent,
                "state": g.capture().state(),
                "period": g.capture().period(),
                "clock": g.capture().clock(),
                "pending": g.capture().pending(),
                "shots": g.log().size(),
            })
        });
        json!({
            "mode": if self.viewing.is_some() { "history" } else { "live" },
            "live": live,
            "viewing": self.viewing.as_ref().map(|s| s.id()),
            "history_len": self.history.len(),
        })
    }

    pub fn new_game(
        &mut self,
        opponent: Option<&str>,
        location: Option<&str>,
        date: Option<NaiveDateTime>,
        force: bool,
    ) -> Result<Value, RecorderError> {
        if let Some(g) = &self.live {
            if !g.log().is_empty() && !force {
                return Err(RecorderError::GameInProgress(g.log().size()));
            }
            if !g.log().is_empty() {
                warn!("discarding unfinished game with {} shots", g.log().size());
            }
        }
        let metadata = GameMetadata::with_defaults(opponent, location, date, &self.config.game);
        let game = LiveGame::start(metadata, &self.config.game);
        info!("new game {} vs {}", game.id(), game.metadata().opponent);
        let out = json!({"id": game.id(), "metadata": game.metadata()});
        self.live = Some(game);
        self.viewing = None;
        Ok(out)
    }

    fn live_mut(&mut self) -> Result<&mut LiveGame, RecorderError> {
        if self.viewing.is_some() {
            return Err(RecorderError::ReadOnly);
        }
        self.live.as_mut().ok_or(RecorderError::NoLiveGame)
    }

    fn prepare_tap(&self, p: Point, surface: &str) -> Point {
        if p.in_range() {
            return p;
        }
        if self.config.game.clamp_taps {
            debug!("clamping {surface} tap ({:.1}, {:.1})", p.x, p.y);
            p.clamped()
        } else {
            warn!("{surface} tap outside surface: ({:.1}, {:.1})", p.x, p.y);
            p
        }
    }

    pub fn tap_floor(&mut self, p: Point) -> Result<Value, RecorderError> {
        let p = self.prepare_tap(p, "floor");
        self.capture(CaptureInput::Origin(FloorPoint::new(p.x, p.y)))
    }

    pub fn tap_goal(&mut self, p: Point) -> Result<Value, RecorderError> {
        let p = self.prepare_tap(p, "goal");
        self.capture(CaptureInput::Placement(GoalPoint::new(p.x, p.y)))
    }

    pub fn capture(&mut self, input: CaptureInput) -> Result<Value, RecorderError> {
        let game = self.live_mut()?;
        let step = game.apply(input)?;
        let ctx = game.capture();
        let mut out = json!({
            "state": ctx.state(),
            "pending": ctx.pending(),
            "clock": ctx.clock(),
            "shots": game.log().size(),
        });
        match step {
            Step::Committed(id) => {
                out["committed"] = json!(id);
                info!("shot {} recorded ({} total)", id, game.log().size());
            }
            Step::Cancelled => out["cancelled"] = json!(true),
            Step::Advanced(_) | Step::Updated => {}
        }
        Ok(out)
    }

    pub fn adjust_period(&mut self, delta: i32) -> Result<Value, RecorderError> {
        let max = self.config.game.max_period;
        let game = self.live_mut()?;
        let period = game.adjust_period(delta, max);
        Ok(json!({"period": period}))
    }

    /// Log of the viewed session, else of the live game.
    fn event_log(&self) -> Option<&EventLog> {
        match (&self.viewing, &self.live) {
            (Some(s), _) => Some(s.events()),
            (None, Some(g)) => Some(g.log()),
            (None, None) => None,
        }
    }

    pub fn events(&self) -> Option<&[ShotEvent]> {
        self.event_log().map(EventLog::all)
    }

    fn events_or_err(&self) -> Result<&[ShotEvent], RecorderError> {
        self.events().ok_or(RecorderError::NoLiveGame)
    }

    /// All shots, or only those of `period`.
    pub fn shots(&self, period: Option<u32>) -> Result<Value, RecorderError> {
        let log = self.event_log().ok_or(RecorderError::NoLiveGame)?;
        let shots: Vec<&ShotEvent> = match period {
            Some(p) => log.events_in_period(p).collect(),
            None => log.all().iter().collect(),
        };
        Ok(json!({"shots": shots}))
    }

    pub fn stats(&self) -> Result<StatsReport, RecorderError> {
        Ok(stats::report(self.events_or_err()?))
    }

    pub fn heatmap(&self) -> Result<Vec<DensityBand>, RecorderError> {
        Ok(density::goal_density(self.events_or_err()?))
    }

    /// The finished session always lands in history. If saving fails it is
    /// held in memory and written with the next successful save; the reply
    /// carries `"persisted": false` and the reason.
    pub fn finish(&mut self) -> Result<Value, RecorderError> {
        self.live_mut()?;
        let Some(game) = self.live.take() else {
            return Err(RecorderError::NoLiveGame);
        };
        let session = game.finalize();
        let mut out = json!({
            "id": session.id(),
            "stats": session.summary_stats(),
            "persisted": true,
        });
        info!(
            "finished game {} vs {} ({} shots)",
            session.id(),
            session.metadata().opponent,
            session.events().size()
        );
        self.history.insert(0, session);
        if let Err(e) = self.repo.save_all(&self.history) {
            error!("history save failed, keeping session in memory: {e:#}");
            out["persisted"] = json!(false);
            out["warning"] = json!(format!("failed to persist history: {e:#}"));
        }
        Ok(out)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> Value {
        let list: Vec<Value> = self.history.iter().map(GameSession::listing).collect();
        json!({"sessions": list})
    }

    pub fn view(&mut self, id: &str) -> Result<Value, RecorderError> {
        let session = id
            .parse::<SessionId>()
            .ok()
            .and_then(|sid| self.history.iter().find(|s| s.id() == sid))
            .cloned()
            .ok_or_else(|| RecorderError::UnknownSession(id.to_string()))?;
        let out = json!({
            "metadata": session.metadata(),
            "summaryStats": session.summary_stats(),
            "shots": session.events().size(),
        });
        self.viewing = Some(session);
        Ok(out)
    }

    pub fn close(&mut self) -> Value {
        let closed = self.viewing.take().map(|s| s.id());
        json!({"closed": closed, "live": self.live.as_ref().map(LiveGame::id)})
    }

    /// Called on daemon exit.
    pub fn shutdown(&mut self) {
        if let Some(g) = self.live.take() {
            if !g.log().is_empty() {
                warn!(
                    "discarding unfinished game vs {} with {} shots",
                    g.metadata().opponent,
                    g.log().size()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureState, Modifier};
    use crate::shot::ShotOutcome;
    use crate::store::memory::MemoryStore;

    fn recorder() -> Recorder<MemoryStore> {
        Recorder::new(Config::default(), MemoryStore::default())
    }

    fn record(r: &mut Recorder<MemoryStore>, outcome: ShotOutcome) {
        r.tap_floor(Point::new(30.0, 70.0)).unwrap();
        r.tap_goal(Point::new(20.0, 20.0)).unwrap();
        r.capture(CaptureInput::Outcome(outcome)).unwrap();
    }

    #[test]
    fn test_capture_requires_game() {
        let mut r = recorder();
        assert!(matches!(
            r.tap_floor(Point::new(1.0, 1.0)),
            Err(RecorderError::NoLiveGame)
        ));
        assert!(r.stats().is_err());
    }

    #[test]
    fn test_full_game_flow() {
        let mut r = recorder();
        r.new_game(Some("Northmen"), None, None, false).unwrap();
        record(&mut r, ShotOutcome::Save);
        r.adjust_period(1).unwrap();
        r.tap_floor(Point::new(50.0, 90.0)).unwrap();
        r.tap_goal(Point::new(80.0, 80.0)).unwrap();
        r.capture(CaptureInput::Toggle(Modifier::PenaltyKill)).unwrap();
        let out = r.capture(CaptureInput::Outcome(ShotOutcome::Goal)).unwrap();
        assert!(out.get("committed").is_some());

        let st = r.stats().unwrap();
        assert_eq!(st.overall.total, 2);
        assert_eq!(st.per_period.len(), 2);
        assert_eq!(st.penalty_kill.pk_total, 1);
        assert_eq!(r.heatmap().unwrap().len(), density::BAND_COUNT);

        let out = r.finish().unwrap();
        assert_eq!(out["stats"]["percentage"], 50);
        assert_eq!(out["persisted"], true);
        assert_eq!(r.repo.sessions.borrow().len(), 1);
        assert!(r.events().is_none());
    }

    #[test]
    fn test_history_is_most_recent_first_and_read_only() {
        let mut r = recorder();
        r.new_game(Some("First"), None, None, false).unwrap();
        record(&mut r, ShotOutcome::Save);
        r.finish().unwrap();
        r.new_game(Some("Second"), None, None, false).unwrap();
        record(&mut r, ShotOutcome::Goal);
        r.finish().unwrap();

        let h = r.history();
        assert_eq!(h["sessions"][0]["opponent"], "Second");
        assert_eq!(h["sessions"][1]["opponent"], "First");

        let id = r.history[1].id().to_string();
        r.new_game(None, None, None, false).unwrap();
        r.view(&id).unwrap();
        assert_eq!(r.events().map(<[ShotEvent]>::len), Some(1));
        assert_eq!(r.stats().unwrap().overall.saves, 1);
        assert!(matches!(
            r.tap_floor(Point::new(1.0, 1.0)),
            Err(RecorderError::ReadOnly)
        ));
        assert!(matches!(r.finish(), Err(RecorderError::ReadOnly)));

        r.close();
        r.tap_floor(Point::new(1.0, 1.0)).unwrap();
    }

    #[test]
    fn test_history_reloads_from_repository() {
        let mut r = recorder();
        r.new_game(Some("Persisted"), None, None, false).unwrap();
        record(&mut r, ShotOutcome::Save);
        r.finish().unwrap();

        let saved = r.repo.sessions.borrow().clone();
        let store = MemoryStore::default();
        *store.sessions.borrow_mut() = saved;
        let again = Recorder::new(Config::default(), store);
        assert_eq!(again.history.len(), 1);
        assert_eq!(again.history[0].metadata().opponent, "Persisted");
    }

    struct BrokenStore;

    impl SessionRepository for BrokenStore {
        fn load_all(&self) -> Vec<GameSession> {
            Vec::new()
        }

        fn save_all(&self, _sessions: &[GameSession]) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    #[test]
    fn test_finish_keeps_session_when_save_fails() {
        let mut r = Recorder::new(Config::default(), BrokenStore);
        r.new_game(Some("Unsaved"), None, None, false).unwrap();
        r.tap_floor(Point::new(30.0, 70.0)).unwrap();
        r.tap_goal(Point::new(20.0, 20.0)).unwrap();
        r.capture(CaptureInput::Outcome(ShotOutcome::Save)).unwrap();

        let out = r.finish().unwrap();
        assert_eq!(out["persisted"], false);
        assert!(out["warning"].as_str().unwrap().contains("disk full"));
        assert_eq!(r.history()["sessions"][0]["opponent"], "Unsaved");
        assert!(matches!(r.finish(), Err(RecorderError::NoLiveGame)));
    }

    #[test]
    fn test_shots_filtered_by_period() {
        let mut r = recorder();
        r.new_game(None, None, None, false).unwrap();
        record(&mut r, ShotOutcome::Save);
        r.adjust_period(2).unwrap();
        record(&mut r, ShotOutcome::Goal);
        record(&mut r, ShotOutcome::Save);

        let all = r.shots(None).unwrap();
        assert_eq!(all["shots"].as_array().unwrap().len(), 3);
        let third = r.shots(Some(3)).unwrap();
        let third = third["shots"].as_array().unwrap();
        assert_eq!(third.len(), 2);
        assert!(third.iter().all(|s| s["period"] == 3));
        assert!(r.shots(Some(2)).unwrap()["shots"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_view_unknown_session() {
        let mut r = recorder();
        assert!(matches!(
            r.view("not-a-uuid"),
            Err(RecorderError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_new_game_guards_unfinished_shots() {
        let mut r = recorder();
        r.new_game(None, None, None, false).unwrap();
        r.new_game(None, None, None, false).unwrap();
        record(&mut r, ShotOutcome::Save);
        assert!(matches!(
            r.new_game(None, None, None, false),
            Err(RecorderError::GameInProgress(1))
        ));
        r.new_game(None, None, None, true).unwrap();
        assert_eq!(r.events().map(<[ShotEvent]>::len), Some(0));
    }

    #[test]
    fn test_out_of_range_taps() {
        let mut r = recorder();
        r.new_game(None, None, None, false).unwrap();
        r.tap_floor(Point::new(-5.0, 120.0)).unwrap();
        r.tap_goal(Point::new(50.0, 50.0)).unwrap();
        r.capture(CaptureInput::Outcome(ShotOutcome::Save)).unwrap();
        assert_eq!(r.events().unwrap()[0].origin, FloorPoint::new(-5.0, 120.0));

        let mut cfg = Config::default();
        cfg.game.clamp_taps = true;
        r.set_config(cfg);
        r.tap_floor(Point::new(-5.0, 120.0)).unwrap();
        r.tap_goal(Point::new(50.0, 50.0)).unwrap();
        r.capture(CaptureInput::Outcome(ShotOutcome::Save)).unwrap();
        assert_eq!(r.events().unwrap()[1].origin, FloorPoint::new(0.0, 100.0));
    }

    #[test]
    fn test_period_clamped_by_config() {
        let mut r = recorder();
        r.new_game(None, None, None, false).unwrap();
        let out = r.adjust_period(10).unwrap();
        assert_eq!(out["period"], 4);
        let out = r.adjust_period(-10).unwrap();
        assert_eq!(out["period"], 1);
    }

    #[test]
    fn test_status_reports_capture_state() {
        let mut r = recorder();
        r.new_game(None, None, None, false).unwrap();
        r.tap_floor(Point::new(10.0, 10.0)).unwrap();
        let s = r.status();
        assert_eq!(s["live"]["state"], json!(CaptureState::AwaitingPlacement));
        assert_eq!(s["live"]["clock"], "15:00");
        assert_eq!(s["mode"], "live");
    }
}

use anyhow::{Result, anyhow};
use log::{error, info};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{fmt::Display, str::FromStr};

use super::server::DaemonState;
use crate::capture::{CaptureInput, Modifier};
use crate::clock::ClockUnit;
use crate::geometry::Point;
use crate::session::parse_game_date;
use crate::shot::ShotOutcome;

/// One request line. Enum-valued fields arrive as the same strings the CLI
/// accepts and are parsed here.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(super) enum Request {
    Status,
    Reload,
    Doctor,
    Shutdown,
    NewGame {
        opponent: Option<String>,
        location: Option<String>,
        date: Option<String>,
        #[serde(default)]
        force: bool,
    },
    Origin {
        x: f64,
        y: f64,
    },
    Placement {
        x: f64,
        y: f64,
    },
    Toggle {
        modifier: String,
    },
    Clock {
        unit: String,
        delta: i32,
    },
    Period {
        delta: i32,
    },
    Outcome {
        outcome: String,
    },
    Cancel,
    Shots {
        #[serde(default)]
        period: Option<u32>,
    },
    Stats,
    Heatmap,
    Finish,
    History,
    View {
        id: String,
    },
    Close,
}

pub(super) fn ok(data: Value) -> Value {
    json!({"ok": true, "data": data})
}

pub(super) fn err(e: impl Display) -> Value {
    json!({"ok": false, "error": e.to_string()})
}

fn parse<T: FromStr<Err = String>>(s: &str) -> Result<T> {
    s.parse::<T>().map_err(|e| anyhow!(e))
}

pub(super) fn handle(req: Request, st: &mut DaemonState) -> Value {
    match run(req, st) {
        Ok(v) => ok(v),
        Err(e) => err(format!("{e:#}")),
    }
}

fn run(req: Request, st: &mut DaemonState) -> Result<Value> {
    let data = match req {
        Request::Status => {
            let mut v = st.recorder.status();
            v["profile"] = json!(st.cfg.config.meta.name);
            v["socket"] = json!(super::runtime::socket_path()?);
            v
        }
        Request::Reload => {
            st.reload()?;
            json!({"profile": st.cfg.config.meta.name})
        }
        Request::Doctor => st.cfg.doctor_report(),
        // handled by the server loop
        Request::Shutdown => json!("shutting down"),
        Request::NewGame {
            opponent,
            location,
            date,
            force,
        } => {
            let date = date.as_deref().map(parse_game_date).transpose()?;
            st.recorder.new_game(opponent.as_deref(), location.as_deref(), date, force)?
        }
        Request::Origin { x, y } => st.recorder.tap_floor(Point::new(x, y))?,
        Request::Placement { x, y } => st.recorder.tap_goal(Point::new(x, y))?,
        Request::Toggle { modifier } => {
            st.recorder.capture(CaptureInput::Toggle(parse::<Modifier>(&modifier)?))?
        }
        Request::Clock { unit, delta } => {
            st.recorder.capture(CaptureInput::AdjustClock(parse::<ClockUnit>(&unit)?, delta))?
        }
        Request::Period { delta } => st.recorder.adjust_period(delta)?,
        Request::Outcome { outcome } => {
            st.recorder.capture(CaptureInput::Outcome(parse::<ShotOutcome>(&outcome)?))?
        }
        Request::Cancel => st.recorder.capture(CaptureInput::Cancel)?,
        Request::Shots { period } => st.recorder.shots(period)?,
        Request::Stats => serde_json::to_value(st.recorder.stats()?)?,
        Request::Heatmap => {
            let bands: Vec<Value> = st.recorder
                .heatmap()?
                .iter()
                .map(|b| {
                    json!({
                        "rank": b.rank,
                        "threshold": b.threshold,
                        "opacity": b.opacity,
                        "rings": b.rings.len(),
                        "path": b.svg_path(),
                    })
                })
                .collect();
            json!({"bands": bands})
        }
        Request::Finish => st.recorder.finish()?,
        Request::History => st.recorder.history(),
        Request::View { id } => st.recorder.view(&id)?,
        Request::Close => st.recorder.close(),
    };
    Ok(data)
}

/// Parse and answer one raw request line.
pub(super) fn handle_line(line: &str, st: &mut DaemonState) -> (Value, bool) {
    let req: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            error!("bad request: {e}");
            return (err(format!("bad request: {e}")), false);
        }
    };
    let shutdown = matches!(req, Request::Shutdown);
    if shutdown {
        info!("shutdown requested");
    }
    (handle(req, st), shutdown)
}

//! Coach's-report generation through an external text generator.
//!
//! The generator sees a rounded projection of the shots plus the overall
//! totals. It never touches the event log, and its failures turn into an
//! "analysis unavailable" message instead of an error.

use log::{error, info};
use serde::Serialize;
use std::{
    io::{self, Write},
    process::{Command, Stdio},
    thread,
};
use thiserror::Error;

use crate::config::Config;
use crate::shot::{GameSituation, ShotEvent, ShotOutcome};
use crate::stats;

pub const EMPTY_MESSAGE: &str = "No shots recorded yet, so there is nothing to analyze.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary command not configured")]
    NotConfigured,
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
    #[error("failed to write prompt to '{program}': {source}")]
    Stdin {
        program: String,
        source: io::Error,
    },
    #[error("summary command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("summary command produced no text")]
    Empty,
}

pub trait Summarizer {
    fn summarize(&self, events: &[ShotEvent]) -> Result<String, SummaryError>;
}

/// What the generator gets to see of one shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotDigest {
    pub result: ShotOutcome,
    pub origin_x: i64,
    pub origin_y: i64,
    pub placement_x: Option<i64>,
    pub placement_y: Option<i64>,
    pub situation: GameSituation,
    pub rebound: bool,
}

impl From<&ShotEvent> for ShotDigest {
    fn from(e: &ShotEvent) -> Self {
        let (origin_x, origin_y) = e.origin.point().rounded();
        let placement = e.placement.map(|p| p.point().rounded());
        Self {
            result: e.outcome,
            origin_x,
            origin_y,
            placement_x: placement.map(|p| p.0),
            placement_y: placement.map(|p| p.1),
            situation: e.situation,
            rebound: e.is_rebound,
        }
    }
}

pub fn build_prompt(events: &[ShotEvent]) -> String {
    let totals = stats::overall_stats(events);
    let digest: Vec<ShotDigest> = events.iter().map(ShotDigest::from).collect();
    let log = serde_json::to_string(&digest).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are an expert box lacrosse goalie coach.
Analyze the following shot data from a single game.

Data context:
- Floor origin X: 0 (left boards) to 100 (right boards). 50 is center.
- Floor origin Y: 0 (center line) to 100 (goal line).
- Goal placement X: 0 (left post) to 100 (right post), goalie's perspective.
- Goal placement Y: 0 (top bar) to 100 (floor).

Stats:
- Total shots: {total}
- Saves: {saves}
- Goals allowed: {goals}
- Save percentage: {pct}%

Shot log (JSON):
{log}

Write a concise coach's report (max 200 words) in Markdown covering:
1. Weaknesses: where goals are beating the goalie (high stick side, five-hole, low glove...).
2. Origin trends: where the scoring shots come from (the point, the crease...).
3. Specific advice for the next period or game.

Tone: constructive, professional, analytical.
",
        total = totals.total,
        saves = totals.saves,
        goals = totals.goals,
        pct = totals.percentage,
    )
}

/// Pipes the prompt through a user-configured program.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
}

impl CommandSummarizer {
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// `None` unless commands are allowed and one is set.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        if !cfg.meta.allow_commands {
            return None;
        }
        Self::new(&cfg.summary.command)
    }
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, events: &[ShotEvent]) -> Result<String, SummaryError> {
        let prompt = build_prompt(events);
        let spawn_err = |source| SummaryError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // written from a thread so a child echoing a long prompt cannot
        // stall on a full stdout pipe; the child is reaped either way
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(prompt.as_bytes()),
            None => Ok(()),
        });
        let out = child.wait_with_output().map_err(spawn_err)?;
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("prompt writer panicked")));
        if let Err(source) = written {
            return Err(SummaryError::Stdin {
                program: self.program.clone(),
                source,
            });
        }
        if !out.status.success() {
            return Err(SummaryError::Failed {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if text.is_empty() {
            return Err(SummaryError::Empty);
        }
        Ok(text)
    }
}

/// Always returns something printable.
pub fn analyze(summarizer: Option<&dyn Summarizer>, events: &[ShotEvent]) -> String {
    if events.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }
    let Some(summarizer) = summarizer else {
        return format!("analysis unavailable: {}", SummaryError::NotConfigured);
    };
    match summarizer.summarize(events) {
        Ok(text) => {
            info!("summary generated for {} shots", events.len());
            text
        }
        Err(e) => {
            error!("summary failed: {e}");
            format!("analysis unavailable: {e}")
        }
    }
}

use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::clock::GameClock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub name: Option<String>,
    pub allow_commands: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub default_location: String,
    pub opponent_placeholder: String,
    pub period_clock: GameClock,
    pub max_period: u32,
    /// Pull taps that land off the surface back into 0..100.
    pub clamp_taps: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// argv; the prompt is written to its stdin
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub meta: Meta,
    pub game: GameSettings,
    pub summary: SummarySettings,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: Some("default".to_string()),
            allow_commands: false,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_location: "Home Arena".to_string(),
            opponent_placeholder: "Unknown Opponent".to_string(),
            period_clock: GameClock::new(15, 0),
            max_period: 4,
            clamp_taps: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub config: Config,
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("boxlax"))
}

fn default_config_text() -> &'static str {
    include_str!("../config/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(&config_dir()?)
    }

    pub fn load_or_install_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = dir.join("config.toml");
        if !path.exists() {
            fs::write(&path, default_config_text())?;
            info!("installed default config at {}", path.display());
        }

        let config = load_config(&path)?;
        Ok(Self {
            config,
            config_dir: dir.to_path_buf(),
            config_path: path,
        })
    }

    /// Keeps the last good config when the file on disk is invalid.
    pub fn reload(&mut self) -> Result<()> {
        self.config = load_config(&self.config_path)?;
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.config_dir.join("history.json")
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let summary_cmd = &self.config.summary.command;
        serde_json::json!({
            "config_path": self.config_path,
            "config_present": self.config_path.exists(),
            "history_path": self.history_path(),
            "history_present": self.history_path().exists(),
            "profile": self.config.meta.name,
            "summary": {
                "command": summary_cmd,
                "allow_commands": self.config.meta.allow_commands,
                "enabled": self.config.meta.allow_commands && !summary_cmd.is_empty(),
            },
            "hints": {
                "enable_summary": "set meta.allow_commands = true and summary.command = [\"<cmd>\", ...]",
                "verbose_logs": "RUST_LOG=debug boxlax start"
            }
        })
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let txt = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    let config = parse_config(&txt).map_err(|e| anyhow!("{}: {e}", path.display()))?;
    Ok(config)
}

pub fn parse_config(txt: &str) -> Result<Config> {
    let config: Config = toml::from_str(txt).map_err(|e| anyhow!("failed to parse: {e}"))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(c: &Config) -> Result<()> {
    if c.game.max_period == 0 {
        return Err(anyhow!("game.max_period must be at least 1"));
    }
    if c.game.opponent_placeholder.trim().is_empty() {
        return Err(anyhow!("game.opponent_placeholder must not be blank"));
    }
    if let Some(prog) = c.summary.command.first() {
        if prog.trim().is_empty() {
            return Err(anyhow!("summary.command program must not be blank"));
        }
    }
    Ok(())
}

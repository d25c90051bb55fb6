use anyhow::{Result, anyhow};
use pico_args::Arguments;
use serde_json::{Value, json};
use std::{env, process::Command};

use crate::config::ConfigState;
use crate::geometry::Surface;
use crate::ipc;
use crate::shot::ShotEvent;
use crate::summary::{self, CommandSummarizer, Summarizer};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("boxlax: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("stop") => request(json!({"op": "shutdown"})),
        Some("status") => request(json!({"op": "status"})),
        Some("reload") => request(json!({"op": "reload"})),
        Some("doctor") => request(json!({"op": "doctor"})),

        Some("new") => {
            // options first: free args are taken positionally
            let force = pargs.contains("--force");
            let opponent: Option<String> = pargs.opt_value_from_str("--opponent")?;
            let location: Option<String> = pargs.opt_value_from_str("--location")?;
            let date: Option<String> = pargs.opt_value_from_str("--date")?;
            request(json!({
                "op": "new_game",
                "opponent": opponent,
                "location": location,
                "date": date,
                "force": force,
            }))
        }

        Some(op @ ("origin" | "placement")) => {
            let surface: Option<Surface> = pargs.opt_value_from_fn("--surface", parse_surface)?;
            let usage = || anyhow!("usage: boxlax {op} <x> <y> [--surface L,T,W,H]");
            let x: f64 = pargs.free_from_str().map_err(|_| usage())?;
            let y: f64 = pargs.free_from_str().map_err(|_| usage())?;
            let (x, y) = match surface {
                Some(s) => {
                    let p = s.normalize(x, y);
                    (p.x, p.y)
                }
                None => (x, y),
            };
            request(json!({"op": op, "x": x, "y": y}))
        }

        Some("toggle") => {
            let modifier: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: boxlax toggle <pk|rebound|controlled>"))?;
            request(json!({"op": "toggle", "modifier": modifier}))
        }

        Some("clock") => {
            let usage = || anyhow!("usage: boxlax clock <min|sec> <+N|-N>");
            let unit: String = pargs.free_from_str().map_err(|_| usage())?;
            let delta: i32 = pargs.free_from_fn(parse_delta).map_err(|_| usage())?;
            request(json!({"op": "clock", "unit": unit, "delta": delta}))
        }

        Some("period") => {
            let delta: i32 = pargs
                .free_from_fn(parse_delta)
                .map_err(|_| anyhow!("usage: boxlax period <+N|-N>"))?;
            request(json!({"op": "period", "delta": delta}))
        }

        Some(outcome @ ("save" | "goal")) => request(json!({"op": "outcome", "outcome": outcome})),
        Some("cancel") => request(json!({"op": "cancel"})),
        Some("shots") => {
            let period: Option<u32> = pargs.opt_value_from_str("--period")?;
            request(json!({"op": "shots", "period": period}))
        }
        Some("stats") => request(json!({"op": "stats"})),
        Some("heatmap") => request(json!({"op": "heatmap"})),
        Some("finish") => request(json!({"op": "finish"})),
        Some("history") => request(json!({"op": "history"})),
        Some("close") => request(json!({"op": "close"})),

        Some("view") => {
            let id: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: boxlax view <session-id>"))?;
            request(json!({"op": "view", "id": id}))
        }

        Some("analyze") => {
            let data = call(json!({"op": "shots"}))?;
            let events: Vec<ShotEvent> = serde_json::from_value(data["shots"].clone())?;
            let cfg = ConfigState::load_or_install_default()?;
            let summarizer = CommandSummarizer::from_config(&cfg.config);
            let text = summary::analyze(
                summarizer.as_ref().map(|s| s as &dyn Summarizer),
                &events,
            );
            println!("{text}");
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn parse_surface(s: &str) -> Result<Surface, String> {
    Surface::parse(s).ok_or_else(|| format!("invalid surface '{s}', expected L,T,W,H"))
}

/// Accepts `+3` as well as `3` and `-3`.
fn parse_delta(s: &str) -> Result<i32, String> {
    s.strip_prefix('+')
        .unwrap_or(s)
        .parse::<i32>()
        .map_err(|e| format!("invalid step '{s}': {e}"))
}

/// Send one request and unwrap the reply envelope.
fn call(req: Value) -> Result<Value> {
    let mut r = ipc::client_request(req)?;
    if r["ok"].as_bool() == Some(true) {
        Ok(r.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    } else {
        Err(anyhow!(
            "{}",
            r["error"].as_str().unwrap_or("daemon returned an error")
        ))
    }
}

fn request(req: Value) -> Result<()> {
    let data = call(req)?;
    print_response(&data);
    Ok(())
}

fn print_help() {
    println!(
        r#"boxlax - box lacrosse goalie shot tracker

USAGE:
  boxlax help [command]                    Show general or command-specific help
  boxlax start                             Start the recording daemon
  boxlax stop                              Stop the daemon
  boxlax status                            Show game, capture state and clock
  boxlax reload                            Reload config.toml
  boxlax doctor                            Show paths and summary setup

  boxlax new [--opponent N] [--location L] [--date YYYY-MM-DDTHH:MM] [--force]
  boxlax origin <x> <y> [--surface L,T,W,H]     Floor tap (shot origin)
  boxlax placement <x> <y> [--surface L,T,W,H]  Goal tap (shot placement)
  boxlax toggle <pk|rebound|controlled>    Flip a modifier on the pending shot
  boxlax clock <min|sec> <+N|-N>           Adjust the game clock
  boxlax period <+N|-N>                    Change period
  boxlax save | goal                       Commit the pending shot
  boxlax cancel                            Drop the pending shot

  boxlax shots [--period N]                List recorded shots
  boxlax stats                             Save percentages and breakdowns
  boxlax heatmap                           Goal density bands as SVG paths
  boxlax analyze                           Coach's report from the summary command
  boxlax finish                            Finalize the game into history
  boxlax history                           List stored sessions
  boxlax view <id>                         Open a stored session read-only
  boxlax close                             Return to the live game

TIPS:
  - Config: ~/.config/boxlax/config.toml
  - History: ~/.config/boxlax/history.json
  - Coordinates are 0..100 unless --surface gives the tapped rectangle
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: boxlax start\nStarts the background daemon."),
        "stop" => println!("usage: boxlax stop\nStops the daemon. An unfinished game is discarded."),
        "status" => println!(
            "usage: boxlax status\nShows live game, capture state, pending shot, clock and period."
        ),
        "reload" => println!("usage: boxlax reload\nReloads config.toml; keeps last good on error."),
        "doctor" => println!("usage: boxlax doctor\nShows config/history paths and summary setup."),
        "new" => println!(
            "usage: boxlax new [--opponent N] [--location L] [--date YYYY-MM-DDTHH:MM] [--force]\nStarts a game. --force discards an unfinished game with shots."
        ),
        "origin" | "placement" => println!(
            "usage: boxlax {cmd} <x> <y> [--surface L,T,W,H]\nRecords a tap. With --surface, x/y are client coordinates inside that rectangle."
        ),
        "toggle" => println!("usage: boxlax toggle <pk|rebound|controlled>"),
        "clock" => println!(
            "usage: boxlax clock <min|sec> <+N|-N>\nSeconds wrap 00..59 and carry into minutes."
        ),
        "period" => println!("usage: boxlax period <+N|-N>\nPeriod stays within 1..max_period."),
        "save" | "goal" => println!("usage: boxlax {cmd}\nCommits the pending shot with that outcome."),
        "cancel" => println!("usage: boxlax cancel\nDrops the pending shot."),
        "shots" => println!(
            "usage: boxlax shots [--period N]\nLists shots of the viewed session if one is open, else the live game."
        ),
        "stats" | "heatmap" => println!(
            "usage: boxlax {cmd}\nWorks on the viewed session if one is open, else the live game."
        ),
        "analyze" => println!(
            "usage: boxlax analyze\nPipes a prompt to summary.command (needs meta.allow_commands = true)."
        ),
        "finish" => println!("usage: boxlax finish\nFinalizes the live game and saves it to history."),
        "history" => println!("usage: boxlax history\nLists stored sessions, most recent first."),
        "view" => println!("usage: boxlax view <id>\nOpens a stored session read-only."),
        "close" => println!("usage: boxlax close\nCloses the viewed session."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use notify::{EventKind, RecursiveMode, Watcher};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::Path,
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};

use super::dispatch;
use super::runtime::socket_path;
use crate::config::ConfigState;
use crate::recorder::Recorder;
use crate::store::JsonFileStore;

pub(super) struct DaemonState {
    pub cfg: ConfigState,
    pub recorder: Recorder<JsonFileStore>,
}

impl DaemonState {
    fn new() -> Result<Self> {
        Ok(Self::from_config(ConfigState::load_or_install_default()?))
    }

    pub(super) fn from_config(cfg: ConfigState) -> Self {
        let store = JsonFileStore::new(cfg.history_path());
        let recorder = Recorder::new(cfg.config.clone(), store);
        Self { cfg, recorder }
    }

    /// On error the previous config stays active.
    pub(super) fn reload(&mut self) -> Result<()> {
        self.cfg.reload()?;
        self.recorder.set_config(self.cfg.config.clone());
        info!("config reloaded from {}", self.cfg.config_path.display());
        Ok(())
    }
}

enum DaemonEvent {
    Signal(i32),
    ConfigChanged,
}

enum Flow {
    Continue,
    Shutdown,
}

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut state = DaemonState::new()?;
    info!(
        "daemon: profile '{}', {} stored sessions",
        state.cfg.config.meta.name.as_deref().unwrap_or("default"),
        state.recorder.history_len()
    );

    // events
    let (tx_evt, rx_evt) = mpsc::channel::<DaemonEvent>();
    spawn_signal_thread(tx_evt.clone())?;
    let _watcher = match watch_config(&state.cfg.config_dir, tx_evt) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("config watcher unavailable: {e}");
            None
        }
    };

    // accept loop; clients are served one at a time
    listener.set_nonblocking(true)?;
    loop {
        match listener.accept() {
            Ok((stream, _)) => match handle_client(stream, &mut state) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => break,
                Err(e) => error!("ipc client error: {e}"),
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => error!("accept failed: {e}"),
        }

        let mut stop = false;
        while let Ok(evt) = rx_evt.try_recv() {
            match evt {
                DaemonEvent::Signal(sig) => {
                    info!("daemon: caught signal {sig}");
                    stop = true;
                }
                DaemonEvent::ConfigChanged => {
                    if let Err(e) = state.reload() {
                        error!("reload failed, keeping last good config: {e:#}");
                    }
                }
            }
        }
        if stop {
            break;
        }
    }

    state.recorder.shutdown();
    let _ = std::fs::remove_file(&sock);
    info!("daemon: stopped");
    Ok(())
}

fn spawn_signal_thread(tx: Sender<DaemonEvent>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            if tx.send(DaemonEvent::Signal(sig)).is_err() {
                break;
            }
        }
    });
    Ok(())
}

fn watch_config(dir: &Path, tx: Sender<DaemonEvent>) -> Result<notify::RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        let touches_config = event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == "config.toml"));
        if touches_config {
            let _ = tx.send(DaemonEvent::ConfigChanged);
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn handle_client(mut stream: UnixStream, st: &mut DaemonState) -> Result<Flow> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(Flow::Continue);
    }

    let (resp, shutdown) = dispatch::handle_line(&line, st);
    writeln!(stream, "{resp}")?;
    Ok(if shutdown {
        Flow::Shutdown
    } else {
        Flow::Continue
    })
}

// client helper
pub fn client_request(req: serde_json::Value) -> Result<serde_json::Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "boxlax daemon is not running (socket missing at {}); run `boxlax start`",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: serde_json::Value = serde_json::from_str(&resp)?;
    Ok(v)
}

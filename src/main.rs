mod capture;
mod cli;
mod clock;
mod config;
mod density;
mod event_log;
mod geometry;
mod ipc;
mod logging;
mod recorder;
mod session;
mod shot;
mod stats;
mod store;
mod summary;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}

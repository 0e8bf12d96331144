mod app;
mod config;
mod controls;
mod hardware;
mod input;
mod system;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    let settings = match config::load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            init_tracing(None);
            error!(error = %format!("{err:#}"), "failed to load configuration");
            return Err(err);
        }
    };
    init_tracing(settings.log_file.as_deref());
    match settings.path.as_ref() {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no configuration file found; using defaults"),
    }

    let shutdown = system::shutdown::install()?;
    let mut app = app::Daemon::from_settings(&settings, shutdown)?;
    if let Err(err) = app.run() {
        error!(error = %format!("{err:#}"), "event loop stopped");
        return Err(err);
    }
    info!("exiting");
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .compact();

    let file = log_file.map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| (path, err))
    });
    let _ = match file {
        Some(Ok(file)) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        Some(Err((path, err))) => {
            eprintln!("cannot open log file {}: {err}; logging to stderr", path.display());
            builder.try_init()
        }
        None => builder.try_init(),
    };
}

use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;

/// Forwards the first SIGINT or SIGTERM as a message on the returned channel.
pub fn install() -> Result<Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to register termination signals")?;

    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "termination signal received");
                shutdown_tx.send(()).ok();
            }
        })
        .context("failed to spawn signal listener")?;

    Ok(shutdown_rx)
}

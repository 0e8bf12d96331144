use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Fire-and-forget control surface of the media player.
pub trait PlaybackControl: Send {
    fn toggle_pause(&mut self) -> Result<(), PlayerError>;
    fn next(&mut self) -> Result<(), PlayerError>;
    fn previous(&mut self) -> Result<(), PlayerError>;
    fn next_playlist(&mut self) -> Result<(), PlayerError>;
    fn previous_playlist(&mut self) -> Result<(), PlayerError>;
}

/// MPD driven through the `mpc` CLI.
///
/// Playlist stepping walks the stored playlists in the order MPD lists them
/// and wraps around at either end. The position is only remembered for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MpcBackend {
    host: Option<String>,
    port: Option<u16>,
    playlist_index: Option<usize>,
}

impl MpcBackend {
    pub fn new(host: Option<String>, port: Option<u16>) -> Self {
        Self {
            host,
            port,
            playlist_index: None,
        }
    }

    fn run_mpc(&self, args: &[&str]) -> Result<String, PlayerError> {
        let mut command = Command::new("mpc");
        if let Some(host) = &self.host {
            command.arg("--host").arg(host);
        }
        if let Some(port) = self.port {
            command.arg("--port").arg(port.to_string());
        }
        let described = format!("mpc {}", args.join(" "));
        let output = command
            .args(args)
            .output()
            .map_err(|source| PlayerError::Spawn {
                command: described.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PlayerError::CommandFailed {
                command: described,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(command = %described, "mpc succeeded");
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn step_playlist(&mut self, forward: bool) -> Result<(), PlayerError> {
        let listing = self.run_mpc(&["lsplaylists"])?;
        let playlists = parse_playlists(&listing);
        let Some(index) = step_index(self.playlist_index, playlists.len(), forward) else {
            info!("no stored playlists to switch to");
            return Ok(());
        };

        let name = playlists[index];
        self.run_mpc(&["clear"])?;
        self.run_mpc(&["load", name])?;
        self.run_mpc(&["play"])?;
        self.playlist_index = Some(index);
        info!(playlist = %name, index, total = playlists.len(), "switched playlist");
        Ok(())
    }
}

impl PlaybackControl for MpcBackend {
    fn toggle_pause(&mut self) -> Result<(), PlayerError> {
        self.run_mpc(&["toggle"]).map(|_| ())
    }

    fn next(&mut self) -> Result<(), PlayerError> {
        self.run_mpc(&["next"]).map(|_| ())
    }

    fn previous(&mut self) -> Result<(), PlayerError> {
        self.run_mpc(&["prev"]).map(|_| ())
    }

    fn next_playlist(&mut self) -> Result<(), PlayerError> {
        self.step_playlist(true)
    }

    fn previous_playlist(&mut self) -> Result<(), PlayerError> {
        self.step_playlist(false)
    }
}

fn parse_playlists(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn step_index(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let index = match current {
        None if forward => 0,
        None => len - 1,
        Some(current) => {
            // the list may have shrunk since the last step
            let current = current.min(len - 1);
            if forward {
                (current + 1) % len
            } else {
                (current + len - 1) % len
            }
        }
    };
    Some(index)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    /// Records every call; optionally fails all of them.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingPlayer {
        pub calls: Arc<Mutex<Vec<&'static str>>>,
        pub fail: bool,
    }

    impl RecordingPlayer {
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&mut self, call: &'static str) -> Result<(), PlayerError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(PlayerError::CommandFailed {
                    command: format!("mpc {call}"),
                    code: 1,
                    stderr: "MPD error: Connection refused".into(),
                });
            }
            Ok(())
        }
    }

    impl PlaybackControl for RecordingPlayer {
        fn toggle_pause(&mut self) -> Result<(), PlayerError> {
            self.record("toggle_pause")
        }

        fn next(&mut self) -> Result<(), PlayerError> {
            self.record("next")
        }

        fn previous(&mut self) -> Result<(), PlayerError> {
            self.record("previous")
        }

        fn next_playlist(&mut self) -> Result<(), PlayerError> {
            self.record("next_playlist")
        }

        fn previous_playlist(&mut self) -> Result<(), PlayerError> {
            self.record("previous_playlist")
        }
    }

    #[test]
    fn playlists_skip_blank_lines() {
        assert_eq!(
            parse_playlists("musicroot\n  Hoerspiele \n\nKinderlieder\n"),
            vec!["musicroot", "Hoerspiele", "Kinderlieder"]
        );
    }

    #[test]
    fn stepping_starts_at_either_end() {
        assert_eq!(step_index(None, 3, true), Some(0));
        assert_eq!(step_index(None, 3, false), Some(2));
    }

    #[test]
    fn stepping_wraps_around() {
        assert_eq!(step_index(Some(2), 3, true), Some(0));
        assert_eq!(step_index(Some(0), 3, false), Some(2));
        assert_eq!(step_index(Some(1), 3, true), Some(2));
        assert_eq!(step_index(Some(1), 3, false), Some(0));
    }

    #[test]
    fn stepping_survives_a_shrunken_list() {
        assert_eq!(step_index(Some(7), 2, true), Some(0));
        assert_eq!(step_index(Some(7), 2, false), Some(0));
    }

    #[test]
    fn no_playlists_means_no_step() {
        assert_eq!(step_index(None, 0, true), None);
        assert_eq!(step_index(Some(4), 0, false), None);
    }
}

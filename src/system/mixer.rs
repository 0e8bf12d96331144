use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONTROL: &str = "PCM";

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },
    #[error("could not parse mixer status from {0:?}")]
    UnparseableStatus(String),
}

/// Volume and switch state as reported by the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerStatus {
    pub volume: i32,
    pub muted: bool,
}

pub trait MixerBackend: Send {
    fn set_volume(&self, percent: i32) -> Result<(), VolumeError>;
    fn mute(&self) -> Result<MixerStatus, VolumeError>;
    fn unmute(&self) -> Result<MixerStatus, VolumeError>;
    fn query(&self) -> Result<MixerStatus, VolumeError>;
}

/// ALSA simple mixer control driven through the `amixer` CLI.
#[derive(Debug, Clone)]
pub struct AmixerBackend {
    control: String,
}

impl Default for AmixerBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL)
    }
}

impl AmixerBackend {
    pub fn new(control: impl Into<String>) -> Self {
        Self {
            control: control.into(),
        }
    }

    fn run_amixer(&self, args: &[&str]) -> Result<String, VolumeError> {
        let command = format!("amixer {}", args.join(" "));
        let output = Command::new("amixer")
            .args(args)
            .output()
            .map_err(|source| VolumeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(VolumeError::CommandFailed {
                command,
                code: output.status.code().unwrap_or(-1),
            });
        }

        debug!(%command, "amixer succeeded");
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl MixerBackend for AmixerBackend {
    fn set_volume(&self, percent: i32) -> Result<(), VolumeError> {
        let level = format!("{percent}%");
        self.run_amixer(&["set", &self.control, &level]).map(|_| ())
    }

    fn mute(&self) -> Result<MixerStatus, VolumeError> {
        parse_status(&self.run_amixer(&["set", &self.control, "mute"])?)
    }

    fn unmute(&self) -> Result<MixerStatus, VolumeError> {
        parse_status(&self.run_amixer(&["set", &self.control, "unmute"])?)
    }

    fn query(&self) -> Result<MixerStatus, VolumeError> {
        parse_status(&self.run_amixer(&["get", &self.control])?)
    }
}

/// Reads the last line of `amixer get`/`set` output, e.g.
/// `  Mono: Playback -1207 [72%] [-12.07dB] [on]`.
///
/// The first `[NN%]` is the volume; the last `[on]`/`[off]` is the playback
/// switch, where `off` means muted.
pub fn parse_status(output: &str) -> Result<MixerStatus, VolumeError> {
    static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)%\]").unwrap());
    static SWITCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(on|off)\]").unwrap());

    let last = output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| VolumeError::UnparseableStatus(output.to_string()))?;
    let unparseable = || VolumeError::UnparseableStatus(last.trim().to_string());

    let volume = PERCENT_RE
        .captures(last)
        .and_then(|capture| capture.get(1))
        .and_then(|value| value.as_str().parse::<i32>().ok())
        .ok_or_else(unparseable)?;
    let muted = SWITCH_RE
        .captures_iter(last)
        .last()
        .and_then(|capture| capture.get(1))
        .map(|switch| switch.as_str() == "off")
        .ok_or_else(unparseable)?;

    Ok(MixerStatus { volume, muted })
}

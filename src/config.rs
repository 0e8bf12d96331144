use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::controls::VolumeLimits;
use crate::hardware::PinId;
use crate::input::{Button, EncoderPins, Wiring};

const CONFIG_ENV: &str = "HOERKOFFER_CONFIG";
const CONFIG_FILE: &str = "hoerkoffer.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pin {pin} is assigned to both {first} and {second}")]
    DuplicatePin {
        pin: PinId,
        first: &'static str,
        second: &'static str,
    },
    #[error("volume range {min}..={max} is not within 0..=100")]
    VolumeRange { min: i32, max: i32 },
    #[error("volume increment must be positive, got {0}")]
    Increment(i32),
    #[error("wait timeout must be at least one second")]
    WaitTimeout,
}

/// What pressing the knob does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnobAction {
    #[default]
    TogglePause,
    ToggleMute,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub pin_a: PinId,
    pub pin_b: PinId,
    pub button: Option<PinId>,
    /// Swap which pin order counts as turning up.
    pub reverse: bool,
    pub button_action: KnobAction,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            pin_a: 23,
            pin_b: 22,
            button: Some(24),
            reverse: false,
            button_action: KnobAction::TogglePause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NavigationPins {
    pub up: PinId,
    pub down: PinId,
    pub left: PinId,
    pub right: PinId,
}

impl Default for NavigationPins {
    fn default() -> Self {
        Self {
            up: 17,
            down: 4,
            left: 27,
            right: 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub min: i32,
    pub max: i32,
    pub increment: i32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        let limits = VolumeLimits::default();
        Self {
            min: limits.min,
            max: limits.max,
            increment: limits.increment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub control: String,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            control: crate::system::mixer::DEFAULT_CONTROL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chip: String,
    pub encoder: EncoderSettings,
    pub navigation: NavigationPins,
    pub volume: VolumeSettings,
    pub debounce_ms: u64,
    pub wait_timeout_secs: u64,
    pub mixer: MixerSettings,
    pub player: PlayerSettings,
    pub log_file: Option<PathBuf>,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chip: "/dev/gpiochip0".to_string(),
            encoder: EncoderSettings::default(),
            navigation: NavigationPins::default(),
            volume: VolumeSettings::default(),
            debounce_ms: 400,
            wait_timeout_secs: 1200,
            mixer: MixerSettings::default(),
            player: PlayerSettings::default(),
            log_file: None,
            path: None,
        }
    }
}

impl Settings {
    pub fn encoder_pins(&self) -> EncoderPins {
        EncoderPins {
            a: self.encoder.pin_a,
            b: self.encoder.pin_b,
        }
    }

    pub fn wiring(&self) -> Wiring {
        Wiring {
            reverse: self.encoder.reverse,
        }
    }

    /// Every button that has a pin, knob first.
    pub fn buttons(&self) -> Vec<(Button, PinId)> {
        let mut buttons = Vec::with_capacity(5);
        if let Some(pin) = self.encoder.button {
            buttons.push((Button::Knob, pin));
        }
        buttons.extend([
            (Button::Up, self.navigation.up),
            (Button::Down, self.navigation.down),
            (Button::Left, self.navigation.left),
            (Button::Right, self.navigation.right),
        ]);
        buttons
    }

    pub fn volume_limits(&self) -> VolumeLimits {
        VolumeLimits {
            min: self.volume.min,
            max: self.volume.max,
            increment: self.volume.increment,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut assigned: HashMap<PinId, &'static str> = HashMap::new();
        let mut pins = vec![
            (self.encoder.pin_a, "encoder pin A"),
            (self.encoder.pin_b, "encoder pin B"),
        ];
        if let Some(pin) = self.encoder.button {
            pins.push((pin, "knob button"));
        }
        pins.extend([
            (self.navigation.up, "up button"),
            (self.navigation.down, "down button"),
            (self.navigation.left, "left button"),
            (self.navigation.right, "right button"),
        ]);
        for (pin, role) in pins {
            if let Some(first) = assigned.insert(pin, role) {
                return Err(ConfigError::DuplicatePin {
                    pin,
                    first,
                    second: role,
                });
            }
        }

        let VolumeSettings { min, max, increment } = self.volume;
        if min < 0 || max > 100 || min > max {
            return Err(ConfigError::VolumeRange { min, max });
        }
        if increment <= 0 {
            return Err(ConfigError::Increment(increment));
        }
        if self.wait_timeout_secs == 0 {
            return Err(ConfigError::WaitTimeout);
        }
        Ok(())
    }
}

/// Loads the first configuration file found, or the defaults when there is none.
pub fn load_settings() -> Result<Settings> {
    for candidate in default_config_paths() {
        if candidate.exists() {
            return load_from(&candidate);
        }
    }
    let settings = Settings::default();
    settings.validate().context("built-in defaults are invalid")?;
    Ok(settings)
}

pub fn load_from(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read hoerkoffer configuration at {}", path.display()))?;
    let mut settings = parse_config(&contents)
        .with_context(|| format!("failed to parse hoerkoffer configuration at {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("invalid hoerkoffer configuration at {}", path.display()))?;
    settings.path = Some(path.to_path_buf());
    Ok(settings)
}

fn parse_config(contents: &str) -> Result<Settings> {
    serde_json::from_str(contents).context("configuration file is not valid JSON")
}

pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(explicit) = env::var_os(CONFIG_ENV) {
        paths.push(PathBuf::from(explicit));
    }
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("hoerkoffer").join(CONFIG_FILE));
    }
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config/hoerkoffer").join(CONFIG_FILE));
    }
    paths.push(PathBuf::from("/etc").join(CONFIG_FILE));
    paths.push(PathBuf::from(CONFIG_FILE));

    paths
}

use std::time::Duration;

use thiserror::Error;

/// Line offset on the GPIO chip (BCM numbering on a Raspberry Pi).
pub type PinId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a transition that left the pin at `level` is one this trigger reports.
    pub fn admits(self, level: PinLevel) -> bool {
        match self {
            Self::Rising => level.is_high(),
            Self::Falling => !level.is_high(),
            Self::Both => true,
        }
    }
}

/// Called on the delivering thread with the pin and the level observed after the edge.
pub type EdgeHandler = Box<dyn FnMut(PinId, PinLevel) + Send + 'static>;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("pin {0} has not been set up")]
    UnknownPin(PinId),
    #[error("pin {0} already has an edge handler registered")]
    AlreadyRegistered(PinId),
    #[error("gpio i/o failed on pin {pin}: {source}")]
    Io {
        pin: PinId,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open gpio chip {chip}: {source}")]
    Chip {
        chip: String,
        #[source]
        source: std::io::Error,
    },
    #[cfg_attr(feature = "hardware", allow(dead_code))]
    #[error("{0}")]
    Disabled(String),
}

/// Digital input pins that can be read and can notify on edges.
pub trait GpioSource: Send {
    fn setup(&self, pin: PinId, pull: Pull) -> Result<(), GpioError>;
    fn read(&self, pin: PinId) -> Result<PinLevel, GpioError>;
    fn register_edge_handler(
        &self,
        pin: PinId,
        edge: Edge,
        debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<(), GpioError>;
    fn unregister_edge_handler(&self, pin: PinId) -> Result<(), GpioError>;
}

/// Per-pin minimum re-fire interval, measured from the last admitted edge.
///
/// Timestamps are monotonic offsets from an arbitrary origin; the kernel event
/// clock and the simulator's epoch both qualify.
#[derive(Debug, Clone, Default)]
pub struct RefireWindow {
    window: Option<Duration>,
    last_admitted: Option<Duration>,
}

impl RefireWindow {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window: window.filter(|window| !window.is_zero()),
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, at: Duration) -> bool {
        let Some(window) = self.window else {
            return true;
        };
        if let Some(last) = self.last_admitted {
            if at.saturating_sub(last) < window {
                return false;
            }
        }
        self.last_admitted = Some(at);
        true
    }
}

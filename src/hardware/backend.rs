use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use gpiod::{Bias, Chip, EdgeDetect, Input, Lines, Options};
use tracing::{debug, info, trace, warn};

use super::gpio::{Edge, EdgeHandler, GpioError, GpioSource, PinId, PinLevel, Pull, RefireWindow};

const CONSUMER: &str = "hoerkoffer";

/// GPIO lines on a Linux character-device chip.
///
/// Every watched pin owns its own line request and a dedicated thread blocked
/// on edge events, so different pins deliver concurrently while edges of a
/// single pin are delivered one after another.
pub struct ChipGpio {
    chip: Chip,
    name: String,
    pulls: Mutex<HashMap<PinId, Pull>>,
    watches: Mutex<HashMap<PinId, Watch>>,
}

struct Watch {
    active: Arc<AtomicBool>,
    level: Arc<AtomicBool>,
}

impl ChipGpio {
    pub fn open(name: &str) -> Result<Self, GpioError> {
        let chip = Chip::new(name).map_err(|source| GpioError::Chip {
            chip: name.to_string(),
            source,
        })?;
        info!(chip = %name, "opened gpio chip");
        Ok(Self {
            chip,
            name: name.to_string(),
            pulls: Mutex::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
        })
    }

    fn pull_for(&self, pin: PinId) -> Result<Pull, GpioError> {
        self.pulls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&pin)
            .copied()
            .ok_or(GpioError::UnknownPin(pin))
    }

    fn request(&self, pin: PinId, pull: Pull, edge: Option<Edge>) -> Result<Lines<Input>, GpioError> {
        let mut options = Options::input([pin]).bias(bias(pull)).consumer(CONSUMER);
        if let Some(edge) = edge {
            options = options.edge(edge_detect(edge));
        }
        self.chip
            .request_lines(options)
            .map_err(|source| GpioError::Io { pin, source })
    }
}

impl GpioSource for ChipGpio {
    fn setup(&self, pin: PinId, pull: Pull) -> Result<(), GpioError> {
        // Probe the line once so misconfigured offsets fail at startup.
        drop(self.request(pin, pull, None)?);
        self.pulls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(pin, pull);
        debug!(chip = %self.name, pin, ?pull, "configured input pin");
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<PinLevel, GpioError> {
        let pull = self.pull_for(pin)?;
        if let Some(watch) = self
            .watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&pin)
        {
            return Ok(PinLevel::from(watch.level.load(Ordering::Acquire)));
        }
        let lines = self.request(pin, pull, None)?;
        let [high] = lines
            .get_values([false; 1])
            .map_err(|source| GpioError::Io { pin, source })?;
        Ok(PinLevel::from(high))
    }

    fn register_edge_handler(
        &self,
        pin: PinId,
        edge: Edge,
        debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<(), GpioError> {
        let pull = self.pull_for(pin)?;
        let mut watches = self
            .watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if watches.contains_key(&pin) {
            return Err(GpioError::AlreadyRegistered(pin));
        }

        let lines = self.request(pin, pull, Some(edge))?;
        let [initial] = lines
            .get_values([false; 1])
            .map_err(|source| GpioError::Io { pin, source })?;

        let active = Arc::new(AtomicBool::new(true));
        let level = Arc::new(AtomicBool::new(initial));
        let watcher = Watcher {
            pin,
            lines,
            active: Arc::clone(&active),
            level: Arc::clone(&level),
            window: RefireWindow::new(debounce),
            handler,
        };

        thread::Builder::new()
            .name(format!("gpio-{pin}"))
            .spawn(move || watcher.run())
            .map_err(|source| GpioError::Io { pin, source })?;

        watches.insert(pin, Watch { active, level });
        debug!(pin, ?edge, ?debounce, "registered edge handler");
        Ok(())
    }

    fn unregister_edge_handler(&self, pin: PinId) -> Result<(), GpioError> {
        let watch = self
            .watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&pin)
            .ok_or(GpioError::UnknownPin(pin))?;
        // The watcher stays parked in its blocking read until the next edge or
        // process exit; it never calls the handler again.
        watch.active.store(false, Ordering::Release);
        debug!(pin, "unregistered edge handler");
        Ok(())
    }
}

struct Watcher {
    pin: PinId,
    lines: Lines<Input>,
    active: Arc<AtomicBool>,
    level: Arc<AtomicBool>,
    window: RefireWindow,
    handler: EdgeHandler,
}

impl Watcher {
    fn run(mut self) {
        while self.active.load(Ordering::Acquire) {
            let event = match self.lines.read_event() {
                Ok(event) => event,
                Err(err) => {
                    warn!(pin = self.pin, error = %err, "reading gpio edge failed; watcher stopped");
                    break;
                }
            };
            if !self.active.load(Ordering::Acquire) {
                break;
            }

            let level = match event.edge {
                gpiod::Edge::Rising => PinLevel::High,
                gpiod::Edge::Falling => PinLevel::Low,
            };
            self.level.store(level.is_high(), Ordering::Release);

            if !self.window.admit(event.time) {
                trace!(pin = self.pin, ?level, "edge inside debounce window");
                continue;
            }
            (self.handler)(self.pin, level);
        }
        debug!(pin = self.pin, "gpio watcher exiting");
    }
}

fn bias(pull: Pull) -> Bias {
    match pull {
        Pull::None => Bias::Disable,
        Pull::Up => Bias::PullUp,
        Pull::Down => Bias::PullDown,
    }
}

fn edge_detect(edge: Edge) -> EdgeDetect {
    match edge {
        Edge::Rising => EdgeDetect::Rising,
        Edge::Falling => EdgeDetect::Falling,
        Edge::Both => EdgeDetect::Both,
    }
}

impl std::fmt::Debug for ChipGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipGpio")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

//! In-memory GPIO used by the unit tests.
//!
//! `drive` delivers an edge notification on the calling thread, so tests can
//! reproduce overlapping interrupt delivery by driving pins from several
//! threads at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::gpio::{Edge, EdgeHandler, GpioError, GpioSource, PinId, PinLevel, Pull, RefireWindow};

#[derive(Clone)]
pub struct SimulatedGpio {
    pins: Arc<Mutex<HashMap<PinId, SimPin>>>,
    epoch: Instant,
}

struct SimPin {
    level: PinLevel,
    watch: Option<(Edge, Arc<Mutex<Delivery>>)>,
}

struct Delivery {
    window: RefireWindow,
    handler: EdgeHandler,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self {
            pins: Arc::new(Mutex::new(HashMap::new())),
            epoch: Instant::now(),
        }
    }

    pub fn drive(&self, pin: PinId, level: PinLevel) {
        self.drive_at(pin, level, self.epoch.elapsed());
    }

    /// Delivers an edge stamped `at` after the simulator's epoch.
    pub fn drive_at(&self, pin: PinId, level: PinLevel, at: Duration) {
        let delivery = {
            let mut pins = self.pins.lock().unwrap();
            let Some(state) = pins.get_mut(&pin) else {
                return;
            };
            state.level = level;
            match &state.watch {
                Some((edge, delivery)) if edge.admits(level) => Some(Arc::clone(delivery)),
                _ => None,
            }
        };

        if let Some(delivery) = delivery {
            let mut delivery = delivery.lock().unwrap();
            if delivery.window.admit(at) {
                (delivery.handler)(pin, level);
            }
        }
    }

    pub fn is_registered(&self, pin: PinId) -> bool {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .is_some_and(|state| state.watch.is_some())
    }
}

impl GpioSource for SimulatedGpio {
    fn setup(&self, pin: PinId, pull: Pull) -> Result<(), GpioError> {
        let level = match pull {
            Pull::Up => PinLevel::High,
            Pull::Down | Pull::None => PinLevel::Low,
        };
        self.pins
            .lock()
            .unwrap()
            .entry(pin)
            .or_insert(SimPin { level, watch: None });
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<PinLevel, GpioError> {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .map(|state| state.level)
            .ok_or(GpioError::UnknownPin(pin))
    }

    fn register_edge_handler(
        &self,
        pin: PinId,
        edge: Edge,
        debounce: Option<Duration>,
        handler: EdgeHandler,
    ) -> Result<(), GpioError> {
        let mut pins = self.pins.lock().unwrap();
        let state = pins.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        if state.watch.is_some() {
            return Err(GpioError::AlreadyRegistered(pin));
        }
        let delivery = Delivery {
            window: RefireWindow::new(debounce),
            handler,
        };
        state.watch = Some((edge, Arc::new(Mutex::new(delivery))));
        Ok(())
    }

    fn unregister_edge_handler(&self, pin: PinId) -> Result<(), GpioError> {
        let mut pins = self.pins.lock().unwrap();
        let state = pins.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        state.watch = None;
        Ok(())
    }
}

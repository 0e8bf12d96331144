#![allow(dead_code)]

use std::time::Duration;

use super::gpio::{Edge, EdgeHandler, GpioError, GpioSource, PinId, PinLevel, Pull};

const DISABLED: &str =
    "hardware support disabled. Enable the `hardware` feature to read the knob's GPIO lines.";

#[derive(Debug)]
pub struct ChipGpio;

impl ChipGpio {
    pub fn open(_name: &str) -> Result<Self, GpioError> {
        Err(GpioError::Disabled(DISABLED.to_string()))
    }
}

impl GpioSource for ChipGpio {
    fn setup(&self, _pin: PinId, _pull: Pull) -> Result<(), GpioError> {
        Err(GpioError::Disabled(DISABLED.to_string()))
    }

    fn read(&self, _pin: PinId) -> Result<PinLevel, GpioError> {
        Err(GpioError::Disabled(DISABLED.to_string()))
    }

    fn register_edge_handler(
        &self,
        _pin: PinId,
        _edge: Edge,
        _debounce: Option<Duration>,
        _handler: EdgeHandler,
    ) -> Result<(), GpioError> {
        Err(GpioError::Disabled(DISABLED.to_string()))
    }

    fn unregister_edge_handler(&self, _pin: PinId) -> Result<(), GpioError> {
        Ok(())
    }
}

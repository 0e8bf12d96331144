use std::time::Duration;

use tracing::debug;

use crate::hardware::{Edge, GpioError, GpioSource, PinId, PinLevel, Pull};

use super::{FunnelSender, guarded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Knob,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pin: PinId,
}

/// A momentary switch wired to ground behind a pull-up.
///
/// All debouncing is left to the platform's re-fire window; every falling
/// edge that makes it through is one press.
#[derive(Debug, Clone, Copy)]
pub struct ButtonDebouncer {
    button: Button,
    pin: PinId,
    window: Duration,
}

impl ButtonDebouncer {
    pub fn new(button: Button, pin: PinId, window: Duration) -> Self {
        Self {
            button,
            pin,
            window,
        }
    }

    pub fn on_falling_edge(&self, pin: PinId) -> ButtonEvent {
        ButtonEvent {
            button: self.button,
            pin,
        }
    }

    pub fn attach<G>(self, gpio: &G, funnel: &FunnelSender) -> Result<(), GpioError>
    where
        G: GpioSource + ?Sized,
    {
        gpio.setup(self.pin, Pull::Up)?;
        let funnel = funnel.clone();
        gpio.register_edge_handler(
            self.pin,
            Edge::Falling,
            Some(self.window),
            Box::new(move |pin, level: PinLevel| {
                guarded("button", pin, || {
                    debug!(pin, button = ?self.button, ?level, "button pressed");
                    funnel.push_button(self.on_falling_edge(pin));
                });
            }),
        )?;
        debug!(pin = self.pin, button = ?self.button, window = ?self.window, "button attached");
        Ok(())
    }
}

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::hardware::{Edge, GpioError, GpioSource, PinId, PinLevel, Pull};

use super::{FunnelSender, guarded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderPin {
    A,
    B,
}

/// One completed detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    Increase,
    Decrease,
}

impl TurnEvent {
    pub fn delta(self) -> i32 {
        match self {
            Self::Increase => 1,
            Self::Decrease => -1,
        }
    }
}

/// Which pin completing a detent counts as an increase.
///
/// This is a property of how the knob is soldered, not something the signal
/// can tell us. With the default wiring, a detent finished by pin A is an
/// increase and one finished by pin B a decrease; `reverse` swaps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wiring {
    pub reverse: bool,
}

impl Wiring {
    fn turn(self, completed_by: EncoderPin) -> TurnEvent {
        match (completed_by, self.reverse) {
            (EncoderPin::A, false) | (EncoderPin::B, true) => TurnEvent::Increase,
            (EncoderPin::B, false) | (EncoderPin::A, true) => TurnEvent::Decrease,
        }
    }
}

#[derive(Debug, Default)]
struct EncoderState {
    level_a: PinLevel,
    level_b: PinLevel,
    last_changed: Option<EncoderPin>,
}

/// Transition-based decoder for a two-pin mechanical encoder.
///
/// A detent is reported when the second pin of the pair goes high while the
/// other is already high. Repeated edges on the pin that changed last are
/// contact bounce and are ignored until the other pin moves, which keeps the
/// decoder independent of how fast the knob is turned.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    state: Mutex<EncoderState>,
    wiring: Wiring,
}

impl QuadratureDecoder {
    pub fn new(wiring: Wiring) -> Self {
        Self {
            state: Mutex::new(EncoderState::default()),
            wiring,
        }
    }

    pub fn seed(&self, level_a: PinLevel, level_b: PinLevel) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.level_a = level_a;
        state.level_b = level_b;
    }

    pub fn on_edge(&self, pin: EncoderPin, level: PinLevel) -> Option<TurnEvent> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match pin {
            EncoderPin::A => state.level_a = level,
            EncoderPin::B => state.level_b = level,
        }

        if state.last_changed == Some(pin) {
            return None;
        }
        state.last_changed = Some(pin);

        let other = match pin {
            EncoderPin::A => state.level_b,
            EncoderPin::B => state.level_a,
        };
        if level.is_high() && other.is_high() {
            Some(self.wiring.turn(pin))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderPins {
    pub a: PinId,
    pub b: PinId,
}

/// Sets up both encoder pins and routes their edges through a shared decoder
/// into the funnel.
pub fn attach_encoder<G>(
    gpio: &G,
    pins: EncoderPins,
    wiring: Wiring,
    funnel: &FunnelSender,
) -> Result<(), GpioError>
where
    G: GpioSource + ?Sized,
{
    gpio.setup(pins.a, Pull::Up)?;
    gpio.setup(pins.b, Pull::Up)?;

    let decoder = Arc::new(QuadratureDecoder::new(wiring));
    decoder.seed(gpio.read(pins.a)?, gpio.read(pins.b)?);

    for (pin, which) in [(pins.a, EncoderPin::A), (pins.b, EncoderPin::B)] {
        let decoder = Arc::clone(&decoder);
        let funnel = funnel.clone();
        gpio.register_edge_handler(
            pin,
            Edge::Both,
            None,
            Box::new(move |pin, level| {
                guarded("encoder", pin, || {
                    trace!(pin, ?which, ?level, "encoder edge");
                    if let Some(turn) = decoder.on_edge(which, level) {
                        debug!(delta = turn.delta(), "encoder detent");
                        funnel.push_turn(turn);
                    }
                });
            }),
        )?;
    }

    debug!(pin_a = pins.a, pin_b = pins.b, reverse = wiring.reverse, "encoder attached");
    Ok(())
}

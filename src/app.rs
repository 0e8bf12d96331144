use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use tracing::{debug, info, trace, warn};

use crate::config::{KnobAction, Settings};
use crate::controls::{NavigationController, VolumeController};
use crate::hardware::{ChipGpio, GpioSource, PinId};
use crate::input::{
    Button, ButtonDebouncer, ButtonEvent, FunnelReceiver, TurnEvent, attach_encoder,
    event_funnel,
};
use crate::system::mixer::{AmixerBackend, MixerBackend};
use crate::system::player::{MpcBackend, PlaybackControl};

pub type Daemon = App<ChipGpio, AmixerBackend, MpcBackend>;

/// Everything the consumer thread owns.
///
/// Edge handlers registered on `gpio` hold the producer side of the funnel;
/// the receiver, the volume state and the player live here and are only
/// touched from `run`.
pub struct App<G, M, P>
where
    G: GpioSource,
    M: MixerBackend,
    P: PlaybackControl,
{
    gpio: G,
    volume: VolumeController<M>,
    navigation: NavigationController<P>,
    knob_action: KnobAction,
    events: FunnelReceiver,
    shutdown: Receiver<()>,
    wait_timeout: Duration,
    registered: Vec<PinId>,
}

impl Daemon {
    pub fn from_settings(settings: &Settings, shutdown: Receiver<()>) -> Result<Self> {
        let gpio = ChipGpio::open(&settings.chip)
            .with_context(|| format!("failed to open gpio chip {}", settings.chip))?;
        let mixer = AmixerBackend::new(settings.mixer.control.clone());
        let player = MpcBackend::new(settings.player.host.clone(), settings.player.port);
        App::new(gpio, mixer, player, settings, shutdown)
    }
}

impl<G, M, P> App<G, M, P>
where
    G: GpioSource,
    M: MixerBackend,
    P: PlaybackControl,
{
    pub fn new(
        gpio: G,
        mixer: M,
        player: P,
        settings: &Settings,
        shutdown: Receiver<()>,
    ) -> Result<Self> {
        let volume = VolumeController::new(mixer, settings.volume_limits());
        info!(
            volume = volume.volume(),
            muted = volume.is_muted(),
            "initial volume"
        );

        let (sender, events) = event_funnel();
        let mut app = Self {
            gpio,
            volume,
            navigation: NavigationController::new(player),
            knob_action: settings.encoder.button_action,
            events,
            shutdown,
            wait_timeout: settings.wait_timeout(),
            registered: Vec::new(),
        };

        let pins = settings.encoder_pins();
        info!(pin_a = pins.a, pin_b = pins.b, "attaching volume knob");
        attach_encoder(&app.gpio, pins, settings.wiring(), &sender)
            .context("failed to attach rotary encoder")?;
        app.registered.extend([pins.a, pins.b]);

        for (button, pin) in settings.buttons() {
            ButtonDebouncer::new(button, pin, settings.debounce())
                .attach(&app.gpio, &sender)
                .with_context(|| format!("failed to attach {button:?} button on pin {pin}"))?;
            app.registered.push(pin);
        }
        info!(
            buttons = app.registered.len() - 2,
            debounce_ms = settings.debounce_ms,
            "inputs attached"
        );

        Ok(app)
    }

    /// Waits for input and applies it until a shutdown message arrives or a
    /// mixer command fails.
    pub fn run(&mut self) -> Result<()> {
        let wake = self.events.wake().clone();
        let shutdown = self.shutdown.clone();
        let timeout = self.wait_timeout;

        let result = loop {
            crossbeam_channel::select! {
                recv(wake) -> signal => {
                    if signal.is_err() {
                        warn!("input funnel closed");
                        break Ok(());
                    }
                    if let Err(err) = self.process_pending() {
                        break Err(err);
                    }
                },
                recv(shutdown) -> _ => {
                    info!("shutting down");
                    break Ok(());
                },
                default(timeout) => {
                    trace!("wait timed out");
                    if let Err(err) = self.process_pending() {
                        break Err(err);
                    }
                },
            }
        };

        self.release_inputs();
        result
    }

    /// Drains both queues, turns first, and applies every event.
    fn process_pending(&mut self) -> Result<()> {
        let drained = self.events.drain_all();
        if drained.is_empty() {
            return Ok(());
        }
        debug!(
            turns = drained.turns.len(),
            buttons = drained.buttons.len(),
            "draining input events"
        );

        for turn in drained.turns {
            self.handle_turn(turn)?;
        }
        for event in drained.buttons {
            self.handle_button(event)?;
        }
        Ok(())
    }

    fn handle_turn(&mut self, turn: TurnEvent) -> Result<()> {
        let volume = self
            .volume
            .on_turn(turn)
            .context("failed to change volume")?;
        info!(volume, "set volume");
        Ok(())
    }

    fn handle_button(&mut self, event: ButtonEvent) -> Result<()> {
        debug!(button = ?event.button, pin = event.pin, "button event");
        if event.button == Button::Knob && self.knob_action == KnobAction::ToggleMute {
            self.volume
                .toggle_mute()
                .context("failed to toggle mute")?;
            info!(volume = %self.volume.status(), "mute toggled from knob");
            return Ok(());
        }

        if let Err(err) = self.navigation.on_button(event.button) {
            warn!(error = %err, button = ?event.button, "player command failed");
        }
        Ok(())
    }

    fn release_inputs(&mut self) {
        for pin in self.registered.drain(..) {
            if let Err(err) = self.gpio.unregister_edge_handler(pin) {
                warn!(pin, error = %err, "failed to release edge handler");
            }
        }
    }
}

impl<G, M, P> Drop for App<G, M, P>
where
    G: GpioSource,
    M: MixerBackend,
    P: PlaybackControl,
{
    fn drop(&mut self) {
        self.release_inputs();
    }
}

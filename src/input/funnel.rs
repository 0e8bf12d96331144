use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::trace;

use super::{ButtonEvent, TurnEvent};

/// Opens the event funnel: two FIFO queues sharing one wake signal.
///
/// The sender half is cloned into every edge handler; the receiver half
/// belongs to the single consumer. The wake signal is a one-slot channel, so
/// any number of pushes between two waits coalesce into a single wake.
pub fn event_funnel() -> (FunnelSender, FunnelReceiver) {
    let (turn_tx, turn_rx) = crossbeam_channel::unbounded();
    let (button_tx, button_rx) = crossbeam_channel::unbounded();
    let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);

    (
        FunnelSender {
            turns: turn_tx,
            buttons: button_tx,
            wake: wake_tx,
        },
        FunnelReceiver {
            turns: turn_rx,
            buttons: button_rx,
            wake: wake_rx,
        },
    )
}

#[derive(Clone, Debug)]
pub struct FunnelSender {
    turns: Sender<TurnEvent>,
    buttons: Sender<ButtonEvent>,
    wake: Sender<()>,
}

impl FunnelSender {
    pub fn push_turn(&self, turn: TurnEvent) {
        if self.turns.send(turn).is_err() {
            trace!(?turn, "funnel closed; dropping turn");
            return;
        }
        self.signal();
    }

    pub fn push_button(&self, event: ButtonEvent) {
        if self.buttons.send(event).is_err() {
            trace!(?event, "funnel closed; dropping button press");
            return;
        }
        self.signal();
    }

    fn signal(&self) {
        match self.wake.try_send(()) {
            // Full means a wake is already pending and will cover this event.
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => trace!("funnel consumer gone"),
        }
    }
}

#[derive(Debug)]
pub struct FunnelReceiver {
    turns: Receiver<TurnEvent>,
    buttons: Receiver<ButtonEvent>,
    wake: Receiver<()>,
}

/// Everything that was queued when a drain ran, FIFO per queue.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drained {
    pub turns: Vec<TurnEvent>,
    pub buttons: Vec<ButtonEvent>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.buttons.is_empty()
    }
}

impl FunnelReceiver {
    /// Wake signal for use in `select!`. Receiving from it clears the signal,
    /// so the consumer must drain after every successful receive; anything
    /// pushed after that receive raises the signal again.
    pub fn wake(&self) -> &Receiver<()> {
        &self.wake
    }

    /// Empties the turn queue, then the button queue.
    pub fn drain_all(&self) -> Drained {
        let turns = self.turns.try_iter().collect();
        let buttons = self.buttons.try_iter().collect();
        Drained { turns, buttons }
    }
}

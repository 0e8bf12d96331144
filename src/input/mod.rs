mod button;
mod encoder;
mod funnel;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::hardware::PinId;

pub use button::{Button, ButtonDebouncer, ButtonEvent};
pub use encoder::{EncoderPins, TurnEvent, Wiring, attach_encoder};
pub use funnel::{FunnelReceiver, FunnelSender, event_funnel};

/// Runs an edge handler body on the delivering thread, logging a panic
/// instead of letting it unwind into the GPIO watcher.
pub(crate) fn guarded<F>(kind: &'static str, pin: PinId, body: F)
where
    F: FnOnce(),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
        error!(pin, kind, panic = %panic_message(payload.as_ref()), "edge handler panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn guarded_contains_panics() {
        let calls = AtomicUsize::new(0);
        guarded("test", 4, || {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("handler blew up");
        });
        guarded("test", 4, || {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}

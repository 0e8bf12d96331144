#[cfg_attr(not(feature = "hardware"), path = "stub.rs")]
mod backend;
mod gpio;
#[cfg(test)]
pub mod sim;

pub use backend::ChipGpio;
pub use gpio::{Edge, GpioError, GpioSource, PinId, PinLevel, Pull};

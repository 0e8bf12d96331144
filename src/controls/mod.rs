mod navigation;
mod volume;

pub use navigation::NavigationController;
pub use volume::{VolumeController, VolumeLimits};

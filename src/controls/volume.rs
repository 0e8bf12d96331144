use tracing::{debug, info, warn};

use crate::input::TurnEvent;
use crate::system::mixer::{MixerBackend, MixerStatus, VolumeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLimits {
    pub min: i32,
    pub max: i32,
    pub increment: i32,
}

impl Default for VolumeLimits {
    fn default() -> Self {
        Self {
            min: 24,
            max: 92,
            increment: 2,
        }
    }
}

impl VolumeLimits {
    pub fn clamp(&self, volume: i32) -> i32 {
        volume.max(self.min).min(self.max)
    }
}

/// Bounded volume with a mute switch, mirrored onto the mixer.
///
/// `last_volume` only means something while muted: it is what unmuting
/// restores.
pub struct VolumeController<M>
where
    M: MixerBackend,
{
    mixer: M,
    limits: VolumeLimits,
    volume: i32,
    muted: bool,
    last_volume: i32,
}

impl<M> VolumeController<M>
where
    M: MixerBackend,
{
    pub fn new(mixer: M, limits: VolumeLimits) -> Self {
        let mut controller = Self {
            mixer,
            limits,
            volume: limits.clamp(0),
            muted: true,
            last_volume: limits.min,
        };
        match controller.mixer.query() {
            Ok(status) => controller.sync(status),
            Err(err) => warn!(
                error = %err,
                "could not read mixer state; assuming muted at minimum volume"
            ),
        }
        controller
    }

    fn sync(&mut self, status: MixerStatus) {
        self.volume = self.limits.clamp(status.volume);
        self.muted = status.muted;
        debug!(volume = self.volume, muted = self.muted, "synced volume from mixer");
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn up(&mut self) -> Result<i32, VolumeError> {
        self.change(self.limits.increment)
    }

    pub fn down(&mut self) -> Result<i32, VolumeError> {
        self.change(-self.limits.increment)
    }

    fn change(&mut self, delta: i32) -> Result<i32, VolumeError> {
        self.set_volume(self.volume.saturating_add(delta))
    }

    pub fn set_volume(&mut self, volume: i32) -> Result<i32, VolumeError> {
        let volume = self.limits.clamp(volume);
        self.mixer.set_volume(volume)?;
        self.volume = volume;
        Ok(volume)
    }

    pub fn toggle_mute(&mut self) -> Result<bool, VolumeError> {
        if self.muted {
            self.muted = self.mixer.unmute()?.muted;
            if !self.muted {
                self.set_volume(self.last_volume)?;
            }
        } else {
            self.last_volume = self.volume;
            self.muted = self.mixer.mute()?.muted;
        }
        info!(muted = self.muted, volume = self.volume, "toggled mute");
        Ok(self.muted)
    }

    /// Applies one detent, unmuting first if needed.
    pub fn on_turn(&mut self, turn: TurnEvent) -> Result<i32, VolumeError> {
        if self.muted {
            debug!("unmuting on turn");
            self.toggle_mute()?;
        }
        match turn {
            TurnEvent::Increase => self.up(),
            TurnEvent::Decrease => self.down(),
        }
    }

    pub fn status(&self) -> String {
        if self.muted {
            format!("{}% (muted)", self.volume)
        } else {
            format!("{}%", self.volume)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::mixer::tests::MockMixer;

    fn controller(volume: i32, muted: bool) -> (VolumeController<MockMixer>, MockMixer) {
        let mixer = MockMixer::with_state(volume, muted);
        let controller = VolumeController::new(mixer.clone(), VolumeLimits::default());
        (controller, mixer)
    }

    #[test]
    fn clamp_stays_in_bounds_and_is_idempotent() {
        let limits = VolumeLimits::default();
        for v in [i32::MIN, -5, 0, 23, 24, 25, 50, 91, 92, 93, 100, i32::MAX] {
            let clamped = limits.clamp(v);
            assert!((limits.min..=limits.max).contains(&clamped), "{v} -> {clamped}");
            assert_eq!(limits.clamp(clamped), clamped);
        }
    }

    #[test]
    fn six_ups_from_fifty_reach_sixty_two_then_clamp_at_max() {
        let (mut volume, mixer) = controller(50, false);
        for _ in 0..6 {
            volume.up().unwrap();
        }
        assert_eq!(volume.volume(), 62);

        for _ in 0..20 {
            let now = volume.up().unwrap();
            assert!(now <= 92);
        }
        assert_eq!(volume.volume(), 92);
        assert_eq!(mixer.history().last().map(String::as_str), Some("set:92"));
    }

    #[test]
    fn down_clamps_at_min() {
        let (mut volume, _) = controller(28, false);
        assert_eq!(volume.down().unwrap(), 26);
        assert_eq!(volume.down().unwrap(), 24);
        assert_eq!(volume.down().unwrap(), 24);
    }

    #[test]
    fn set_volume_pushes_clamped_value() {
        let (mut volume, mixer) = controller(50, false);
        assert_eq!(volume.set_volume(150).unwrap(), 92);
        assert_eq!(volume.set_volume(3).unwrap(), 24);
        assert_eq!(mixer.history(), vec!["set:92", "set:24"]);
    }

    #[test]
    fn mute_then_unmute_restores_volume() {
        let (mut volume, mixer) = controller(60, false);

        assert!(volume.toggle_mute().unwrap());
        assert!(volume.is_muted());
        assert_eq!(volume.last_volume, 60);

        assert!(!volume.toggle_mute().unwrap());
        assert!(!volume.is_muted());
        assert_eq!(volume.volume(), 60);
        assert_eq!(mixer.history(), vec!["mute", "unmute", "set:60"]);
    }

    #[test]
    fn initial_state_is_synced_and_clamped() {
        let (volume, _) = controller(100, false);
        assert_eq!(volume.volume(), 92);
        assert!(!volume.is_muted());

        let (volume, _) = controller(40, true);
        assert_eq!(volume.volume(), 40);
        assert!(volume.is_muted());
    }

    #[test]
    fn failed_initial_query_keeps_muted_defaults() {
        let mixer = MockMixer::default();
        mixer.inner.lock().unwrap().fail_query = true;
        let mut volume = VolumeController::new(mixer.clone(), VolumeLimits::default());

        assert!(volume.is_muted());
        assert_eq!(volume.volume(), 24);
        assert!(!volume.toggle_mute().unwrap());
        assert_eq!(volume.volume(), 24);
    }

    #[test]
    fn turning_while_muted_unmutes_first() {
        let (mut volume, mixer) = controller(50, false);
        volume.toggle_mute().unwrap();

        assert_eq!(volume.on_turn(TurnEvent::Increase).unwrap(), 52);
        assert!(!volume.is_muted());
        assert_eq!(mixer.history(), vec!["mute", "unmute", "set:50", "set:52"]);
    }

    #[test]
    fn backend_failure_surfaces_as_volume_error() {
        let (mut volume, mixer) = controller(50, false);
        mixer.inner.lock().unwrap().fail_commands = true;

        assert!(matches!(
            volume.up(),
            Err(VolumeError::CommandFailed { code: 1, .. })
        ));
        assert_eq!(volume.volume(), 50);
    }

    #[test]
    fn status_reports_mute_state() {
        let (mut volume, _) = controller(62, false);
        assert_eq!(volume.status(), "62%");
        volume.toggle_mute().unwrap();
        assert_eq!(volume.status(), "62% (muted)");
    }
}

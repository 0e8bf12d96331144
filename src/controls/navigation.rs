use tracing::info;

use crate::input::Button;
use crate::system::player::{PlaybackControl, PlayerError};

/// Maps navigation buttons onto player commands.
///
/// Left/right skip tracks; up/down step through stored playlists, with up
/// going backwards.
pub struct NavigationController<P>
where
    P: PlaybackControl,
{
    player: P,
}

impl<P> NavigationController<P>
where
    P: PlaybackControl,
{
    pub fn new(player: P) -> Self {
        Self { player }
    }

    pub fn on_button(&mut self, button: Button) -> Result<(), PlayerError> {
        match button {
            Button::Knob => {
                info!("toggling pause");
                self.player.toggle_pause()
            }
            Button::Right => {
                info!("next track");
                self.player.next()
            }
            Button::Left => {
                info!("previous track");
                self.player.previous()
            }
            Button::Up => {
                info!("previous playlist");
                self.player.previous_playlist()
            }
            Button::Down => {
                info!("next playlist");
                self.player.next_playlist()
            }
        }
    }
}

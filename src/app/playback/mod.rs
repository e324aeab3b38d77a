mod player;
mod process;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use tracing::debug;

pub use player::PlayerKind;
pub(crate) use player::Player;
pub(crate) use process::PlayerSlot;

use super::episode::Episode;
use crate::error::PlaybackError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Mode {
    #[default]
    Play,
    PrintCommand,
    PrintUrl,
}

impl Mode {
    /// Printing needs no listener, so there is nothing to wait for between passes.
    pub(crate) fn single_pass(self) -> bool {
        !matches!(self, Self::Play)
    }
}

pub(crate) struct PlaybackDriver {
    player: Box<dyn Player>,
    mode: Mode,
    slot: Arc<PlayerSlot>,
}

impl PlaybackDriver {
    pub(crate) fn new(player: Box<dyn Player>, mode: Mode, slot: Arc<PlayerSlot>) -> Self {
        Self { player, mode, slot }
    }

    pub(crate) fn play(&self, episode: &Episode) -> Result<(), PlaybackError> {
        let argv = self.player.build_command(episode);
        match self.mode {
            Mode::PrintCommand => println!("{}", printable_command(&argv)),
            Mode::PrintUrl => println!("{}", episode.path),
            Mode::Play => {
                println!("{}", now_playing_line(episode));
                if io::stdout().is_terminal() {
                    print!("{}", terminal_title(episode));
                    let _ = io::stdout().flush();
                }
                let status = self.slot.run(&argv)?;
                debug!(player = self.player.name(), %status, "player finished");
            }
        }
        Ok(())
    }
}

/// Command line as it would be typed, with the path quoted.
pub(crate) fn printable_command(argv: &[String]) -> String {
    match argv.split_last() {
        Some((path, rest)) if !rest.is_empty() => format!("{} \"{path}\"", rest.join(" ")),
        Some((path, _)) => format!("\"{path}\""),
        None => String::new(),
    }
}

pub(crate) fn now_playing_line(episode: &Episode) -> String {
    format!(
        "### Listening to \"{}\" {}h: {}",
        episode.title, episode.hour, episode.path
    )
}

pub(crate) fn terminal_title(episode: &Episode) -> String {
    format!("\x1B]2;{} {}h\x07", episode.title, episode.hour)
}

mod catalog;
mod episode;
mod filter;
mod playback;
mod reload;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::cli::Cli;
use crate::config::{Settings, load_file_config};
use crate::error::{DownloadError, EXIT_INTERRUPTED};
use crate::http::{Fetch, HttpFetcher};

use self::catalog::EpisodeResolver;
use self::episode::Episode;
#[cfg(test)]
pub(crate) use self::filter::Exclusion;
pub(crate) use self::filter::{EpisodeFilter, FilterConfig, parse_exclusions};
pub(crate) use self::playback::Mode;
pub use self::playback::PlayerKind;
use self::playback::{PlaybackDriver, PlayerSlot};
use self::reload::AutoReload;

pub fn run(cli: Cli) -> Result<()> {
    let file = load_file_config(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli, file, Local::now().date_naive())?;
    info!(
        date = %settings.filter.date,
        from = settings.filter.from_hour,
        to = settings.filter.to_hour,
        "looking for podcasts"
    );

    let mut session = Session::new(HttpFetcher::new(&settings.user_agent));
    install_interrupt_handler(session.player_slot())?;

    let player = settings.player.build(settings.player_path.as_deref());
    let driver = PlaybackDriver::new(player, settings.mode, session.player_slot());
    let played = play_all(&mut session, &settings, &driver)?;
    info!(played, "nothing left to play");
    Ok(())
}

fn play_all<F: Fetch>(
    session: &mut Session<F>,
    settings: &Settings,
    driver: &PlaybackDriver,
) -> Result<usize> {
    let mut played = 0;
    let mut episodes = session.episodes(&settings.filter, settings.mode.single_pass());
    for episode in episodes.by_ref() {
        let episode = episode.context("failed to download the podcast list")?;
        driver.play(&episode)?;
        played += 1;
    }
    info!(passes = episodes.passes(), "catalog polling stopped");
    Ok(played)
}

fn install_interrupt_handler(slot: Arc<PlayerSlot>) -> Result<()> {
    ctrlc::set_handler(move || {
        if slot.is_exiting() {
            return;
        }
        println!("\nCTRL-C: stopping the player and leaving...");
        if slot.cancel() {
            std::process::exit(EXIT_INTERRUPTED);
        }
    })
    .context("failed to register Ctrl+C handler")
}

/// Everything one run owns: the transport, the metadata cache and the player slot the
/// interrupt handler shares.
pub(crate) struct Session<F> {
    fetcher: F,
    resolver: EpisodeResolver,
    player: Arc<PlayerSlot>,
}

impl<F: Fetch> Session<F> {
    pub(crate) fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            resolver: EpisodeResolver::new(),
            player: Arc::new(PlayerSlot::new()),
        }
    }

    pub(crate) fn player_slot(&self) -> Arc<PlayerSlot> {
        Arc::clone(&self.player)
    }

    /// One walk of the day, filtered.
    pub(crate) fn pass(&mut self, config: &FilterConfig) -> Result<Vec<Episode>, DownloadError> {
        let day = catalog::day_in_hour_order(&self.fetcher, &mut self.resolver, config.date)?;
        Ok(EpisodeFilter::new(day.into_iter(), config).collect())
    }

    pub(crate) fn episodes<'s>(
        &'s mut self,
        config: &'s FilterConfig,
        single_pass: bool,
    ) -> AutoReload<impl FnMut() -> Result<Vec<Episode>, DownloadError> + 's> {
        AutoReload::new(move || self.pass(config), single_pass)
    }

    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[cfg(test)]
    pub(crate) fn resolver(&self) -> &EpisodeResolver {
        &self.resolver
    }
}

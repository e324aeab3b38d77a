use std::collections::{HashSet, VecDeque};

use tracing::info;

use super::episode::{Episode, ItemId};
use crate::error::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Stopped,
}

/// Re-runs a catalog pass every time the previous one has been consumed, yielding only
/// episodes it has not yielded before.
///
/// Ends when a pass brings nothing new, after the first pass in `once` mode, or after
/// yielding a download error.
pub(crate) struct AutoReload<P> {
    pass: P,
    once: bool,
    state: State,
    passes: usize,
    queue: VecDeque<Episode>,
    yielded: HashSet<ItemId>,
}

impl<P> AutoReload<P>
where
    P: FnMut() -> Result<Vec<Episode>, DownloadError>,
{
    pub(crate) fn new(pass: P, once: bool) -> Self {
        Self {
            pass,
            once,
            state: State::Running,
            passes: 0,
            queue: VecDeque::new(),
            yielded: HashSet::new(),
        }
    }

    pub(crate) fn passes(&self) -> usize {
        self.passes
    }

    fn refill(&mut self) -> Result<(), DownloadError> {
        self.passes += 1;
        let episodes = (self.pass)()?;
        let total = episodes.len();
        self.queue.extend(
            episodes
                .into_iter()
                .filter(|episode| !self.yielded.contains(&episode.id)),
        );
        info!(
            pass = self.passes,
            total,
            new = self.queue.len(),
            "catalog pass finished"
        );
        Ok(())
    }
}

impl<P> Iterator for AutoReload<P>
where
    P: FnMut() -> Result<Vec<Episode>, DownloadError>,
{
    type Item = Result<Episode, DownloadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.queue.is_empty() {
            if self.state == State::Stopped || (self.once && self.passes > 0) {
                self.state = State::Stopped;
                return None;
            }
            if let Err(err) = self.refill() {
                self.state = State::Stopped;
                return Some(Err(err));
            }
            if self.queue.is_empty() {
                self.state = State::Stopped;
                return None;
            }
        }

        let episode = self.queue.pop_front()?;
        self.yielded.insert(episode.id.clone());
        Some(Ok(episode))
    }
}

// Current/previous track identity, used to skip redundant reloads

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackState {
    pub current: PathBuf,
    pub previous: PathBuf,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, path: &Path) {
        self.current = path.to_path_buf();
    }

    /// Whether `requested` has to be read from disk again.
    ///
    /// A changed track always reloads. An unchanged one reloads only when the
    /// device went idle (the track ran to the end) and `requested` is the
    /// previous track. A stopped device keeps the buffered data.
    pub fn needs_reload(&self, requested: &Path, device_idle: bool) -> bool {
        self.previous != self.current || (device_idle && self.previous == requested)
    }

    /// Record that the current track is now the buffered one
    pub fn commit(&mut self) {
        self.previous = self.current.clone();
    }

    /// Forget the previous track so the next load counts as a change
    pub fn reset_previous(&mut self) {
        self.previous = PathBuf::new();
    }
}

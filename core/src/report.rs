use std::path::Path;

use crate::result::SongError;

/// Presentation seam for an album run.
///
/// The pipeline itself never prints; whoever drives it implements this to
/// render progress bars, log lines, or nothing.
pub trait RunObserver: Send + Sync {
    fn album_started(&self, _title: &str, _songs: usize) {}
    fn song_started(&self, _name: &str) {}
    /// Cumulative bytes for the song currently streaming; `total` when the
    /// server sent a content length.
    fn download_progress(&self, _name: &str, _written: u64, _total: Option<u64>) {}
    /// `skipped` marks a file that already existed and was kept.
    fn song_succeeded(&self, _name: &str, _path: &Path, _skipped: bool) {}
    fn song_failed(&self, _name: &str, _error: &SongError) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl RunObserver for NullObserver {}

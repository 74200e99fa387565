use std::io;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use khgrab_download_http::DownloadError;
use khgrab_format_picker::{FiletypeWeights, NoCandidatesError};
use khgrab_scrape_api::url::Url;
use khgrab_scrape_api::ScrapeError;

/// Per-run knobs, passed explicitly so two runs (or two tests) never share
/// hidden state.
#[derive(Clone, Default)]
pub struct DownloadAlbumOptions {
    pub weights: FiletypeWeights,
    /// Filetype (leading dot) that beats weighted ranking whenever a song
    /// offers it.
    pub preferred_type: Option<String>,
    /// Replace files that already exist instead of skipping them.
    pub overwrite: bool,
    /// Songs downloaded in parallel; 0 and 1 both mean sequential.
    pub jobs: usize,
    pub cancel: Option<CancellationToken>,
}

/// Why one song produced no file. Every variant is recoverable at album
/// scope: the song lands in the failed list and the run moves on.
#[derive(Debug, thiserror::Error)]
pub enum SongError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    NoFiles(#[from] NoCandidatesError),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// One song that yielded no file, and why.
#[derive(Debug)]
pub struct SongFailure {
    pub url: Url,
    pub name: String,
    pub error: SongError,
}

/// A failure that aborts a whole album (its songs never start).
#[derive(Debug, thiserror::Error)]
pub enum AlbumError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error("creating album folder {}: {source}", path.display())]
    Folder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The outcome of one album run.
///
/// For a run that wasn't cancelled, `succeeded` and `failed` partition the
/// scraped song set exactly. A cancelled run covers only the songs that
/// finished processing before the cut.
#[derive(Debug)]
pub struct AlbumRun {
    pub title: String,
    /// `None` when the album had no songs — no folder is created then.
    pub folder: Option<PathBuf>,
    /// Local paths, one per song that produced a file (freshly written or
    /// already present).
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<SongFailure>,
    pub cancelled: bool,
}

impl AlbumRun {
    pub(crate) fn empty(title: String) -> Self {
        AlbumRun {
            title,
            folder: None,
            succeeded: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }

    pub fn songs_processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

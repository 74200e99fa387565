mod report;
mod result;

pub use report::{NullObserver, RunObserver};
pub use result::{AlbumError, AlbumRun, DownloadAlbumOptions, SongError, SongFailure};

pub use khgrab_download_http::{
    filename_for_url, sanitize_component, DownloadError, DownloadOutcome, HttpDownloadOptions,
    HttpDownloader, NoProgress, ProgressSink,
};
pub use khgrab_format_picker::{filetype_of, pick, pick_best, FiletypeWeights, NoCandidatesError};
pub use khgrab_scrape_api::{reqwest, url, FetchError, ScrapeContext, ScrapeError};
pub use khgrab_scraper_khinsider::{scrape_album, scrape_song_files, AlbumPage};

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use khgrab_scrape_api::url::Url;
use tracing::{info, warn};

/// Display name for a song or file URL: the decoded final path segment.
pub fn song_display_name(url: &Url) -> String {
    filename_for_url(url).unwrap_or_else(|| url.to_string())
}

enum SongRecord {
    Succeeded(PathBuf),
    Failed(SongFailure),
    Cancelled,
}

/// Scrape-rank-fetch pipeline for whole albums.
pub struct AlbumClient {
    ctx: ScrapeContext,
    downloader: HttpDownloader,
}

impl AlbumClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_context(ScrapeContext::new()?))
    }

    pub fn with_context(ctx: ScrapeContext) -> Self {
        AlbumClient {
            ctx,
            downloader: HttpDownloader::new(),
        }
    }

    pub fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    /// Run one album start to finish: scrape the listing, set up the album
    /// folder, then scrape + pick + download every song.
    ///
    /// One song's failure never aborts the album; it becomes an entry in
    /// [`AlbumRun::failed`] and the loop continues. An album with no songs
    /// returns an empty run and creates nothing. A pre-existing album
    /// folder is the resume path: existing files are skipped and counted
    /// as successes.
    pub async fn download_album(
        &self,
        album_url: &Url,
        out_dir: &Path,
        options: &DownloadAlbumOptions,
        observer: &dyn RunObserver,
    ) -> Result<AlbumRun, AlbumError> {
        let page = scrape_album(&self.ctx, album_url).await?;
        observer.album_started(&page.title, page.song_urls.len());

        if page.is_empty() {
            info!(title = %page.title, "no songs found");
            return Ok(AlbumRun::empty(page.title));
        }

        let folder = out_dir.join(sanitize_component(&page.title));
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| AlbumError::Folder {
                path: folder.clone(),
                source,
            })?;

        let jobs = options.jobs.max(1);
        let records: Vec<SongRecord> = stream::iter(page.song_urls.iter())
            .map(|song_url| self.process_song(song_url, &folder, options, observer))
            .buffer_unordered(jobs)
            .collect()
            .await;

        let mut run = AlbumRun {
            title: page.title,
            folder: Some(folder),
            succeeded: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        };
        for record in records {
            match record {
                SongRecord::Succeeded(path) => run.succeeded.push(path),
                SongRecord::Failed(failure) => run.failed.push(failure),
                SongRecord::Cancelled => run.cancelled = true,
            }
        }
        info!(
            title = %run.title,
            succeeded = run.succeeded.len(),
            failed = run.failed.len(),
            cancelled = run.cancelled,
            "album finished"
        );
        Ok(run)
    }

    async fn process_song(
        &self,
        song_url: &Url,
        folder: &Path,
        options: &DownloadAlbumOptions,
        observer: &dyn RunObserver,
    ) -> SongRecord {
        if options
            .cancel
            .as_ref()
            .is_some_and(|cancel| cancel.is_cancelled())
        {
            return SongRecord::Cancelled;
        }

        let name = song_display_name(song_url);
        observer.song_started(&name);

        match self.try_song(song_url, &name, folder, options, observer).await {
            Ok(outcome) => {
                let skipped = matches!(outcome, DownloadOutcome::Skipped(_));
                let path = outcome.into_path();
                observer.song_succeeded(&name, &path, skipped);
                SongRecord::Succeeded(path)
            }
            Err(SongError::Download(DownloadError::Cancelled { .. })) => SongRecord::Cancelled,
            Err(error) => {
                warn!(song = %name, %error, "song failed");
                observer.song_failed(&name, &error);
                SongRecord::Failed(SongFailure {
                    url: song_url.clone(),
                    name,
                    error,
                })
            }
        }
    }

    async fn try_song(
        &self,
        song_url: &Url,
        name: &str,
        folder: &Path,
        options: &DownloadAlbumOptions,
        observer: &dyn RunObserver,
    ) -> Result<DownloadOutcome, SongError> {
        let files = scrape_song_files(&self.ctx, song_url).await?;
        let chosen = pick(&files, &options.weights, options.preferred_type.as_deref())?;

        let dl_options = HttpDownloadOptions {
            overwrite: options.overwrite,
            cancel: options.cancel.clone(),
        };
        let progress = SongProgress { observer, name };
        Ok(self
            .downloader
            .download_into(&self.ctx, chosen, &dl_options, folder, &progress)
            .await?)
    }
}

/// Forwards byte-level progress to the run observer under the song's name.
struct SongProgress<'a> {
    observer: &'a dyn RunObserver,
    name: &'a str,
}

impl ProgressSink for SongProgress<'_> {
    fn on_progress(&self, written: u64, total: Option<u64>) {
        self.observer.download_progress(self.name, written, total);
    }
}

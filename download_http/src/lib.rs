mod dest;

pub use dest::{filename_for_url, sanitize_component};

use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use khgrab_scrape_api::{FetchError, ScrapeContext};

/// How one download should behave.
#[derive(Clone, Default)]
pub struct HttpDownloadOptions {
    /// Replace an existing destination instead of skipping it.
    pub overwrite: bool,
    /// Cooperative cancellation, checked between chunks.
    pub cancel: Option<CancellationToken>,
}

/// Where the bytes ended up — or why they didn't have to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fully streamed to disk.
    Written(PathBuf),
    /// The destination already existed and overwrite was off.
    Skipped(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Written(path) | DownloadOutcome::Skipped(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            DownloadOutcome::Written(path) | DownloadOutcome::Skipped(path) => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("creating {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot derive a filename from {url}")]
    NoFilename { url: Url },
    #[error("download of {url} was cancelled")]
    Cancelled { url: Url },
}

/// Receives cumulative progress while a body streams to disk.
pub trait ProgressSink: Send + Sync {
    /// `written` bytes so far; `total` when the server sent a length, which
    /// lets the caller render a completion fraction.
    fn on_progress(&self, written: u64, total: Option<u64>);
}

/// Sink for callers that don't care.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _written: u64, _total: Option<u64>) {}
}

#[derive(Default)]
pub struct HttpDownloader {}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {}
    }

    /// Stream `url` into `output`.
    ///
    /// The destination is opened with exclusive-create semantics: an
    /// existing file becomes `Skipped`, and two racing callers can never
    /// both write the same missing file. The body is copied chunk by chunk
    /// in bounded memory. On a mid-stream failure the partial file is left
    /// on disk; there is no rollback.
    pub async fn download_to<P>(
        &self,
        ctx: &ScrapeContext,
        url: &Url,
        options: &HttpDownloadOptions,
        output: P,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        P: AsRef<Path>,
    {
        let output = output.as_ref();

        let mut file = if options.overwrite {
            tokio::fs::File::create(output)
                .await
                .map_err(|source| DownloadError::Create {
                    path: output.to_path_buf(),
                    source,
                })?
        } else {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(output)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %output.display(), "destination exists, skipping");
                    return Ok(DownloadOutcome::Skipped(output.to_path_buf()));
                }
                Err(source) => {
                    return Err(DownloadError::Create {
                        path: output.to_path_buf(),
                        source,
                    })
                }
            }
        };

        let response = self
            .send(ctx, url)
            .await?;

        let total = response.content_length();
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        loop {
            let next = match &options.cancel {
                Some(cancel) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(DownloadError::Cancelled { url: url.clone() });
                    }
                    chunk = stream.next() => chunk,
                },
                None => stream.next().await,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::Write {
                    path: output.to_path_buf(),
                    source,
                })?;
            written += chunk.len() as u64;
            progress.on_progress(written, total);
        }

        file.flush().await.map_err(|source| DownloadError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        info!(%url, path = %output.display(), bytes = written, "download finished");
        Ok(DownloadOutcome::Written(output.to_path_buf()))
    }

    /// Like [`Self::download_to`], with the filename derived from the URL.
    pub async fn download_into<P>(
        &self,
        ctx: &ScrapeContext,
        url: &Url,
        options: &HttpDownloadOptions,
        folder: P,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        P: AsRef<Path>,
    {
        let name =
            filename_for_url(url).ok_or_else(|| DownloadError::NoFilename { url: url.clone() })?;
        self.download_to(ctx, url, options, folder.as_ref().join(name), progress)
            .await
    }

    async fn send(
        &self,
        ctx: &ScrapeContext,
        url: &Url,
    ) -> Result<khgrab_scrape_api::reqwest::Response, DownloadError> {
        let response = ctx
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            }
            .into());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct Recorded(Mutex<Vec<(u64, Option<u64>)>>);

    impl Recorded {
        fn new() -> Self {
            Recorded(Mutex::new(Vec::new()))
        }
    }

    impl ProgressSink for Recorded {
        fn on_progress(&self, written: u64, total: Option<u64>) {
            self.0.lock().unwrap().push((written, total));
        }
    }

    #[tokio::test]
    async fn streams_body_to_disk_and_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"0123456789"[..]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.mp3");
        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/a.mp3", server.uri())).unwrap();
        let progress = Recorded::new();

        let outcome = HttpDownloader::new()
            .download_to(&ctx, &url, &HttpDownloadOptions::default(), &dest, &progress)
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Written(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");

        let seen = progress.0.lock().unwrap();
        let (written, total) = *seen.last().unwrap();
        assert_eq!(written, 10);
        assert_eq!(total, Some(10));
    }

    #[tokio::test]
    async fn existing_destination_is_skipped_without_a_request() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("kept.mp3");
        std::fs::write(&dest, b"old bytes").unwrap();

        let ctx = ScrapeContext::new().unwrap();
        // nothing listens here; a request would fail the test
        let url = Url::parse("http://127.0.0.1:9/kept.mp3").unwrap();

        let outcome = HttpDownloader::new()
            .download_to(&ctx, &url, &HttpDownloadOptions::default(), &dest, &NoProgress)
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Skipped(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"old bytes");
    }

    #[tokio::test]
    async fn overwrite_replaces_the_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"new"[..]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.mp3");
        std::fs::write(&dest, b"something much longer").unwrap();

        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/a.mp3", server.uri())).unwrap();
        let options = HttpDownloadOptions {
            overwrite: true,
            ..Default::default()
        };

        let outcome = HttpDownloader::new()
            .download_to(&ctx, &url, &options, &dest, &NoProgress)
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Written(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn http_error_status_fails_the_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/a.mp3", server.uri())).unwrap();

        let result = HttpDownloader::new()
            .download_to(
                &ctx,
                &url,
                &HttpDownloadOptions::default(),
                dir.path().join("a.mp3"),
                &NoProgress,
            )
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::Fetch(FetchError::Status { .. }))
        ));
    }

    #[tokio::test]
    async fn cancelled_token_abandons_the_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1 << 20]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/a.mp3", server.uri())).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = HttpDownloadOptions {
            overwrite: false,
            cancel: Some(cancel),
        };

        let result = HttpDownloader::new()
            .download_to(&ctx, &url, &options, dir.path().join("a.mp3"), &NoProgress)
            .await;

        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn download_into_derives_the_filename() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/01%20Intro.flac"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"flac!"[..]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/dl/01%20Intro.flac", server.uri())).unwrap();

        let outcome = HttpDownloader::new()
            .download_into(&ctx, &url, &HttpDownloadOptions::default(), dir.path(), &NoProgress)
            .await
            .unwrap();

        assert_eq!(outcome.path(), dir.path().join("01 Intro.flac"));
    }
}

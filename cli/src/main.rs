mod progress;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;
use url::Url;

use khgrab::{AlbumClient, DownloadAlbumOptions, FiletypeWeights};
use khgrab_convert::{convert_all, FfmpegConverter};

use crate::progress::ConsoleObserver;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// URLs of albums to download
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to a text file containing album URLs (separated by newlines)
    #[arg(short = 'f', long = "from-file", value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Path specifying where the albums should be saved
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Download a specific filetype when a song offers it (e.g. mp3)
    #[arg(short = 't', long = "type", value_name = "EXT")]
    filetype: Option<String>,

    /// Convert downloaded files to this filetype with ffmpeg
    #[arg(short, long, value_name = "EXT")]
    convert: Option<String>,

    /// Re-download files that already exist
    #[arg(long)]
    overwrite: bool,

    /// Songs to download in parallel within an album
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// TOML file mapping filetypes to ranking weights (".flac" = 30)
    #[arg(long, value_name = "FILE")]
    weights: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("khdl error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let urls = gather_urls(&args)?;
    if urls.is_empty() {
        println!("Please specify a URL.");
        return Ok(ExitCode::FAILURE);
    }

    let weights = match &args.weights {
        Some(path) => load_weights(path)?,
        None => FiletypeWeights::default(),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let options = DownloadAlbumOptions {
        weights,
        preferred_type: args.filetype.as_deref().map(dotted),
        overwrite: args.overwrite,
        jobs: args.jobs,
        cancel: Some(cancel.clone()),
    };

    let client = AlbumClient::new()?;
    let mut all_succeeded = Vec::new();

    for url in &urls {
        if cancel.is_cancelled() {
            break;
        }
        let album_url = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(url = %url, %e, "not a valid album URL");
                continue;
            }
        };

        let observer = ConsoleObserver::new();
        match client
            .download_album(&album_url, &args.output, &options, &observer)
            .await
        {
            Ok(run) => {
                observer.finish();
                if run.folder.is_none() {
                    println!("No songs found for {}!", run.title);
                }
                if !run.failed.is_empty() {
                    eprintln!("Some songs failed to download:");
                    for failure in &run.failed {
                        eprintln!("  {}", failure.name);
                    }
                }
                all_succeeded.extend(run.succeeded);
            }
            Err(e) => {
                observer.finish();
                error!(url = %url, %e, "album failed");
            }
        }
    }

    if cancel.is_cancelled() {
        eprintln!("Cancelled.");
    }

    if let Some(target) = &args.convert {
        let converter = FfmpegConverter::discover()?;
        let results = convert_all(&converter, &all_succeeded, target).await;
        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed > 0 {
            eprintln!("{failed} file(s) failed to convert.");
        }
    }

    // individual song failures never fail the process
    Ok(ExitCode::SUCCESS)
}

fn gather_urls(args: &Args) -> Result<BTreeSet<String>> {
    let mut urls: BTreeSet<String> = args.urls.iter().cloned().collect();
    if let Some(path) = &args.from_file {
        let listing = std::fs::read_to_string(path)
            .with_context(|| format!("reading URL list {}", path.display()))?;
        urls.extend(
            listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
    }
    Ok(urls)
}

fn load_weights(path: &Path) -> Result<FiletypeWeights> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading weight table {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing weight table {}", path.display()))
}

fn dotted(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no {0} binary on PATH")]
    MissingBinary(&'static str),
    #[error("converting {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("converter exited with {status} for {}", path.display())]
    Failed { path: PathBuf, status: ExitStatus },
}

/// Post-processing collaborator: turn a downloaded file into another audio
/// format. Injected by the caller — the download pipeline never depends on
/// any particular external tool.
#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Convert `input` to the format named by `target_ext`, returning the
    /// converted file's path. The source file is kept.
    async fn convert(&self, input: &Path, target_ext: &str) -> Result<PathBuf, ConvertError>;
}

/// `ffmpeg`-backed [`AudioConverter`].
pub struct FfmpegConverter {
    binary: PathBuf,
}

impl FfmpegConverter {
    /// Locate `ffmpeg` on PATH.
    pub fn discover() -> Result<Self, ConvertError> {
        let binary = which::which("ffmpeg").map_err(|_| ConvertError::MissingBinary("ffmpeg"))?;
        Ok(FfmpegConverter { binary })
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        FfmpegConverter { binary }
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn convert(&self, input: &Path, target_ext: &str) -> Result<PathBuf, ConvertError> {
        let output = target_path(input, target_ext);
        info!(input = %input.display(), output = %output.display(), "converting");

        let status = Command::new(&self.binary)
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-y")
            .arg(&output)
            .status()
            .await
            .map_err(|source| ConvertError::Spawn {
                path: input.to_path_buf(),
                source,
            })?;

        if !status.success() {
            return Err(ConvertError::Failed {
                path: input.to_path_buf(),
                status,
            });
        }
        Ok(output)
    }
}

/// Convert every path not already of `target_ext`. One file's failure is
/// logged and reported in its slot; the rest still convert.
pub async fn convert_all(
    converter: &dyn AudioConverter,
    paths: &[PathBuf],
    target_ext: &str,
) -> Vec<Result<PathBuf, ConvertError>> {
    let wanted = dotted(target_ext);
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        if extension_of(path) == wanted {
            results.push(Ok(path.clone()));
            continue;
        }
        match converter.convert(path, &wanted).await {
            Ok(converted) => results.push(Ok(converted)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "conversion failed");
                results.push(Err(e));
            }
        }
    }
    results
}

/// Converted-file path: the input with its extension swapped.
pub fn target_path(input: &Path, target_ext: &str) -> PathBuf {
    input.with_extension(target_ext.trim_start_matches('.'))
}

fn dotted(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Renamer;

    #[async_trait]
    impl AudioConverter for Renamer {
        async fn convert(&self, input: &Path, target_ext: &str) -> Result<PathBuf, ConvertError> {
            Ok(target_path(input, target_ext))
        }
    }

    #[test]
    fn target_path_swaps_the_extension() {
        assert_eq!(
            target_path(Path::new("/x/Track 01.m4a"), ".flac"),
            Path::new("/x/Track 01.flac")
        );
    }

    #[tokio::test]
    async fn files_already_in_the_target_type_are_left_alone() {
        let paths = vec![PathBuf::from("/x/a.flac"), PathBuf::from("/x/b.m4a")];
        let results = convert_all(&Renamer, &paths, "flac").await;
        assert_eq!(results[0].as_deref().unwrap(), Path::new("/x/a.flac"));
        assert_eq!(results[1].as_deref().unwrap(), Path::new("/x/b.flac"));
    }

    #[tokio::test]
    async fn dotless_and_dotted_target_agree() {
        let paths = vec![PathBuf::from("/x/b.m4a")];
        let dotted_run = convert_all(&Renamer, &paths, ".flac").await;
        let dotless_run = convert_all(&Renamer, &paths, "flac").await;
        assert_eq!(
            dotted_run[0].as_deref().unwrap(),
            dotless_run[0].as_deref().unwrap()
        );
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

/// Preference score per filetype (extension with its leading dot).
///
/// An explicit value threaded through calls rather than ambient state, so a
/// run — or a test — can carry its own table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FiletypeWeights(BTreeMap<String, i32>);

impl FiletypeWeights {
    pub fn new(table: BTreeMap<String, i32>) -> Self {
        FiletypeWeights(table)
    }

    /// Weight of a filetype. Types missing from the table weigh 0, which
    /// keeps the ranking total over any candidate set.
    pub fn weight(&self, filetype: &str) -> i32 {
        self.0.get(filetype).copied().unwrap_or(0)
    }
}

impl Default for FiletypeWeights {
    fn default() -> Self {
        FiletypeWeights(BTreeMap::from([
            (".flac".to_string(), 30),
            (".m4a".to_string(), 20),
            (".mp3".to_string(), 10),
        ]))
    }
}

/// Filetype of a candidate URL: the extension of its path, leading dot
/// included. Case-sensitive; a path without an extension yields `""`.
pub fn filetype_of(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// There was nothing to choose from. Recoverable: the caller skips the song
/// and carries on with the album.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("no downloadable files to choose from")]
pub struct NoCandidatesError;

/// The candidate with the strictly highest weight; ties keep the earliest
/// candidate, so one call is always internally consistent.
pub fn pick_best<'a>(
    candidates: &'a [Url],
    weights: &FiletypeWeights,
) -> Result<&'a Url, NoCandidatesError> {
    let mut best: Option<(&Url, i32)> = None;
    for url in candidates {
        let w = weights.weight(&filetype_of(url));
        match best {
            Some((_, top)) if top >= w => {}
            _ => best = Some((url, w)),
        }
    }
    best.map(|(url, _)| url).ok_or(NoCandidatesError)
}

/// Like [`pick_best`], but a requested filetype wins outright when any
/// candidate offers it; otherwise weighted selection decides.
pub fn pick<'a>(
    candidates: &'a [Url],
    weights: &FiletypeWeights,
    preferred: Option<&str>,
) -> Result<&'a Url, NoCandidatesError> {
    if let Some(wanted) = preferred {
        if let Some(url) = candidates.iter().find(|url| filetype_of(url) == wanted) {
            return Ok(url);
        }
    }
    pick_best(candidates, weights)
}

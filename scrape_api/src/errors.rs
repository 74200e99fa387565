use url::Url;

/// Transport or HTTP-status failure while fetching one page.
///
/// Fatal for that page only, never for the whole run — the caller decides
/// whether to skip the page or abort its album.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetching {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("fetching {url}: HTTP {status}")]
    Status { url: Url, status: reqwest::StatusCode },
}

/// The page could not be read as the page we expected.
///
/// The markup selectors are a versionless contract with the site; a
/// redesign surfaces as `Markup`, not a panic.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no {what} on {url}")]
    Markup { url: Url, what: &'static str },
}

use url::{ParseError, Url};

/// Resolves an href scraped off a page against the absolute URL of the page
/// it came from.
///
/// Anything that already parses as an absolute URL is returned as-is.
/// Everything else adopts the parent's scheme and host and keeps its own
/// path, query and fragment verbatim — `song/a` found on
/// `https://h/album/1` comes back as `https://h/song/a`, not
/// `https://h/album/song/a`.
pub fn normalize(href: &str, parent: &Url) -> Result<Url, ParseError> {
    match Url::parse(href) {
        Ok(absolute) => Ok(absolute),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let mut origin = parent.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin.set_fragment(None);
            origin.join(href)
        }
        Err(e) => Err(e),
    }
}

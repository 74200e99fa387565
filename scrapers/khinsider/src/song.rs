use std::collections::BTreeSet;

use nipper::Document;
use tracing::debug;
use url::Url;

use khgrab_scrape_api::{ScrapeContext, ScrapeError};

use crate::common::decode_and_normalize;

/// Collect a song page's downloadable file URLs.
///
/// The site marks download links with a `songDownloadLink` element *inside*
/// the real anchor, so the href lives on the matched element's parent. Each
/// offered filetype typically contributes one URL; duplicates collapse on
/// URL identity and the result comes back in a stable order.
pub async fn scrape_song_files(ctx: &ScrapeContext, url: &Url) -> Result<Vec<Url>, ScrapeError> {
    let body = ctx.get_body("song page", url).await?;
    parse_song_files(&body, url)
}

/// The pure half of [`scrape_song_files`].
pub fn parse_song_files(html: &str, url: &Url) -> Result<Vec<Url>, ScrapeError> {
    let document = Document::from(html);

    let mut files = BTreeSet::new();
    for marker in document.select("a .songDownloadLink").iter() {
        let Some(href) = marker.parent().attr("href") else {
            continue;
        };
        files.insert(decode_and_normalize(&href, url)?);
    }

    debug!(%url, files = files.len(), "scraped song page");
    Ok(files.into_iter().collect())
}

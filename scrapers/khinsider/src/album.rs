use std::collections::BTreeSet;

use nipper::Document;
use tracing::debug;
use url::Url;

use khgrab_scrape_api::{ScrapeContext, ScrapeError};

use crate::common::decode_and_normalize;

/// One scraped album page: the display title plus its song pages in a
/// fixed, reproducible order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumPage {
    pub url: Url,
    pub title: String,
    pub song_urls: Vec<Url>,
}

impl AlbumPage {
    pub fn is_empty(&self) -> bool {
        self.song_urls.is_empty()
    }
}

/// Scrape an album's title and song-page URLs.
pub async fn scrape_album(ctx: &ScrapeContext, url: &Url) -> Result<AlbumPage, ScrapeError> {
    let body = ctx.get_body("album page", url).await?;
    parse_album(&body, url)
}

/// The pure half of [`scrape_album`], split out so fixtures can drive it.
pub fn parse_album(html: &str, url: &Url) -> Result<AlbumPage, ScrapeError> {
    let document = Document::from(html);

    let heading = document.select("#EchoTopic h2");
    if !heading.exists() {
        return Err(ScrapeError::Markup {
            url: url.clone(),
            what: "album heading (#EchoTopic h2)",
        });
    }
    let title = heading.text().to_string();

    let songlist = document.select("#songlist");
    if !songlist.exists() {
        return Err(ScrapeError::Markup {
            url: url.clone(),
            what: "song list (#songlist)",
        });
    }

    // Set-then-sort: repeated runs enumerate songs identically, which also
    // fixes download order.
    let mut songs = BTreeSet::new();
    for anchor in songlist.select("a").iter() {
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        songs.insert(decode_and_normalize(&href, url)?);
    }

    debug!(title = %title, songs = songs.len(), "scraped album page");
    Ok(AlbumPage {
        url: url.clone(),
        title,
        song_urls: songs.into_iter().collect(),
    })
}

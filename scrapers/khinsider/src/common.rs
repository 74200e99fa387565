use url::Url;

/// Percent-decode an href, then make it absolute relative to the page that
/// contained it. Hrefs that are not valid percent-encoding are taken as-is.
pub(crate) fn decode_and_normalize(href: &str, page: &Url) -> Result<Url, url::ParseError> {
    let decoded = match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => href.to_string(),
    };
    unrelative::normalize(&decoded, page)
}

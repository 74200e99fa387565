use url::Url;

/// Destination filename for a URL when the caller doesn't supply one:
/// URL-decode the path, take its final segment, sanitize.
pub fn filename_for_url(url: &Url) -> Option<String> {
    let path = url.path();
    let decoded = match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    };
    let segment = decoded.split('/').rev().find(|s| !s.is_empty())?;
    let name = sanitize_component(segment);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// Make a scraped display string usable as one path component.
///
/// Separators, NUL and control characters become `_`; leading/trailing
/// spaces and dots go away; length is capped at 255 bytes. Interior spaces
/// are kept — album titles are display names.
pub fn sanitize_component(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c: char| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_segment_decoded() {
        let url = Url::parse("https://dl.example.com/ost/01%20Opening%20Theme.flac").unwrap();
        assert_eq!(
            filename_for_url(&url).as_deref(),
            Some("01 Opening Theme.flac")
        );
    }

    #[test]
    fn query_is_not_part_of_the_name() {
        let url = Url::parse("https://dl.example.com/a.mp3?token=zzz").unwrap();
        assert_eq!(filename_for_url(&url).as_deref(), Some("a.mp3"));
    }

    #[test]
    fn trailing_slash_falls_back_to_previous_segment() {
        let url = Url::parse("https://dl.example.com/albums/ost/").unwrap();
        assert_eq!(filename_for_url(&url).as_deref(), Some("ost"));
    }

    #[test]
    fn root_path_has_no_name() {
        let url = Url::parse("https://dl.example.com/").unwrap();
        assert_eq!(filename_for_url(&url), None);
    }

    #[test]
    fn decoded_separators_cannot_escape_the_folder() {
        let url = Url::parse("https://dl.example.com/a%2Fb.mp3").unwrap();
        let name = filename_for_url(&url).unwrap();
        assert!(!name.contains('/'));
    }

    #[test]
    fn sanitize_keeps_spaces_and_drops_separators() {
        assert_eq!(
            sanitize_component("Test OST: Disc 1/2"),
            "Test OST: Disc 1_2"
        );
        assert_eq!(sanitize_component("a\\b\0c"), "a_b_c");
    }

    #[test]
    fn sanitize_trims_dots_and_spaces() {
        assert_eq!(sanitize_component("  ..Album.. "), "Album");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_component(&long).len(), 255);
    }
}

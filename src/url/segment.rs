use url::Url;

/// Checks whether a URL's path ends in `.{extension}`
///
/// The query string and fragment are ignored, so `b.mp3?x=1` matches `mp3`.
/// The comparison is ASCII case-insensitive.
///
/// # Examples
///
/// ```
/// use echo_sieve::url::has_extension;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/b.MP3?x=1#t=30").unwrap();
/// assert!(has_extension(&url, "mp3"));
/// ```
pub fn has_extension(url: &Url, extension: &str) -> bool {
    let path = url.path();
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };

    // A dot in an earlier segment ("/v1.2/track") is not an extension
    !ext.contains('/') && ext.eq_ignore_ascii_case(extension)
}

/// Returns the last non-empty path segment of a URL, percent-decoded
///
/// Returns None for URLs whose path is empty or ends in a slash.
pub fn final_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }

    // Malformed UTF-8 after decoding keeps the raw segment
    let decoded = urlencoding::decode(segment)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

use crate::url::final_segment;
use sha2::{Digest, Sha256};
use url::Url;

/// Hex characters of the URL digest appended to every mirror name
const DIGEST_LEN: usize = 12;

/// Longest stem kept from the source file name
const MAX_STEM_LEN: usize = 80;

/// Stem used when the URL path has no usable final segment
const FALLBACK_STEM: &str = "audio";

/// Derives the local file name of a mirrored URL
///
/// The sanitized final path segment keeps the name recognizable; a digest of
/// the full URL keeps unrelated sources with the same basename apart. The
/// same URL always maps to the same name.
///
/// # Examples
///
/// ```
/// use echo_sieve::download::mirror_file_name;
/// use url::Url;
///
/// let a = mirror_file_name(&Url::parse("https://x/one/ep.mp3").unwrap());
/// let b = mirror_file_name(&Url::parse("https://x/two/ep.mp3").unwrap());
/// assert!(a.starts_with("ep-") && a.ends_with(".mp3"));
/// assert_ne!(a, b);
/// ```
pub fn mirror_file_name(url: &Url) -> String {
    let segment = final_segment(url).map(|s| sanitize(&s)).unwrap_or_default();

    let (stem, extension) = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (segment.as_str(), None),
    };

    let stem: String = if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.chars().take(MAX_STEM_LEN).collect()
    };

    let digest = url_digest(url);
    match extension {
        Some(ext) => format!("{}-{}.{}", stem, digest, ext),
        None => format!("{}-{}", stem, digest),
    }
}

fn url_digest(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}

/// Keeps ASCII alphanumerics, `-`, `_` and `.`; anything else becomes `_`.
/// Leading dots are dropped so a mirror is never a hidden file.
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

//! HTML parser for extracting audio links and embedded frames
//!
//! Three independent signals feed one deduplicated candidate set:
//! - `src` of audio-typed media elements (`<source type="audio/mpeg">`, `<audio>`)
//! - `href` of anchors whose path ends in the audio extension
//! - absolute URLs ending in the audio extension inside inline `<script>` text
//!
//! Frame sources are collected separately so the extractor can recurse.

use crate::url::{has_extension, resolve_link};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// What counts as an audio link on a page
#[derive(Debug, Clone, Copy)]
pub struct AudioRules<'a> {
    /// Extension without the dot, e.g. `mp3`
    pub extension: &'a str,
    /// `type` attribute of `<source>` elements treated as audio
    pub media_type: &'a str,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Absolute candidate audio URLs
    pub audio_links: HashSet<String>,

    /// Absolute `<iframe src>` URLs, in document order
    pub frames: Vec<Url>,
}

/// Parses HTML content and extracts audio links and frame sources
///
/// Relative references are resolved against `base_url`.
///
/// # Example
///
/// ```
/// use echo_sieve::extract::{parse_html, AudioRules};
/// use url::Url;
///
/// let html = r#"<a href="/ep1.mp3">Episode 1</a><iframe src="/player"></iframe>"#;
/// let base = Url::parse("https://example.com/show").unwrap();
/// let rules = AudioRules { extension: "mp3", media_type: "audio/mpeg" };
///
/// let parsed = parse_html(html, &base, rules);
/// assert!(parsed.audio_links.contains("https://example.com/ep1.mp3"));
/// assert_eq!(parsed.frames[0].as_str(), "https://example.com/player");
/// ```
pub fn parse_html(html: &str, base_url: &Url, rules: AudioRules<'_>) -> ParsedPage {
    let document = Html::parse_document(html);

    let mut audio_links = HashSet::new();
    extract_media_sources(&document, base_url, rules, &mut audio_links);
    extract_anchors(&document, base_url, rules, &mut audio_links);
    extract_script_urls(&document, rules, &mut audio_links);

    let frames = extract_frames(&document, base_url);

    ParsedPage {
        audio_links,
        frames,
    }
}

fn extract_media_sources(
    document: &Html,
    base_url: &Url,
    rules: AudioRules<'_>,
    links: &mut HashSet<String>,
) {
    if let Ok(source_selector) = Selector::parse("source[src]") {
        for element in document.select(&source_selector) {
            let is_audio = element
                .value()
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case(rules.media_type))
                .unwrap_or(false);

            if !is_audio {
                continue;
            }

            if let Some(url) = element.value().attr("src").and_then(|s| resolve_link(s, base_url)) {
                links.insert(url.to_string());
            }
        }
    }

    // <audio src> is audio-typed by definition
    if let Ok(audio_selector) = Selector::parse("audio[src]") {
        for element in document.select(&audio_selector) {
            if let Some(url) = element.value().attr("src").and_then(|s| resolve_link(s, base_url)) {
                links.insert(url.to_string());
            }
        }
    }
}

fn extract_anchors(
    document: &Html,
    base_url: &Url,
    rules: AudioRules<'_>,
    links: &mut HashSet<String>,
) {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return;
    };

    for element in document.select(&a_selector) {
        if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
            if has_extension(&url, rules.extension) {
                links.insert(url.to_string());
            }
        }
    }
}

fn script_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https?://[^\s"'<>\\`]+"#).expect("static script URL pattern is valid")
    })
}

/// Finds absolute audio URLs inside inline script text
///
/// Player configuration is often JSON with escaped slashes (`https:\/\/...`),
/// so those are unescaped before matching.
fn extract_script_urls(document: &Html, rules: AudioRules<'_>, links: &mut HashSet<String>) {
    let Ok(script_selector) = Selector::parse("script") else {
        return;
    };

    let script_text = document
        .select(&script_selector)
        .map(|script| script.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
        .replace("\\/", "/");

    for found in script_url_pattern().find_iter(&script_text) {
        let candidate = found
            .as_str()
            .trim_end_matches(|c: char| matches!(c, ',' | ';' | ')' | ']' | '}' | '.'));

        if let Ok(url) = Url::parse(candidate) {
            if has_extension(&url, rules.extension) {
                links.insert(url.to_string());
            }
        }
    }
}

fn extract_frames(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(iframe_selector) = Selector::parse("iframe[src]") else {
        return Vec::new();
    };

    let mut frames: Vec<Url> = Vec::new();
    for element in document.select(&iframe_selector) {
        if let Some(url) = element.value().attr("src").and_then(|s| resolve_link(s, base_url)) {
            if !frames.contains(&url) {
                frames.push(url);
            }
        }
    }
    frames
}

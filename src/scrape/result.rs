use serde::Serialize;
use std::collections::BTreeMap;

/// How a discovered link is offered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// The remote URL passed the availability probe
    Direct,
    /// A local mirror was written; the key is its file name
    Temporary,
}

/// Why a candidate link is missing from the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OmitReason {
    /// Probe failed and the declared or streamed size exceeded the cap
    TooLarge,
    /// Probe failed and the mirror download failed
    DownloadFailed,
    /// The scrape was cancelled or hit its deadline first
    Cancelled,
}

/// A candidate that did not make it into the result mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedLink {
    pub url: String,
    pub reason: OmitReason,
}

/// One element of the JSON answer handed to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub locator: String,
    pub kind: LinkStatus,
}

/// Outcome of scraping one page
///
/// The mapping is keyed by the original URL for `Direct` entries and by the
/// local file name for `Temporary` ones. Candidates that could be neither
/// probed nor mirrored are not in the mapping; they are listed in
/// [`omitted`](Self::omitted) for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    links: BTreeMap<String, LinkStatus>,
    omitted: Vec<OmittedLink>,
}

impl ScrapeResult {
    pub(crate) fn insert(&mut self, key: String, status: LinkStatus) {
        self.links.insert(key, status);
    }

    pub(crate) fn omit(&mut self, url: String, reason: OmitReason) {
        self.omitted.push(OmittedLink { url, reason });
    }

    pub fn get(&self, key: &str) -> Option<LinkStatus> {
        self.links.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, LinkStatus)> {
        self.links.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn links(&self) -> &BTreeMap<String, LinkStatus> {
        &self.links
    }

    pub fn omitted(&self) -> &[OmittedLink] {
        &self.omitted
    }

    pub fn count(&self, status: LinkStatus) -> usize {
        self.links.values().filter(|s| **s == status).count()
    }

    /// Builds the `[{locator, kind}]` answer
    ///
    /// Temporary locators become `{public_base_url}/downloads/{file}` when a
    /// base URL is given, and stay bare file names otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use echo_sieve::scrape::ScrapeResult;
    ///
    /// let result = ScrapeResult::default();
    /// assert!(result.to_entries(Some("http://localhost:5000")).is_empty());
    /// ```
    pub fn to_entries(&self, public_base_url: Option<&str>) -> Vec<ResultEntry> {
        self.iter()
            .map(|(key, kind)| {
                let locator = match (kind, public_base_url) {
                    (LinkStatus::Temporary, Some(base)) => {
                        format!("{}/downloads/{}", base.trim_end_matches('/'), key)
                    }
                    _ => key.to_string(),
                };
                ResultEntry { locator, kind }
            })
            .collect()
    }
}

//! Scrape orchestration
//!
//! [`Scraper`] composes extraction, probing and mirroring into a single
//! status-tagged result per page.

mod coordinator;
mod result;

pub use coordinator::Scraper;
pub use result::{LinkStatus, OmitReason, OmittedLink, ResultEntry, ScrapeResult};

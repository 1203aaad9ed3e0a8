//! URL handling module for Echo-Sieve
//!
//! This module provides link resolution against a page base, query-stripped
//! extension matching, and file-name extraction for mirrored downloads.

mod resolve;
mod segment;

// Re-export main functions
pub use resolve::{parse_page_url, resolve_link};
pub use segment::{final_segment, has_extension};

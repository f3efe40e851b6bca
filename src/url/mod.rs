//! URL handling module for Sponsor-Scout
//!
//! This module provides URL normalization, the website identity used for
//! deduplication, domain extraction and source filtering.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_asset_url, is_foreign_cctld};
pub use filter::{DomainFilter, FilterVerdict};
pub use normalize::{normalize_url, site_identity, SiteIdentity};

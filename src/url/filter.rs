//! Domain exclusion filter

use crate::config::FilterSettings;
use crate::url::{extract_domain, is_asset_url, is_foreign_cctld, normalize_url};

/// Reason a URL or website was filtered out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Keep,
    Excluded(String),
    ForeignTld,
    Asset,
    Unparseable,
}

impl FilterVerdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Applies the configured exclusion patterns and TLD policy
#[derive(Debug, Clone)]
pub struct DomainFilter {
    patterns: Vec<String>,
    allow_foreign_tlds: bool,
}

impl DomainFilter {
    pub fn new(settings: &FilterSettings) -> Self {
        Self {
            patterns: settings
                .exclude_domains
                .iter()
                .map(|p| p.trim().to_lowercase())
                .collect(),
            allow_foreign_tlds: settings.allow_foreign_tlds,
        }
    }

    /// Returns the first exclusion pattern matching `domain`
    ///
    /// `*.example.com` matches `example.com` itself and any subdomain;
    /// a bare pattern matches only that exact domain.
    pub fn excluded_by(&self, domain: &str) -> Option<&str> {
        let domain = domain.to_lowercase();
        let domain = domain.strip_prefix("www.").unwrap_or(&domain);

        self.patterns
            .iter()
            .find(|pattern| match pattern.strip_prefix("*.") {
                Some(base) => {
                    domain == base
                        || domain
                            .strip_suffix(base)
                            .map_or(false, |prefix| prefix.ends_with('.'))
                }
                None => domain == pattern.as_str(),
            })
            .map(|p| p.as_str())
    }

    /// Decides whether a search result URL is worth scraping
    pub fn check_source(&self, raw: &str) -> FilterVerdict {
        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(_) => return FilterVerdict::Unparseable,
        };

        if is_asset_url(&url) {
            return FilterVerdict::Asset;
        }

        self.check_domain(&url)
    }

    /// Decides whether a candidate's website may be analyzed
    ///
    /// Unparseable websites are kept; the registry treats them as opaque strings.
    pub fn check_website(&self, raw: &str) -> FilterVerdict {
        match normalize_url(raw) {
            Ok(url) => self.check_domain(&url),
            Err(_) => FilterVerdict::Keep,
        }
    }

    fn check_domain(&self, url: &::url::Url) -> FilterVerdict {
        let Some(domain) = extract_domain(url) else {
            return FilterVerdict::Unparseable;
        };

        if let Some(pattern) = self.excluded_by(&domain) {
            return FilterVerdict::Excluded(pattern.to_string());
        }

        if !self.allow_foreign_tlds && is_foreign_cctld(&domain) {
            return FilterVerdict::ForeignTld;
        }

        FilterVerdict::Keep
    }
}

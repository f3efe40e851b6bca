//! Contact email discovery on company websites
//!
//! The homepage is scanned for `mailto:` links, plain addresses and
//! obfuscated `name [at] domain [dot] com` forms. Without a preferred
//! address (`contact@`, `info@`, ...) a few same-site contact pages are
//! visited as well. Every fetch runs under its own per-call timeout and
//! retry policy.

use crate::pipeline::retry::RetryPolicy;
use crate::services::{FetchedPage, PageFetcher, ServiceError};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use url::Url;

/// Local parts that mark a general inbox
const PREFERRED_PREFIXES: &[&str] = &[
    "contact", "info", "hello", "sales", "support", "team", "hr", "careers", "jobs",
    "inquiries",
];

/// Domains that only ever appear in templates or tracking snippets
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "domain.com",
    "yourdomain.com",
    "email.com",
    "company.com",
    "wixpress.com",
    "sentry.io",
];

const PLACEHOLDER_LOCALS: &[&str] = &[
    "yourname",
    "your.name",
    "name",
    "user",
    "username",
    "test",
    "email",
    "firstname.lastname",
    "john.doe",
    "noreply",
    "no-reply",
];

/// Suffixes of retina image names such as `logo@2x.png`
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// Paths of pages likely to list contact addresses
const CONTACT_PATHS: &[&str] = &[
    "/contact",
    "/contact-us",
    "/about/contact",
    "/about",
    "/team",
    "/imprint",
];

const MIN_EMAIL_CHARS: usize = 6;
const MAX_EMAIL_CHARS: usize = 64;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid email pattern")
});

static OBFUSCATED_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\[({]\s*at\s*[\])}]\s*").expect("valid obfuscated at pattern")
});

static OBFUSCATED_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[\[({]\s*dot\s*[\])}]\s*").expect("valid obfuscated dot pattern")
});

/// Finds public contact addresses on a company website
#[derive(Clone)]
pub struct EmailFinder {
    fetcher: Arc<dyn PageFetcher>,
    max_contact_pages: usize,
    retry: RetryPolicy,
}

impl EmailFinder {
    /// # Arguments
    ///
    /// * `fetcher` - Page fetcher shared with the rest of the run
    /// * `max_contact_pages` - Contact pages visited after the homepage
    /// * `retry` - Policy applied to each page fetch; its call timeout is the scrape timeout
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        max_contact_pages: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            max_contact_pages,
            retry,
        }
    }

    /// Collects addresses from the homepage and, if needed, contact pages
    ///
    /// Only a homepage failure is returned; contact page failures are skipped.
    pub async fn find(&self, website: &str) -> Result<BTreeSet<String>, ServiceError> {
        let homepage = homepage_url(website)?;
        let page = self.fetch(homepage.as_str()).await?;

        let mut emails = emails_from_page(&page);
        if has_preferred(&emails) {
            tracing::debug!("Preferred address found on {}", homepage);
            return Ok(emails);
        }

        let base = Url::parse(&page.final_url).unwrap_or(homepage);
        for url in contact_page_urls(&page, &base, self.max_contact_pages) {
            match self.fetch(&url).await {
                Ok(contact_page) => {
                    emails.extend(emails_from_page(&contact_page));
                    if has_preferred(&emails) {
                        break;
                    }
                }
                Err(e) => tracing::debug!("Skipping contact page {}: {}", url, e),
            }
        }

        tracing::debug!("Found {} address(es) for {}", emails.len(), website);
        Ok(emails)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError> {
        self.retry
            .run("contact fetch", || self.fetcher.fetch(url))
            .await
            .map_err(|failure| failure.error)
    }
}

/// The website as a fetchable URL; `https://` is added when no scheme is given
fn homepage_url(website: &str) -> Result<Url, ServiceError> {
    let trimmed = website.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    Url::parse(&candidate).map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", website, e)))
}

fn emails_from_page(page: &FetchedPage) -> BTreeSet<String> {
    let mut emails: BTreeSet<String> = page
        .mailto
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_valid_email(e))
        .collect();
    emails.extend(extract_emails(&page.text));
    emails
}

/// Pulls valid addresses out of free text, including obfuscated ones
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    let deobfuscated = OBFUSCATED_AT.replace_all(text, "@");
    let deobfuscated = OBFUSCATED_DOT.replace_all(&deobfuscated, ".");

    EMAIL
        .find_iter(&deobfuscated)
        .map(|m| m.as_str().trim_end_matches('.').to_lowercase())
        .filter(|e| is_valid_email(e))
        .collect()
}

/// Rejects placeholders, image names and addresses of implausible length
pub fn is_valid_email(email: &str) -> bool {
    let len = email.chars().count();
    if !(MIN_EMAIL_CHARS..=MAX_EMAIL_CHARS).contains(&len) {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || !domain.contains('.') {
        return false;
    }

    if IMAGE_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return false;
    }

    let placeholder_domain = PLACEHOLDER_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)));

    !placeholder_domain && !PLACEHOLDER_LOCALS.contains(&local)
}

/// Returns true when a general inbox address is among `emails`
pub fn has_preferred(emails: &BTreeSet<String>) -> bool {
    emails.iter().any(|e| {
        e.split_once('@')
            .is_some_and(|(local, _)| PREFERRED_PREFIXES.contains(&local))
    })
}

/// Same-site pages worth checking for addresses, in visiting order
///
/// Linked contact pages come first, then the common paths.
fn contact_page_urls(page: &FetchedPage, base: &Url, limit: usize) -> Vec<String> {
    let host = base.host_str().map(strip_www).unwrap_or_default();
    let mut urls: Vec<String> = Vec::new();

    let mut push = |url: &Url| {
        let mut url = url.clone();
        url.set_fragment(None);
        let s = url.to_string();
        if url.as_str() != base.as_str() && !urls.contains(&s) {
            urls.push(s);
        }
    };

    for link in &page.links {
        let Ok(url) = Url::parse(&link.url) else {
            continue;
        };
        if url.host_str().map(strip_www) != Some(host) {
            continue;
        }

        let path = url.path().trim_end_matches('/').to_lowercase();
        let looks_like_contact = CONTACT_PATHS.contains(&path.as_str())
            || link.text.to_lowercase().contains("contact");
        if looks_like_contact {
            push(&url);
        }
    }

    for path in CONTACT_PATHS {
        if let Ok(url) = base.join(path) {
            push(&url);
        }
    }

    urls.truncate(limit);
    urls
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

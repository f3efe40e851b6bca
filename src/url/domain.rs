use url::Url;

/// Country-code TLDs commonly registered by US companies for branding
const GENERIC_USE_CCTLDS: &[&str] = &["us", "io", "ai", "co", "me", "tv", "fm", "ly"];

/// Second-level labels that turn a ccTLD into a compound public suffix (co.uk, com.au)
const COMPOUND_SECOND_LEVELS: &[&str] =
    &["co", "com", "org", "net", "ac", "gov", "edu", "ne", "or"];

/// File extensions that never point at a company page
const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".bmp", ".css", ".js", ".pdf",
    ".zip", ".mp4", ".mp3",
];

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or `None` when the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sponsor_scout::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when the host sits under a foreign country-code TLD
///
/// Both the last label (`.de`) and compound suffixes (`.co.uk`, `.com.au`)
/// are checked. `.us` and a handful of ccTLDs used as generic brand
/// suffixes are kept.
pub fn is_foreign_cctld(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let last = labels[labels.len() - 1];
    let is_cc = last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic());
    if !is_cc {
        return false;
    }

    // "acme.co.uk" is British even though "co" alone would pass
    if labels.len() >= 3 && COMPOUND_SECOND_LEVELS.contains(&labels[labels.len() - 2]) {
        return last != "us";
    }

    !GENERIC_USE_CCTLDS.contains(&last)
}

/// Returns true when the URL path ends in a static asset extension
pub fn is_asset_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

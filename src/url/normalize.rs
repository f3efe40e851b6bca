use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "mc_eid",
    "ref",
    "source",
];

/// Normalized website identity used for run-scoped deduplication
///
/// Two raw website strings describe the same company site when their
/// identities are equal. The scheme never participates, so
/// `http://Example.com/` and `https://example.com` collapse to `example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteIdentity(String);

impl SiteIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a URL according to Sponsor-Scout's normalization rules
///
/// # Normalization Steps
///
/// 1. Trim whitespace; prepend `https://` when no scheme is present
/// 2. Parse the URL; reject if malformed
/// 3. Enforce HTTPS: convert `http://` to `https://`
/// 4. Lowercase the host and remove a `www.` prefix
/// 5. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
/// 6. Remove fragment (everything after #)
/// 7. Remove tracking query parameters
/// 8. Sort remaining query parameters alphabetically
/// 9. Remove empty query string (trailing ?)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize; bare domains are accepted
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use sponsor_scout::url::normalize_url;
///
/// let url = normalize_url("http://WWW.EXAMPLE.COM/page/").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
///
/// let url = normalize_url("acme-hr.com").unwrap();
/// assert_eq!(url.as_str(), "https://acme-hr.com/");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    // Step 1: Bare domains ("acme-hr.com/") get a scheme
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    };

    // Step 2: Parse the URL
    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 3: Validate and upgrade scheme
    match url.scheme() {
        "https" => {}
        "http" => {
            url.set_scheme("https")
                .map_err(|_| UrlError::Malformed(format!("Cannot upgrade scheme of {}", url)))?;
        }
        other => {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                other
            )));
        }
    }

    // Step 4: Lowercase the host and remove www. prefix
    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();

        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }

        if !normalized_host.contains('.') && normalized_host != "localhost" {
            return Err(UrlError::Malformed(format!(
                "Host '{}' is not a domain",
                normalized_host
            )));
        }

        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingDomain);
    }

    // Step 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    // Step 7 & 8: Filter and sort query parameters
    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        // Step 9: Set query or remove if empty
        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Computes the deduplication identity of a raw website string
///
/// The identity is the normalized host, followed by the normalized path
/// when it is not the root, followed by the sorted query, all lowercased.
/// Input that cannot be normalized is used verbatim, so malformed
/// websites still deduplicate by exact string equality.
///
/// # Examples
///
/// ```
/// use sponsor_scout::url::site_identity;
///
/// assert_eq!(site_identity("http://Example.com/"), site_identity("https://example.com"));
/// assert_eq!(site_identity("ACME-HR.COM/").as_str(), "acme-hr.com");
/// assert_eq!(site_identity("not a url").as_str(), "not a url");
/// ```
pub fn site_identity(raw: &str) -> SiteIdentity {
    match normalize_url(raw) {
        Ok(url) => SiteIdentity(identity_of(&url)),
        Err(e) => {
            tracing::debug!("Using raw website as identity for '{}': {}", raw, e);
            SiteIdentity(raw.to_string())
        }
    }
}

fn identity_of(url: &Url) -> String {
    let mut identity = String::new();

    if let Some(host) = url.host_str() {
        identity.push_str(host);
    }
    if let Some(port) = url.port() {
        identity.push_str(&format!(":{}", port));
    }
    if url.path() != "/" {
        identity.push_str(url.path());
    }
    if let Some(query) = url.query() {
        identity.push('?');
        identity.push_str(query);
    }

    identity.to_lowercase()
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

//! HTML parser for extracting page text, links and mail addresses
//!
//! This module turns fetched HTML into what the pipeline reads:
//! - Page title
//! - Visible text (one line per text node, scripts and styles removed)
//! - Links to other pages, with their anchor text
//! - Addresses from `mailto:` links

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text is never visible
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL
    pub url: String,

    /// Anchor text, whitespace collapsed
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text of the body
    pub text: String,

    /// All links found on the page (absolute URLs)
    pub links: Vec<PageLink>,

    /// Lowercased addresses from mailto: links
    pub mailto: Vec<String>,
}

/// Parses HTML content and extracts text, links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `tel:` and `data:` links
/// - Fragment-only links
/// - `mailto:` links (collected separately into `mailto`)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use sponsor_scout::services::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Sponsors</title></head>
///     <body><a href="/acme">Acme HR</a> <a href="mailto:Info@Acme.com">Mail</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Sponsors".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/acme");
/// assert_eq!(parsed.mailto, vec!["info@acme.com".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = extract_text(&document);
    let (links, mailto) = extract_links(&document, base_url);

    ParsedPage {
        title,
        text,
        links,
        mailto,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Collects visible text nodes of the body, one per line
fn extract_text(document: &Html) -> String {
    let root = match Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
    {
        Some(body) => body,
        None => document.root_element(),
    };

    let mut lines = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Extracts page links and mailto addresses from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> (Vec<PageLink>, Vec<String>) {
    let mut links = Vec::new();
    let mut mailto = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return (links, mailto);
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(address) = mailto_address(href) {
            if !mailto.contains(&address) {
                mailto.push(address);
            }
            continue;
        }

        if let Some(url) = resolve_link(href, base_url) {
            links.push(PageLink {
                url,
                text: collapse_whitespace(&element.text().collect::<String>()),
            });
        }
    }

    (links, mailto)
}

/// Returns the lowercased address of a `mailto:` href
fn mailto_address(href: &str) -> Option<String> {
    let href = href.trim();
    let rest = href
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("mailto:"))
        .map(|_| &href[7..])?;

    let address = rest.split('?').next().unwrap_or("").trim().to_lowercase();
    address.contains('@').then_some(address)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, tel: schemes and data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("tel:") || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url.to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

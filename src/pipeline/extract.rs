//! Company extraction from scraped pages
//!
//! The reasoning service reads the page text and lists the companies it
//! names. Its answer is parsed tolerantly: a JSON array or a
//! `{"companies": [...]}` object first, then `Name - https://site` lines.

use crate::lead::CompanyCandidate;
use crate::pipeline::prompts::extraction_prompt;
use crate::services::{extract_json, FetchedPage, ServiceError, SharedReasoner};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Names that are placeholders rather than companies
const GENERIC_COMPANY_NAMES: &[&str] = &[
    "company",
    "organization",
    "the firm",
    "client",
    "example",
    "test",
    "none",
    "n/a",
    "website",
    "url",
];

/// Site chrome that models sometimes report as a company
const BAD_NAME_SUBSTRINGS: &[&str] = &[
    "wikipedia",
    "wikimedia",
    "privacy policy",
    "terms of use",
    "cookie statement",
    "donate",
    "edit links",
    "code of conduct",
    "statistics",
];

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 60;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]{2,60})\]\((https?://[^)\s]+)\)").expect("valid markdown link pattern")
});

static NAME_DASH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)^\s*(?:[-*•]|\d+[.)])?\s*(\S[^\n]{0,59}?)",
        r"\s*(?:-|–|:|\|)\s*<?(https?://[^\s<>]+)"
    ))
    .expect("valid company line pattern")
});

/// A company as reported by the model, before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCompany {
    pub name: String,
    pub website: String,
    pub description: String,
}

/// Turns a scraped page into company candidates
pub struct Extractor {
    reasoner: SharedReasoner,
    max_page_chars: usize,
}

impl Extractor {
    pub fn new(reasoner: SharedReasoner, max_page_chars: usize) -> Self {
        Self {
            reasoner,
            max_page_chars,
        }
    }

    /// Extracts candidates from one page
    ///
    /// An answer naming no companies yields an empty list, not an error.
    pub async fn extract(
        &self,
        page: &FetchedPage,
        source_url: &str,
    ) -> Result<Vec<CompanyCandidate>, ServiceError> {
        let text = truncate_chars(&page.text, self.max_page_chars);
        if text.trim().is_empty() {
            tracing::debug!("No text on {}, nothing to extract", source_url);
            return Ok(Vec::new());
        }

        let prompt = extraction_prompt(text, source_url);
        let answer = self.reasoner.generate(&prompt).await?;

        let raw = parse_company_data(&answer);
        let candidates = filter_candidates(raw, source_url);
        tracing::info!(
            "Extracted {} candidate(s) from {}",
            candidates.len(),
            source_url
        );
        Ok(candidates)
    }
}

/// Parses the model's company listing
pub fn parse_company_data(text: &str) -> Vec<RawCompany> {
    if let Some(value) = extract_json(text) {
        let items = match value {
            Value::Array(items) => Some(items),
            Value::Object(mut map) => match map.remove("companies") {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        };

        if let Some(items) = items {
            return items.iter().filter_map(raw_company_from_json).collect();
        }
    }

    parse_company_lines(text)
}

fn raw_company_from_json(item: &Value) -> Option<RawCompany> {
    let field = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let name = field("name");
    if name.is_empty() {
        return None;
    }

    let website = match field("website") {
        w if w.is_empty() => field("url"),
        w => w,
    };

    Some(RawCompany {
        name,
        website,
        description: field("description"),
    })
}

/// Line-based fallback for answers without JSON
fn parse_company_lines(text: &str) -> Vec<RawCompany> {
    let mut companies = Vec::new();

    for caps in MARKDOWN_LINK.captures_iter(text) {
        companies.push(RawCompany {
            name: caps[1].trim().to_string(),
            website: clean_url(&caps[2]),
            description: String::new(),
        });
    }

    if companies.is_empty() {
        for caps in NAME_DASH_URL.captures_iter(text) {
            companies.push(RawCompany {
                name: caps[1].trim().trim_matches('*').trim().to_string(),
                website: clean_url(&caps[2]),
                description: String::new(),
            });
        }
    }

    companies
}

fn clean_url(url: &str) -> String {
    url.trim_end_matches(['.', ',', ';', ')', '>', '"', '\''])
        .to_string()
}

/// Returns true when `name` looks like a real company name
pub fn is_plausible_company_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
        return false;
    }

    let lower = name.to_lowercase();
    if GENERIC_COMPANY_NAMES.contains(&lower.as_str()) {
        return false;
    }

    !BAD_NAME_SUBSTRINGS.iter().any(|bad| lower.contains(bad))
}

/// Drops implausible entries and builds candidates tagged with their source
pub fn filter_candidates(raw: Vec<RawCompany>, source_url: &str) -> Vec<CompanyCandidate> {
    raw.into_iter()
        .filter_map(|company| {
            if !is_plausible_company_name(&company.name) {
                tracing::debug!("Dropping implausible company name: {:?}", company.name);
                return None;
            }

            let website = company.website.trim();
            if website.is_empty() {
                tracing::debug!("Dropping {} (no website)", company.name);
                return None;
            }

            let website = if website.contains("://") {
                website.to_string()
            } else {
                format!("https://{}", website.trim_start_matches('/'))
            };

            Some(
                CompanyCandidate::new(company.name, website)
                    .with_snippet(company.description)
                    .with_source_url(source_url),
            )
        })
        .collect()
}

/// Cuts `text` to at most `max_chars` characters on a char boundary
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

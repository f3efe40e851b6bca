//! Keyword heuristic that labels candidates HR or NE_B2B
//!
//! The classifier looks at the company name, the snippet it was found with
//! and the labels of its website host. Each vocabulary term that appears as
//! a whole token sequence scores one point for its category. The higher
//! score wins; no signal or a tie yields the fallback category (NE_B2B
//! unless configured otherwise). Classification is a pure function of the
//! candidate.

use crate::config::ClassifierSettings;
use crate::lead::{CompanyCandidate, LeadCategory};
use crate::url::{extract_domain, normalize_url};

const HR_TERMS: &[&str] = &[
    "hr",
    "human resources",
    "human capital",
    "hris",
    "hcm",
    "payroll",
    "recruiting",
    "recruitment",
    "recruiter",
    "recruiters",
    "staffing",
    "talent",
    "benefits",
    "workforce",
    "employee",
    "employees",
    "onboarding",
    "hiring",
    "people operations",
    "peopleops",
    "compensation",
    "shrm",
    "background screening",
    "background checks",
    "applicant tracking",
    "ats",
    "pre employment",
];

const NE_B2B_TERMS: &[&str] = &[
    "northeast",
    "north east",
    "new england",
    "boston",
    "massachusetts",
    "connecticut",
    "rhode island",
    "vermont",
    "new hampshire",
    "maine",
    "new york",
    "providence",
    "hartford",
    "worcester",
    "b2b",
    "manufacturing",
    "manufacturer",
    "industrial",
    "wholesale",
    "distributor",
    "distribution",
    "logistics",
    "supply",
    "tools",
    "engineering",
    "construction",
    "commercial",
];

/// Per-category signal counts for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub hr: usize,
    pub ne_b2b: usize,
}

/// Deterministic keyword classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    hr_terms: Vec<Vec<String>>,
    ne_b2b_terms: Vec<Vec<String>>,
    fallback: LeadCategory,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierSettings::default())
    }
}

impl Classifier {
    /// Builds a classifier from the built-in vocabulary plus configured extras
    pub fn new(settings: &ClassifierSettings) -> Self {
        let build = |builtin: &[&str], extra: &[String]| -> Vec<Vec<String>> {
            builtin
                .iter()
                .map(|t| t.to_string())
                .chain(extra.iter().cloned())
                .map(|term| tokenize(&term))
                .filter(|tokens| !tokens.is_empty())
                .collect()
        };

        Self {
            hr_terms: build(HR_TERMS, &settings.hr_keywords),
            ne_b2b_terms: build(NE_B2B_TERMS, &settings.ne_b2b_keywords),
            fallback: settings.fallback,
        }
    }

    /// Assigns exactly one category to the candidate
    pub fn classify(&self, candidate: &CompanyCandidate) -> LeadCategory {
        let signals = self.signals(candidate);

        let category = if signals.hr > signals.ne_b2b {
            LeadCategory::Hr
        } else if signals.ne_b2b > signals.hr {
            LeadCategory::NeB2b
        } else {
            self.fallback
        };

        tracing::debug!(
            "Classified {} as {} (hr={}, ne_b2b={})",
            candidate.name,
            category,
            signals.hr,
            signals.ne_b2b
        );

        category
    }

    /// Counts the vocabulary terms found for each category
    pub fn signals(&self, candidate: &CompanyCandidate) -> Signals {
        let tokens = candidate_tokens(candidate);
        Signals {
            hr: count_matches(&self.hr_terms, &tokens),
            ne_b2b: count_matches(&self.ne_b2b_terms, &tokens),
        }
    }

    pub fn fallback(&self) -> LeadCategory {
        self.fallback
    }
}

fn candidate_tokens(candidate: &CompanyCandidate) -> Vec<String> {
    let mut tokens = tokenize(&candidate.name);
    tokens.extend(tokenize(&candidate.source_snippet));

    // Host labels only; the TLD and path carry no category signal
    if let Some(host) = normalize_url(&candidate.website)
        .ok()
        .and_then(|url| extract_domain(&url))
    {
        let labels: Vec<&str> = host.split('.').collect();
        let without_tld = &labels[..labels.len().saturating_sub(1)];
        tokens.extend(tokenize(&without_tld.join(" ")));
    }

    tokens
}

fn count_matches(terms: &[Vec<String>], tokens: &[String]) -> usize {
    terms
        .iter()
        .filter(|term| tokens.windows(term.len()).any(|window| window == term.as_slice()))
        .count()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

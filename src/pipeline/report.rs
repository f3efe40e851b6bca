//! Run results: analyzed leads plus skip and failure records
//!
//! Failures are only ever logged and counted; they never reach the CSV.

use crate::lead::{AnalyzedLead, PartialLead};
use crate::pipeline::router::Stage;
use crate::url::SiteIdentity;
use std::fmt;
use std::time::Duration;

/// Why a candidate was not routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Site identity already routed this run
    Duplicate,

    /// Website matched the exclusion pattern
    Excluded(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => f.write_str("duplicate"),
            Self::Excluded(pattern) => write!(f, "excluded by {}", pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRecord {
    pub name: String,
    pub identity: SiteIdentity,
    pub reason: SkipReason,
}

/// A lead whose analysis or review did not complete
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub lead: PartialLead,
    pub stage: Stage,
    pub attempts: u32,
    pub reason: String,
}

/// Where source discovery failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStage {
    Search,
    Fetch,
    Extract,
}

impl fmt::Display for SourceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("search"),
            Self::Fetch => f.write_str("fetch"),
            Self::Extract => f.write_str("extract"),
        }
    }
}

/// A search query or source page that yielded nothing
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub stage: SourceStage,

    /// Query text or page URL
    pub target: String,
    pub reason: String,
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Analyzed leads in processing order
    pub leads: Vec<AnalyzedLead>,
    pub skips: Vec<SkipRecord>,
    pub failures: Vec<FailureRecord>,
    pub source_failures: Vec<SourceFailure>,

    /// Source pages fetched successfully
    pub sources_scraped: usize,

    /// Candidates taken from extraction, including skipped ones
    pub candidates_seen: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicate_count(&self) -> usize {
        self.skips
            .iter()
            .filter(|s| s.reason == SkipReason::Duplicate)
            .count()
    }

    pub fn excluded_count(&self) -> usize {
        self.skips.len() - self.duplicate_count()
    }
}

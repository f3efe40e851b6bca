use crate::state::ReviewStatus;
use crate::url::{site_identity, SiteIdentity};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Business segment assigned to every lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum LeadCategory {
    /// HR-industry vendor (software, services, staffing)
    Hr,

    /// Regional B2B company in the US Northeast
    NeB2b,
}

impl LeadCategory {
    /// Label written to reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hr => "HR",
            Self::NeB2b => "NE_B2B",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Hr, Self::NeB2b]
    }
}

impl FromStr for LeadCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "hr" => Ok(Self::Hr),
            "ne_b2b" | "neb2b" | "b2b" => Ok(Self::NeB2b),
            other => Err(format!(
                "unknown lead category '{}', expected 'hr' or 'ne-b2b'",
                other
            )),
        }
    }
}

impl TryFrom<String> for LeadCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LeadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw company record produced by extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyCandidate {
    pub name: String,
    pub website: String,

    /// Text describing the company where it was found
    pub source_snippet: String,

    /// Page the company was extracted from
    pub source_url: Option<String>,
}

impl CompanyCandidate {
    pub fn new(name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
            source_snippet: String::new(),
            source_url: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.source_snippet = snippet.into();
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Deduplication identity of the candidate's website
    pub fn identity(&self) -> SiteIdentity {
        site_identity(&self.website)
    }
}

/// A candidate with its category
///
/// The category is fixed at construction; there is no setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLead {
    candidate: CompanyCandidate,
    category: LeadCategory,
}

impl ClassifiedLead {
    pub fn new(candidate: CompanyCandidate, category: LeadCategory) -> Self {
        Self {
            candidate,
            category,
        }
    }

    pub fn candidate(&self) -> &CompanyCandidate {
        &self.candidate
    }

    pub fn category(&self) -> LeadCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.candidate.name
    }

    pub fn website(&self) -> &str {
        &self.candidate.website
    }

    /// The company reference kept when analysis fails
    pub fn to_partial(&self) -> PartialLead {
        PartialLead {
            name: self.candidate.name.clone(),
            website: self.candidate.website.clone(),
            identity: self.candidate.identity(),
            category: self.category,
        }
    }
}

/// Category and identity of a lead whose analysis or review failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialLead {
    pub name: String,
    pub website: String,
    pub identity: SiteIdentity,
    pub category: LeadCategory,
}

impl fmt::Display for PartialLead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.identity, self.category)
    }
}

/// Output of a category's analysis step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadAnalysis {
    pub contact_emails: BTreeSet<String>,
    pub motivation_notes: String,
}

/// Output of a category's review step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadReview {
    pub status: ReviewStatus,
    pub notes: String,

    /// Replacement motivation text, when the reviewer tightened it
    pub refined_motivation: Option<String>,
}

impl LeadReview {
    pub fn approved(notes: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Approved,
            notes: notes.into(),
            refined_motivation: None,
        }
    }

    pub fn rejected(notes: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Rejected,
            notes: notes.into(),
            refined_motivation: None,
        }
    }
}

/// A classified lead enriched by analysis and, afterwards, review
///
/// Only [`AnalyzedLead::from_analysis`] creates one, so review can never be
/// applied to a lead that has not been analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedLead {
    lead: ClassifiedLead,
    contact_emails: BTreeSet<String>,
    motivation_notes: String,
    review_status: ReviewStatus,
    review_notes: String,
}

impl AnalyzedLead {
    /// Builds a lead awaiting review
    pub fn from_analysis(lead: ClassifiedLead, analysis: LeadAnalysis) -> Self {
        Self {
            lead,
            contact_emails: analysis.contact_emails,
            motivation_notes: analysis.motivation_notes,
            review_status: ReviewStatus::Pending,
            review_notes: String::new(),
        }
    }

    /// Applies the review verdict
    ///
    /// A lead that already carries a verdict keeps it.
    pub fn with_review(mut self, review: LeadReview) -> Self {
        if self.review_status.is_final() {
            tracing::warn!(
                "Ignoring second review for {} (already {})",
                self.lead.name(),
                self.review_status
            );
            return self;
        }

        self.review_status = review.status;
        self.review_notes = review.notes;
        if let Some(refined) = review.refined_motivation.filter(|m| !m.trim().is_empty()) {
            self.motivation_notes = refined;
        }
        self
    }

    pub fn lead(&self) -> &ClassifiedLead {
        &self.lead
    }

    pub fn name(&self) -> &str {
        self.lead.name()
    }

    pub fn website(&self) -> &str {
        self.lead.website()
    }

    pub fn category(&self) -> LeadCategory {
        self.lead.category()
    }

    pub fn contact_emails(&self) -> &BTreeSet<String> {
        &self.contact_emails
    }

    pub fn motivation_notes(&self) -> &str {
        &self.motivation_notes
    }

    pub fn review_status(&self) -> ReviewStatus {
        self.review_status
    }

    pub fn review_notes(&self) -> &str {
        &self.review_notes
    }

    pub fn source_url(&self) -> Option<&str> {
        self.lead.candidate().source_url.as_deref()
    }
}

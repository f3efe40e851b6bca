//! Lead data model and classification
//!
//! A lead moves through three shapes during a run:
//! `CompanyCandidate` (extracted) → `ClassifiedLead` (category fixed) →
//! `AnalyzedLead` (contacts, motivation, then review verdict).

mod classify;
mod types;

pub use classify::{Classifier, Signals};
pub use types::{
    AnalyzedLead, ClassifiedLead, CompanyCandidate, LeadAnalysis, LeadCategory, LeadReview,
    PartialLead,
};

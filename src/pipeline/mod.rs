//! Lead pipeline: extraction, routing, analysis, review and run orchestration
//!
//! This module handles:
//! - Extracting company candidates from scraped pages
//! - Discovering contact addresses on company websites
//! - Routing classified leads to their category's analysis and review steps
//! - Retrying external calls with bounded backoff
//! - Sequencing a whole run and collecting its report

mod contacts;
mod extract;
mod orchestrator;
mod prompts;
mod report;
mod retry;
mod router;
mod steps;

pub use contacts::{extract_emails, has_preferred, is_valid_email, EmailFinder};
pub use extract::{
    filter_candidates, is_plausible_company_name, parse_company_data, Extractor, RawCompany,
};
pub use orchestrator::{Orchestrator, Services};
pub use prompts::{analysis_prompt, extraction_prompt, review_prompt, CategoryBriefs};
pub use report::{FailureRecord, RunReport, SkipReason, SkipRecord, SourceFailure, SourceStage};
pub use retry::{RetryFailure, RetryPolicy};
pub use router::{CategoryRoutes, Router, RoutingError, Stage, StepPair};
pub use steps::{parse_analysis, parse_review, AnalysisStep, LlmAnalyst, LlmReviewer, ReviewStep};

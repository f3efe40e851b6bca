//! Category routing with run-scoped deduplication
//!
//! The router owns the run registry. A lead's website is marked seen before
//! its analysis starts, so each site identity reaches analysis and review at
//! most once per run, however often it is rediscovered.

use crate::config::Config;
use crate::lead::{AnalyzedLead, ClassifiedLead, LeadCategory, PartialLead};
use crate::pipeline::contacts::EmailFinder;
use crate::pipeline::prompts::CategoryBriefs;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::steps::{AnalysisStep, LlmAnalyst, LlmReviewer, ReviewStep};
use crate::services::{ServiceError, SharedReasoner};
use crate::state::RunRegistry;
use crate::url::SiteIdentity;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stage in which routing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysis,
    Review,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Review => f.write_str("review"),
        }
    }
}

/// Why a lead produced no analyzed result
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// The website was already routed in this run; a normal outcome
    #[error("duplicate of already routed site {identity}")]
    Skipped { identity: SiteIdentity },

    #[error("{stage} failed for {lead} after {attempts} attempt(s): {reason}")]
    AnalysisFailed {
        lead: PartialLead,
        stage: Stage,
        attempts: u32,
        reason: ServiceError,
    },
}

/// Analysis and review steps of one category
#[derive(Clone)]
pub struct StepPair {
    pub analysis: Arc<dyn AnalysisStep>,
    pub review: Arc<dyn ReviewStep>,
}

impl StepPair {
    pub fn new(analysis: Arc<dyn AnalysisStep>, review: Arc<dyn ReviewStep>) -> Self {
        Self { analysis, review }
    }
}

/// Step pairs for every category
#[derive(Clone)]
pub struct CategoryRoutes {
    pub hr: StepPair,
    pub ne_b2b: StepPair,
}

impl CategoryRoutes {
    /// Reasoning-backed steps with category briefs
    pub fn llm(
        reasoner: SharedReasoner,
        email_finder: Option<EmailFinder>,
        briefs: &CategoryBriefs,
    ) -> Self {
        let pair = |category: LeadCategory| {
            let brief = briefs.for_category(category);
            StepPair::new(
                Arc::new(LlmAnalyst::new(reasoner.clone(), email_finder.clone(), brief)),
                Arc::new(LlmReviewer::new(reasoner.clone(), brief)),
            )
        };

        Self {
            hr: pair(LeadCategory::Hr),
            ne_b2b: pair(LeadCategory::NeB2b),
        }
    }

    pub fn for_category(&self, category: LeadCategory) -> &StepPair {
        match category {
            LeadCategory::Hr => &self.hr,
            LeadCategory::NeB2b => &self.ne_b2b,
        }
    }
}

/// Dispatches classified leads to their category's steps
pub struct Router {
    registry: RunRegistry,
    routes: CategoryRoutes,
    retry: RetryPolicy,
}

impl Router {
    pub fn new(routes: CategoryRoutes, retry: RetryPolicy) -> Self {
        Self {
            registry: RunRegistry::new(),
            routes,
            retry,
        }
    }

    /// Router with the configured retry policy and reasoning call timeout
    pub fn from_config(config: &Config, routes: CategoryRoutes) -> Self {
        let retry = RetryPolicy::from_settings(&config.retry, config.provider.request_timeout());
        Self::new(routes, retry)
    }

    /// Returns true if the website was already routed in this run
    pub fn has_seen(&self, website: &str) -> bool {
        self.registry.has_seen(website)
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Analyzes then reviews a lead, unless its site was already routed
    ///
    /// # Returns
    ///
    /// * `Ok(AnalyzedLead)` - Lead with analysis and review verdict
    /// * `Err(RoutingError::Skipped)` - Site identity already routed this run
    /// * `Err(RoutingError::AnalysisFailed)` - A step failed permanently or
    ///   ran out of retries; carries the lead's category and identity
    pub async fn route(&mut self, lead: ClassifiedLead) -> Result<AnalyzedLead, RoutingError> {
        let identity = match self.registry.check_and_mark(lead.website()) {
            Ok(identity) => identity,
            Err(identity) => return Err(RoutingError::Skipped { identity }),
        };

        tracing::info!(
            "Routing {} ({}) to {} analysis",
            lead.name(),
            identity,
            lead.category()
        );

        let steps = self.routes.for_category(lead.category());

        // Discovery runs once; only the reasoning call is retried
        let known_emails = steps.analysis.discover_contacts(&lead).await;
        let lead_ref = &lead;
        let emails_ref = &known_emails;

        let analysis = self
            .retry
            .run("analysis", move || steps.analysis.analyze(lead_ref, emails_ref))
            .await
            .map_err(|failure| RoutingError::AnalysisFailed {
                lead: lead.to_partial(),
                stage: Stage::Analysis,
                attempts: failure.attempts,
                reason: failure.error,
            })?;

        let analyzed = AnalyzedLead::from_analysis(lead, analysis);
        let analyzed_ref = &analyzed;

        let review = self
            .retry
            .run("review", move || steps.review.review(analyzed_ref))
            .await
            .map_err(|failure| RoutingError::AnalysisFailed {
                lead: analyzed.lead().to_partial(),
                stage: Stage::Review,
                attempts: failure.attempts,
                reason: failure.error,
            })?;

        let reviewed = analyzed.with_review(review);
        tracing::info!(
            "{} reviewed: {}",
            reviewed.name(),
            reviewed.review_status()
        );
        Ok(reviewed)
    }
}

//! Category-specific analysis and review steps
//!
//! The router only sees the [`AnalysisStep`] and [`ReviewStep`] traits. The
//! reasoning-backed implementations here are what a real run wires in; tests
//! substitute stubs.

use crate::lead::{AnalyzedLead, ClassifiedLead, LeadAnalysis, LeadReview};
use crate::pipeline::contacts::{extract_emails, is_valid_email, EmailFinder};
use crate::pipeline::prompts::{analysis_prompt, review_prompt};
use crate::services::{extract_json, ServiceError, SharedReasoner};
use crate::state::ReviewStatus;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;

/// Enriches a classified lead with contacts and a motivation
///
/// The router calls [`discover_contacts`](AnalysisStep::discover_contacts)
/// once per lead and then retries [`analyze`](AnalysisStep::analyze) alone,
/// so page fetches are never repeated when the reasoning call is retried.
#[async_trait]
pub trait AnalysisStep: Send + Sync {
    /// Addresses found on the lead's website; never fails
    async fn discover_contacts(&self, _lead: &ClassifiedLead) -> BTreeSet<String> {
        BTreeSet::new()
    }

    async fn analyze(
        &self,
        lead: &ClassifiedLead,
        known_emails: &BTreeSet<String>,
    ) -> Result<LeadAnalysis, ServiceError>;
}

/// Approves or rejects an analyzed lead
#[async_trait]
pub trait ReviewStep: Send + Sync {
    async fn review(&self, lead: &AnalyzedLead) -> Result<LeadReview, ServiceError>;
}

/// Analysis backed by the reasoning service and website contact discovery
pub struct LlmAnalyst {
    reasoner: SharedReasoner,
    email_finder: Option<EmailFinder>,
    brief: String,
}

impl LlmAnalyst {
    pub fn new(
        reasoner: SharedReasoner,
        email_finder: Option<EmailFinder>,
        brief: impl Into<String>,
    ) -> Self {
        Self {
            reasoner,
            email_finder,
            brief: brief.into(),
        }
    }
}

#[async_trait]
impl AnalysisStep for LlmAnalyst {
    async fn discover_contacts(&self, lead: &ClassifiedLead) -> BTreeSet<String> {
        let Some(finder) = &self.email_finder else {
            return BTreeSet::new();
        };

        match finder.find(lead.website()).await {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!(
                    "Contact discovery failed for {} ({}): {}",
                    lead.name(),
                    lead.website(),
                    e
                );
                BTreeSet::new()
            }
        }
    }

    async fn analyze(
        &self,
        lead: &ClassifiedLead,
        known_emails: &BTreeSet<String>,
    ) -> Result<LeadAnalysis, ServiceError> {
        let prompt = analysis_prompt(lead, &self.brief, known_emails);
        let answer = self.reasoner.generate(&prompt).await?;
        let (motivation_notes, model_emails) = parse_analysis(&answer)?;

        let mut contact_emails = known_emails.clone();
        contact_emails.extend(model_emails);
        Ok(LeadAnalysis {
            contact_emails,
            motivation_notes,
        })
    }
}

/// Review backed by the reasoning service
pub struct LlmReviewer {
    reasoner: SharedReasoner,
    brief: String,
}

impl LlmReviewer {
    pub fn new(reasoner: SharedReasoner, brief: impl Into<String>) -> Self {
        Self {
            reasoner,
            brief: brief.into(),
        }
    }
}

#[async_trait]
impl ReviewStep for LlmReviewer {
    async fn review(&self, lead: &AnalyzedLead) -> Result<LeadReview, ServiceError> {
        let prompt = review_prompt(lead, &self.brief);
        let answer = self.reasoner.generate(&prompt).await?;
        parse_review(&answer)
    }
}

/// Reads `{"motivation": .., "emails": [..]}`, falling back to the raw text
///
/// Returns the motivation and the valid addresses the model named.
pub fn parse_analysis(answer: &str) -> Result<(String, BTreeSet<String>), ServiceError> {
    if let Some(Value::Object(map)) = extract_json(answer) {
        let motivation = map
            .get("motivation")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let emails = map
            .get("emails")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| is_valid_email(e))
                    .collect()
            })
            .unwrap_or_default();

        if motivation.is_empty() {
            return Err(ServiceError::Malformed(
                "analysis answer has no motivation".to_string(),
            ));
        }
        return Ok((motivation, emails));
    }

    let motivation = answer.trim();
    if motivation.is_empty() {
        return Err(ServiceError::Malformed("empty analysis answer".to_string()));
    }
    Ok((motivation.to_string(), extract_emails(motivation)))
}

/// Reads `{"status", "notes", "motivation"}` or a bare APPROVED/REJECTED keyword
pub fn parse_review(answer: &str) -> Result<LeadReview, ServiceError> {
    if let Some(Value::Object(map)) = extract_json(answer) {
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        let status = ReviewStatus::from_verdict(&text("status"))
            .filter(|s| s.is_final())
            .ok_or_else(|| {
                ServiceError::Malformed(format!(
                    "review status {:?} is not a verdict",
                    text("status")
                ))
            })?;

        let refined = text("motivation");
        return Ok(LeadReview {
            status,
            notes: text("notes"),
            refined_motivation: (!refined.is_empty()).then_some(refined),
        });
    }

    let upper = answer.to_uppercase();
    let approved = upper.contains("APPROVED");
    let rejected = upper.contains("REJECTED");

    match (approved, rejected) {
        (true, false) => Ok(LeadReview::approved(answer.trim())),
        (false, true) => Ok(LeadReview::rejected(answer.trim())),
        _ => Err(ServiceError::Malformed(format!(
            "review answer has no single verdict: {}",
            answer.chars().take(120).collect::<String>()
        ))),
    }
}

//! Prompt construction for extraction, analysis and review calls

use crate::config::SegmentEntry;
use crate::lead::{AnalyzedLead, ClassifiedLead, LeadCategory};
use crate::services::Prompt;
use std::collections::BTreeSet;

const HR_BRIEF: &str = "The conference audience is HR leaders: CHROs, HR directors, \
talent acquisition, benefits and people-operations managers. Explain why this company \
would want to reach HR decision makers in person, which of its products or services \
fit that audience, and what pain points of HR teams it addresses.";

const NE_B2B_BRIEF: &str = "The conference audience is business buyers across the \
Northeast United States (New England and New York). Explain why this company would \
want regional visibility with Northeast buyers, what it sells to other businesses, \
and any local presence or customers in the region.";

/// Analysis brief per lead category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBriefs {
    hr: String,
    ne_b2b: String,
}

impl Default for CategoryBriefs {
    fn default() -> Self {
        Self {
            hr: HR_BRIEF.to_string(),
            ne_b2b: NE_B2B_BRIEF.to_string(),
        }
    }
}

impl CategoryBriefs {
    /// Built-in briefs, replaced by the first segment brief given for a category
    pub fn from_segments(segments: &[SegmentEntry]) -> Self {
        let mut briefs = Self::default();
        for category in LeadCategory::all() {
            let custom = segments
                .iter()
                .filter(|s| s.category == category)
                .find_map(|s| s.brief.as_deref().map(str::trim).filter(|b| !b.is_empty()));

            if let Some(brief) = custom {
                match category {
                    LeadCategory::Hr => briefs.hr = brief.to_string(),
                    LeadCategory::NeB2b => briefs.ne_b2b = brief.to_string(),
                }
            }
        }
        briefs
    }

    pub fn for_category(&self, category: LeadCategory) -> &str {
        match category {
            LeadCategory::Hr => &self.hr,
            LeadCategory::NeB2b => &self.ne_b2b,
        }
    }
}

/// Asks for the companies named on a scraped page
pub fn extraction_prompt(page_text: &str, source_url: &str) -> Prompt {
    let system = "You extract company names and official websites from web pages \
for a conference sponsorship team. Only list real, currently operating companies that \
the page names as vendors, providers, members or exhibitors. Ignore navigation, \
footers, publishers and the site hosting the page.";

    let user = format!(
        "Source page: {source_url}\n\n\
Return a JSON array where each item is \
{{\"name\": \"Company name\", \"website\": \"https://company.com\", \
\"description\": \"one sentence\"}}. \
Use the company's own homepage, not a profile page on another site. \
Leave \"website\" empty when the page does not reveal it. \
Return [] when no companies are named.\n\n\
Page text:\n{page_text}"
    );

    Prompt::json(system, user)
}

/// Asks for the sponsorship motivation and contact addresses of a lead
pub fn analysis_prompt(
    lead: &ClassifiedLead,
    brief: &str,
    known_emails: &BTreeSet<String>,
) -> Prompt {
    let system = format!(
        "You are a sponsorship researcher preparing outreach notes.\n{}",
        brief
    );

    let known = if known_emails.is_empty() {
        "none found".to_string()
    } else {
        known_emails.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    let snippet = lead.candidate().source_snippet.trim();
    let user = format!(
        "Company: {name}\nWebsite: {website}\nCategory: {category}\n\
Context: {context}\nContact emails found on the website: {known}\n\n\
Respond with JSON: {{\"motivation\": \"2-4 sentences on why they would sponsor\", \
\"emails\": [\"additional public contact addresses you are confident about\"]}}. \
Do not invent addresses.",
        name = lead.name(),
        website = lead.website(),
        category = lead.category(),
        context = if snippet.is_empty() { "none" } else { snippet },
    );

    Prompt::json(system, user)
}

/// Asks for an approve/reject verdict on an analyzed lead
pub fn review_prompt(lead: &AnalyzedLead, brief: &str) -> Prompt {
    let system = format!(
        "You review sponsorship leads before they reach the sales team. \
Reject leads that are not real companies, are clearly outside the target audience, \
or whose motivation is generic or unsupported.\n{}",
        brief
    );

    let emails = if lead.contact_emails().is_empty() {
        "none".to_string()
    } else {
        lead.contact_emails()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let user = format!(
        "Company: {}\nWebsite: {}\nCategory: {}\nContact emails: {}\nMotivation: {}\n\n\
Respond with JSON: {{\"status\": \"approved\" or \"rejected\", \
\"notes\": \"one or two sentences\", \
\"motivation\": \"optional tightened motivation, or empty\"}}",
        lead.name(),
        lead.website(),
        lead.category(),
        emails,
        lead.motivation_notes(),
    );

    Prompt::json(system, user)
}

//! Run statistics
//!
//! Condenses a [`RunReport`] into counts and prints them after a run.

use crate::lead::LeadCategory;
use crate::pipeline::RunReport;
use crate::state::ReviewStatus;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counts derived from a run report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_leads: usize,

    /// Leads per category, keyed by the category label
    pub leads_by_category: BTreeMap<&'static str, usize>,

    /// Leads per review status
    pub leads_by_status: BTreeMap<&'static str, usize>,

    pub candidates_seen: usize,
    pub sources_scraped: usize,
    pub duplicate_skips: usize,
    pub excluded: usize,
    pub failures: usize,
    pub source_failures: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let mut leads_by_category: BTreeMap<&'static str, usize> = LeadCategory::all()
            .iter()
            .map(|c| (c.as_str(), 0))
            .collect();
        let mut leads_by_status: BTreeMap<&'static str, usize> = ReviewStatus::all_states()
            .iter()
            .map(|s| (s.as_str(), 0))
            .collect();

        for lead in &report.leads {
            *leads_by_category.entry(lead.category().as_str()).or_default() += 1;
            *leads_by_status.entry(lead.review_status().as_str()).or_default() += 1;
        }

        Self {
            total_leads: report.leads.len(),
            leads_by_category,
            leads_by_status,
            candidates_seen: report.candidates_seen,
            sources_scraped: report.sources_scraped,
            duplicate_skips: report.duplicate_count(),
            excluded: report.excluded_count(),
            failures: report.failures.len(),
            source_failures: report.source_failures.len(),
            elapsed: report.elapsed,
        }
    }

    /// Share of routed candidates that produced a lead, as a percentage
    pub fn success_rate(&self) -> f64 {
        let routed = self.total_leads + self.failures;
        if routed == 0 {
            return 0.0;
        }
        (self.total_leads as f64 / routed as f64) * 100.0
    }
}

/// Prints the run summary to stdout
pub fn print_run_summary(report: &RunReport, output: &str) {
    let summary = RunSummary::from_report(report);

    println!("=== Sponsor-Scout Run Summary ===\n");

    println!("Overview:");
    println!("  Source pages scraped: {}", summary.sources_scraped);
    println!("  Candidates processed: {}", summary.candidates_seen);
    println!("  Leads written: {} -> {}", summary.total_leads, output);
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Leads by Category:");
    for (category, count) in &summary.leads_by_category {
        println!("  {}: {}", category, count);
    }
    println!();

    println!("Leads by Review Status:");
    for (status, count) in &summary.leads_by_status {
        println!("  {}: {}", status, count);
    }
    println!();

    println!("Skipped:");
    println!("  Duplicates: {}", summary.duplicate_skips);
    println!("  Excluded domains: {}", summary.excluded);
    println!();

    if !report.failures.is_empty() {
        println!("Failed Leads ({}):", report.failures.len());
        for failure in &report.failures {
            println!(
                "  - {} [{} after {} attempt(s)]: {}",
                failure.lead, failure.stage, failure.attempts, failure.reason
            );
        }
        println!();
    }

    if !report.source_failures.is_empty() {
        println!("Failed Sources ({}):", report.source_failures.len());
        for failure in &report.source_failures {
            println!("  - {} {}: {}", failure.stage, failure.target, failure.reason);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} routed leads analyzed)",
        summary.success_rate(),
        summary.total_leads,
        summary.total_leads + summary.failures
    );
}

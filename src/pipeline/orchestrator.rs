//! Pipeline orchestrator - sequences one sponsorship-lead run
//!
//! A run goes through these stages:
//! - Search every segment query and collect source pages
//! - Scrape each source page and extract company candidates
//! - Registry check, classification and routing, one candidate at a time
//! - Write all analyzed leads to the output file
//!
//! Per-source and per-lead failures are recorded in the [`RunReport`] and the
//! run moves on; only the output write can fail a run.

use crate::config::Config;
use crate::lead::{ClassifiedLead, Classifier, CompanyCandidate};
use crate::output::{CsvWriter, LeadWriter};
use crate::pipeline::contacts::EmailFinder;
use crate::pipeline::extract::Extractor;
use crate::pipeline::prompts::CategoryBriefs;
use crate::pipeline::report::{
    FailureRecord, RunReport, SkipReason, SkipRecord, SourceFailure, SourceStage,
};
use crate::pipeline::retry::{RetryFailure, RetryPolicy};
use crate::pipeline::router::{CategoryRoutes, Router, RoutingError};
use crate::services::{
    create_reasoning_client, HttpFetcher, PageFetcher, SearchService, SerperClient, SharedReasoner,
};
use crate::url::{site_identity, DomainFilter, FilterVerdict};
use crate::ConfigError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// External collaborators of a run
pub struct Services {
    /// Not needed in single-URL mode
    pub search: Option<Arc<dyn SearchService>>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub reasoner: SharedReasoner,
    pub routes: CategoryRoutes,
}

impl Services {
    /// Builds the real collaborators from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Services)` - All clients constructed
    /// * `Err(ScoutError)` - Missing key, unknown provider or HTTP client failure
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let reasoner = create_reasoning_client(&config.provider)?;

        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::new(config.pipeline.scrape_timeout())?);

        let search: Option<Arc<dyn SearchService>> = if config.is_single_url_mode() {
            None
        } else {
            let api_key = config
                .search
                .api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingKeys(vec!["SERPER_API_KEY".to_string()]))?;
            Some(Arc::new(SerperClient::new(api_key, &config.search)?))
        };

        let contact_retry =
            RetryPolicy::from_settings(&config.retry, config.pipeline.scrape_timeout());
        let email_finder = EmailFinder::new(
            fetcher.clone(),
            config.pipeline.max_contact_pages,
            contact_retry,
        );
        let briefs = CategoryBriefs::from_segments(&config.segments);
        let routes = CategoryRoutes::llm(reasoner.clone(), Some(email_finder), &briefs);

        Ok(Self {
            search,
            fetcher,
            reasoner,
            routes,
        })
    }
}

/// Main pipeline structure
pub struct Orchestrator {
    config: Arc<Config>,
    search: Option<Arc<dyn SearchService>>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Extractor,
    classifier: Classifier,
    filter: DomainFilter,
    router: Router,
    writer: Box<dyn LeadWriter>,

    /// Search and scraping; per-call timeout is the scrape timeout
    io_retry: RetryPolicy,

    /// Extraction calls; per-call timeout is the reasoning timeout
    reasoning_retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, services: Services, writer: Box<dyn LeadWriter>) -> Self {
        let reasoning_retry =
            RetryPolicy::from_settings(&config.retry, config.provider.request_timeout());
        let io_retry = reasoning_retry.with_call_timeout(config.pipeline.scrape_timeout());

        Self {
            extractor: Extractor::new(services.reasoner, config.pipeline.max_page_chars),
            classifier: Classifier::new(&config.classifier),
            filter: DomainFilter::new(&config.filter),
            router: Router::new(services.routes, reasoning_retry.clone()),
            search: services.search,
            fetcher: services.fetcher,
            writer,
            io_retry,
            reasoning_retry,
            config,
        }
    }

    /// Orchestrator with real collaborators and CSV output
    pub fn from_config(config: Arc<Config>) -> crate::Result<Self> {
        let services = Services::from_config(&config)?;
        let writer = Box::new(CsvWriter::new(&config.output.path));
        Ok(Self::new(config, services, writer))
    }

    /// Runs search, extraction, routing and output
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run completed and the output file was written
    /// * `Err(ScoutError)` - The output file could not be written
    pub async fn run(&mut self) -> crate::Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        let candidates = self.discover(&mut report).await;
        tracing::info!(
            "Extracted {} candidate(s) from {} source page(s)",
            candidates.len(),
            report.sources_scraped
        );

        self.process_candidates(candidates, &mut report).await;
        self.finish(report, started)
    }

    /// Routes a given candidate stream and writes the output, skipping discovery
    pub async fn run_with_candidates(
        &mut self,
        candidates: Vec<CompanyCandidate>,
    ) -> crate::Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        self.process_candidates(candidates, &mut report).await;
        self.finish(report, started)
    }

    /// Searches, scrapes and extracts until the candidate cap is reached
    pub async fn discover(&self, report: &mut RunReport) -> Vec<CompanyCandidate> {
        let sources = self.collect_sources(report).await;
        let max_candidates = self.config.pipeline.max_candidates;
        let mut candidates = Vec::new();

        for source in &sources {
            if candidates.len() >= max_candidates {
                tracing::info!("Candidate cap of {} reached", max_candidates);
                break;
            }

            let page = match self
                .io_retry
                .run("fetch", || self.fetcher.fetch(source))
                .await
            {
                Ok(page) => page,
                Err(failure) => {
                    record_source_failure(report, SourceStage::Fetch, source, failure);
                    continue;
                }
            };
            report.sources_scraped += 1;

            match self
                .reasoning_retry
                .run("extraction", || self.extractor.extract(&page, source))
                .await
            {
                Ok(found) => candidates.extend(found),
                Err(failure) => {
                    record_source_failure(report, SourceStage::Extract, source, failure)
                }
            }
        }

        candidates
    }

    /// Source page URLs: the single test URL, or filtered search results
    async fn collect_sources(&self, report: &mut RunReport) -> Vec<String> {
        if let Some(url) = &self.config.pipeline.test_url {
            tracing::info!("Single-URL mode, extracting from {}", url);
            return vec![url.clone()];
        }

        let Some(search) = &self.search else {
            tracing::warn!("No search service configured and no test URL given");
            return Vec::new();
        };

        let max_urls = self.config.search.max_urls;
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        'segments: for segment in &self.config.segments {
            for query in &segment.queries {
                if sources.len() >= max_urls {
                    break 'segments;
                }

                tracing::info!("Searching [{}] via {}: {}", segment.name, search.name(), query);
                let hits = match self.io_retry.run("search", || search.search(query)).await {
                    Ok(hits) => hits,
                    Err(failure) => {
                        record_source_failure(report, SourceStage::Search, query, failure);
                        continue;
                    }
                };

                for hit in hits {
                    if sources.len() >= max_urls {
                        break;
                    }

                    match self.filter.check_source(&hit.url) {
                        FilterVerdict::Keep => {}
                        verdict => {
                            tracing::debug!("Skipping source {}: {:?}", hit.url, verdict);
                            continue;
                        }
                    }

                    if seen.insert(site_identity(&hit.url)) {
                        sources.push(hit.url);
                    }
                }
            }
        }

        tracing::info!("Collected {} source page(s)", sources.len());
        sources
    }

    /// Registry check, classification and routing for each candidate in order
    ///
    /// At most `max_candidates` candidates are taken from the stream. A
    /// failing lead is recorded and processing continues with the next one.
    pub async fn process_candidates<I>(&mut self, candidates: I, report: &mut RunReport)
    where
        I: IntoIterator<Item = CompanyCandidate>,
    {
        let max_candidates = self.config.pipeline.max_candidates;

        for candidate in candidates.into_iter().take(max_candidates) {
            report.candidates_seen += 1;

            if self.router.has_seen(&candidate.website) {
                let identity = candidate.identity();
                tracing::info!("Skipping duplicate {} ({})", candidate.name, identity);
                report.skips.push(SkipRecord {
                    name: candidate.name,
                    identity,
                    reason: SkipReason::Duplicate,
                });
                continue;
            }

            if let FilterVerdict::Excluded(pattern) = self.filter.check_website(&candidate.website)
            {
                let identity = candidate.identity();
                tracing::info!(
                    "Skipping {} ({}): excluded by {}",
                    candidate.name,
                    identity,
                    pattern
                );
                report.skips.push(SkipRecord {
                    name: candidate.name,
                    identity,
                    reason: SkipReason::Excluded(pattern),
                });
                continue;
            }

            let category = self.classifier.classify(&candidate);
            let name = candidate.name.clone();

            match self.router.route(ClassifiedLead::new(candidate, category)).await {
                Ok(lead) => report.leads.push(lead),
                Err(RoutingError::Skipped { identity }) => {
                    tracing::info!("Skipping duplicate {} ({})", name, identity);
                    report.skips.push(SkipRecord {
                        name,
                        identity,
                        reason: SkipReason::Duplicate,
                    });
                }
                Err(RoutingError::AnalysisFailed {
                    lead,
                    stage,
                    attempts,
                    reason,
                }) => {
                    tracing::warn!(
                        "Lead {} failed in {} after {} attempt(s): {}",
                        lead,
                        stage,
                        attempts,
                        reason
                    );
                    report.failures.push(FailureRecord {
                        lead,
                        stage,
                        attempts,
                        reason: reason.to_string(),
                    });
                }
            }
        }
    }

    fn finish(&self, mut report: RunReport, started: Instant) -> crate::Result<RunReport> {
        report.elapsed = started.elapsed();
        self.writer.write(&report.leads)?;
        tracing::info!(
            "Wrote {} lead(s) to {}",
            report.leads.len(),
            self.writer.describe()
        );
        Ok(report)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn record_source_failure(
    report: &mut RunReport,
    stage: SourceStage,
    target: &str,
    failure: RetryFailure,
) {
    tracing::warn!("Source {} failed for {}: {}", stage, target, failure);
    report.source_failures.push(SourceFailure {
        stage,
        target: target.to_string(),
        reason: failure.to_string(),
    });
}

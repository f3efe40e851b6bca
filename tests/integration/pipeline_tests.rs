//! Integration tests for the lead pipeline
//!
//! External collaborators are replaced by in-process stubs so the tests
//! exercise registry gating, routing, retry and output end-to-end.

use async_trait::async_trait;
use sponsor_scout::config::Config;
use sponsor_scout::lead::{
    AnalyzedLead, ClassifiedLead, CompanyCandidate, LeadAnalysis, LeadCategory, LeadReview,
};
use sponsor_scout::output::{CsvWriter, CSV_HEADER};
use sponsor_scout::pipeline::{
    AnalysisStep, CategoryRoutes, EmailFinder, LlmAnalyst, Orchestrator, RetryPolicy, ReviewStep,
    Router, RoutingError, Services, SkipReason, SourceStage, Stage, StepPair,
};
use sponsor_scout::services::{
    FetchErrorKind, FetchedPage, PageFetcher, Prompt, ReasoningClient, SearchHit, SearchService,
    ServiceError,
};
use sponsor_scout::ReviewStatus;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Analysis stub recording every lead it sees
#[derive(Default)]
struct RecordingAnalyst {
    calls: Mutex<Vec<String>>,

    /// Websites whose analysis fails permanently
    failing: Vec<String>,
}

impl RecordingAnalyst {
    fn failing_on(websites: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: websites.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisStep for RecordingAnalyst {
    async fn analyze(
        &self,
        lead: &ClassifiedLead,
        _known_emails: &BTreeSet<String>,
    ) -> Result<LeadAnalysis, ServiceError> {
        self.calls.lock().unwrap().push(lead.website().to_string());

        if self.failing.iter().any(|w| w == lead.website()) {
            return Err(ServiceError::Rejected("provider refused the request".to_string()));
        }

        let domain = lead.website().to_lowercase();
        Ok(LeadAnalysis {
            contact_emails: [format!("info@{}", domain.trim_end_matches('/'))]
                .into_iter()
                .collect(),
            motivation_notes: format!("{} wants to meet {} buyers", lead.name(), lead.category()),
        })
    }
}

/// Analysis stub that never answers
#[derive(Default)]
struct HangingAnalyst {
    calls: AtomicU32,
}

#[async_trait]
impl AnalysisStep for HangingAnalyst {
    async fn analyze(
        &self,
        _lead: &ClassifiedLead,
        _known_emails: &BTreeSet<String>,
    ) -> Result<LeadAnalysis, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

struct ApprovingReviewer;

#[async_trait]
impl ReviewStep for ApprovingReviewer {
    async fn review(&self, lead: &AnalyzedLead) -> Result<LeadReview, ServiceError> {
        Ok(LeadReview::approved(format!("{} looks relevant", lead.name())))
    }
}

/// Fetcher taking 20s per page; pages list no general inbox
#[derive(Default)]
struct SlowFetcher {
    fetches: AtomicU32,
}

#[async_trait]
impl PageFetcher for SlowFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(20)).await;
        Ok(FetchedPage {
            final_url: url.to_string(),
            text: "Ask Jane.Doe@acme-hr.com about partnerships".to_string(),
            ..Default::default()
        })
    }
}

/// Reasoning stub answering analysis prompts after a delay
///
/// The first `rate_limited` calls fail with a rate limit.
struct SlowAnalysisReasoner {
    delay: Duration,
    rate_limited: u32,
    calls: AtomicU32,
}

#[async_trait]
impl ReasoningClient for SlowAnalysisReasoner {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.rate_limited {
            return Err(ServiceError::RateLimited("429 slow down".to_string()));
        }
        tokio::time::sleep(self.delay).await;
        Ok(r#"{"motivation": "Sells payroll to HR buyers", "emails": []}"#.to_string())
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }
}

/// Router whose analysis discovers contacts through `fetcher`
fn create_discovering_router(
    fetcher: Arc<SlowFetcher>,
    reasoner: Arc<SlowAnalysisReasoner>,
) -> Router {
    let contact_retry = RetryPolicy::new(3, Duration::from_secs(2), 2.0, Duration::from_secs(30));
    let finder = EmailFinder::new(fetcher, 3, contact_retry);
    let analyst: Arc<dyn AnalysisStep> =
        Arc::new(LlmAnalyst::new(reasoner, Some(finder), "HR software vendors"));
    let routes = create_test_routes(analyst.clone(), analyst);
    let policy = RetryPolicy::new(3, Duration::from_secs(2), 2.0, Duration::from_secs(120));
    Router::new(routes, policy)
}

/// Search stub with canned results per query
struct StubSearch {
    results: HashMap<String, Vec<SearchHit>>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchService for StubSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results
            .get(query)
            .cloned()
            .ok_or_else(|| ServiceError::Rejected(format!("unexpected query {}", query)))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Fetcher stub serving canned page text
struct StubFetcher {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(text) => Ok(FetchedPage {
                final_url: url.to_string(),
                text: text.clone(),
                ..Default::default()
            }),
            None => Err(ServiceError::Fetch {
                url: url.to_string(),
                kind: FetchErrorKind::NotFound,
            }),
        }
    }
}

/// Reasoning stub answering extraction prompts by page content
struct StubExtractionReasoner {
    answers: Vec<(String, String)>,
}

#[async_trait]
impl ReasoningClient for StubExtractionReasoner {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ServiceError> {
        Ok(self
            .answers
            .iter()
            .find(|(marker, _)| prompt.user.contains(marker.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| "[]".to_string()))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }
}

fn create_test_config(output: &Path) -> Config {
    let mut config = Config::default();
    config.output.path = output.display().to_string();
    config.retry.max_attempts = 3;
    config.retry.delay_secs = 0.01;
    config.retry.backoff = 2.0;
    config
}

fn create_test_routes(
    hr: Arc<dyn AnalysisStep>,
    ne_b2b: Arc<dyn AnalysisStep>,
) -> CategoryRoutes {
    let review: Arc<dyn ReviewStep> = Arc::new(ApprovingReviewer);
    CategoryRoutes {
        hr: StepPair::new(hr, review.clone()),
        ne_b2b: StepPair::new(ne_b2b, review),
    }
}

fn create_test_orchestrator(
    config: Config,
    routes: CategoryRoutes,
    search: Option<Arc<dyn SearchService>>,
    fetcher: Arc<dyn PageFetcher>,
    reasoner: Arc<dyn ReasoningClient>,
) -> Orchestrator {
    let writer = Box::new(CsvWriter::new(&config.output.path));
    let services = Services {
        search,
        fetcher,
        reasoner,
        routes,
    };
    Orchestrator::new(Arc::new(config), services, writer)
}

fn create_offline_orchestrator(config: Config, routes: CategoryRoutes) -> Orchestrator {
    let fetcher = Arc::new(StubFetcher {
        pages: HashMap::new(),
        fetched: Mutex::new(Vec::new()),
    });
    let reasoner = Arc::new(StubExtractionReasoner { answers: vec![] });
    create_test_orchestrator(config, routes, None, fetcher, reasoner)
}

fn read_csv_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_end_to_end_dedupes_and_writes_csv() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let routes = create_test_routes(hr.clone(), ne.clone());
    let mut orchestrator = create_offline_orchestrator(create_test_config(&output), routes);

    let candidates = vec![
        CompanyCandidate::new("Acme HR Co", "acme-hr.com"),
        CompanyCandidate::new("Acme HR Co", "ACME-HR.COM/"),
        CompanyCandidate::new("NorthEast Tools", "netools.biz"),
    ];

    let report = orchestrator.run_with_candidates(candidates).await.unwrap();

    assert_eq!(report.leads.len(), 2);
    assert_eq!(report.leads[0].category(), LeadCategory::Hr);
    assert_eq!(report.leads[1].category(), LeadCategory::NeB2b);
    assert_eq!(report.duplicate_count(), 1);
    assert_eq!(report.skips[0].name, "Acme HR Co");
    assert_eq!(report.skips[0].identity.as_str(), "acme-hr.com");
    assert!(report.failures.is_empty());

    assert_eq!(hr.calls(), vec!["acme-hr.com".to_string()]);
    assert_eq!(ne.calls(), vec!["netools.biz".to_string()]);

    let (headers, rows) = read_csv_rows(&output);
    assert_eq!(headers, CSV_HEADER);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "Acme HR Co");
    assert_eq!(rows[0][1], "acme-hr.com");
    assert_eq!(rows[0][2], "HR");
    assert_eq!(rows[0][3], "info@acme-hr.com");
    assert_eq!(rows[0][5], "approved");
    assert_eq!(rows[1][0], "NorthEast Tools");
    assert_eq!(rows[1][2], "NE_B2B");
}

#[tokio::test]
async fn test_same_site_dispatched_at_most_once() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let routes = create_test_routes(hr.clone(), ne.clone());
    let mut orchestrator = create_offline_orchestrator(create_test_config(&output), routes);

    let variants = [
        "netools.biz",
        "http://www.NETOOLS.biz/",
        "https://netools.biz#contact",
        "NETOOLS.BIZ",
        "https://netools.biz/?utm_source=newsletter",
    ];
    let candidates = variants
        .iter()
        .map(|w| CompanyCandidate::new("NorthEast Tools", *w))
        .collect();

    let report = orchestrator.run_with_candidates(candidates).await.unwrap();

    assert_eq!(ne.calls().len() + hr.calls().len(), 1);
    assert_eq!(report.leads.len(), 1);
    assert_eq!(report.duplicate_count(), variants.len() - 1);
    assert!(report
        .skips
        .iter()
        .all(|s| s.identity.as_str() == "netools.biz"));
}

#[tokio::test]
async fn test_failed_lead_does_not_abort_run() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let hr = Arc::new(RecordingAnalyst::failing_on(&["three-hr.com"]));
    let ne = Arc::new(RecordingAnalyst::default());
    let routes = create_test_routes(hr.clone(), ne);
    let mut orchestrator = create_offline_orchestrator(create_test_config(&output), routes);

    let candidates = ["one", "two", "three", "four", "five"]
        .iter()
        .map(|n| CompanyCandidate::new(format!("{} HR Payroll", n), format!("{}-hr.com", n)))
        .collect();

    let report = orchestrator.run_with_candidates(candidates).await.unwrap();

    let names: Vec<&str> = report.leads.iter().map(|l| l.name()).collect();
    assert_eq!(
        names,
        vec!["one HR Payroll", "two HR Payroll", "four HR Payroll", "five HR Payroll"]
    );

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.lead.name, "three HR Payroll");
    assert_eq!(failure.lead.category, LeadCategory::Hr);
    assert_eq!(failure.stage, Stage::Analysis);
    // Permanent errors are not retried
    assert_eq!(failure.attempts, 1);
    assert_eq!(hr.calls().len(), 5);

    // Failures stay out of the CSV
    let (_, rows) = read_csv_rows(&output);
    assert_eq!(rows.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_on_hanging_analysis() {
    let hanging = Arc::new(HangingAnalyst::default());
    let routes = create_test_routes(hanging.clone(), hanging.clone());
    let policy = RetryPolicy::new(3, Duration::from_secs(2), 2.0, Duration::from_secs(5));
    let mut router = Router::new(routes, policy);

    let start = tokio::time::Instant::now();
    let lead = ClassifiedLead::new(
        CompanyCandidate::new("Acme HR Co", "https://acme-hr.com"),
        LeadCategory::Hr,
    );
    let result = router.route(lead).await;

    match result {
        Err(RoutingError::AnalysisFailed {
            lead,
            stage,
            attempts,
            reason,
        }) => {
            assert_eq!(lead.identity.as_str(), "acme-hr.com");
            assert_eq!(lead.category, LeadCategory::Hr);
            assert_eq!(stage, Stage::Analysis);
            assert_eq!(attempts, 3);
            assert!(matches!(reason, ServiceError::Timeout(_)));
        }
        other => panic!("expected AnalysisFailed, got {:?}", other.map(|l| l.name().to_string())),
    }

    assert_eq!(hanging.calls.load(Ordering::SeqCst), 3);

    // Three 5s timeouts plus 2s and 4s of backoff
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(21), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(22), "elapsed {:?}", elapsed);

    // Exhausted sites stay seen for the rest of the run
    assert!(router.has_seen("acme-hr.com"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_contact_pages_do_not_eat_analysis_timeout() {
    let fetcher = Arc::new(SlowFetcher::default());
    let reasoner = Arc::new(SlowAnalysisReasoner {
        delay: Duration::from_secs(45),
        rate_limited: 0,
        calls: AtomicU32::new(0),
    });
    let mut router = create_discovering_router(fetcher.clone(), reasoner.clone());

    // Four 20s fetches plus a 45s answer exceed one 120s reasoning call
    let lead = ClassifiedLead::new(
        CompanyCandidate::new("Acme HR Co", "acme-hr.com"),
        LeadCategory::Hr,
    );
    let lead = router.route(lead).await.unwrap();

    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 4);
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 1);
    assert!(lead.contact_emails().contains("jane.doe@acme-hr.com"));
    assert_eq!(lead.motivation_notes(), "Sells payroll to HR buyers");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_analysis_does_not_refetch_pages() {
    let fetcher = Arc::new(SlowFetcher::default());
    let reasoner = Arc::new(SlowAnalysisReasoner {
        delay: Duration::from_secs(1),
        rate_limited: 2,
        calls: AtomicU32::new(0),
    });
    let mut router = create_discovering_router(fetcher.clone(), reasoner.clone());

    let lead = ClassifiedLead::new(
        CompanyCandidate::new("Acme HR Co", "acme-hr.com"),
        LeadCategory::Hr,
    );
    let lead = router.route(lead).await.unwrap();

    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 3);
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 4);
    assert_eq!(lead.review_status(), ReviewStatus::Approved);
}

#[tokio::test]
async fn test_excluded_website_is_skipped() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let routes = create_test_routes(hr.clone(), ne.clone());
    let mut orchestrator = create_offline_orchestrator(create_test_config(&output), routes);

    let candidates = vec![
        CompanyCandidate::new("Acme HR Co", "https://en.wikipedia.org/wiki/Acme"),
        CompanyCandidate::new("Acme HR Co", "acme-hr.com"),
    ];
    let report = orchestrator.run_with_candidates(candidates).await.unwrap();

    assert_eq!(report.leads.len(), 1);
    assert_eq!(report.excluded_count(), 1);
    assert!(matches!(report.skips[0].reason, SkipReason::Excluded(_)));
    assert_eq!(hr.calls(), vec!["acme-hr.com".to_string()]);
}

#[tokio::test]
async fn test_candidate_cap_limits_processing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let mut config = create_test_config(&output);
    config.pipeline.max_candidates = 2;

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let routes = create_test_routes(hr.clone(), ne.clone());
    let mut orchestrator = create_offline_orchestrator(config, routes);

    let candidates = (1..=4)
        .map(|i| CompanyCandidate::new(format!("Payroll {}", i), format!("payroll{}.com", i)))
        .collect();
    let report = orchestrator.run_with_candidates(candidates).await.unwrap();

    assert_eq!(report.candidates_seen, 2);
    assert_eq!(report.leads.len(), 2);
    assert_eq!(hr.calls().len() + ne.calls().len(), 2);
}

#[tokio::test]
async fn test_empty_run_still_writes_header() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("nested/out/leads.csv");

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let mut orchestrator =
        create_offline_orchestrator(create_test_config(&output), create_test_routes(hr, ne));

    let report = orchestrator.run_with_candidates(Vec::new()).await.unwrap();

    assert!(report.leads.is_empty());
    let (headers, rows) = read_csv_rows(&output);
    assert_eq!(headers, CSV_HEADER);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_full_run_from_search_results() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let mut config = create_test_config(&output);
    config.segments.truncate(1);
    config.segments[0].queries = vec!["hr vendors".to_string(), "payroll vendors".to_string()];

    let hit = |url: &str| SearchHit {
        title: "List".to_string(),
        url: url.to_string(),
        snippet: String::new(),
    };

    let search = Arc::new(StubSearch {
        results: HashMap::from([
            (
                "hr vendors".to_string(),
                vec![
                    hit("https://lists.test/hr-vendors"),
                    hit("https://en.wikipedia.org/wiki/Payroll"),
                    hit("https://lists.test/hr-vendors/"),
                    hit("https://lists.test/logo.png"),
                ],
            ),
            (
                "payroll vendors".to_string(),
                vec![hit("https://gone.test/payroll"), hit("https://blog.test/payroll")],
            ),
        ]),
        queries: Mutex::new(Vec::new()),
    });

    let fetcher = Arc::new(StubFetcher {
        pages: HashMap::from([
            (
                "https://lists.test/hr-vendors".to_string(),
                "HR VENDOR LIST: Acme HR Co, Gusto".to_string(),
            ),
            (
                "https://blog.test/payroll".to_string(),
                "PAYROLL BLOG: Acme HR Co again".to_string(),
            ),
        ]),
        fetched: Mutex::new(Vec::new()),
    });

    let reasoner = Arc::new(StubExtractionReasoner {
        answers: vec![
            (
                "HR VENDOR LIST".to_string(),
                r#"[{"name": "Acme HR Co", "website": "acme-hr.com", "description": "HR software"},
                    {"name": "Gusto", "website": "https://gusto.com",
                     "description": "Payroll and benefits"}]"#
                    .to_string(),
            ),
            (
                "PAYROLL BLOG".to_string(),
                concat!(
                    "```json\n",
                    r#"[{"name": "Acme HR Co", "website": "https://www.acme-hr.com/"}]"#,
                    "\n```"
                )
                .to_string(),
            ),
        ],
    });

    let hr = Arc::new(RecordingAnalyst::default());
    let ne = Arc::new(RecordingAnalyst::default());
    let mut orchestrator = create_test_orchestrator(
        config,
        create_test_routes(hr.clone(), ne.clone()),
        Some(search.clone()),
        fetcher.clone(),
        reasoner,
    );

    let report = orchestrator.run().await.unwrap();

    assert_eq!(
        *search.queries.lock().unwrap(),
        vec!["hr vendors".to_string(), "payroll vendors".to_string()]
    );
    // Wikipedia, the duplicate list URL and the image are never fetched
    assert_eq!(
        *fetcher.fetched.lock().unwrap(),
        vec![
            "https://lists.test/hr-vendors".to_string(),
            "https://gone.test/payroll".to_string(),
            "https://blog.test/payroll".to_string(),
        ]
    );

    assert_eq!(report.sources_scraped, 2);
    assert_eq!(report.source_failures.len(), 1);
    assert_eq!(report.source_failures[0].stage, SourceStage::Fetch);
    assert_eq!(report.source_failures[0].target, "https://gone.test/payroll");

    let names: Vec<&str> = report.leads.iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["Acme HR Co", "Gusto"]);
    assert_eq!(report.duplicate_count(), 1);
    assert_eq!(
        report.leads[0].lead().candidate().source_url.as_deref(),
        Some("https://lists.test/hr-vendors")
    );
    assert!(report
        .leads
        .iter()
        .all(|l| l.review_status() == ReviewStatus::Approved));

    let (_, rows) = read_csv_rows(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][7], "https://lists.test/hr-vendors");
}

//! Integration tests for the HTTP trigger
//!
//! Requests go through the full axum router with stubbed pipeline services.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use sponsor_scout::config::Config;
use sponsor_scout::lead::{AnalyzedLead, ClassifiedLead, LeadAnalysis, LeadReview};
use sponsor_scout::pipeline::{AnalysisStep, CategoryRoutes, ReviewStep, Services, StepPair};
use sponsor_scout::server::{create_router, AppState, ErrorResponse, RunResponse, API_KEY_HEADER};
use sponsor_scout::services::{
    FetchErrorKind, FetchedPage, PageFetcher, Prompt, ReasoningClient, ServiceError,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const SHARED_KEY: &str = "shared-secret";
const SOURCE_URL: &str = "https://lists.test/hr-vendors";

struct StubAnalyst;

#[async_trait]
impl AnalysisStep for StubAnalyst {
    async fn analyze(
        &self,
        lead: &ClassifiedLead,
        _known_emails: &BTreeSet<String>,
    ) -> Result<LeadAnalysis, ServiceError> {
        Ok(LeadAnalysis {
            contact_emails: BTreeSet::from([format!("info@{}", lead.website())]),
            motivation_notes: format!("{} sells to HR teams", lead.name()),
        })
    }
}

struct StubReviewer;

#[async_trait]
impl ReviewStep for StubReviewer {
    async fn review(&self, _lead: &AnalyzedLead) -> Result<LeadReview, ServiceError> {
        Ok(LeadReview::approved("fits the audience"))
    }
}

/// Serves one source page; every other URL is missing
struct StubFetcher;

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError> {
        if url != SOURCE_URL {
            return Err(ServiceError::Fetch {
                url: url.to_string(),
                kind: FetchErrorKind::NotFound,
            });
        }
        Ok(FetchedPage {
            final_url: url.to_string(),
            text: "Top HR vendors: Acme HR Payroll".to_string(),
            ..Default::default()
        })
    }
}

/// Extraction stub returning a fixed answer
struct StubReasoner {
    answer: String,
}

#[async_trait]
impl ReasoningClient for StubReasoner {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, ServiceError> {
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }
}

fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.api_key = Some(SHARED_KEY.to_string());
    config.pipeline.test_url = Some(SOURCE_URL.to_string());
    config.retry.max_attempts = 1;
    config
}

/// Router whose runs extract `extraction_answer`; counts service builds
fn create_test_app(extraction_answer: &str, builds: Arc<AtomicU32>) -> axum::Router {
    let answer = extraction_answer.to_string();
    let factory = move |_: &Config| -> sponsor_scout::Result<Services> {
        builds.fetch_add(1, Ordering::SeqCst);
        let pair = StepPair::new(Arc::new(StubAnalyst), Arc::new(StubReviewer));
        Ok(Services {
            search: None,
            fetcher: Arc::new(StubFetcher),
            reasoner: Arc::new(StubReasoner {
                answer: answer.clone(),
            }),
            routes: CategoryRoutes {
                hr: pair.clone(),
                ne_b2b: pair,
            },
        })
    };

    let state = AppState::new(Arc::new(create_test_config()), Arc::new(factory)).unwrap();
    create_router(Arc::new(state))
}

fn run_request(api_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/run-generator")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

const ACME_ANSWER: &str =
    r#"[{"name": "Acme HR Payroll", "website": "acme-hr.com", "description": "HR software"}]"#;

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let builds = Arc::new(AtomicU32::new(0));
    let app = create_test_app(ACME_ANSWER, builds.clone());

    let response = app
        .oneshot(run_request(None, r#"{"segments": ["hr-tech"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(error.error, "API key required or invalid.");
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_api_key_is_forbidden() {
    let builds = Arc::new(AtomicU32::new(0));
    let app = create_test_app(ACME_ANSWER, builds.clone());

    let response = app
        .oneshot(run_request(Some("guess"), r#"{"segments": ["hr-tech"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auth_checked_before_body() {
    let app = create_test_app(ACME_ANSWER, Arc::new(AtomicU32::new(0)));

    let response = app.oneshot(run_request(None, "not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_run_requests() {
    let builds = Arc::new(AtomicU32::new(0));
    let app = create_test_app(ACME_ANSWER, builds.clone());

    for body in ["{}", "not json", r#"{"segments": ["no-such-segment"]}"#] {
        let response = app
            .clone()
            .oneshot(run_request(Some(SHARED_KEY), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }

    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = create_test_app(ACME_ANSWER, Arc::new(AtomicU32::new(0)));

    let response = app
        .oneshot(get_request("/results/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(error.error, "Result not found or expired");
}

#[tokio::test]
async fn test_run_then_download_csv() {
    let builds = Arc::new(AtomicU32::new(0));
    let app = create_test_app(ACME_ANSWER, builds.clone());

    let response = app
        .clone()
        .oneshot(run_request(Some(SHARED_KEY), r#"{"segments_to_run": ["hr-tech"]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let run: RunResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(run.leads, 1);
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let response = app
        .oneshot(get_request(&format!("/results/{}", run.job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"leads.csv\""
    );

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("Company Name,Website,Lead Category"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Acme HR Payroll,"), "row {}", row);
    assert!(row.contains("info@acme-hr.com"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_run_without_leads_is_no_content() {
    let app = create_test_app("[]", Arc::new(AtomicU32::new(0)));

    let response = app
        .oneshot(run_request(Some(SHARED_KEY), r#"{"segments": []}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = create_test_app(ACME_ANSWER, Arc::new(AtomicU32::new(0)));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/run-generator")
        .header(header::ORIGIN, "https://dashboard.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, API_KEY_HEADER)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

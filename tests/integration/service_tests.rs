//! Integration tests for the HTTP collaborators
//!
//! These tests use wiremock to stand in for the search API, company
//! websites and the reasoning providers.

use serde_json::json;
use sponsor_scout::config::{Config, ProviderSettings, SearchSettings};
use sponsor_scout::pipeline::{EmailFinder, Orchestrator, RetryPolicy};
use sponsor_scout::services::{
    create_reasoning_client, FetchErrorKind, HttpFetcher, PageFetcher, Prompt, SearchService,
    SerperClient, ServiceError,
};
use sponsor_scout::ReviewStatus;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

fn create_test_search_settings(endpoint: &str) -> SearchSettings {
    SearchSettings {
        endpoint: endpoint.to_string(),
        results_per_query: 5,
        ..Default::default()
    }
}

fn create_test_provider(name: &str, api_base: &str, api_key: Option<&str>) -> ProviderSettings {
    ProviderSettings {
        name: name.to_string(),
        api_key: api_key.map(String::from),
        api_base: Some(api_base.to_string()),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

fn create_contact_retry() -> RetryPolicy {
    RetryPolicy::new(1, Duration::ZERO, 1.0, Duration::from_secs(5))
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn test_serper_search_maps_organic_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "serper-test"))
        .and(body_json(json!({"q": "hr software vendors", "num": 5, "gl": "us"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                {
                    "title": "Top HR vendors",
                    "link": "https://lists.test/hr",
                    "snippet": "The best HR tools"
                },
                {"title": "No link here"},
                {"title": "Payroll roundup", "link": "https://blog.test/payroll", "snippet": ""}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = create_test_search_settings(&server.uri());
    let client = SerperClient::new("serper-test", &settings).unwrap();
    let hits = client.search("hr software vendors").await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://lists.test/hr");
    assert_eq!(hits[0].title, "Top HR vendors");
    assert_eq!(hits[1].url, "https://blog.test/payroll");
}

#[tokio::test]
async fn test_serper_error_classification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string_contains("busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string_contains("denied"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let settings = create_test_search_settings(&server.uri());
    let client = SerperClient::new("serper-test", &settings).unwrap();

    let rate_limited = client.search("busy").await.unwrap_err();
    assert!(matches!(rate_limited, ServiceError::RateLimited(_)));
    assert!(rate_limited.is_transient());

    let rejected = client.search("denied").await.unwrap_err();
    assert!(matches!(rejected, ServiceError::Rejected(_)));
    assert!(!rejected.is_transient());
}

#[tokio::test]
async fn test_http_fetcher_parses_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vendors"))
        .respond_with(html(
            r#"<h1>HR Vendors</h1>
            <script>var tracking = "ignore me";</script>
            <p>Acme HR Co builds payroll software.</p>
            <a href="/acme">Acme HR Co</a>
            <a href="mailto:Partners@Lists.test">Email us</a>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let page = fetcher.fetch(&format!("{}/vendors", server.uri())).await.unwrap();

    assert_eq!(page.title.as_deref(), Some("Test"));
    assert!(page.text.contains("Acme HR Co builds payroll software."));
    assert!(!page.text.contains("ignore me"));
    assert_eq!(page.links.len(), 1);
    assert_eq!(page.links[0].url, format!("{}/acme", server.uri()));
    assert_eq!(page.links[0].text, "Acme HR Co");
    assert_eq!(page.mailto, vec!["partners@lists.test".to_string()]);
}

#[tokio::test]
async fn test_http_fetcher_error_classification() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/overloaded"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/brochure.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "application/pdf"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let fetch_kind = |err: ServiceError| match err {
        ServiceError::Fetch { kind, .. } => kind,
        other => panic!("expected fetch error, got {:?}", other),
    };

    let missing = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();
    assert!(!missing.is_transient());
    assert_eq!(fetch_kind(missing), FetchErrorKind::NotFound);

    let blocked = fetcher.fetch(&format!("{}/forbidden", server.uri())).await.unwrap_err();
    assert_eq!(fetch_kind(blocked), FetchErrorKind::Blocked);

    let overloaded = fetcher.fetch(&format!("{}/overloaded", server.uri())).await.unwrap_err();
    assert!(overloaded.is_transient());
    assert_eq!(fetch_kind(overloaded), FetchErrorKind::Status(503));

    let binary = fetcher.fetch(&format!("{}/brochure.bin", server.uri())).await.unwrap_err();
    assert_eq!(fetch_kind(binary), FetchErrorKind::ContentMismatch);
}

#[tokio::test]
async fn test_email_finder_visits_contact_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<p>Questions? Ask Jane.Doe@acme-hr.com</p>
            <a href="/contact-us">Contact</a>
            <a href="/pricing">Pricing</a>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contact-us"))
        .respond_with(html("<p>Write to info [at] acme-hr [dot] com</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
    let finder = EmailFinder::new(fetcher, 3, create_contact_retry());

    let emails = finder.find(&server.uri()).await.unwrap();
    let emails: Vec<&str> = emails.iter().map(String::as_str).collect();
    assert_eq!(emails, vec!["info@acme-hr.com", "jane.doe@acme-hr.com"]);
}

#[tokio::test]
async fn test_email_finder_stops_at_preferred_address() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="mailto:hello@netools.biz">hello@netools.biz</a>
            <a href="/contact">Contact</a>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html("<p>sales@netools.biz</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
    let emails = EmailFinder::new(fetcher, 3, create_contact_retry())
        .find(&server.uri())
        .await
        .unwrap();

    assert_eq!(emails.len(), 1);
    assert!(emails.contains("hello@netools.biz"));
}

#[tokio::test]
async fn test_openai_provider_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("json_object"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(r#"{"ok": true}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_test_provider("openai", &server.uri(), Some("sk-test"));
    let client = create_reasoning_client(&provider).unwrap();
    assert_eq!(client.name(), "openai");
    assert_eq!(client.model(), "gpt-3.5-turbo");

    let answer = client
        .generate(&Prompt::json("You are terse.", "Say ok"))
        .await
        .unwrap();
    assert_eq!(answer, r#"{"ok": true}"#);
}

#[tokio::test]
async fn test_openai_provider_error_classification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("overload"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("no access"))
        .mount(&server)
        .await;

    let provider = create_test_provider("openai", &server.uri(), Some("sk-test"));
    let client = create_reasoning_client(&provider).unwrap();

    let overloaded = client
        .generate(&Prompt::json("system", "overload"))
        .await
        .unwrap_err();
    assert!(matches!(overloaded, ServiceError::Unavailable(_)));
    assert!(overloaded.is_transient());

    let forbidden = client
        .generate(&Prompt::json("system", "forbidden"))
        .await
        .unwrap_err();
    assert!(matches!(forbidden, ServiceError::Rejected(_)));
}

#[tokio::test]
async fn test_anthropic_provider_joins_text_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "APPROVED"},
                {"type": "text", "text": " - strong HR fit"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_reasoning_client(&create_test_provider(
        "anthropic",
        &server.uri(),
        Some("ak-test"),
    ))
    .unwrap();

    let answer = client
        .generate(&Prompt::json("Review leads.", "Acme HR Co"))
        .await
        .unwrap();
    assert_eq!(answer, "APPROVED - strong HR fit");
}

#[tokio::test]
async fn test_gemini_provider_passes_key_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "[]"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_test_provider("google", &server.uri(), Some("g-test"));
    let client = create_reasoning_client(&provider).unwrap();

    let answer = client.generate(&Prompt::json("Extract.", "Nothing")).await.unwrap();
    assert_eq!(answer, "[]");
}

#[tokio::test]
async fn test_ollama_provider_needs_no_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "{\"motivation\": \"local\"}"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_test_provider("ollama", &server.uri(), None);
    let client = create_reasoning_client(&provider).unwrap();
    assert_eq!(client.model(), "llama3.2");

    let answer = client.generate(&Prompt::json("Analyze.", "Acme")).await.unwrap();
    assert!(answer.contains("local"));
}

#[tokio::test]
async fn test_single_url_run_against_mock_services() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Source page listing two companies
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(html("<p>Acme HR Co and NorthEast Tools are exhibiting.</p>"))
        .expect(1)
        .mount(&server)
        .await;

    // Acme's website with a general inbox; NorthEast Tools' site is down (404)
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(html("<footer>info@acme-hr.com</footer>"))
        .mount(&server)
        .await;

    let companies = json!([
        {
            "name": "Acme HR Co",
            "website": format!("{}/acme", base),
            "description": "HR and payroll software"
        },
        {
            "name": "NorthEast Tools",
            "website": format!("{}/netools", base),
            "description": "Industrial tools distributor in Boston"
        },
        {"name": "Acme HR Co", "website": format!("{}/acme/", base), "description": "Listed twice"}
    ])
    .to_string();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Source page:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(&companies)))
        .expect(1)
        .mount(&server)
        .await;

    let analysis =
        json!({"motivation": "Wants to reach conference buyers", "emails": []}).to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Contact emails found on the website"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(&analysis)))
        .expect(2)
        .mount(&server)
        .await;

    let review = json!({"status": "approved", "notes": "Good fit"}).to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("before they reach the sales team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(&review)))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("leads.csv");

    let mut config = Config::default();
    config.provider = create_test_provider("openai", &base, Some("sk-test"));
    config.pipeline.test_url = Some(format!("{}/list", base));
    config.pipeline.scrape_timeout_secs = 5;
    config.retry.delay_secs = 0.01;
    config.output.path = output.display().to_string();

    let mut orchestrator = Orchestrator::from_config(Arc::new(config)).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.sources_scraped, 1);
    assert_eq!(report.leads.len(), 2);
    assert_eq!(report.duplicate_count(), 1);
    assert!(report.failures.is_empty());

    let acme = &report.leads[0];
    assert_eq!(acme.name(), "Acme HR Co");
    assert!(acme.contact_emails().contains("info@acme-hr.com"));
    assert_eq!(acme.review_status(), ReviewStatus::Approved);

    let netools = &report.leads[1];
    assert_eq!(netools.name(), "NorthEast Tools");
    assert!(netools.contact_emails().is_empty());
    assert_eq!(netools.review_notes(), "Good fit");

    let mut reader = csv::Reader::from_path(&output).unwrap();
    assert_eq!(reader.records().count(), 2);
}

//! HTTP surface: fixture generation, checks and fix suggestions
//!
//! | Route                    | Purpose                                    |
//! |--------------------------|--------------------------------------------|
//! | `GET /health`            | liveness                                   |
//! | `GET /bugs`              | fixture catalog                            |
//! | `POST /generate`         | write a fixture page and check it          |
//! | `POST /check`            | check inline HTML or a URL                 |
//! | `POST /suggest`          | fix suggestion for one failure             |
//! | `GET /generated_html/*`  | generated pages                            |

use crate::commands::ServeArgs;
use crate::error::{CliError, CliResult};
use crate::handlers::check::build_engine;
use crate::handlers::generate::check_fixture;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pagecheck::fixtures::{compose, BugFamily, CATALOG};
use pagecheck::{run_session, Category, EngineConfig, PageSource, StaticFactory, TestReport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

/// File name of the generated fixture page
pub const FIXTURE_FILE: &str = "buggy_website.html";

/// Shared server state
#[derive(Debug, Clone)]
pub struct AppState {
    dir: Arc<PathBuf>,
    public_url: String,
    #[cfg(feature = "llm")]
    llm: Option<pagecheck::llm::LlmConfig>,
}

impl AppState {
    /// State serving fixtures from `dir`, reachable at `public_url`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            #[cfg(feature = "llm")]
            llm: None,
        }
    }

    /// Enable `/suggest`; configurations without a key leave it disabled
    #[cfg(feature = "llm")]
    #[must_use]
    pub fn with_llm(mut self, config: pagecheck::llm::LlmConfig) -> Self {
        self.llm = config.has_api_key().then_some(config);
        self
    }

    fn fixture_url(&self) -> String {
        format!("{}/generated_html/{FIXTURE_FILE}", self.public_url)
    }
}

/// Error body `{"error": ...}` with a status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<pagecheck::PagecheckError> for ApiError {
    fn from(err: pagecheck::PagecheckError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl From<CliError> for ApiError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::InvalidArgument { message } => Self::new(StatusCode::BAD_REQUEST, message),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

/// `POST /generate` body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Bug family keys
    pub bugs: Vec<String>,
    /// Variant index
    #[serde(default)]
    pub variant: usize,
}

/// `POST /generate` answer
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Where the page is served
    pub url: String,
    /// Families included
    pub bugs: Vec<String>,
    /// Keys with no family
    pub unknown: Vec<String>,
    /// Static check of the page
    pub report: TestReport,
}

/// `POST /check` body
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Inline HTML or URL
    pub source: String,
    /// Categories to run (default: all)
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Probe link destinations
    #[serde(default)]
    pub network: bool,
}

/// `POST /suggest` body
#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    /// Category of the failing element
    pub category: String,
    /// Element name
    pub item: String,
    /// Failed check
    pub test: String,
    /// Failure reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Element markup
    #[serde(default)]
    pub code_snippet: Option<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn bugs() -> Json<&'static [BugFamily]> {
    Json(CATALOG)
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let fixture = compose(&request.bugs, request.variant);
    if fixture.bugs.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "no known bug families selected"));
    }
    tokio::fs::create_dir_all(state.dir.as_path())
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tokio::fs::write(state.dir.join(FIXTURE_FILE), &fixture.html)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!(bugs = ?fixture.bugs, "fixture written");

    let report = check_fixture(&fixture).await?;
    Ok(Json(GenerateResponse {
        url: state.fixture_url(),
        bugs: fixture.bugs,
        unknown: fixture.unknown,
        report,
    }))
}

async fn check(Json(request): Json<CheckRequest>) -> Result<Json<TestReport>, ApiError> {
    if request.source.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "source is empty"));
    }
    let mut config = EngineConfig::immediate().with_check_destinations(request.network);
    if !request.categories.is_empty() {
        config = config.with_categories(request.categories);
    }
    let engine = build_engine(config);
    let source = PageSource::from_input(request.source);
    let report = run_session(&StaticFactory::default(), &engine, &source).await?;
    Ok(Json(report))
}

#[cfg(feature = "llm")]
async fn suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    use pagecheck::llm::FixSuggester;
    use pagecheck::FailureDigest;

    let Some(config) = state.llm.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "suggestions need an API key",
        ));
    };
    let category: Category = request
        .category
        .parse()
        .map_err(|e: String| ApiError::new(StatusCode::BAD_REQUEST, e))?;
    let digest = FailureDigest {
        category,
        item: request.item,
        test: request.test,
        reason: request.reason.unwrap_or_default(),
        code_snippet: request.code_snippet.unwrap_or_default(),
    };
    match FixSuggester::from_config(config).suggest(&digest).await {
        Ok(text) => Ok(Json(serde_json::json!({ "suggestion": text }))),
        Err(err) => {
            tracing::error!(error = %err, "suggestion failed");
            Err(ApiError::new(StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}

#[cfg(not(feature = "llm"))]
async fn suggest(Json(_request): Json<SuggestRequest>) -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "suggestions not enabled. Rebuild with --features llm",
    )
}

/// Application router
pub fn router(state: AppState) -> Router {
    let generated = ServeDir::new(state.dir.as_path());
    Router::new()
        .route("/health", get(health))
        .route("/bugs", get(bugs))
        .route("/generate", post(generate))
        .route("/check", post(check))
        .route("/suggest", post(suggest))
        .nest_service("/generated_html", generated)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until interrupted
pub async fn serve(args: &ServeArgs) -> CliResult<()> {
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    let addr = listener.local_addr()?;
    let state = AppState::new(args.dir.clone(), format!("http://{addr}"));
    #[cfg(feature = "llm")]
    let state = state.with_llm(
        pagecheck::llm::LlmConfig::default()
            .with_base_url(args.llm_base_url.clone())
            .with_model(args.model.clone())
            .with_api_key(args.api_key.clone()),
    );

    println!("Pagecheck server listening on http://{addr}");
    println!("  Fixtures:    {}", args.dir.display());
    #[cfg(feature = "llm")]
    println!(
        "  Suggestions: {}",
        if state.llm.is_some() { "enabled" } else { "disabled (no API key)" }
    );
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn app(dir: &std::path::Path) -> Router {
        router(AppState::new(dir, "http://127.0.0.1:8000/"))
    }

    mod route_tests {
        use super::*;

        #[tokio::test]
        async fn test_health() {
            let dir = tempfile::tempdir().unwrap();
            let request = Request::get("/health").body(Body::empty()).unwrap();
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "ok");
        }

        #[tokio::test]
        async fn test_bugs_lists_catalog() {
            let dir = tempfile::tempdir().unwrap();
            let request = Request::get("/bugs").body(Body::empty()).unwrap();
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body.as_array().unwrap().len(), CATALOG.len());
            assert_eq!(body[0]["key"], "broken_link");
        }

        #[tokio::test]
        async fn test_generate_writes_and_checks() {
            let dir = tempfile::tempdir().unwrap();
            let request = post_json(
                "/generate",
                serde_json::json!({ "bugs": ["empty_button", "nope"] }),
            );
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body["url"],
                "http://127.0.0.1:8000/generated_html/buggy_website.html"
            );
            assert_eq!(body["unknown"][0], "nope");
            let report: TestReport = serde_json::from_value(body["report"].clone()).unwrap();
            assert_eq!(report.buttons.len(), 1);
            let written = std::fs::read_to_string(dir.path().join(FIXTURE_FILE)).unwrap();
            assert_eq!(written, "<button></button>");
        }

        #[tokio::test]
        async fn test_generate_rejects_unknown_only() {
            let dir = tempfile::tempdir().unwrap();
            let request = post_json("/generate", serde_json::json!({ "bugs": ["nope"] }));
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("no known"));
        }

        #[tokio::test]
        async fn test_generated_page_is_served() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(FIXTURE_FILE), "<a>x</a>").unwrap();
            let request = Request::get("/generated_html/buggy_website.html")
                .body(Body::empty())
                .unwrap();
            let response = app(dir.path()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], b"<a>x</a>");
        }

        #[tokio::test]
        async fn test_check_inline() {
            let dir = tempfile::tempdir().unwrap();
            let request = post_json(
                "/check",
                serde_json::json!({ "source": "<a>Link Without Href</a>", "categories": ["links"] }),
            );
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["categories"], serde_json::json!(["links"]));
            assert_eq!(body["links"][0]["outcome"]["verdict"], "FAILED");
        }

        #[tokio::test]
        async fn test_check_empty_source() {
            let dir = tempfile::tempdir().unwrap();
            let request = post_json("/check", serde_json::json!({ "source": "  " }));
            let (status, _) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_suggest_without_key() {
            let dir = tempfile::tempdir().unwrap();
            let request = post_json(
                "/suggest",
                serde_json::json!({
                    "category": "button",
                    "item": "Button 1",
                    "test": "Label Test",
                    "code_snippet": "<button></button>"
                }),
            );
            let (status, body) = call(app(dir.path()), request).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert!(body["error"].is_string());
        }

        #[cfg(feature = "llm")]
        #[tokio::test]
        async fn test_suggest_with_model() {
            let model = Router::new().route(
                "/v1/chat/completions",
                post(|Json(body): Json<serde_json::Value>| async move {
                    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
                    let content = if prompt.contains("Failed Test: Label Test") {
                        "Suggested Fix:\n\nGive the button a text label."
                    } else {
                        "unexpected prompt"
                    };
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": content}}]
                    }))
                }),
            );
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, model).await.unwrap();
            });

            let dir = tempfile::tempdir().unwrap();
            let state = AppState::new(dir.path(), "http://127.0.0.1:8000").with_llm(
                pagecheck::llm::LlmConfig::default()
                    .with_base_url(format!("http://{addr}"))
                    .with_api_key(Some("sk-test".into())),
            );
            let request = post_json(
                "/suggest",
                serde_json::json!({
                    "category": "buttons",
                    "item": "Button 1",
                    "test": "Label Test",
                    "code_snippet": "<button></button>"
                }),
            );
            let (status, body) = call(router(state), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["suggestion"], "Suggested Fix:\n\nGive the button a text label.");
        }
    }
}

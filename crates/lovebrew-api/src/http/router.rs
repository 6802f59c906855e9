//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
};
use lovebrew_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::compile::compile;
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::convert::convert;
use crate::http::health::{health, info, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the build service.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Assemble routes, middleware, and shared state.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let state = Arc::new(state);
        let telemetry = state.telemetry.clone();
        let max_upload_bytes = state.config.max_upload_bytes;
        let permissive_cors = state.config.mode.permissive_cors();

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    mode = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(lovebrew_telemetry::propagate_request_id_layer())
            .layer(lovebrew_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(DefaultBodyLimit::max(max_upload_bytes))
            .route_layer(layered);
        let router = if permissive_cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        };

        Self {
            router: router.with_state(state),
        }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/compile", post(compile))
            .route("/convert", post(convert))
            .route("/info", get(info))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    /// Serve the API on `addr` until the process ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve the API on `addr` until `shutdown` resolves, letting in-flight
    /// requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(addr = %addr, "Starting API");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// The assembled router, for in-process callers.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header::CONTENT_TYPE};
    use base64::{Engine as _, engine::general_purpose};
    use lovebrew_bundler::fake::FakeToolchain;
    use lovebrew_bundler::{CommandRunner, ToolReport};
    use lovebrew_config::ServerConfig;
    use lovebrew_telemetry::Metrics;
    use lovebrew_test_support::fixtures::{jpeg_bytes, png_bytes};
    use lovebrew_test_support::multipart::MultipartBody;
    use lovebrew_test_support::resources::ResourceTree;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        tree: ResourceTree,
    }

    fn harness(toolchain: FakeToolchain, tools: ToolReport) -> Result<Harness> {
        let tree = ResourceTree::complete()?;
        let config = ServerConfig {
            resources_dir: tree.root().to_path_buf(),
            ..ServerConfig::default()
        };
        let runner = CommandRunner::with_runner(Arc::new(toolchain));
        let state = ApiState::new(config, runner, Metrics::new()?, tools);
        Ok(Harness {
            router: ApiServer::new(state).into_router(),
            tree,
        })
    }

    async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    fn multipart_post(uri: &str, body: MultipartBody) -> Result<Request<Body>> {
        Ok(Request::post(uri)
            .header(CONTENT_TYPE, body.content_type())
            .body(Body::from(body.finish()))?)
    }

    fn decoded(body: &Value, key: &str) -> Result<Vec<u8>> {
        let encoded = body[key]
            .as_str()
            .with_context(|| format!("missing binary for {key}"))?;
        Ok(general_purpose::STANDARD.decode(encoded)?)
    }

    #[tokio::test]
    async fn compile_builds_every_requested_target() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let query = "title=Demo&author=Me&description=Tiny&version=2.0.1&targets=ctr,hac,cafe";
        let request = Request::post(format!("/compile?{query}")).body(Body::empty())?;
        let (status, body) = send(&harness.router, request).await?;

        assert_eq!(status, StatusCode::OK);
        let ctr = decoded(&body, "ctr")?;
        assert!(ctr.starts_with(b"3DSX"));
        let ctr = String::from_utf8_lossy(&ctr);
        assert!(ctr.contains("Demo\0Tiny • 2.0.1\0Me"));
        let hac = decoded(&body, "hac")?;
        assert_eq!(&hac[0x10..0x14], b"NRO0");
        assert!(String::from_utf8_lossy(&hac).contains("Demo\0Me\02.0.1"));
        let cafe = decoded(&body, "cafe")?;
        assert!(cafe.starts_with(b"WUHB"));
        assert!(String::from_utf8_lossy(&cafe).contains("Demo\0Demo\0Me"));
        assert_eq!(body["errors"], serde_json::json!({}));
        assert!(
            body["log"]
                .as_str()
                .is_some_and(|log| log.contains("[INFO] handling /compile"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn compile_reports_partial_success() -> Result<()> {
        let harness = harness(FakeToolchain::new().failing("nacptool"), ToolReport::default())?;
        let request = Request::post("/compile?targets=ctr,hac").body(Body::empty())?;
        let (status, body) = send(&harness.router, request).await?;

        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert!(decoded(&body, "ctr")?.starts_with(b"3DSX"));
        assert!(body.get("hac").is_none());
        assert_eq!(body["errors"]["hac"]["code"], "COMMAND_FAILED");
        assert!(body["log"].as_str().is_some_and(|log| log.contains("[ERROR]")));
        Ok(())
    }

    #[tokio::test]
    async fn compile_fails_when_every_target_fails() -> Result<()> {
        let harness = harness(FakeToolchain::new().missing("elf2rpl"), ToolReport::default())?;
        let request = Request::post("/compile?targets=cafe").body(Body::empty())?;
        let (status, body) = send(&harness.router, request).await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["cafe"]["code"], "COMMAND_EXE_NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn compile_rejects_unknown_targets() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let request = Request::post("/compile?targets=ctr,bogus").body(Body::empty())?;
        let (status, body) = send(&harness.router, request).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TARGET_NOT_VALID");
        assert!(body["detail"].as_str().is_some_and(|d| d.contains("bogus")));
        Ok(())
    }

    #[tokio::test]
    async fn compile_rejects_unknown_query_keys() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let request = Request::post("/compile?targets=ctr&colour=red").body(Body::empty())?;
        let (status, body) = send(&harness.router, request).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUERY");
        Ok(())
    }

    #[tokio::test]
    async fn compile_uses_uploaded_icons() -> Result<()> {
        let toolchain = FakeToolchain::new();
        let harness = harness(toolchain.clone(), ToolReport::default())?;
        let body = MultipartBody::new().file(
            "icon-hac",
            "icon.jpg",
            "image/jpeg",
            &jpeg_bytes(256, 256),
        );
        let (status, _) =
            send(&harness.router, multipart_post("/compile?targets=hac", body)?).await?;

        assert_eq!(status, StatusCode::OK);
        let elf2nro = toolchain
            .invocations()
            .into_iter()
            .find(|invocation| invocation.program == "elf2nro")
            .context("elf2nro was not invoked")?;
        let icon = elf2nro.flag("--icon").context("missing --icon")?;
        assert!(!icon.starts_with(harness.tree.root().to_string_lossy().as_ref()));
        Ok(())
    }

    #[tokio::test]
    async fn compile_rejects_icons_of_the_wrong_size() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file(
            "icon-ctr",
            "icon.png",
            "image/png",
            &png_bytes(64, 64),
        );
        let (status, body) =
            send(&harness.router, multipart_post("/compile?targets=ctr", body)?).await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_ICON_SIZE");
        Ok(())
    }

    #[tokio::test]
    async fn compile_rejects_unexpected_fields() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file("readme", "README.md", "text/plain", b"hello");
        let (status, body) =
            send(&harness.router, multipart_post("/compile?targets=ctr", body)?).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNEXPECTED_FIELD");
        Ok(())
    }

    #[tokio::test]
    async fn compile_appends_the_game_archive() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file(
            "game",
            "game.love",
            "application/zip",
            b"PK\x03\x04game",
        );
        let (status, body) =
            send(&harness.router, multipart_post("/compile?targets=ctr", body)?).await?;

        assert_eq!(status, StatusCode::OK);
        assert!(decoded(&body, "ctr")?.ends_with(b"PK\x03\x04game"));
        Ok(())
    }

    #[tokio::test]
    async fn convert_returns_packed_textures() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file(
            "sprites/hero.png",
            "hero.png",
            "image/png",
            &png_bytes(32, 32),
        );
        let (status, body) = send(&harness.router, multipart_post("/convert", body)?).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["filepath"], "sprites/hero.t3x");
        let data = body[0]["data"].as_str().context("missing data")?;
        assert!(general_purpose::STANDARD.decode(data)?.starts_with(b"T3X\0"));
        Ok(())
    }

    #[tokio::test]
    async fn convert_requires_uploads() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let (status, body) =
            send(&harness.router, Request::post("/convert").body(Body::empty())?).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "NO_FILE_UPLOADED");
        Ok(())
    }

    #[tokio::test]
    async fn convert_rejects_unsupported_files() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file("notes.txt", "notes.txt", "text/plain", b"just text");
        let (status, body) = send(&harness.router, multipart_post("/convert", body)?).await?;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], "INVALID_FILE_TYPE");
        Ok(())
    }

    #[tokio::test]
    async fn convert_rejects_oversized_textures() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let body = MultipartBody::new().file(
            "big.png",
            "big.png",
            "image/png",
            &png_bytes(1025, 8),
        );
        let (status, body) = send(&harness.router, multipart_post("/convert", body)?).await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "WIDTH_TOO_LARGE");
        Ok(())
    }

    #[tokio::test]
    async fn info_reports_version_and_uptime() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let (status, body) =
            send(&harness.router, Request::get("/info").body(Body::empty())?).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["uptime"], "00:00:00");
        assert!(body["serverTime"].is_string());
        assert!(body["deployedTime"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_missing_tools() -> Result<()> {
        let tools = ToolReport {
            found: vec!["tex3ds"],
            missing: vec!["wut-tools/wuhbtool".to_string()],
        };
        let harness = harness(FakeToolchain::new(), tools)?;
        let (status, body) =
            send(&harness.router, Request::get("/health").body(Body::empty())?).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["tools"]["missing"][0], "wut-tools/wuhbtool");
        assert_eq!(body["missing_resources"], serde_json::json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn responses_carry_a_request_id_and_are_counted() -> Result<()> {
        let harness = harness(FakeToolchain::new(), ToolReport::default())?;
        let response = harness
            .router
            .clone()
            .oneshot(
                Request::get("/info")
                    .header(HEADER_REQUEST_ID, "fixed-id")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(
            response
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok()),
            Some("fixed-id")
        );

        let response = harness
            .router
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await?.to_vec())?;
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("/info"));
        Ok(())
    }
}

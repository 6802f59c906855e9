//! Per-request metrics and context propagation.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use lovebrew_bundler::RequestLog;
use lovebrew_telemetry::{Metrics, current_request_id, current_route, with_request_context};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::http::constants::HEADER_REQUEST_ID;

/// Counts requests per matched route and status, and scopes the request id
/// and route into the task-local context for the handler.
#[derive(Clone)]
pub(crate) struct HttpMetricsLayer {
    telemetry: Metrics,
}

impl HttpMetricsLayer {
    pub(crate) const fn new(telemetry: Metrics) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct HttpMetricsService<S> {
    inner: S,
    telemetry: Metrics,
}

/// Matched route template, falling back to the raw path for unmatched requests.
fn route_of<B>(req: &Request<B>) -> String {
    req.extensions().get::<MatchedPath>().map_or_else(
        || req.uri().path().to_string(),
        |matched| matched.as_str().to_string(),
    )
}

fn request_id_of<B>(req: &Request<B>) -> String {
    req.headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Build log keyed by the id of the request being served.
///
/// Outside a request scope a fresh id is generated.
pub(crate) fn current_request_log() -> RequestLog {
    let log = RequestLog::new(
        current_request_id()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    );
    if let Some(route) = current_route() {
        log.info(format!("handling {route}"));
    }
    log
}

impl<S, B> Service<Request<B>> for HttpMetricsService<S>
where
    S: Service<Request<B>, Response = axum::response::Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let route = route_of(&req);
        let request_id = request_id_of(&req);
        let telemetry = self.telemetry.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            with_request_context(request_id, route.clone(), async move {
                let response = fut.await?;
                telemetry.inc_http_request(&route, response.status().as_u16());
                Ok(response)
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_log_is_keyed_by_the_scoped_request() {
        let log = with_request_context("req-7", "/convert", async { current_request_log() }).await;
        assert_eq!(log.request_id(), "req-7");
        assert!(log.contents().ends_with("[INFO] handling /convert"));

        let detached = current_request_log();
        assert!(!detached.request_id().is_empty());
        assert!(detached.is_empty());
    }
}

//! Per-route request counting.
//!
//! Every request runs inside a [`with_request_context`] scope so handlers and
//! error rendering can name it, and is counted in `http_requests_total` once
//! the inner service produces a response.

use std::task::{Context, Poll};

use antmon_telemetry::{Metrics, with_request_context};
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::http::constants::HEADER_REQUEST_ID;

#[derive(Clone)]
pub(crate) struct RequestMetricsLayer {
    telemetry: Metrics,
}

impl RequestMetricsLayer {
    pub(crate) const fn new(telemetry: Metrics) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for RequestMetricsLayer {
    type Service = RequestMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestMetrics {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RequestMetrics<S> {
    inner: S,
    telemetry: Metrics,
}

/// Route template when axum matched one, else the literal path.
fn route_label<B>(request: &Request<B>) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |matched| matched.as_str().to_string(),
    )
}

fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default()
}

impl<S, B> Service<Request<B>> for RequestMetrics<S>
where
    S: Service<Request<B>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let route = route_label(&request);
        let id = request_id(&request);
        let telemetry = self.telemetry.clone();
        let pending = self.inner.call(request);

        Box::pin(with_request_context(id, route.clone(), async move {
            let response = pending.await?;
            telemetry.inc_http_request(&route, response.status().as_u16());
            Ok(response)
        }))
    }
}

//! HTTP transport: routes, request id and locale extraction, request tracing.
//!
//! - `GET /v1/texts/key/:key`: one text in the `Accept-Language` language
//! - `GET /v1/texts/group/:group_id`: every translated text of a group
//! - `GET /health`: storage liveness
//! - `GET /metrics`: Prometheus request metrics

use crate::context::RequestContext;
use crate::error::{ErrorBody, ResolveError};
use crate::metrics::{Metrics, METRICS_PATH, UNMATCHED_ENDPOINT};
use crate::models::ResolvedTextMap;
use crate::repository::HealthCheck;
use crate::resolver::TextResolver;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, MatchedPath, Path, State};
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{debug, error, info, info_span, warn, Level, Span};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    resolver: TextResolver,
    health: Arc<dyn HealthCheck>,
    metrics: Metrics,
    /// Stops accepting connections; in-flight requests keep running
    shutdown: CancellationToken,
    /// Parent of every request's cancellation token
    requests: CancellationToken,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        resolver: TextResolver,
        health: Arc<dyn HealthCheck>,
        metrics: Metrics,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            resolver,
            health,
            metrics,
            shutdown: CancellationToken::new(),
            requests: CancellationToken::new(),
            request_timeout,
        }
    }

    /// Cancelling this token starts a graceful shutdown of `serve`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancelling this token cancels every in-flight request.
    pub fn request_cancel_token(&self) -> CancellationToken {
        self.requests.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/texts/key/:key", get(get_text_by_key))
        .route("/v1/texts/group/:group_id", get(get_text_group))
        .route("/health", get(check_health))
        .route(METRICS_PATH, get(export_metrics))
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Serve until the state's shutdown token is cancelled, then let in-flight
/// requests finish. Requests still running `drain_timeout` after the shutdown
/// signal are cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let shutdown = state.shutdown_token();
    let requests = state.request_cancel_token();
    info!("Listening on {}", listener.local_addr()?);

    let drain = tokio::spawn({
        let shutdown = shutdown.clone();
        let requests = requests.clone();
        async move {
            shutdown.cancelled().await;
            tokio::time::sleep(drain_timeout).await;
            warn!("Drain period of {:?} elapsed, cancelling in-flight requests", drain_timeout);
            requests.cancel();
        }
    });

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    drain.abort();
    requests.cancel();
    served?;

    Ok(())
}

fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id
    )
}

async fn get_text_by_key(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<ResolvedTextMap>, ResolveError> {
    debug!(%ctx, key = %key, "get_text_by_key");
    let texts = state.resolver.resolve_by_key(&ctx, &key).await?;
    Ok(Json(texts))
}

async fn get_text_group(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(group_id): Path<String>,
) -> Result<Json<ResolvedTextMap>, ResolveError> {
    debug!(%ctx, group_id = %group_id, "get_text_group");
    let texts = state.resolver.resolve_by_group(&ctx, &group_id).await?;
    Ok(Json(texts))
}

/// Count and time every request except metric scrapes.
async fn track_metrics(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());
    if endpoint == METRICS_PATH {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let start = Instant::now();
    let response = next.run(request).await;

    state.metrics.record_request(
        method.as_str(),
        &endpoint,
        response.status().as_u16(),
        start.elapsed(),
    );
    response
}

async fn export_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok((content_type, body)) => ([(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, Json(ErrorBody::new(status, "internal server error"))).into_response()
        }
    }
}

async fn check_health(State(state): State<AppState>) -> Response {
    match state.health.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "OK" }))).into_response(),
        Err(e) => {
            error!(error = %e, "Health check failed");
            let status = StatusCode::SERVICE_UNAVAILABLE;
            (status, Json(ErrorBody::new(status, "service unavailable"))).into_response()
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let language = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(primary_language)
            .unwrap_or_default();

        let ctx = RequestContext::new(request_id, language)
            .with_cancellation(state.requests.child_token());

        Ok(match state.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        })
    }
}

/// First tag of an `Accept-Language` value, without its quality parameter.
/// The tag is not case-folded.
fn primary_language(header: &str) -> String {
    header
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

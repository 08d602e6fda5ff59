//! # HTTP surface
//!
//! `POST /api/v1/stream-posts` streams frames as Server-Sent Events and falls back to the
//! batch document when the client does not accept `text/event-stream`.
//! `POST /api/v1/generate-posts` always answers with the batch document.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use context_store::ContextStore;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{Error, ErrorKind},
    llm::{AudienceAnalyzer, EmotionAnalyzer, PostGenerator, StyleMatcher, TopicExtractor},
    pipeline::ContentPipeline,
    request::GenerateRequest,
    transport::{BatchResponse, ChannelSink, Frame},
};

/// Frames buffered between the run and a slow client before the run is held back
const FRAME_BUFFER: usize = 32;

pub struct AppState<X, A, G, C, U, M>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    pub pipeline: Arc<ContentPipeline<X, A, G, C, U, M>>,
    /// Model name reported by the health endpoint
    pub model: String,
}

impl<X, A, G, C, U, M> AppState<X, A, G, C, U, M>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    pub fn new(pipeline: ContentPipeline<X, A, G, C, U, M>, model: impl Into<String>) -> Self {
        AppState {
            pipeline: Arc::new(pipeline),
            model: model.into(),
        }
    }
}

impl<X, A, G, C, U, M> Clone for AppState<X, A, G, C, U, M>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        AppState {
            pipeline: Arc::clone(&self.pipeline),
            model: self.model.clone(),
        }
    }
}

pub fn build_router<X, A, G, C, U, M>(state: AppState<X, A, G, C, U, M>) -> Router
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/stream-posts", post(stream_posts::<X, A, G, C, U, M>))
        .route("/api/v1/generate-posts", post(generate_posts::<X, A, G, C, U, M>))
        .route("/api/v1/health", get(health_check::<X, A, G, C, U, M>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `listener` until the process is stopped
pub async fn serve<X, A, G, C, U, M>(
    listener: TcpListener,
    state: AppState<X, A, G, C, U, M>,
) -> anyhow::Result<()>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    tracing::info!(address = ?listener.local_addr().ok(), "Listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn health_check<X, A, G, C, U, M>(
    State(state): State<AppState<X, A, G, C, U, M>>,
) -> Json<Value>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "model": state.model,
    }))
}

async fn generate_posts<X, A, G, C, U, M>(
    State(state): State<AppState<X, A, G, C, U, M>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    let request = match accept_request(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    batch_response(state.pipeline.collect(request).await)
}

async fn stream_posts<X, A, G, C, U, M>(
    State(state): State<AppState<X, A, G, C, U, M>>,
    headers: HeaderMap,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    let request = match accept_request(body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if !accepts_event_stream(&headers) {
        tracing::info!("Client does not accept event streams, answering with batch response");
        return batch_response(state.pipeline.collect(request).await);
    }

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let token = CancellationToken::new();
    let pipeline = Arc::clone(&state.pipeline);
    let run_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = pipeline
            .run_with_cancellation(request, ChannelSink::new(tx), run_token)
            .await
        {
            tracing::info!(error = %e, "Streaming run stopped early");
        }
    });

    // the guard lives as long as the response body; a client that goes away drops the
    // body and with it cancels the run
    let guard = token.drop_guard();
    let events = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let frame = rx.recv().await?;
        Some((frame, (rx, guard)))
    })
    .map(|frame: Frame| frame_event(&frame));

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// One SSE event per frame, named after the frame type
fn frame_event(frame: &Frame) -> Result<Event, axum::Error> {
    Event::default()
        .event(frame.event_name())
        .json_data(frame)
        .inspect_err(|e| tracing::error!(error = %e, "Failed to encode frame"))
}

/// Parses and validates the body up front so malformed requests get a 400 before any
/// stream is opened
fn accept_request(
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<GenerateRequest, Response> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected malformed request body");
        rejected(&Error::Validation(rejection.body_text()))
    })?;

    if let Err(e) = request.clone().validate() {
        tracing::warn!(error = %e, "Rejected invalid request");
        return Err(rejected(&e));
    }
    Ok(request)
}

fn rejected(error: &Error) -> Response {
    batch_response(BatchResponse::from_frames([Frame::fatal(error)]))
}

fn batch_response(response: BatchResponse) -> Response {
    let status = match (response.success, response.error_kind) {
        (true, _) => StatusCode::OK,
        (false, Some(ErrorKind::Validation)) => StatusCode::BAD_REQUEST,
        (false, _) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(response)).into_response()
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/event-stream"))
}

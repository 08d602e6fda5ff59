use futures::StreamExt;
use reqwest::{header, Client, Response};

use crate::{
    error::{Error, Result},
    request::GenerateRequest,
    transport::{BatchResponse, Frame, FrameDecoder},
};

/// HTTP client for a running post-pulse server.
///
/// Prefers the streaming endpoint and falls back to the batch endpoint when a stream
/// cannot be opened.
#[derive(Debug, Clone)]
pub struct PostPulseClient {
    client: Client,
    base_url: String,
}

impl PostPulseClient {
    const STREAM_PATH: &str = "/api/v1/stream-posts";
    const BATCH_PATH: &str = "/api/v1/generate-posts";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Generates posts for `request`, handing every streamed frame to `on_frame` as it
    /// arrives. `on_frame` is not called when the batch fallback answers.
    #[tracing::instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn generate<F>(&self, request: &GenerateRequest, on_frame: F) -> Result<BatchResponse>
    where
        F: FnMut(&Frame),
    {
        match self.open_stream(request).await {
            Ok(StreamOpen::Events(response)) => Ok(read_frames(response, on_frame).await),
            Ok(StreamOpen::Batch(response)) => read_batch(response).await,
            Err(e) => {
                tracing::warn!(error = %e, "Could not open event stream, falling back to batch");
                self.generate_batch(request).await
            }
        }
    }

    /// Calls the batch endpoint directly
    pub async fn generate_batch(&self, request: &GenerateRequest) -> Result<BatchResponse> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, Self::BATCH_PATH))
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)
            .inspect_err(|e| tracing::error!(error = %e, "Batch request failed"))?;

        read_batch(response).await
    }

    async fn open_stream(&self, request: &GenerateRequest) -> Result<StreamOpen> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, Self::STREAM_PATH))
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if response.status().is_success() && content_type.starts_with("text/event-stream") {
            Ok(StreamOpen::Events(response))
        } else if content_type.starts_with("application/json") {
            // the server answered with the batch document itself, e.g. a rejected request
            Ok(StreamOpen::Batch(response))
        } else {
            Err(Error::Transport(format!(
                "stream endpoint answered {} with content type '{content_type}'",
                response.status()
            )))
        }
    }
}

enum StreamOpen {
    Events(Response),
    Batch(Response),
}

/// Decodes frames until the terminal frame or the end of the body. A body that ends
/// early yields a response marked as a transport failure.
async fn read_frames<F: FnMut(&Frame)>(response: Response, mut on_frame: F) -> BatchResponse {
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    let mut body = response.bytes_stream();

    'read: while let Some(chunk) = body.next().await {
        let decoded = chunk
            .map_err(transport_error)
            .and_then(|bytes| decoder.push(&bytes));
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::error!(error = %e, "Event stream broke off");
                break;
            }
        };
        for frame in decoded {
            on_frame(&frame);
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                break 'read;
            }
        }
    }

    if !frames.last().is_some_and(Frame::is_terminal) {
        match decoder.finish() {
            Ok(Some(frame)) => {
                on_frame(&frame);
                frames.push(frame);
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Discarding partial trailing frame"),
        }
    }

    BatchResponse::from_frames(frames)
}

async fn read_batch(response: Response) -> Result<BatchResponse> {
    let status = response.status();
    response
        .json::<BatchResponse>()
        .await
        .map_err(|e| Error::Transport(format!("invalid batch response ({status}): {e}")))
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

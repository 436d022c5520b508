//! `POST /chat/completions` handler.

use std::sync::Arc;

use bytes::Bytes;
use geminillm::apis::openai::ChatCompletionsRequest;
use http_body_util::combinators::BoxBody;
use http_body_util::StreamBody;
use hyper::body::Frame;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, warn};

use super::{bearer_token, error_response, full, status_for};
use crate::server::AppState;

const DONE_FRAME: &str = "data: [DONE]\n\n";

pub async fn chat_completions(
    headers: &HeaderMap,
    body: Bytes,
    state: Arc<AppState>,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let api_key = bearer_token(headers);

    let request: ChatCompletionsRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "failed to decode chat completions request");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to decode request body: {err}"),
            );
        }
    };

    if request.stream.unwrap_or_default() {
        stream_chat(state, &api_key, &request, &body).await
    } else {
        single_chat(state, &api_key, &request, &body).await
    }
}

async fn single_chat(
    state: Arc<AppState>,
    api_key: &str,
    request: &ChatCompletionsRequest,
    raw_body: &Bytes,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let completion = match state.adapter.chat_completion(api_key, request).await {
        Ok(completion) => completion,
        Err(err) => {
            error!(%err, "chat completion failed");
            record_failure(&state, raw_body, &err);
            return error_response(status_for(&err), &err.to_string());
        }
    };

    let payload = match serde_json::to_string(&completion) {
        Ok(payload) => payload,
        Err(err) => {
            error!(%err, "failed to encode completion response");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding failure");
        }
    };

    let mut response = Response::new(full(payload));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

async fn stream_chat(
    state: Arc<AppState>,
    api_key: &str,
    request: &ChatCompletionsRequest,
    raw_body: &Bytes,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let mut chunks = match state.adapter.chat_completion_stream(api_key, request).await {
        Ok(chunks) => chunks,
        Err(err) => {
            error!(%err, "chat completion stream failed to start");
            record_failure(&state, raw_body, &err);
            return error_response(status_for(&err), &err.to_string());
        }
    };

    // Relay task: one SSE frame per chunk, in arrival order, then the
    // terminating sentinel once the adapter closes its channel.
    let (tx, rx) = mpsc::channel::<Bytes>(16);
    tokio::spawn(async move {
        while let Some(chunk) = chunks.recv().await {
            let payload = match serde_json::to_string(&chunk) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "failed to encode stream chunk");
                    break;
                }
            };
            if tx
                .send(Bytes::from(format!("data: {payload}\n\n")))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = tx.send(Bytes::from(DONE_FRAME)).await;
    });

    let stream = ReceiverStream::new(rx).map(|chunk| Ok::<_, hyper::Error>(Frame::data(chunk)));

    let mut response = Response::new(BoxBody::new(StreamBody::new(stream)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

fn record_failure(state: &AppState, raw_body: &Bytes, err: &crate::adapter::AdapterError) {
    if let Err(dump_err) = state.dump.record(raw_body, err.to_string().as_bytes()) {
        warn!(%dump_err, "failed to persist failing request");
    }
}

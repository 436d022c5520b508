//! HTTP handlers and response helpers.

pub mod chat_completions;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, AUTHORIZATION};
use hyper::{Response, StatusCode};

use crate::adapter::AdapterError;

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn error_response(
    status: StatusCode,
    message: &str,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let mut response = Response::new(full(message.to_string()));
    *response.status_mut() = status;
    response
}

/// Maps the adapter error taxonomy onto response status codes: requests the
/// translation layer cannot represent and provider rejections are
/// unprocessable; internal-consistency defects are server errors.
pub fn status_for(err: &AdapterError) -> StatusCode {
    match err {
        AdapterError::InvalidParams(_) | AdapterError::Provider(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AdapterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Pulls the bearer credential out of the Authorization header. An absent or
/// empty credential is forwarded as-is; the provider rejects it.
pub fn bearer_token(headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start_matches("Bearer ").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-123"));
        assert_eq!(bearer_token(&headers), "sk-123");
    }

    #[test]
    fn missing_authorization_is_empty() {
        assert_eq!(bearer_token(&HeaderMap::new()), "");
    }

    #[test]
    fn error_response_sets_status() {
        let response = error_response(StatusCode::BAD_REQUEST, "bad");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

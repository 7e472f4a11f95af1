//! Common types used throughout the hosted pipeline.
//!
//! Requests and responses carry fully buffered bodies. The listener host
//! collects incoming bodies before they enter the pipeline, so every stage
//! sees the same shape regardless of how the request arrived.

use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building framework responses.
pub trait ResponseExt {
    /// Creates an empty response with the given status code.
    fn empty(status: StatusCode) -> Response;

    /// Creates a JSON response from an already serialized value.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;

    /// Creates a JSON `{"message": ...}` response.
    fn message(status: StatusCode, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(value.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json; charset=utf-8"),
        );
        response
    }

    fn message(status: StatusCode, message: &str) -> Response {
        Self::json(status, &serde_json::json!({ "message": message }))
    }
}

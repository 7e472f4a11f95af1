//! Controller actions.
//!
//! An action is an async function from [`ActionContext`] to
//! `Result<ActionResult, HandlerError>`. Actions are registered on an
//! [`HttpConfiguration`](crate::HttpConfiguration) against a route template.
//!
//! # Example
//!
//! ```rust,ignore
//! use webprobe_host::{ActionContext, ActionResult, HttpConfiguration};
//! use http::Method;
//!
//! let config = HttpConfiguration::new().route(
//!     Method::POST,
//!     "/api/NoAttributes/WithParameter/{id}",
//!     |ctx: ActionContext| async move {
//!         let id: i32 = ctx.param("id")?;
//!         ActionResult::ok(&id)
//!     },
//! );
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::middleware::BoxFuture;
use crate::types::{Response, ResponseExt};

/// A type-erased action.
pub type ErasedAction =
    Arc<dyn Fn(ActionContext) -> BoxFuture<'static, Result<ActionResult, HandlerError>> + Send + Sync>;

/// Wraps an async function into an [`ErasedAction`].
pub fn erase<F, Fut>(action: F) -> ErasedAction
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionResult, HandlerError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(action(ctx)))
}

/// Errors returned by actions.
///
/// Each variant maps onto a response status; see
/// [`HandlerError::status_code`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was malformed (bad parameter, bad body).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value could not be serialized into the response.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other fault raised by the action.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Creates an internal error from any displayable value.
    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into a response.
    ///
    /// The error text is only exposed when `include_detail` is set.
    pub fn into_response(self, include_detail: bool) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::BAD_REQUEST => "The request is invalid.",
            StatusCode::NOT_FOUND => "The requested resource was not found.",
            _ => "An error has occurred.",
        };
        error_response(status, message, include_detail.then(|| self.to_string()))
    }
}

/// Builds the standard error body, optionally carrying a detail string.
pub(crate) fn error_response(status: StatusCode, message: &str, detail: Option<String>) -> Response {
    let body = match detail {
        Some(detail) => serde_json::json!({ "message": message, "detail": detail }),
        None => serde_json::json!({ "message": message }),
    };
    Response::json(status, &body)
}

/// What an action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// A JSON body with a status code.
    Json {
        /// Response status.
        status: StatusCode,
        /// Serialized body.
        value: serde_json::Value,
    },
    /// A status code without a body.
    Status(StatusCode),
    /// A `302 Found` pointing at the given location.
    Redirect(String),
    /// Raw content with an explicit media type.
    Content {
        /// Response status.
        status: StatusCode,
        /// Value of the `Content-Type` header.
        content_type: String,
        /// Body bytes.
        body: Bytes,
    },
}

impl ActionResult {
    /// `200 OK` with `value` serialized as JSON.
    pub fn ok<T: Serialize + ?Sized>(value: &T) -> Result<Self, HandlerError> {
        Self::json(StatusCode::OK, value)
    }

    /// `status` with `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, HandlerError> {
        Ok(Self::Json {
            status,
            value: serde_json::to_value(value)?,
        })
    }

    /// A status code without a body.
    pub fn status(status: StatusCode) -> Self {
        Self::Status(status)
    }

    /// A `302 Found` redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect(location.into())
    }

    /// Raw content.
    pub fn content(status: StatusCode, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::Content {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Converts the result into a response.
    pub fn into_response(self) -> Response {
        match self {
            Self::Json { status, value } => Response::json(status, &value),
            Self::Status(status) => Response::empty(status),
            Self::Redirect(location) => match HeaderValue::try_from(location.as_str()) {
                Ok(value) => {
                    let mut response = Response::empty(StatusCode::FOUND);
                    response.headers_mut().insert(header::LOCATION, value);
                    response
                }
                Err(_) => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error has occurred.",
                    Some(format!("Invalid redirect location '{location}'")),
                ),
            },
            Self::Content {
                status,
                content_type,
                body,
            } => {
                let mut response = http::Response::new(Full::new(body));
                *response.status_mut() = status;
                if let Ok(value) = HeaderValue::try_from(content_type) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                response
            }
        }
    }
}

/// Everything an action can see about the request.
#[derive(Debug, Clone)]
pub struct ActionContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
}

impl ActionContext {
    /// Creates a context from request parts and route parameters.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        params: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            params,
            body,
        }
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Route parameters captured from the template.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Parses a route parameter.
    pub fn param<T: FromStr>(&self, name: &str) -> Result<T, HandlerError> {
        let raw = self
            .params
            .get(name)
            .ok_or_else(|| HandlerError::BadRequest(format!("Missing route parameter '{name}'")))?;
        raw.parse().map_err(|_| {
            HandlerError::BadRequest(format!("The value '{raw}' is not valid for '{name}'"))
        })
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HandlerError::BadRequest(format!("Invalid request body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn context(params: &[(&str, &str)], body: &str) -> ActionContext {
        ActionContext::new(
            Method::POST,
            Uri::from_static("/values/5"),
            HeaderMap::new(),
            params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            Bytes::from(body.to_string()),
        )
    }

    async fn body_of(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_param_parses() {
        let ctx = context(&[("id", "5")], "");
        let id: i32 = ctx.param("id").unwrap();
        assert_eq!(id, 5);
    }

    #[test]
    fn test_param_rejects_bad_value() {
        let ctx = context(&[("id", "five")], "");
        let err = ctx.param::<i32>("id").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("five"));
    }

    #[test]
    fn test_missing_param() {
        let ctx = context(&[], "");
        assert!(matches!(
            ctx.param::<i32>("id"),
            Err(HandlerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_json_body() {
        let ctx = context(&[], r#"{"name":"Alice"}"#);
        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["name"], "Alice");

        let ctx = context(&[], "not json");
        assert!(ctx.json::<serde_json::Value>().is_err());
    }

    #[tokio::test]
    async fn test_ok_result() {
        let response = ActionResult::ok(&5).unwrap().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "5");
    }

    #[test]
    fn test_redirect_result() {
        let response = ActionResult::redirect("/elsewhere").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/elsewhere");
    }

    #[tokio::test]
    async fn test_content_result() {
        let response =
            ActionResult::content(StatusCode::ACCEPTED, "text/plain", "queued").into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body_of(response).await, "queued");
    }

    #[tokio::test]
    async fn test_error_detail_is_optional() {
        let hidden = HandlerError::internal("boom").into_response(false);
        assert_eq!(hidden.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(hidden).await, r#"{"message":"An error has occurred."}"#);

        let shown = HandlerError::internal("boom").into_response(true);
        let body: serde_json::Value = serde_json::from_str(&body_of(shown).await).unwrap();
        assert_eq!(body["detail"], "boom");
    }
}

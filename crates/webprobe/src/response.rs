//! Captured responses and fluent response assertions.
//!
//! Every assertion panics on mismatch with an expected-vs-actual message and
//! otherwise returns the builder, so a chain reads top to bottom:
//!
//! ```rust,ignore
//! WebProbe::server()
//!     .working()
//!     .with_request(TestRequest::post("/json"))
//!     .should_return_response()
//!     .with_status_code(StatusCode::OK)
//!     .and_also()
//!     .with_response_model(&ResponseModel { integer_value: 1, string_value: "Test".into() });
//! ```

use std::any::type_name;
use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode, Version};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::{ProbeError, ProbeResult};

/// A response collected from a test server.
#[derive(Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedResponse {
    /// Collects an HTTP response.
    pub async fn from_http<B>(response: http::Response<B>) -> ProbeResult<Self>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ProbeError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body,
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Canonical reason phrase of the status code.
    pub fn reason_phrase(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    /// Headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid UTF-8.
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the body is non-empty.
    pub fn has_content(&self) -> bool {
        !self.body.is_empty()
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> ProbeResult<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ProbeError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> ProbeResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ProbeError::BodyRead(format!("Invalid JSON: {e}")))
    }
}

impl fmt::Debug for CapturedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Assertions over a captured response.
#[derive(Debug, Clone)]
pub struct ResponseTestBuilder {
    response: CapturedResponse,
}

impl ResponseTestBuilder {
    pub(crate) fn new(response: CapturedResponse) -> Self {
        Self { response }
    }

    /// Asserts the exact status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code differs.
    pub fn with_status_code(self, expected: StatusCode) -> Self {
        let actual = self.response.status;
        assert!(
            actual == expected,
            "Expected response to have {expected} status code, but instead received {actual}."
        );
        self
    }

    /// Asserts a `2xx` status code.
    pub fn with_success_status_code(self) -> Self {
        let actual = self.response.status;
        assert!(
            actual.is_success(),
            "Expected response to have success status code, but instead received {actual}."
        );
        self
    }

    /// Asserts the HTTP version.
    pub fn with_version(self, expected: Version) -> Self {
        let actual = self.response.version;
        assert!(
            actual == expected,
            "Expected response to have {expected:?} version, but instead received {actual:?}."
        );
        self
    }

    /// Asserts the reason phrase.
    pub fn with_reason_phrase(self, expected: &str) -> Self {
        let actual = self.response.reason_phrase().unwrap_or("");
        assert!(
            actual == expected,
            "Expected response to have '{expected}' reason phrase, but instead received '{actual}'."
        );
        self
    }

    /// Asserts that a header is present.
    pub fn containing_header(self, name: &str) -> Self {
        assert!(
            self.response.headers.contains_key(name),
            "Expected response headers to contain {name}, but none was found."
        );
        self
    }

    /// Asserts that one of the header's values equals `expected`.
    pub fn containing_header_value(self, name: &str, expected: &str) -> Self {
        let values = self.header_values(name);
        assert!(
            values.iter().any(|v| *v == expected),
            "Expected response header {name} to have value '{expected}', but instead found {values:?}."
        );
        self
    }

    /// Asserts that one of the header's values contains `fragment`.
    pub fn containing_header_fragment(self, name: &str, fragment: &str) -> Self {
        let values = self.header_values(name);
        assert!(
            values.iter().any(|v| v.contains(fragment)),
            "Expected response header {name} to contain '{fragment}', but instead found {values:?}."
        );
        self
    }

    /// Asserts the `Content-Type` header.
    ///
    /// Without parameters in `expected`, only the media type is compared, so
    /// `"application/json"` matches `application/json; charset=utf-8`.
    pub fn with_content_type(self, expected: &str) -> Self {
        let actual = self.response.content_type().unwrap_or("");
        let matches = if expected.contains(';') {
            actual.eq_ignore_ascii_case(expected)
        } else {
            media_type(actual).eq_ignore_ascii_case(expected.trim())
        };
        assert!(
            matches,
            "Expected response content type to be '{expected}', but instead received '{actual}'."
        );
        self
    }

    /// Asserts the body text.
    pub fn with_string_content(self, expected: &str) -> Self {
        let actual = self.require_text();
        assert!(
            actual == expected,
            "Expected response content to be '{expected}', but instead received '{actual}'."
        );
        self
    }

    /// Asserts that the body deserializes to a value equal to `expected`.
    ///
    /// Works with anonymous shapes too: `with_response_model(&json!({"id": 1}))`.
    pub fn with_response_model<T>(self, expected: &T) -> ResponseModelTestBuilder<T>
    where
        T: DeserializeOwned + PartialEq + fmt::Debug,
    {
        let model = self.require_model::<T>();
        assert!(
            &model == expected,
            "Expected response model to be {expected:?}, but instead received {model:?}."
        );
        ResponseModelTestBuilder {
            response: self.response,
            model,
        }
    }

    /// Asserts that the body deserializes to `T`, whatever its value.
    pub fn with_response_model_of_type<T: DeserializeOwned>(self) -> ResponseModelTestBuilder<T> {
        let model = self.require_model::<T>();
        ResponseModelTestBuilder {
            response: self.response,
            model,
        }
    }

    /// Connector for readability.
    pub fn and_also(self) -> Self {
        self
    }

    /// Hands the captured response to the test.
    pub fn and_provide_response(self) -> CapturedResponse {
        self.response
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        self.response
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    fn require_text(&self) -> String {
        assert!(
            self.response.has_content(),
            "Expected response to have content, but it had none."
        );
        match self.response.text() {
            Ok(text) => text,
            Err(e) => panic!("Expected response content to be text, but it was not: {e}"),
        }
    }

    fn require_model<T: DeserializeOwned>(&self) -> T {
        assert!(
            self.response.has_content(),
            "Expected response to have content of type {}, but it had none.",
            type_name::<T>()
        );
        match serde_json::from_slice(&self.response.body) {
            Ok(model) => model,
            Err(e) => panic!(
                "Expected response model to be of type {}, but it could not be read as one: {e}.",
                type_name::<T>()
            ),
        }
    }
}

/// Assertions over a deserialized response model.
pub struct ResponseModelTestBuilder<T> {
    response: CapturedResponse,
    model: T,
}

impl<T> ResponseModelTestBuilder<T> {
    /// Asserts that the model satisfies `predicate`.
    pub fn passing<P>(self, predicate: P) -> Self
    where
        P: FnOnce(&T) -> bool,
    {
        assert!(
            predicate(&self.model),
            "Expected response model of type {} to pass the given predicate, but it failed.",
            type_name::<T>()
        );
        self
    }

    /// Runs custom assertions against the model.
    pub fn passing_with<F>(self, assertions: F) -> Self
    where
        F: FnOnce(&T),
    {
        assertions(&self.model);
        self
    }

    /// Returns to the response assertions.
    pub fn and_also(self) -> ResponseTestBuilder {
        ResponseTestBuilder::new(self.response)
    }

    /// Hands the model to the test.
    pub fn and_provide_model(self) -> T {
        self.model
    }

    /// Hands the captured response to the test.
    pub fn and_provide_response(self) -> CapturedResponse {
        self.response
    }
}

impl<T: fmt::Debug> fmt::Debug for ResponseModelTestBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseModelTestBuilder")
            .field("status", &self.response.status)
            .field("model", &self.model)
            .finish()
    }
}

fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        id: u32,
        name: String,
    }

    fn response(status: StatusCode, body: &str) -> ResponseTestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.append("x-tag", HeaderValue::from_static("alpha"));
        headers.append("x-tag", HeaderValue::from_static("beta-release"));
        ResponseTestBuilder::new(CapturedResponse::new(status, headers, Bytes::from(body.to_string())))
    }

    #[test]
    fn test_status_assertions() {
        response(StatusCode::CREATED, "")
            .with_status_code(StatusCode::CREATED)
            .with_success_status_code()
            .with_reason_phrase("Created")
            .with_version(Version::HTTP_11);
    }

    #[test]
    #[should_panic(expected = "Expected response to have 404 Not Found status code, but instead received 200 OK.")]
    fn test_status_mismatch_message() {
        let _ = response(StatusCode::OK, "").with_status_code(StatusCode::NOT_FOUND);
    }

    #[test]
    #[should_panic(expected = "success status code")]
    fn test_success_mismatch() {
        let _ = response(StatusCode::FOUND, "").with_success_status_code();
    }

    #[test]
    fn test_header_assertions() {
        response(StatusCode::OK, "")
            .containing_header("X-Tag")
            .containing_header_value("x-tag", "alpha")
            .containing_header_fragment("x-tag", "release")
            .with_content_type("application/json")
            .with_content_type("application/json; charset=utf-8");
    }

    #[test]
    #[should_panic(expected = "to have value 'gamma'")]
    fn test_header_value_mismatch() {
        let _ = response(StatusCode::OK, "").containing_header_value("x-tag", "gamma");
    }

    #[test]
    #[should_panic(expected = "Expected response headers to contain Location")]
    fn test_missing_header() {
        let _ = response(StatusCode::OK, "").containing_header("Location");
    }

    #[test]
    fn test_string_content() {
        response(StatusCode::OK, "plain").with_string_content("plain");
    }

    #[test]
    fn test_model_by_value() {
        let item = response(StatusCode::OK, r#"{"id":1,"name":"Test"}"#)
            .with_response_model(&Item {
                id: 1,
                name: "Test".to_string(),
            })
            .and_provide_model();
        assert_eq!(item.id, 1);
    }

    #[test]
    fn test_anonymous_model() {
        response(StatusCode::OK, r#"{"id":1}"#).with_response_model(&json!({"id": 1}));
    }

    #[test]
    #[should_panic(expected = "Expected response model to be")]
    fn test_model_value_mismatch() {
        let _ = response(StatusCode::OK, r#"{"id":2}"#).with_response_model(&json!({"id": 1}));
    }

    #[test]
    fn test_model_by_type_ignores_value() {
        response(StatusCode::OK, "5")
            .with_response_model_of_type::<i32>()
            .passing(|m| *m == 5)
            .passing_with(|m| assert!(*m > 0))
            .and_also()
            .with_status_code(StatusCode::OK);
    }

    #[test]
    #[should_panic(expected = "could not be read as one")]
    fn test_model_wrong_type() {
        let _ = response(StatusCode::OK, r#""text""#).with_response_model_of_type::<i32>();
    }

    #[test]
    #[should_panic(expected = "to pass the given predicate")]
    fn test_predicate_failure() {
        let _ = response(StatusCode::OK, "5")
            .with_response_model_of_type::<i32>()
            .passing(|m| *m == 6);
    }

    #[test]
    #[should_panic(expected = "but it had none")]
    fn test_body_assertion_requires_content() {
        let _ = response(StatusCode::NO_CONTENT, "").with_response_model_of_type::<Item>();
    }

    #[test]
    fn test_provide_response() {
        let captured = response(StatusCode::ACCEPTED, "done")
            .and_also()
            .and_provide_response();
        assert_eq!(captured.status(), StatusCode::ACCEPTED);
        assert_eq!(captured.text().unwrap(), "done");
        assert!(captured.json::<serde_json::Value>().is_err());
    }
}

//! Test request building.
//!
//! A [`TestRequestBuilder`] starts from `GET /` and is edited fluently.
//! Invalid input (an unparsable URI, a bad header name, a body that fails to
//! serialize) does not panic at the call site; the first such error is kept
//! and reported when the request is built.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use serde::Serialize;
use webprobe_host::Request;

use crate::error::{ProbeError, ProbeResult};

/// A synthetic request, immutable once built.
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    /// Starts a `GET` request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Starts a `HEAD` request.
    pub fn head(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::HEAD, uri)
    }

    /// HTTP method.
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

    /// Request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts this request into the host's request type.
    pub fn into_http_request(self) -> Request {
        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Builder for [`TestRequest`].
#[must_use]
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<String>,
}

impl Default for TestRequestBuilder {
    fn default() -> Self {
        Self::new(Method::GET, "/")
    }
}

impl TestRequestBuilder {
    /// Creates a builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI.
    ///
    /// Relative URIs such as `api/values/5` are resolved against the root.
    pub fn with_request_uri(mut self, uri: impl AsRef<str>) -> Self {
        self.uri = uri.as_ref().to_string();
        self
    }

    /// Appends a header.
    ///
    /// ```ignore
    /// TestRequestBuilder::default()
    ///     .with_header("CustomHeader", "CustomValue")
    ///     .with_header("X-Request-ID", "12345");
    /// ```
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) => self.fail(format!("Invalid header name '{name}': {e}")),
            (_, Err(e)) => self.fail(format!("Invalid value for header '{name}': {e}")),
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn with_content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.headers.remove(header::CONTENT_TYPE);
        self.with_header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Authorization` header to a bearer token.
    pub fn with_bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.headers.remove(header::AUTHORIZATION);
        self.with_header(
            header::AUTHORIZATION.as_str(),
            format!("Bearer {}", token.as_ref()),
        )
    }

    /// Sets the raw body.
    pub fn with_content(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets `Content-Type: application/json`.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(format!("Failed to serialize JSON body: {e}")),
        }
        self.with_content_type("application/json")
    }

    /// Appends percent-encoded query parameters to the URI.
    pub fn with_query<K, V>(mut self, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in params {
            let separator = if self.uri.contains('?') { '&' } else { '?' };
            self.uri.push(separator);
            self.uri.push_str(&urlencoding::encode(key.as_ref()));
            self.uri.push('=');
            self.uri.push_str(&urlencoding::encode(value.as_ref()));
        }
        self
    }

    /// Builds the request, reporting the first recorded error.
    pub fn build(self) -> ProbeResult<TestRequest> {
        if let Some(message) = self.error {
            return Err(ProbeError::RequestBuild(message));
        }

        let uri = resolve_uri(&self.uri)
            .parse::<Uri>()
            .map_err(|e| ProbeError::RequestBuild(format!("Invalid URI '{}': {e}", self.uri)))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }

    fn fail(&mut self, message: String) {
        self.error.get_or_insert(message);
    }
}

impl From<TestRequest> for TestRequestBuilder {
    fn from(request: TestRequest) -> Self {
        Self {
            method: request.method,
            uri: request.uri.to_string(),
            headers: request.headers,
            body: Some(request.body),
            error: None,
        }
    }
}

fn resolve_uri(uri: &str) -> String {
    let uri = uri.trim();
    if uri.is_empty() {
        "/".to_string()
    } else if uri.starts_with('/') || uri.contains("://") {
        uri.to_string()
    } else {
        format!("/{uri}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_request() {
        let request = TestRequestBuilder::default().build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_method_and_relative_uri() {
        let request = TestRequestBuilder::default()
            .with_method(Method::POST)
            .with_request_uri("api/NoAttributes/WithParameter/5")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().path(), "/api/NoAttributes/WithParameter/5");
    }

    #[test]
    fn test_absolute_uri_is_kept() {
        let request = TestRequest::get("http://localhost/values?page=2").build().unwrap();
        assert_eq!(request.uri().host(), Some("localhost"));
        assert_eq!(request.uri().query(), Some("page=2"));
    }

    #[test]
    fn test_header_values_accumulate() {
        let request = TestRequest::get("/")
            .with_header("CustomHeader", "CustomValue")
            .with_header("Accept", "text/plain")
            .with_header("Accept", "application/json")
            .build()
            .unwrap();

        assert_eq!(request.headers().get("customheader").unwrap(), "CustomValue");
        assert_eq!(request.headers().get_all("accept").iter().count(), 2);
    }

    #[test]
    fn test_invalid_header_is_reported_at_build() {
        let err = TestRequest::get("/")
            .with_header("bad header", "value")
            .with_header("X-Ok", "fine")
            .build()
            .unwrap_err();

        assert!(matches!(err, ProbeError::RequestBuild(msg) if msg.contains("bad header")));
    }

    #[test]
    fn test_invalid_uri_is_reported_at_build() {
        let err = TestRequest::get("/spaces are not allowed").build().unwrap_err();
        assert!(matches!(err, ProbeError::RequestBuild(_)));
    }

    #[test]
    fn test_bearer_token_replaces_previous() {
        let request = TestRequest::get("/users")
            .with_bearer_token("first")
            .with_bearer_token("second")
            .build()
            .unwrap();

        let values: Vec<_> = request.headers().get_all(header::AUTHORIZATION).iter().collect();
        assert_eq!(values, vec!["Bearer second"]);
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/users")
            .with_json(&json!({"name": "Alice"}))
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(request.body().as_ref(), b"{\"name\":\"Alice\"}");
    }

    #[test]
    fn test_query_is_encoded() {
        let request = TestRequest::get("/search?lang=en")
            .with_query(&[("q", "a b&c")])
            .build()
            .unwrap();

        assert_eq!(request.uri().query(), Some("lang=en&q=a%20b%26c"));
    }

    #[test]
    fn test_round_trip_through_builder() {
        let original = TestRequest::put("/items/1")
            .with_content("payload")
            .build()
            .unwrap();

        let rebuilt = TestRequestBuilder::from(original)
            .with_header("X-Extra", "1")
            .build()
            .unwrap();

        assert_eq!(rebuilt.method(), Method::PUT);
        assert_eq!(rebuilt.body().as_ref(), b"payload");
        assert!(rebuilt.headers().contains_key("x-extra"));
    }

    #[test]
    fn test_into_http_request() {
        let request = TestRequest::delete("/items/1")
            .with_header("X-Test", "value")
            .build()
            .unwrap()
            .into_http_request();

        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.uri().path(), "/items/1");
        assert_eq!(request.headers().get("X-Test").unwrap(), "value");
    }
}

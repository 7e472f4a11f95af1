//! Request dispatch.
//!
//! A [`RequestTestBuilder`] pairs a synthetic request with the host it will
//! be sent to. The host is resolved when the response is requested:
//!
//! 1. a host supplied for this call (explicit configuration or startup),
//! 2. the global OWIN test server, if running,
//! 3. the global HTTP test server, if running,
//! 4. a one-off HTTP test server built from the global configuration.
//!
//! One-off servers are stopped as soon as the response is captured.

use std::fmt;
use std::sync::Arc;

use webprobe_host::HttpConfiguration;

use crate::error::{ProbeError, ProbeResult};
use crate::lifecycle::{HttpTestServer, OwinTestServer, TestServer};
use crate::registry;
use crate::request::TestRequestBuilder;
use crate::response::ResponseTestBuilder;
use crate::settings::ProbeSettings;

type StartOwin = fn(&ProbeSettings) -> ProbeResult<OwinTestServer>;

pub(crate) enum Target {
    /// Resolve against the global state at dispatch time.
    Global,
    /// A server started by `starts*`.
    Bound(Arc<dyn TestServer>),
    LocalHttp(HttpConfiguration),
    LocalOwin(StartOwin),
    /// Starting the server failed; reported at dispatch.
    Failed(ProbeError),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("Global"),
            Self::Bound(server) => f.debug_tuple("Bound").field(server).finish(),
            Self::LocalHttp(config) => f.debug_tuple("LocalHttp").field(config).finish(),
            Self::LocalOwin(_) => f.write_str("LocalOwin"),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl Target {
    /// The server to send to, and whether it must be stopped afterwards.
    fn resolve(self) -> ProbeResult<(Arc<dyn TestServer>, bool)> {
        match self {
            Self::Bound(server) => Ok((server, false)),
            Self::Failed(e) => Err(e),
            Self::LocalHttp(config) => {
                let server = HttpTestServer::start(&config, &registry::settings())?;
                Ok((Arc::new(server) as Arc<dyn TestServer>, true))
            }
            Self::LocalOwin(start) => {
                let server = start(&registry::settings())?;
                Ok((Arc::new(server) as Arc<dyn TestServer>, true))
            }
            Self::Global => {
                if let Some(server) = registry::OWIN.current().filter(|s| s.is_running()) {
                    return Ok((server as Arc<dyn TestServer>, false));
                }
                if let Some(server) = registry::HTTP.current().filter(|s| s.is_running()) {
                    return Ok((server as Arc<dyn TestServer>, false));
                }
                match registry::configuration() {
                    Some(config) => Self::LocalHttp(config).resolve(),
                    None => Err(ProbeError::NoServer),
                }
            }
        }
    }
}

/// Builds the request of a test chain and dispatches it.
pub struct RequestTestBuilder {
    target: Target,
    request: TestRequestBuilder,
}

impl fmt::Debug for RequestTestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTestBuilder")
            .field("target", &self.target)
            .field("request", &self.request)
            .finish()
    }
}

impl RequestTestBuilder {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            request: TestRequestBuilder::default(),
        }
    }

    /// Uses a fully formed request.
    ///
    /// Accepts a [`TestRequest`](crate::TestRequest) or a builder such as
    /// `TestRequest::post("/test")`.
    pub fn with_request(mut self, request: impl Into<TestRequestBuilder>) -> Self {
        self.request = request.into();
        self
    }

    /// Edits the request, which starts as `GET /`.
    ///
    /// ```rust,ignore
    /// .with_request_fn(|req| {
    ///     req.with_method(Method::POST)
    ///         .with_request_uri("api/NoAttributes/WithParameter/5")
    /// })
    /// ```
    pub fn with_request_fn<F>(mut self, edit: F) -> Self
    where
        F: FnOnce(TestRequestBuilder) -> TestRequestBuilder,
    {
        self.request = edit(self.request);
        self
    }

    /// Dispatches the request and returns the response assertions.
    ///
    /// # Panics
    ///
    /// Panics if no test server is available or the request cannot be sent.
    pub fn should_return_response(self) -> ResponseTestBuilder {
        match self.try_should_return_response() {
            Ok(builder) => builder,
            Err(e) => panic!("{e}"),
        }
    }

    /// Dispatches the request, returning setup failures as errors.
    pub fn try_should_return_response(self) -> ProbeResult<ResponseTestBuilder> {
        let (server, one_off) = self.target.resolve()?;

        let result = self.request.build().and_then(|request| {
            tracing::debug!(
                kind = %server.kind(),
                method = %request.method(),
                uri = %request.uri(),
                one_off,
                "dispatching test request"
            );
            server.send(request)
        });

        if one_off {
            server.stop();
        }

        let response = result?;
        tracing::debug!(status = %response.status(), "test response captured");
        Ok(ResponseTestBuilder::new(response))
    }
}

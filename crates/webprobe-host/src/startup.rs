//! Startup descriptors.
//!
//! A [`Startup`] type composes a middleware pipeline the way an OWIN startup
//! class does: it receives an [`AppBuilder`], registers middleware in order,
//! optionally mounts an [`HttpConfiguration`], and optionally ends the chain
//! with a terminal handler. Requests falling off the end of the chain get
//! `404 Not Found`.
//!
//! # Example
//!
//! ```rust
//! use webprobe_host::{AppBuilder, Request, Response, ResponseExt, Startup};
//! use http::StatusCode;
//!
//! #[derive(Default)]
//! struct HealthStartup;
//!
//! impl Startup for HealthStartup {
//!     fn configuration(&self, app: &mut AppBuilder) {
//!         app.use_fn("health", |request, next| {
//!             Box::pin(async move {
//!                 if request.uri().path() == "/health" {
//!                     Response::empty(StatusCode::OK)
//!                 } else {
//!                     next.run(request).await
//!                 }
//!             })
//!         });
//!     }
//! }
//!
//! let pipeline = webprobe_host::startup::build_pipeline(&HealthStartup);
//! assert_eq!(pipeline.stage_names(), vec!["health"]);
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::configuration::{HttpConfiguration, WebApiMiddleware};
use crate::middleware::{BoxFuture, BoxedMiddleware, Endpoint, FnEndpoint, FnMiddleware, Middleware, Next};
use crate::pipeline::{NotFoundEndpoint, Pipeline};
use crate::types::{Request, Response};

/// Describes how to compose the pipeline of a startup-hosted server.
///
/// `Default` lets the testing layer instantiate the descriptor from its type
/// alone.
pub trait Startup: Default + Send + Sync + 'static {
    /// Registers middleware on the application builder.
    fn configuration(&self, app: &mut AppBuilder);
}

/// Collects the middleware of a startup descriptor.
pub struct AppBuilder {
    stages: Vec<BoxedMiddleware>,
    endpoint: Option<Arc<dyn Endpoint>>,
    include_error_detail: bool,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("has_terminal", &self.endpoint.is_some())
            .finish()
    }
}

impl AppBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            endpoint: None,
            include_error_detail: false,
        }
    }

    /// Appends a middleware stage.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a closure middleware.
    pub fn use_fn<F>(&mut self, name: &'static str, func: F) -> &mut Self
    where
        F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
    {
        self.use_middleware(FnMiddleware::new(name, func))
    }

    /// Mounts a route configuration at this position of the chain.
    ///
    /// Requests matching one of its templates are answered by it; other
    /// requests continue to the next stage.
    pub fn use_web_api(&mut self, config: &HttpConfiguration) -> &mut Self {
        self.include_error_detail |= config.error_detail_included();
        self.use_middleware(WebApiMiddleware::new(config))
    }

    /// Ends the chain with a handler that answers every remaining request.
    pub fn run<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint = Some(Arc::new(FnEndpoint::new(handler)));
        self
    }

    /// Number of registered stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Finishes the pipeline.
    pub fn build(self) -> Pipeline {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| Arc::new(NotFoundEndpoint));
        Pipeline::from_parts(self.stages, endpoint).with_error_detail(self.include_error_detail)
    }
}

/// Runs a startup descriptor and returns the resulting pipeline.
pub fn build_pipeline<S: Startup>(startup: &S) -> Pipeline {
    let mut app = AppBuilder::new();
    startup.configuration(&mut app);
    tracing::debug!(
        startup = std::any::type_name::<S>(),
        stages = app.stage_count(),
        "startup configured"
    );
    app.build()
}

//! Route-based host configuration.
//!
//! [`HttpConfiguration`] is the description a raw host is started from: a
//! route table of controller actions plus the delegating message handlers
//! every request passes through before routing.
//!
//! # Example
//!
//! ```rust
//! use webprobe_host::{ActionContext, ActionResult, HttpConfiguration};
//! use http::Method;
//!
//! let config = HttpConfiguration::new()
//!     .route(Method::GET, "/api/values", |_ctx: ActionContext| async move {
//!         ActionResult::ok(&["a", "b"])
//!     })
//!     .include_error_detail(true);
//!
//! assert_eq!(config.route_count(), 1);
//! ```

use std::future::Future;
use std::sync::Arc;

use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;

use crate::action::{erase, ActionContext, ActionResult, ErasedAction, HandlerError};
use crate::middleware::{BoxFuture, BoxedMiddleware, Endpoint, Middleware, Next};
use crate::pipeline::{not_found, Pipeline};
use crate::router::{RouteOutcome, Router};
use crate::types::{Request, Response, ResponseExt};

/// Routes, message handlers and error policy for a raw host.
///
/// Cheap to clone; actions and handlers are shared.
#[derive(Clone, Default)]
pub struct HttpConfiguration {
    router: Router<ErasedAction>,
    message_handlers: Vec<BoxedMiddleware>,
    include_error_detail: bool,
}

impl std::fmt::Debug for HttpConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfiguration")
            .field("routes", &self.router.route_count())
            .field(
                "message_handlers",
                &self
                    .message_handlers
                    .iter()
                    .map(|h| h.name())
                    .collect::<Vec<_>>(),
            )
            .field("include_error_detail", &self.include_error_detail)
            .finish()
    }
}

impl HttpConfiguration {
    /// Creates an empty configuration. Every request to it is `404`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action for `method` and `template`.
    pub fn route<F, Fut>(mut self, method: Method, template: impl AsRef<str>, action: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ActionResult, HandlerError>> + Send + 'static,
    {
        self.add_route(method, template, action);
        self
    }

    /// Registers an action in place.
    pub fn add_route<F, Fut>(&mut self, method: Method, template: impl AsRef<str>, action: F)
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ActionResult, HandlerError>> + Send + 'static,
    {
        self.router.add_route(method, template, erase(action));
    }

    /// Adds a delegating message handler. Handlers run in registration order.
    pub fn message_handler(mut self, handler: impl Middleware) -> Self {
        self.message_handlers.push(Arc::new(handler));
        self
    }

    /// Whether error bodies carry the underlying error text.
    pub fn include_error_detail(mut self, include: bool) -> Self {
        self.include_error_detail = include;
        self
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    /// Number of registered message handlers.
    pub fn message_handler_count(&self) -> usize {
        self.message_handlers.len()
    }

    /// Returns `true` if error detail is exposed in responses.
    pub fn error_detail_included(&self) -> bool {
        self.include_error_detail
    }

    /// Returns `true` if some route template matches `path`, for any method.
    pub fn has_route_for(&self, path: &str) -> bool {
        !matches!(
            self.router.resolve(&Method::GET, path),
            RouteOutcome::NotFound
        )
    }

    /// Builds the pipeline: message handlers in front of the route table.
    pub fn build_pipeline(&self) -> Pipeline {
        let endpoint = RouteEndpoint {
            router: self.router.clone(),
            include_error_detail: self.include_error_detail,
        };
        Pipeline::from_parts(self.message_handlers.clone(), Arc::new(endpoint))
            .with_error_detail(self.include_error_detail)
    }
}

/// Endpoint dispatching to controller actions through the route table.
struct RouteEndpoint {
    router: Router<ErasedAction>,
    include_error_detail: bool,
}

impl RouteEndpoint {
    async fn handle(&self, request: Request) -> Response {
        let outcome = self.router.resolve(request.method(), request.uri().path());
        let route = match outcome {
            RouteOutcome::Matched(route) => route,
            RouteOutcome::MethodNotAllowed(allowed) => {
                return method_not_allowed(request.method(), &allowed);
            }
            RouteOutcome::NotFound => return not_found(&request),
        };

        tracing::debug!(template = route.template(), "route matched");
        let (action, params) = route.into_parts();
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let ctx = ActionContext::new(parts.method, parts.uri, parts.headers, params, body);
        match action(ctx).await {
            Ok(result) => result.into_response(),
            Err(err) => {
                tracing::warn!(error = %err, "action failed");
                err.into_response(self.include_error_detail)
            }
        }
    }
}

impl Endpoint for RouteEndpoint {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(self.handle(request))
    }
}

fn method_not_allowed(method: &Method, allowed: &[Method]) -> Response {
    let mut response = Response::message(
        StatusCode::METHOD_NOT_ALLOWED,
        &format!("The requested resource does not support http method '{method}'."),
    );
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::try_from(allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

/// Middleware mounting a configuration inside a startup pipeline.
///
/// Requests whose path matches one of the configuration's templates are
/// handled by the configuration's own pipeline; everything else continues
/// down the startup chain.
pub(crate) struct WebApiMiddleware {
    config: HttpConfiguration,
    pipeline: Pipeline,
}

impl WebApiMiddleware {
    pub(crate) fn new(config: &HttpConfiguration) -> Self {
        Self {
            config: config.clone(),
            pipeline: config.build_pipeline(),
        }
    }
}

impl Middleware for WebApiMiddleware {
    fn name(&self) -> &'static str {
        "web-api"
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if self.config.has_route_for(request.uri().path()) {
                self.pipeline.dispatch(request).await
            } else {
                next.run(request).await
            }
        })
    }
}

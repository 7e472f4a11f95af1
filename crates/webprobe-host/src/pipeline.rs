//! The request pipeline.
//!
//! A [`Pipeline`] owns its middleware stages and endpoint. Dispatch never
//! fails from the caller's point of view: a panic anywhere in the chain is
//! caught and reported as `500 Internal Server Error`, the same way an
//! action returning [`HandlerError`](crate::HandlerError) is.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::StatusCode;

use crate::action::error_response;
use crate::middleware::{BoxFuture, BoxedMiddleware, Endpoint, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Endpoint answering every request with `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundEndpoint;

impl Endpoint for NotFoundEndpoint {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move { not_found(&request) })
    }
}

/// The standard response for a request no route accepted.
pub(crate) fn not_found(request: &Request) -> Response {
    Response::message(
        StatusCode::NOT_FOUND,
        &format!(
            "No HTTP resource was found that matches the request URI '{}'.",
            request.uri()
        ),
    )
}

/// An ordered chain of middleware ending in an endpoint.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
    include_error_detail: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("include_error_detail", &self.include_error_detail)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with no stages in front of `endpoint`.
    pub fn new(endpoint: impl Endpoint) -> Self {
        Self::from_parts(Vec::new(), Arc::new(endpoint))
    }

    pub(crate) fn from_parts(stages: Vec<BoxedMiddleware>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            stages,
            endpoint,
            include_error_detail: false,
        }
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn with_stage(mut self, stage: impl Middleware) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Whether panic messages are included in `500` bodies.
    pub fn with_error_detail(mut self, include: bool) -> Self {
        self.include_error_detail = include;
        self
    }

    /// Names of the stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs the request through every stage and the endpoint.
    pub async fn dispatch(&self, request: Request) -> Response {
        let method = request.method().clone();
        let uri = request.uri().clone();
        tracing::debug!(%method, %uri, "dispatching request");

        let next = Next::new(&self.stages, self.endpoint.as_ref());
        match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(response) => {
                tracing::debug!(%method, %uri, status = %response.status(), "request completed");
                response
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%method, %uri, panic = %message, "unhandled fault in pipeline");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error has occurred.",
                    self.include_error_detail.then_some(message),
                )
            }
        }
    }
}

impl Endpoint for Pipeline {
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(self.dispatch(request))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Middleware and endpoint traits.
//!
//! A [`Pipeline`](crate::Pipeline) is an ordered list of [`Middleware`]
//! stages in front of a single [`Endpoint`]. Each stage receives the request
//! and a [`Next`] handle; calling [`Next::run`] passes the request on,
//! returning early short-circuits the rest of the chain.
//!
//! The same trait serves both as a delegating message handler registered on
//! an [`HttpConfiguration`](crate::HttpConfiguration) and as startup
//! middleware registered through an [`AppBuilder`](crate::AppBuilder).
//!
//! # Example
//!
//! ```rust,ignore
//! use webprobe_host::{BoxFuture, Middleware, Next, Request, Response};
//!
//! struct Stamp;
//!
//! impl Middleware for Stamp {
//!     fn name(&self) -> &'static str {
//!         "stamp"
//!     }
//!
//!     fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let mut response = next.run(request).await;
//!             response.headers_mut().insert("x-stamp", "1".parse().unwrap());
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::types::{Request, Response};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased middleware stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A pipeline stage.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by calling `next.run(request)`.
    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response>;
}

/// The terminal handler of a pipeline.
pub trait Endpoint: Send + Sync + 'static {
    /// Produces the response for a request that reached the end of the chain.
    fn call(&self, request: Request) -> BoxFuture<'_, Response>;
}

/// Handle to the remainder of the pipeline.
///
/// Consumed by [`Next::run`], so a stage can forward a request at most once.
pub struct Next<'a> {
    stages: &'a [BoxedMiddleware],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [BoxedMiddleware], endpoint: &'a dyn Endpoint) -> Self {
        Self { stages, endpoint }
    }

    /// Number of stages still ahead of the endpoint.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Runs the next stage, or the endpoint when no stages remain.
    pub async fn run(self, request: Request) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::trace!(stage = stage.name(), "entering middleware");
                stage.process(request, Next::new(rest, self.endpoint)).await
            }
            None => self.endpoint.call(request).await,
        }
    }
}

/// A middleware built from a closure.
///
/// ```rust,ignore
/// let timing = FnMiddleware::new("timing", |request, next| {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         let response = next.run(request).await;
///         tracing::debug!(elapsed = ?start.elapsed());
///         response
///     })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a named closure middleware.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
    {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Response> {
        (self.func)(request, next)
    }
}

/// An endpoint built from an async closure.
pub struct FnEndpoint<F> {
    func: F,
}

impl<F> FnEndpoint<F> {
    /// Wraps the closure.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self { func }
    }
}

impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin((self.func)(request))
    }
}

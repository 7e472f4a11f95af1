//! In-memory host.
//!
//! [`HttpServer`] hands requests straight to a pipeline without any socket.
//! It is the raw host the testing layer starts from an
//! [`HttpConfiguration`].

use std::sync::Arc;

use crate::configuration::HttpConfiguration;
use crate::pipeline::Pipeline;
use crate::types::{Request, Response};

/// A pipeline reachable by direct invocation.
#[derive(Debug, Clone)]
pub struct HttpServer {
    pipeline: Arc<Pipeline>,
}

impl HttpServer {
    /// Hosts the pipeline built from `config`.
    pub fn new(config: &HttpConfiguration) -> Self {
        Self::from_pipeline(config.build_pipeline())
    }

    /// Hosts an already built pipeline.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Sends a request through the pipeline.
    pub async fn send(&self, request: Request) -> Response {
        self.pipeline.dispatch(request).await
    }
}

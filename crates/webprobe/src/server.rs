//! Server lifecycle entry point.
//!
//! ```rust,ignore
//! WebProbe::is_using(Some(routes()));
//!
//! WebProbe::server().starts();
//! WebProbe::server()
//!     .working()
//!     .with_request(TestRequest::post("/test"))
//!     .should_return_response()
//!     .with_status_code(StatusCode::NOT_FOUND);
//! WebProbe::server().stops();
//! ```

use std::sync::Arc;

use webprobe_host::{HttpConfiguration, Startup};

use crate::dispatch::{RequestTestBuilder, Target};
use crate::error::ProbeError;
use crate::lifecycle::{HostKind, HttpTestServer, OwinTestServer};
use crate::registry;

/// Starts, stops and selects test servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerTestBuilder;

impl ServerTestBuilder {
    /// Starts the global HTTP test server from the global configuration.
    ///
    /// Without a global configuration nothing is started and dispatching
    /// through the returned builder fails with [`ProbeError::NoServer`].
    pub fn starts(self) -> RequestTestBuilder {
        match registry::configuration() {
            Some(config) => self.starts_with(config),
            None => RequestTestBuilder::new(Target::Failed(ProbeError::NoServer)),
        }
    }

    /// Starts the global HTTP test server from `config`.
    ///
    /// A running global HTTP test server is stopped first.
    pub fn starts_with(self, config: HttpConfiguration) -> RequestTestBuilder {
        registry::HTTP.stop();
        match HttpTestServer::start(&config, &registry::settings()) {
            Ok(server) => {
                let server = Arc::new(server);
                registry::HTTP.install(Arc::clone(&server));
                RequestTestBuilder::new(Target::Bound(server))
            }
            Err(e) => start_failed(HostKind::Http, e),
        }
    }

    /// Starts the global OWIN test server for startup `S`.
    ///
    /// A running global OWIN test server is stopped first.
    pub fn starts_owin<S: Startup>(self) -> RequestTestBuilder {
        registry::OWIN.stop();
        match OwinTestServer::start::<S>(&registry::settings()) {
            Ok(server) => {
                let server = Arc::new(server);
                registry::OWIN.install(Arc::clone(&server));
                RequestTestBuilder::new(Target::Bound(server))
            }
            Err(e) => start_failed(HostKind::Owin, e),
        }
    }

    /// Stops every global test server.
    pub fn stops(self) {
        registry::OWIN.stop();
        registry::HTTP.stop();
    }

    /// Uses the global test servers, or a one-off server built from the
    /// global configuration.
    pub fn working(self) -> RequestTestBuilder {
        RequestTestBuilder::new(Target::Global)
    }

    /// Uses a one-off HTTP test server for `config`, ignoring global state.
    pub fn working_with(self, config: HttpConfiguration) -> RequestTestBuilder {
        RequestTestBuilder::new(Target::LocalHttp(config))
    }

    /// Uses a one-off OWIN test server for startup `S`.
    pub fn working_owin<S: Startup>(self) -> RequestTestBuilder {
        RequestTestBuilder::new(Target::LocalOwin(OwinTestServer::start::<S>))
    }
}

fn start_failed(kind: HostKind, error: ProbeError) -> RequestTestBuilder {
    tracing::error!(%kind, %error, "failed to start global test server");
    RequestTestBuilder::new(Target::Failed(error))
}

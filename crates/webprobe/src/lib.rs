//! # Webprobe
//!
//! Fluent testing for in-process HTTP pipelines. A test starts a host,
//! sends a synthetic request through the full pipeline and asserts on the
//! captured response in one chain.
//!
//! ## Key Features
//!
//! - **Two hosts**: an in-memory host for an [`HttpConfiguration`] and a
//!   loopback listener for a [`Startup`](webprobe_host::Startup) descriptor
//! - **Global or one-off servers**: start a server once for a group of tests,
//!   or let each chain start and stop its own
//! - **Fluent assertions**: status, headers, content and deserialized models
//! - **Synchronous API**: every server drives its host on its own runtime
//!
//! ## Example
//!
//! ```ignore
//! use http::{Method, StatusCode};
//! use webprobe::WebProbe;
//!
//! #[test]
//! fn route_with_parameter() {
//!     WebProbe::server()
//!         .working_with(routes())
//!         .with_request_fn(|req| {
//!             req.with_method(Method::POST)
//!                 .with_request_uri("api/NoAttributes/WithParameter/5")
//!         })
//!         .should_return_response()
//!         .with_status_code(StatusCode::OK)
//!         .and_also()
//!         .with_response_model_of_type::<i32>()
//!         .passing(|id| *id == 5);
//! }
//! ```
//!
//! Global servers and the global configuration are process-wide. Tests that
//! use them should be serialized, e.g. with `serial_test`.

#![doc(html_root_url = "https://docs.rs/webprobe/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;
mod error;
mod lifecycle;
pub mod logging;
mod registry;
mod request;
mod response;
mod server;
mod settings;

pub use dispatch::RequestTestBuilder;
pub use error::{ProbeError, ProbeResult};
pub use lifecycle::{HostKind, HttpTestServer, OwinTestServer, ServerState, TestServer};
pub use request::{TestRequest, TestRequestBuilder};
pub use response::{CapturedResponse, ResponseModelTestBuilder, ResponseTestBuilder};
pub use server::ServerTestBuilder;
pub use settings::{ProbeSettings, ENV_PREFIX};

pub use webprobe_host::HttpConfiguration;

/// Entry point of every test chain.
#[derive(Debug)]
pub struct WebProbe;

impl WebProbe {
    /// Starts a server chain.
    pub fn server() -> ServerTestBuilder {
        ServerTestBuilder
    }

    /// Sets or clears the global configuration.
    ///
    /// It backs [`ServerTestBuilder::starts`] and the one-off server of
    /// [`ServerTestBuilder::working`].
    pub fn is_using(config: Option<HttpConfiguration>) {
        registry::set_configuration(config);
    }

    /// The global configuration, if set.
    pub fn configuration() -> Option<HttpConfiguration> {
        registry::configuration()
    }

    /// Replaces the settings used for servers started from now on.
    ///
    /// Invalid settings are rejected and the current ones are kept.
    pub fn with_settings(settings: ProbeSettings) -> ProbeResult<()> {
        settings.validate()?;
        registry::set_settings(settings);
        Ok(())
    }

    /// Current settings; loaded from `WEBPROBE_*` variables on first use.
    pub fn settings() -> ProbeSettings {
        registry::settings()
    }
}

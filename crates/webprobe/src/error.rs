//! Test error types.

use thiserror::Error;
use webprobe_host::HostError;

use crate::lifecycle::HostKind;

/// Errors that stop a test chain before any assertion runs.
///
/// Assertion mismatches are not errors: they panic with an expected-vs-actual
/// message, the way `assert_eq!` does.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No global host is active and no configuration is available.
    #[error(
        "No test servers are started or could be started for this particular test case. \
         Either call WebProbe::server().starts() to start a new test server or provide \
         global or test specific HttpConfiguration."
    )]
    NoServer,

    /// The bound test server has already been stopped.
    #[error("The {0} test server has been stopped")]
    ServerStopped(HostKind),

    /// The synthetic request could not be turned into an HTTP request.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// The host failed to start, dispatch or stop.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The response body could not be read.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// The runtime backing a test server could not be created.
    #[error("Failed to build test server runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Settings could not be loaded.
    #[error("Settings error: {0}")]
    Settings(String),
}

/// Result alias for the testing library.
pub type ProbeResult<T> = Result<T, ProbeError>;

impl From<toml::de::Error> for ProbeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Settings(e.to_string())
    }
}

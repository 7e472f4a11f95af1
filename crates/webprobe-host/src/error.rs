//! Host error types.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while starting, driving or stopping a host.
///
/// Faults inside the hosted pipeline are never reported here; they are
/// translated into `500` responses by the pipeline itself.
#[derive(Debug, Error)]
pub enum HostError {
    /// The listener could not be bound.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configured bind address is not a socket address.
    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),

    /// The host has already been stopped.
    #[error("Host at {0} is not running")]
    NotRunning(SocketAddr),

    /// The client side of a loopback dispatch failed.
    #[error("Request to {addr} failed: {message}")]
    Client {
        /// Address of the listener.
        addr: SocketAddr,
        /// Description of the failure.
        message: String,
    },

    /// A response body could not be collected.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The request could not be rewritten for the listener.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

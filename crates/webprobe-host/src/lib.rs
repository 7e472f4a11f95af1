//! # Webprobe Host
//!
//! In-process HTTP host used by the `webprobe` testing library.
//!
//! This crate provides:
//!
//! - [`HttpConfiguration`]: route templates mapped to controller actions,
//!   plus delegating message handlers
//! - [`Pipeline`]: ordered [`Middleware`] stages in front of an [`Endpoint`],
//!   with panics translated into `500` responses
//! - [`Startup`] descriptors composing a pipeline through [`AppBuilder`]
//! - Two hosts: the in-memory [`HttpServer`] and the loopback
//!   [`ListenerServer`] with graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use webprobe_host::{ActionContext, ActionResult, HttpConfiguration, HttpServer};
//! use http::Method;
//!
//! let config = HttpConfiguration::new().route(Method::GET, "/ping", |_ctx: ActionContext| async move {
//!     ActionResult::ok("pong")
//! });
//!
//! let server = HttpServer::new(&config);
//! let response = server.send(request).await;
//! ```

#![doc(html_root_url = "https://docs.rs/webprobe-host/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod action;
pub mod config;
pub mod configuration;
mod error;
pub mod listener;
pub mod memory;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod shutdown;
pub mod startup;
mod types;

pub use action::{ActionContext, ActionResult, HandlerError};
pub use config::HostConfig;
pub use configuration::HttpConfiguration;
pub use error::{HostError, HostResult};
pub use listener::ListenerServer;
pub use memory::HttpServer;
pub use middleware::{BoxFuture, Endpoint, FnEndpoint, FnMiddleware, Middleware, Next};
pub use pipeline::{NotFoundEndpoint, Pipeline};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use startup::{AppBuilder, Startup};
pub use types::{Request, Response, ResponseExt};

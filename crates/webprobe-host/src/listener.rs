//! Loopback listener host.
//!
//! [`ListenerServer`] serves a pipeline over HTTP/1.1 on a real TCP listener
//! (by default `127.0.0.1` on a free port) and dispatches through a pooled
//! hyper client. It is the host started from a [`Startup`](crate::Startup)
//! descriptor. The listener stays open until [`ListenerServer::shutdown`]
//! runs or the owning runtime is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use webprobe_host::{HostConfig, ListenerServer, Pipeline, NotFoundEndpoint};
//!
//! let server = ListenerServer::start(Pipeline::new(NotFoundEndpoint), &HostConfig::default()).await?;
//! let response = server.send(request).await?;
//! server.shutdown().await;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::uri::PathAndQuery;
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::config::HostConfig;
use crate::error::{HostError, HostResult};
use crate::pipeline::Pipeline;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::types::{Request, Response, ResponseExt};

/// A pipeline served on a loopback socket.
#[derive(Debug)]
pub struct ListenerServer {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    accept_loop: JoinHandle<()>,
    client: Client<HttpConnector, Full<Bytes>>,
    shutdown_timeout: Duration,
}

impl ListenerServer {
    /// Binds the listener and starts accepting connections.
    ///
    /// Must be called from within a tokio runtime; the accept loop and the
    /// connection tasks are spawned onto it.
    pub async fn start(pipeline: Pipeline, config: &HostConfig) -> HostResult<Self> {
        let bind_err = |source| HostError::Bind {
            addr: config.bind_addr().to_string(),
            source,
        };

        let listener = TcpListener::bind(config.socket_addr()?)
            .await
            .map_err(bind_err)?;
        let addr = listener.local_addr().map_err(bind_err)?;

        let shutdown = ShutdownSignal::new();
        let tracker = ConnectionTracker::new();
        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(pipeline),
            shutdown.clone(),
            tracker.clone(),
            config.keep_alive(),
        ));

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build_http();

        tracing::info!(%addr, "listener host started");
        Ok(Self {
            addr,
            shutdown,
            tracker,
            accept_loop,
            client,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://{addr}`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns `false` once shutdown has begun.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }

    /// Number of open server-side connections.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_connections()
    }

    /// Sends a request to the listener and collects the response.
    ///
    /// Only the path and query of the request URI are kept; scheme and
    /// authority are replaced by the listener's address.
    pub async fn send(&self, request: Request) -> HostResult<Response> {
        if !self.is_running() {
            return Err(HostError::NotRunning(self.addr));
        }

        let (mut parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", PathAndQuery::as_str)
            .to_string();
        parts.uri = Uri::builder()
            .scheme("http")
            .authority(self.addr.to_string())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| HostError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(http::Request::from_parts(parts, body))
            .await
            .map_err(|e| HostError::Client {
                addr: self.addr,
                message: e.to_string(),
            })?;

        let (parts, body) = response.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| HostError::Body(e.to_string()))?
            .to_bytes();
        Ok(Response::from_parts(parts, Full::new(bytes)))
    }

    /// Stops accepting, lets open connections finish and waits for them up
    /// to the configured timeout.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        if let Err(e) = self.accept_loop.await {
            tracing::warn!(addr = %self.addr, error = %e, "accept loop ended abnormally");
        }

        let drained = tokio::time::timeout(self.shutdown_timeout, self.tracker.wait_idle()).await;
        match drained {
            Ok(()) => tracing::info!(addr = %self.addr, "listener host stopped"),
            Err(_) => tracing::warn!(
                addr = %self.addr,
                connections = self.tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    keep_alive: bool,
) {
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, remote_addr)) => {
                    let guard = tracker.acquire();
                    let pipeline = Arc::clone(&pipeline);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, remote_addr, pipeline, shutdown, keep_alive).await;
                        drop(guard);
                    });
                }
                Err(e) => tracing::error!(error = %e, "failed to accept connection"),
            },
            () = shutdown.recv() => break,
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    pipeline: Arc<Pipeline>,
    shutdown: ShutdownSignal,
    keep_alive: bool,
) {
    let service = service_fn(move |request: http::Request<Incoming>| {
        let pipeline = Arc::clone(&pipeline);
        async move { Ok::<_, Infallible>(handle(&pipeline, request).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(%remote_addr, error = %e, "connection closed with error");
    }
}

async fn handle(pipeline: &Pipeline, request: http::Request<Incoming>) -> Response {
    let (parts, body) = request.into_parts();
    match body.collect().await {
        Ok(collected) => {
            let request = Request::from_parts(parts, Full::new(collected.to_bytes()));
            pipeline.dispatch(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            Response::message(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            )
        }
    }
}

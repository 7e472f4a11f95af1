//! Test servers.
//!
//! A test server owns one running host together with the tokio runtime that
//! drives it, so the fluent API can stay synchronous: every dispatch blocks
//! on the server's own runtime until the response is complete.
//!
//! - [`HttpTestServer`] hosts an [`HttpConfiguration`] in memory.
//! - [`OwinTestServer`] hosts a [`Startup`] pipeline on a loopback listener.
//!
//! Test servers must be driven from plain `#[test]` functions, not from
//! inside another tokio runtime.

use std::fmt;
use std::net::SocketAddr;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Runtime;
use webprobe_host::{startup, HttpConfiguration, HttpServer, ListenerServer, Startup};

use crate::error::{ProbeError, ProbeResult};
use crate::registry;
use crate::request::TestRequest;
use crate::response::CapturedResponse;
use crate::settings::ProbeSettings;

/// The two kinds of host a test can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// In-memory host built from an [`HttpConfiguration`].
    Http,
    /// Loopback listener built from a [`Startup`] descriptor.
    Owin,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("HTTP"),
            Self::Owin => f.write_str("OWIN"),
        }
    }
}

/// Lifecycle state of a test server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not accepting requests.
    Stopped,
    /// Host is being built.
    Starting,
    /// Accepting requests.
    Running,
    /// Draining before stop.
    Stopping,
}

/// A running host that accepts synthetic requests.
pub trait TestServer: Send + Sync + fmt::Debug {
    /// Which kind of host this is.
    fn kind(&self) -> HostKind;

    /// Current lifecycle state.
    fn state(&self) -> ServerState;

    /// Returns `true` while the server accepts requests.
    fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Sends a request and waits for the complete response.
    fn send(&self, request: TestRequest) -> ProbeResult<CapturedResponse>;

    /// Stops the server. Stopping twice is a no-op.
    fn stop(&self);
}

#[derive(Debug)]
struct Lifecycle {
    kind: HostKind,
    state: Mutex<ServerState>,
}

impl Lifecycle {
    fn new(kind: HostKind) -> Self {
        Self {
            kind,
            state: Mutex::new(ServerState::Starting),
        }
    }

    fn get(&self) -> ServerState {
        *self.state.lock()
    }

    fn transition(&self, to: ServerState) {
        let from = std::mem::replace(&mut *self.state.lock(), to);
        tracing::debug!(kind = %self.kind, ?from, ?to, "test server state changed");
    }

    /// Moves to `Stopping` unless already stopped or stopping.
    fn begin_stop(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, ServerState::Stopped | ServerState::Stopping) {
            return false;
        }
        *state = ServerState::Stopping;
        drop(state);
        tracing::debug!(kind = %self.kind, "test server stopping");
        true
    }

    fn ensure_running(&self) -> ProbeResult<()> {
        if self.get() == ServerState::Running {
            Ok(())
        } else {
            Err(ProbeError::ServerStopped(self.kind))
        }
    }
}

fn build_runtime(kind: HostKind, settings: &ProbeSettings) -> ProbeResult<Runtime> {
    settings.validate()?;
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.worker_threads)
        .thread_name(match kind {
            HostKind::Http => "webprobe-http",
            HostKind::Owin => "webprobe-owin",
        })
        .enable_all()
        .build()
        .map_err(ProbeError::Runtime)
}

/// In-memory host for an [`HttpConfiguration`].
pub struct HttpTestServer {
    lifecycle: Lifecycle,
    runtime: Runtime,
    server: HttpServer,
}

impl HttpTestServer {
    /// Builds the pipeline for `config` and starts serving it.
    pub fn start(config: &HttpConfiguration, settings: &ProbeSettings) -> ProbeResult<Self> {
        let lifecycle = Lifecycle::new(HostKind::Http);
        let runtime = build_runtime(HostKind::Http, settings)?;
        let server = HttpServer::new(config);

        lifecycle.transition(ServerState::Running);
        tracing::info!(routes = config.route_count(), "HTTP test server started");
        Ok(Self {
            lifecycle,
            runtime,
            server,
        })
    }

    /// The global HTTP test server, if one was started.
    pub fn global() -> Option<std::sync::Arc<Self>> {
        registry::HTTP.current()
    }

    /// Returns `true` if a global HTTP test server is running.
    pub fn global_is_started() -> bool {
        registry::HTTP.is_started()
    }
}

impl fmt::Debug for HttpTestServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTestServer")
            .field("state", &self.lifecycle.get())
            .finish_non_exhaustive()
    }
}

impl TestServer for HttpTestServer {
    fn kind(&self) -> HostKind {
        HostKind::Http
    }

    fn state(&self) -> ServerState {
        self.lifecycle.get()
    }

    fn send(&self, request: TestRequest) -> ProbeResult<CapturedResponse> {
        self.lifecycle.ensure_running()?;
        let request = request.into_http_request();
        self.runtime.block_on(async {
            let response = self.server.send(request).await;
            CapturedResponse::from_http(response).await
        })
    }

    fn stop(&self) {
        if !self.lifecycle.begin_stop() {
            return;
        }
        self.lifecycle.transition(ServerState::Stopped);
        tracing::info!("HTTP test server stopped");
    }
}

/// Loopback listener host for a [`Startup`] descriptor.
pub struct OwinTestServer {
    lifecycle: Lifecycle,
    runtime: Runtime,
    listener: RwLock<Option<ListenerServer>>,
    addr: SocketAddr,
    startup: &'static str,
}

impl OwinTestServer {
    /// Runs `S::configuration` and serves the resulting pipeline.
    pub fn start<S: Startup>(settings: &ProbeSettings) -> ProbeResult<Self> {
        let lifecycle = Lifecycle::new(HostKind::Owin);
        let runtime = build_runtime(HostKind::Owin, settings)?;
        let pipeline = startup::build_pipeline(&S::default());
        let listener = runtime.block_on(ListenerServer::start(pipeline, &settings.host_config()))?;
        let addr = listener.local_addr();

        lifecycle.transition(ServerState::Running);
        let startup = std::any::type_name::<S>();
        tracing::info!(%addr, startup, "OWIN test server started");
        Ok(Self {
            lifecycle,
            runtime,
            listener: RwLock::new(Some(listener)),
            addr,
            startup,
        })
    }

    /// The listener address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Type name of the startup descriptor.
    pub fn startup_name(&self) -> &'static str {
        self.startup
    }

    /// The global OWIN test server, if one was started.
    pub fn global() -> Option<std::sync::Arc<Self>> {
        registry::OWIN.current()
    }

    /// Returns `true` if a global OWIN test server is running.
    pub fn global_is_started() -> bool {
        registry::OWIN.is_started()
    }
}

impl fmt::Debug for OwinTestServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwinTestServer")
            .field("state", &self.lifecycle.get())
            .field("addr", &self.addr)
            .field("startup", &self.startup)
            .finish_non_exhaustive()
    }
}

impl TestServer for OwinTestServer {
    fn kind(&self) -> HostKind {
        HostKind::Owin
    }

    fn state(&self) -> ServerState {
        self.lifecycle.get()
    }

    fn send(&self, request: TestRequest) -> ProbeResult<CapturedResponse> {
        self.lifecycle.ensure_running()?;
        let guard = self.listener.read();
        let Some(listener) = guard.as_ref() else {
            return Err(ProbeError::ServerStopped(HostKind::Owin));
        };

        let request = request.into_http_request();
        self.runtime.block_on(async {
            match listener.send(request).await {
                Ok(response) => CapturedResponse::from_http(response).await,
                Err(e) => Err(ProbeError::from(e)),
            }
        })
    }

    fn stop(&self) {
        if !self.lifecycle.begin_stop() {
            return;
        }

        let listener = self.listener.write().take();
        if let Some(listener) = listener {
            self.runtime.block_on(listener.shutdown());
        }
        self.lifecycle.transition(ServerState::Stopped);
        tracing::info!(addr = %self.addr, "OWIN test server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use webprobe_host::{ActionContext, ActionResult, AppBuilder, Response, ResponseExt};

    #[derive(Default)]
    struct PingStartup;

    impl Startup for PingStartup {
        fn configuration(&self, app: &mut AppBuilder) {
            app.run(|request| async move {
                if request.uri().path() == "/ping" {
                    Response::empty(StatusCode::NO_CONTENT)
                } else {
                    Response::empty(StatusCode::NOT_FOUND)
                }
            });
        }
    }

    fn settings() -> ProbeSettings {
        ProbeSettings {
            worker_threads: 1,
            ..ProbeSettings::default()
        }
    }

    #[test]
    fn test_http_server_lifecycle() {
        let config = HttpConfiguration::new().route(
            Method::GET,
            "/values/{id}",
            |ctx: ActionContext| async move {
                let id: u32 = ctx.param("id")?;
                ActionResult::ok(&id)
            },
        );
        let server = HttpTestServer::start(&config, &settings()).unwrap();
        assert_eq!(server.kind(), HostKind::Http);
        assert_eq!(server.state(), ServerState::Running);

        let response = server
            .send(TestRequest::get("/values/7").build().unwrap())
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json::<u32>().unwrap(), 7);

        server.stop();
        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(!server.is_running());
    }

    #[test]
    fn test_stopped_http_server_rejects_requests() {
        let server = HttpTestServer::start(&HttpConfiguration::new(), &settings()).unwrap();
        server.stop();

        let err = server
            .send(TestRequest::get("/").build().unwrap())
            .unwrap_err();
        assert!(matches!(err, ProbeError::ServerStopped(HostKind::Http)));
    }

    #[test]
    fn test_owin_server_lifecycle() {
        let server = OwinTestServer::start::<PingStartup>(&settings()).unwrap();
        assert!(server.local_addr().ip().is_loopback());
        assert!(server.startup_name().ends_with("PingStartup"));

        let response = server
            .send(TestRequest::get("/ping").build().unwrap())
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        let err = server
            .send(TestRequest::get("/ping").build().unwrap())
            .unwrap_err();
        assert!(matches!(err, ProbeError::ServerStopped(HostKind::Owin)));
    }

    #[test]
    fn test_zero_worker_threads_is_an_error() {
        let settings = ProbeSettings {
            worker_threads: 0,
            ..settings()
        };
        let err = HttpTestServer::start(&HttpConfiguration::new(), &settings).unwrap_err();
        assert!(matches!(err, ProbeError::Settings(_)));
        let err = OwinTestServer::start::<PingStartup>(&settings).unwrap_err();
        assert!(matches!(err, ProbeError::Settings(_)));
    }

    #[test]
    fn test_owin_bind_failure() {
        let settings = ProbeSettings {
            bind_addr: "203.0.113.1:1".to_string(),
            ..settings()
        };
        let err = OwinTestServer::start::<PingStartup>(&settings).unwrap_err();
        assert!(matches!(err, ProbeError::Host(_)));
    }
}

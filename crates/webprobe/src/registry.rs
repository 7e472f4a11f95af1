//! Process-wide test state.
//!
//! One slot per host kind, plus the global [`HttpConfiguration`] and the
//! settings every test server is started with. Tests that touch this state
//! must not run in parallel with each other.

use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use webprobe_host::HttpConfiguration;

use crate::lifecycle::{HttpTestServer, OwinTestServer, TestServer};
use crate::settings::ProbeSettings;

/// Holds the global test server of one kind.
pub(crate) struct Slot<T> {
    current: Mutex<Option<Arc<T>>>,
}

impl<T: TestServer> Slot<T> {
    const fn new() -> Self {
        Self {
            current: const_mutex(None),
        }
    }

    pub(crate) fn current(&self) -> Option<Arc<T>> {
        self.current.lock().clone()
    }

    /// Makes `server` the global instance, stopping any previous one.
    pub(crate) fn install(&self, server: Arc<T>) {
        let previous = self.current.lock().replace(server);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Stops and removes the global instance.
    pub(crate) fn stop(&self) {
        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|server| server.is_running())
    }
}

pub(crate) static HTTP: Slot<HttpTestServer> = Slot::new();
pub(crate) static OWIN: Slot<OwinTestServer> = Slot::new();

static CONFIGURATION: Mutex<Option<HttpConfiguration>> = const_mutex(None);
static SETTINGS: Mutex<Option<ProbeSettings>> = const_mutex(None);

pub(crate) fn configuration() -> Option<HttpConfiguration> {
    CONFIGURATION.lock().clone()
}

pub(crate) fn set_configuration(config: Option<HttpConfiguration>) {
    tracing::debug!(present = config.is_some(), "global configuration replaced");
    *CONFIGURATION.lock() = config;
}

/// Settings for new test servers, loaded from the environment on first use.
pub(crate) fn settings() -> ProbeSettings {
    SETTINGS
        .lock()
        .get_or_insert_with(|| {
            ProbeSettings::load(None).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring invalid webprobe settings");
                ProbeSettings::default()
            })
        })
        .clone()
}

pub(crate) fn set_settings(settings: ProbeSettings) {
    *SETTINGS.lock() = Some(settings);
}

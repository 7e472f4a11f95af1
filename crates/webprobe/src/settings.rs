//! Test server settings.
//!
//! Settings are layered, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML document ([`ProbeSettings::from_toml_str`], [`ProbeSettings::from_file`])
//! 3. `WEBPROBE_*` environment variables ([`ProbeSettings::with_env_overrides`])
//!
//! [`ProbeSettings::load`] applies all three.
//!
//! ```toml
//! bind_addr = "127.0.0.1:0"
//! shutdown_timeout_ms = 2000
//! worker_threads = 2
//! log_level = "webprobe=debug"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use webprobe_host::HostConfig;

use crate::error::{ProbeError, ProbeResult};

/// Prefix of the environment variables read by [`ProbeSettings::with_env_overrides`].
pub const ENV_PREFIX: &str = "WEBPROBE_";

/// Settings shared by every test server the library starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    /// Listener address of startup-hosted servers.
    pub bind_addr: String,
    /// How long a stop waits for open connections, in milliseconds.
    pub shutdown_timeout_ms: u64,
    /// Worker threads of each test server runtime.
    pub worker_threads: usize,
    /// Filter directive used by [`init_test_logging`](crate::logging::init_test_logging).
    pub log_level: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            bind_addr: webprobe_host::config::DEFAULT_BIND_ADDR.to_string(),
            shutdown_timeout_ms: webprobe_host::config::DEFAULT_SHUTDOWN_TIMEOUT_MS,
            worker_threads: 2,
            log_level: "warn".to_string(),
        }
    }
}

impl ProbeSettings {
    /// Parses settings from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> ProbeResult<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProbeError::Settings(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.with_env_overrides()
    }

    /// Applies `WEBPROBE_*` environment variables from the process.
    pub fn with_env_overrides(self) -> ProbeResult<Self> {
        self.with_overrides(std::env::vars())
    }

    /// Applies `WEBPROBE_*` overrides from the given pairs.
    ///
    /// Unknown `WEBPROBE_*` keys are rejected; other keys are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> ProbeResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            match name {
                "BIND_ADDR" => self.bind_addr = value.to_string(),
                "SHUTDOWN_TIMEOUT_MS" => self.shutdown_timeout_ms = parse_env(key, value)?,
                "WORKER_THREADS" => self.worker_threads = parse_env(key, value)?,
                "LOG_LEVEL" => self.log_level = value.to_string(),
                _ => {
                    return Err(ProbeError::Settings(format!(
                        "unknown environment variable {key}"
                    )))
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// The drain timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Listener configuration derived from these settings.
    pub fn host_config(&self) -> HostConfig {
        HostConfig::builder()
            .bind_addr(self.bind_addr.clone())
            .shutdown_timeout(self.shutdown_timeout())
            .build()
    }

    /// Checks that a test server can be started with these settings.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.worker_threads == 0 {
            return Err(ProbeError::Settings(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        self.host_config().socket_addr()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ProbeResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ProbeError::Settings(format!("{key}: expected integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.bind_addr, "127.0.0.1:0");
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(settings.worker_threads, 2);
        assert_eq!(settings.host_config().bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ProbeSettings::from_toml_str("worker_threads = 4").unwrap();
        assert_eq!(settings.worker_threads, 4);
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_unknown_toml_key_is_rejected() {
        let err = ProbeSettings::from_toml_str("port = 80").unwrap_err();
        assert!(matches!(err, ProbeError::Settings(_)));
    }

    #[test]
    fn test_invalid_bind_addr_is_rejected() {
        let err = ProbeSettings::from_toml_str(r#"bind_addr = "loopback""#).unwrap_err();
        assert!(matches!(err, ProbeError::Host(_)));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        assert!(ProbeSettings::from_toml_str("worker_threads = 0").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "shutdown_timeout_ms = 250").unwrap();
        writeln!(file, r#"log_level = "debug""#).unwrap();

        let settings = ProbeSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.shutdown_timeout(), Duration::from_millis(250));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProbeSettings::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let settings = ProbeSettings::from_toml_str("worker_threads = 4")
            .unwrap()
            .with_overrides([
                ("WEBPROBE_WORKER_THREADS", "1"),
                ("WEBPROBE_BIND_ADDR", "127.0.0.1:8181"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();

        assert_eq!(settings.worker_threads, 1);
        assert_eq!(settings.bind_addr, "127.0.0.1:8181");
    }

    #[test]
    fn test_env_bad_integer() {
        let err = ProbeSettings::default()
            .with_overrides([("WEBPROBE_SHUTDOWN_TIMEOUT_MS", "soon")])
            .unwrap_err();
        assert!(err.to_string().contains("WEBPROBE_SHUTDOWN_TIMEOUT_MS"));
    }

    #[test]
    fn test_env_unknown_key() {
        let result = ProbeSettings::default().with_overrides([("WEBPROBE_COLOR", "red")]);
        assert!(result.is_err());
    }
}

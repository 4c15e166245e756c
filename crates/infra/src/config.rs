//! Configuration for remote command interfaces and the command server.

use std::path::PathBuf;
use std::time::Duration;

use crate::remote::codec::DEFAULT_MAX_FRAME_BYTES;

/// Environment variable overriding the socket path.
pub const SOCKET_ENV: &str = "CMDGRAPH_SOCKET";

/// Environment variable setting the remote response timeout in milliseconds.
/// `0` disables the timeout.
pub const TIMEOUT_ENV: &str = "CMDGRAPH_TIMEOUT_MS";

/// Default per-request timeout for remote calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `<runtime dir>/cmdgraph/cmdgraph.sock`, or the same below the system temp
/// dir when the platform has no runtime dir.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cmdgraph")
        .join("cmdgraph.sock")
}

/// Client-side settings for a remote command interface.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Unix socket of the controlled process
    pub socket_path: PathBuf,
    /// How long to wait for a response; `None` blocks indefinitely
    pub timeout: Option<Duration>,
    /// Largest frame accepted in either direction
    pub max_frame_bytes: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            timeout: Some(DEFAULT_TIMEOUT),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl RemoteConfig {
    /// Defaults, overridden by `CMDGRAPH_SOCKET` / `CMDGRAPH_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = std::env::var_os(SOCKET_ENV) {
            config.socket_path = PathBuf::from(path);
        }

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.timeout = None,
                Ok(ms) => config.timeout = Some(Duration::from_millis(ms)),
                Err(err) => {
                    tracing::warn!("ignoring {TIMEOUT_ENV}={raw:?}: {err}");
                }
            }
        }

        config
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

/// Settings for a [`CommandServer`](crate::remote::CommandServer) listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where to bind the Unix socket
    pub socket_path: PathBuf,
    /// Largest frame accepted in either direction
    pub max_frame_bytes: usize,
    /// How often the accept loop checks for shutdown
    pub poll_interval: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            poll_interval: Duration::from_millis(50),
            name: "cmdgraph-server".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

//! Broker configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                    | Default        |
//! |-----------------------------|----------------|
//! | `LISTEN_ADDR`               | `0.0.0.0:8080` |
//! | `WORKER_TOKEN`              | required       |
//! | `CLIENT_IDLE_TIMEOUT_SECS`  | `10`           |
//! | `WORKER_REPLY_TIMEOUT_SECS` | `0` (off)      |
//! | `SELECTION_POLICY`          | `fifo`         |
//! | `LOG_FORMAT`                | `text`         |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::domain::SelectionPolicy;

/// Default client idle timeout.
pub const DEFAULT_CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level broker configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Shared secret workers must present to register.
    pub worker_token: String,

    /// Longest a session waits for the next client frame.
    pub client_idle_timeout: Duration,

    /// Longest a session waits for a worker reply; `None` waits forever.
    pub worker_reply_timeout: Option<Duration>,

    /// How a free worker is picked for a new client.
    pub selection_policy: SelectionPolicy,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl RelayConfig {
    /// Creates a configuration with defaults and the given worker token.
    #[must_use]
    pub fn new(worker_token: impl Into<String>) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            worker_token: worker_token.into(),
            client_idle_timeout: DEFAULT_CLIENT_IDLE_TIMEOUT,
            worker_reply_timeout: None,
            selection_policy: SelectionPolicy::default(),
            json_logs: false,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `WORKER_TOKEN` is missing or empty, or if
    /// `LISTEN_ADDR` is set but cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("LISTEN_ADDR is not a valid socket address")?;

        let worker_token = std::env::var("WORKER_TOKEN").unwrap_or_default();
        if worker_token.trim().is_empty() {
            bail!("WORKER_TOKEN must be set to a non-empty secret");
        }

        let client_idle_timeout = Duration::from_secs(parse_env(
            "CLIENT_IDLE_TIMEOUT_SECS",
            DEFAULT_CLIENT_IDLE_TIMEOUT.as_secs(),
        ))
        .max(Duration::from_secs(1));

        let worker_reply_timeout = match parse_env("WORKER_REPLY_TIMEOUT_SECS", 0u64) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let selection_policy = parse_env("SELECTION_POLICY", SelectionPolicy::default());

        let json_logs = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            worker_token,
            client_idle_timeout,
            worker_reply_timeout,
            selection_policy,
            json_logs,
        })
    }
}

// The token stays out of logs.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("worker_token", &"<redacted>")
            .field("client_idle_timeout", &self.client_idle_timeout)
            .field("worker_reply_timeout", &self.worker_reply_timeout)
            .field("selection_policy", &self.selection_policy)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

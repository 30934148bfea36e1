//! Transport configuration: server address, handshake headers, reconnects.

use std::time::Duration;

use rand::Rng;
use tokio_tungstenite::tungstenite::http::Uri;
use trollbox_protocol::ENGINE_IO_VERSION;

use crate::TransportError;

/// The public trollbox server.
pub const DEFAULT_SERVER: &str = "http://www.windows93.net:8081";

/// Browser user agent the server expects to see.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/83.0.4103.61 Safari/537.36";

/// How long a connection attempt may take, from TCP connect to the Engine.IO
/// open packet.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// How the transport retries after losing its connection.
///
/// Delays grow as `initial_delay * 2^attempt`, capped at `max_delay`, with a
/// random deviation of up to `randomization_factor` of the delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Whether to reconnect at all.
    pub enabled: bool,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Jitter in `0.0..=1.0`. 0 disables jitter.
    pub randomization_factor: f64,

    /// Give up after this many failed attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(5_000),
            randomization_factor: 0.5,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based), jittered
    /// with a fresh random sample.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff(attempt, rand::rng().random::<f64>())
    }

    /// Deterministic core of [`delay_for`](Self::delay_for). `sample` is a
    /// uniform draw from `0.0..1.0`: its magnitude sets the deviation and
    /// its first decimal digit picks the sign.
    pub fn backoff(&self, attempt: u32, sample: f64) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * 2f64.powi(attempt.min(31) as i32);

        let jittered = if self.randomization_factor > 0.0 {
            let deviation = (sample * self.randomization_factor * base).floor();
            if ((sample * 10.0).floor() as u64) & 1 == 0 {
                base - deviation
            } else {
                base + deviation
            }
        } else {
            base
        };

        let capped = jittered.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Where and how to connect.
///
/// ```rust
/// use trollbox_transport::TransportConfig;
///
/// let config = TransportConfig::default();
/// assert_eq!(config.origin().unwrap(), "http://www.windows93.net");
/// assert_eq!(
///     config.websocket_url().unwrap(),
///     "ws://www.windows93.net:8081/socket.io/?EIO=3&transport=websocket",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server URL (`http`, `https`, `ws` or `wss`).
    pub server: String,

    /// Value of the `User-Agent` handshake header.
    pub user_agent: String,

    /// Retry behavior after a lost connection.
    pub reconnect: ReconnectPolicy,

    /// Upper bound on one connection attempt, including the wait for the
    /// Engine.IO open packet.
    pub handshake_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

impl TransportConfig {
    /// Configuration for the given server with default headers and
    /// reconnect policy.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            user_agent: USER_AGENT.to_owned(),
            reconnect: ReconnectPolicy::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Replaces the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Replaces the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    fn uri(&self) -> Result<Uri, TransportError> {
        self.server
            .parse::<Uri>()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", self.server)))
    }

    /// `<scheme>://<host>` of the server, without port or path.
    pub fn origin(&self) -> Result<String, TransportError> {
        let uri = self.uri()?;
        match (uri.scheme_str(), uri.host()) {
            (Some(scheme), Some(host)) => Ok(format!("{scheme}://{host}")),
            _ => Err(TransportError::InvalidAddress(format!(
                "{}: missing scheme or host",
                self.server
            ))),
        }
    }

    /// The Engine.IO WebSocket endpoint for the server.
    pub fn websocket_url(&self) -> Result<String, TransportError> {
        let uri = self.uri()?;
        let scheme = match uri.scheme_str() {
            Some("http") | Some("ws") => "ws",
            Some("https") | Some("wss") => "wss",
            other => {
                return Err(TransportError::InvalidAddress(format!(
                    "{}: unsupported scheme {other:?}",
                    self.server
                )));
            }
        };
        let authority = uri.authority().ok_or_else(|| {
            TransportError::InvalidAddress(format!("{}: missing host", self.server))
        })?;
        Ok(format!(
            "{scheme}://{authority}/socket.io/?EIO={ENGINE_IO_VERSION}&transport=websocket"
        ))
    }

    /// The per-connection headers the server expects, in order.
    pub fn handshake_headers(&self) -> Result<Vec<(&'static str, String)>, TransportError> {
        Ok(vec![
            ("Accept-Encoding", "identity".to_owned()),
            ("Accept-Language", "*".to_owned()),
            ("Connection", "keep-alive".to_owned()),
            ("Cookie", String::new()),
            ("Origin", self.origin()?),
            ("User-Agent", self.user_agent.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server() {
        assert_eq!(TransportConfig::default().server, "http://www.windows93.net:8081");
    }

    #[test]
    fn test_handshake_timeout_default_and_override() {
        let config = TransportConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(20));

        let config = config.with_handshake_timeout(Duration::from_millis(250));
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_handshake_headers_exact() {
        let headers = TransportConfig::default().handshake_headers().unwrap();
        assert_eq!(
            headers,
            vec![
                ("Accept-Encoding", "identity".to_owned()),
                ("Accept-Language", "*".to_owned()),
                ("Connection", "keep-alive".to_owned()),
                ("Cookie", String::new()),
                ("Origin", "http://www.windows93.net".to_owned()),
                (
                    "User-Agent",
                    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/83.0.4103.61 Safari/537.36"
                        .to_owned()
                ),
            ]
        );
    }

    #[test]
    fn test_origin_drops_port_and_path() {
        let config = TransportConfig::new("https://chat.example.org:9000/room");
        assert_eq!(config.origin().unwrap(), "https://chat.example.org");
    }

    #[test]
    fn test_websocket_url_maps_https_to_wss() {
        let config = TransportConfig::new("https://chat.example.org");
        assert_eq!(
            config.websocket_url().unwrap(),
            "wss://chat.example.org/socket.io/?EIO=3&transport=websocket"
        );
    }

    #[test]
    fn test_websocket_url_keeps_port() {
        let config = TransportConfig::new("http://127.0.0.1:4000");
        assert_eq!(
            config.websocket_url().unwrap(),
            "ws://127.0.0.1:4000/socket.io/?EIO=3&transport=websocket"
        );
    }

    #[test]
    fn test_address_without_scheme_is_invalid() {
        let config = TransportConfig::new("www.windows93.net");
        assert!(matches!(
            config.origin(),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            config.websocket_url(),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_unsupported_scheme_is_invalid() {
        let config = TransportConfig::new("ftp://example.org");
        assert!(matches!(
            config.websocket_url(),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_backoff_without_jitter_doubles_until_cap() {
        let policy = ReconnectPolicy {
            randomization_factor: 0.0,
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.backoff(0, 0.9), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(1, 0.9), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(2, 0.9), Duration::from_millis(4_000));
        assert_eq!(policy.backoff(3, 0.9), Duration::from_millis(5_000));
        assert_eq!(policy.backoff(40, 0.9), Duration::from_millis(5_000));
    }

    #[test]
    fn test_backoff_jitter_direction_follows_sample() {
        let policy = ReconnectPolicy::default();
        // 0.25 → deviation 125ms, first decimal 2 (even) → subtract.
        assert_eq!(policy.backoff(0, 0.25), Duration::from_millis(875));
        // 0.75 → deviation 375ms, first decimal 7 (odd) → add.
        assert_eq!(policy.backoff(0, 0.75), Duration::from_millis(1_375));
    }

    #[test]
    fn test_delay_for_stays_within_bounds() {
        let policy = ReconnectPolicy::default();
        for attempt in 0..10 {
            let delay = policy.delay_for(attempt);
            assert!(delay <= policy.max_delay);
            assert!(delay >= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_disabled_policy() {
        assert!(!ReconnectPolicy::disabled().enabled);
    }
}

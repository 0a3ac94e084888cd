use std::net::SocketAddr;

/// Backend the proxy relays to when `MEMORIE_PROXY_UPSTREAM` is unset.
pub const DEFAULT_UPSTREAM: &str = "http://ec2-18-144-65-149.us-west-1.compute.amazonaws.com:3000";

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8888";

/// Proxy configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the proxy binds to (default: 127.0.0.1:8888).
    pub listen: SocketAddr,
    /// Upstream base URL, without trailing slash.
    pub upstream: String,
    /// Leading path segment removed before forwarding, e.g. `/api`.
    pub strip_prefix: Option<String>,
}

impl Config {
    /// Load configuration from `MEMORIE_PROXY_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let listen = env("MEMORIE_PROXY_LISTEN")
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "invalid MEMORIE_PROXY_LISTEN; using {DEFAULT_LISTEN}");
                    None
                }
            })
            .unwrap_or_else(default_listen);

        let upstream = env("MEMORIE_PROXY_UPSTREAM")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string());

        let strip_prefix = env("MEMORIE_PROXY_STRIP_PREFIX")
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Self {
            listen,
            upstream: upstream.trim_end_matches('/').to_string(),
            strip_prefix,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8888))
}

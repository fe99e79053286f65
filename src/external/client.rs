use std::sync::LazyLock;
use std::time::Duration;

/// User-Agent sent with probes and alert relays
pub const USER_AGENT: &str = concat!("cronhook/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for every outbound call.
///
/// Built lazily on first access and reused so probes share one connection
/// pool. Per-request timeouts are set by callers; the client-wide values are
/// an upper bound.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
});

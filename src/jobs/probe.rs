//! Single outbound attempt against a job's target URL.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::external::HTTP_CLIENT;

/// Why a probe did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The target answered 403, typically a CORS-style rejection.
    Forbidden,
    /// Timed out or could not connect.
    NoResponse { reason: String },
    /// Any other non-2xx/3xx status or transport error.
    Failed { status: Option<u16>, reason: String },
}

impl ProbeFailure {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ProbeFailure::Forbidden => "CORS_REJECTED",
            ProbeFailure::NoResponse { .. } => "NO_RESPONSE",
            ProbeFailure::Failed { .. } => "PROBE_FAILED",
        }
    }

    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::FORBIDDEN {
            ProbeFailure::Forbidden
        } else {
            ProbeFailure::Failed {
                status: Some(status.as_u16()),
                reason: format!("unexpected status {}", status),
            }
        }
    }

    fn from_error(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            ProbeFailure::NoResponse {
                reason: error.to_string(),
            }
        } else {
            ProbeFailure::Failed {
                status: error.status().map(|s| s.as_u16()),
                reason: error.to_string(),
            }
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Forbidden => write!(f, "target rejected the request (403)"),
            ProbeFailure::NoResponse { reason } => write!(f, "no response: {}", reason),
            ProbeFailure::Failed { reason, .. } => write!(f, "{}", reason),
        }
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// One attempt, bounded by `timeout`. 2xx and 3xx count as success.
    async fn attempt(&self, url: &str, timeout: Duration) -> Result<(), ProbeFailure>;
}

/// `HEAD` request through the shared HTTP client. A 3xx that reaches the
/// check (redirect limit hit, or a bare 304) still counts as reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

#[async_trait]
impl Probe for HttpProbe {
    async fn attempt(&self, url: &str, timeout: Duration) -> Result<(), ProbeFailure> {
        let response = HTTP_CLIENT
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(ProbeFailure::from_error)?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(ProbeFailure::from_status(status))
        }
    }
}

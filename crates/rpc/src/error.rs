use std::sync::Arc;

use reqwest::StatusCode;
use snafu::Snafu;

use crate::transport::TransportError;

/// Why a single attempt against a single node failed
///
/// Never returned to callers on its own; only as the last error of
/// [`RpcError::AllNodesFailed`].
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AttemptError {
    #[snafu(display("Transport failure"))]
    Transport { source: Arc<TransportError> },
    #[snafu(display("HTTP status {status}"))]
    HttpStatus { status: u16, body: String },
    #[snafu(display("JSON-RPC error {code}: {message}"))]
    RpcPayload { code: i64, message: String },
    #[snafu(display("No response within {timeout_ms}ms"))]
    Timeout { timeout_ms: u64 },
    #[snafu(display("Invalid response: {reason}"))]
    InvalidResponse { reason: String },
}

impl AttemptError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AttemptError::Transport { .. })
    }

    /// Did the node tell us to slow down
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AttemptError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            AttemptError::RpcPayload { message, .. } => {
                let message = message.to_lowercase();
                message.contains("rate limit") || message.contains("too many requests")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RpcError {
    /// Every node in the traversal was tried and failed
    #[snafu(display(
        "All {attempted_nodes} attempted nodes failed ({skipped_nodes} skipped with open circuit)"
    ))]
    AllNodesFailed {
        attempted_nodes: usize,
        skipped_nodes: usize,
        #[snafu(source)]
        last_error: AttemptError,
    },
    /// Every node had its circuit open; no request was sent
    #[snafu(display("Circuit open for all {skipped_nodes} nodes"))]
    CircuitOpen { skipped_nodes: usize },
}

impl RpcError {
    pub fn last_error(&self) -> Option<&AttemptError> {
        match self {
            RpcError::AllNodesFailed { last_error, .. } => Some(last_error),
            RpcError::CircuitOpen { .. } => None,
        }
    }
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

#[test]
fn rate_limit_detection() {
    assert!(
        AttemptError::HttpStatus {
            status: 429,
            body: String::new()
        }
        .is_rate_limited()
    );
    assert!(
        AttemptError::RpcPayload {
            code: -32000,
            message: "Rate limit exceeded, slow down".into()
        }
        .is_rate_limited()
    );
    assert!(
        !AttemptError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_rate_limited()
    );
    assert!(!AttemptError::Timeout { timeout_ms: 10 }.is_rate_limited());
}

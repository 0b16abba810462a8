use std::fmt;

use nodeweave_rpc::RpcError;
use serde::Serialize;
use snafu::Snafu;

/// Why a read could not be served fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    CircuitOpen,
    AllNodesFailed,
    RateLimited,
    Timeout,
    NetworkError,
}

impl DegradationReason {
    pub const ALL: [DegradationReason; 5] = [
        DegradationReason::CircuitOpen,
        DegradationReason::AllNodesFailed,
        DegradationReason::RateLimited,
        DegradationReason::Timeout,
        DegradationReason::NetworkError,
    ];

    /// Is retrying later expected to help
    ///
    /// An open circuit means the node set was just deemed broken; hammering
    /// it again right away is what the circuit is there to prevent.
    pub fn is_retryable(self) -> bool {
        !matches!(self, DegradationReason::CircuitOpen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DegradationReason::CircuitOpen => "circuit_open",
            DegradationReason::AllNodesFailed => "all_nodes_failed",
            DegradationReason::RateLimited => "rate_limited",
            DegradationReason::Timeout => "timeout",
            DegradationReason::NetworkError => "network_error",
        }
    }

    pub(crate) fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read that failed and could not be served from cache either
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)), display("Read failed: {reason}"))]
pub struct DegradationError {
    reason: DegradationReason,
    source: RpcError,
}

impl DegradationError {
    pub fn reason(&self) -> DegradationReason {
        self.reason
    }

    pub fn is_retryable(&self) -> bool {
        self.reason.is_retryable()
    }

    pub fn rpc_error(&self) -> &RpcError {
        &self.source
    }
}

#[test]
fn only_circuit_open_is_not_retryable() {
    for reason in DegradationReason::ALL {
        assert_eq!(
            reason.is_retryable(),
            reason != DegradationReason::CircuitOpen
        );
    }
}

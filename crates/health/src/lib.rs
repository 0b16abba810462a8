// SPDX-License-Identifier: MIT

//! Node health tracking
//!
//! [`NodeHealthManager`] scores every known JSON-RPC node from the outcomes
//! of real calls and of background probes, and hands out the order in which
//! nodes should be tried. Health data is advisory: reading it never waits
//! for anything, and the static node list is always part of the order.
mod config;
mod manager;
mod report;

pub use config::HealthConfig;
pub use manager::{HealthInitError, NodeHealthManager};
pub use report::{HealthReport, NodeHealth};

use std::time::Duration;

const LOG_TARGET: &str = "nodeweave::health";

/// Result of a single request to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOutcome {
    pub success: bool,
    pub latency: Duration,
}

impl NodeOutcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
        }
    }

    pub fn failure(latency: Duration) -> Self {
        Self {
            success: false,
            latency,
        }
    }
}

use nodeweave_core::node_url::NodeUrl;
use serde::Serialize;

/// Snapshot of the stats of a single node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealth {
    pub url: NodeUrl,
    pub success_count: u64,
    pub failure_count: u64,
    pub sample_count: usize,
    pub consecutive_failures: u32,
    pub avg_latency_ms: Option<u64>,
    pub health_score: f64,
    pub last_probed_secs_ago: Option<u64>,
    pub circuit_open: bool,
}

/// Snapshot of all nodes, in configured order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub nodes: Vec<NodeHealth>,
}

impl HealthReport {
    pub fn get(&self, url: &NodeUrl) -> Option<&NodeHealth> {
        self.nodes.iter().find(|n| &n.url == url)
    }

    /// Nodes whose circuit is currently closed
    pub fn available(&self) -> usize {
        self.nodes.iter().filter(|n| !n.circuit_open).count()
    }
}

use std::time::Duration;

/// Tunables of [`crate::NodeHealthManager`]
#[derive(Debug, Clone, bon::Builder)]
pub struct HealthConfig {
    /// Below this many samples a node gets the neutral score
    #[builder(default = 3)]
    pub min_samples: usize,
    /// Number of most recent outcomes kept per node
    #[builder(default = 20)]
    pub sample_window: usize,
    /// Average latency at which the latency penalty maxes out
    #[builder(default = Duration::from_secs(2))]
    pub latency_ceiling: Duration,
    /// Consecutive failures after which the node's circuit opens
    #[builder(default = 5)]
    pub circuit_failure_threshold: u32,
    /// How long an open circuit keeps the node out of rotation
    #[builder(default = Duration::from_secs(30))]
    pub circuit_cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

use std::time::Duration;

use nodeweave_cache::CacheConfig;
use nodeweave_core::node_url::NodeUrl;
use nodeweave_health::HealthConfig;
use nodeweave_rpc::FailoverConfig;

/// Public Hive API nodes used when none are configured
pub const DEFAULT_NODES: &[&str] = &[
    "https://api.hive.blog",
    "https://api.deathwing.me",
    "https://anyx.io",
    "https://api.openhive.network",
];

pub fn default_nodes() -> Vec<NodeUrl> {
    DEFAULT_NODES
        .iter()
        .map(|url| url.parse().expect("Can't fail"))
        .collect()
}

#[derive(Debug, Clone, bon::Builder)]
pub struct WeaveConfig {
    /// Static node list, in order of preference
    #[builder(default = default_nodes())]
    pub nodes: Vec<NodeUrl>,
    #[builder(default)]
    pub health: HealthConfig,
    #[builder(default)]
    pub failover: FailoverConfig,
    #[builder(default)]
    pub cache: CacheConfig,
    /// Attempt timeout of resource credit reads
    #[builder(default = Duration::from_secs(2))]
    pub rc_attempt_timeout: Duration,
    /// Period of background node probing, zero disables it
    #[builder(default = Duration::from_secs(60))]
    pub probe_interval: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

use std::time::Duration;

use clap::{Parser, Subcommand};
use nodeweave_cache::CacheConfig;
use nodeweave_core::namespace::ApiNamespace;
use nodeweave_core::node_url::NodeUrl;
use nodeweave_health::HealthConfig;
use nodeweave_rpc::FailoverConfig;

use crate::config::{WeaveConfig, default_nodes};

#[derive(Parser, Debug)]
#[command(version, about = "Resilient reads from Hive JSON-RPC nodes")]
pub(crate) struct Opts {
    /// Node urls, comma separated, in order of preference
    #[arg(long, env = "NODEWEAVE_NODES", value_delimiter = ',', global = true)]
    pub nodes: Vec<NodeUrl>,

    #[arg(long, env = "NODEWEAVE_CACHE_TTL_MS", default_value_t = 30_000, global = true)]
    pub cache_ttl_ms: u64,

    #[arg(long, env = "NODEWEAVE_MAX_STALE_MS", default_value_t = 300_000, global = true)]
    pub max_stale_ms: u64,

    #[arg(long, env = "NODEWEAVE_ATTEMPT_TIMEOUT_MS", default_value_t = 8_000, global = true)]
    pub attempt_timeout_ms: u64,

    #[arg(
        long,
        env = "NODEWEAVE_RC_ATTEMPT_TIMEOUT_MS",
        default_value_t = 2_000,
        global = true
    )]
    pub rc_attempt_timeout_ms: u64,

    #[arg(long, env = "NODEWEAVE_MIN_HEALTH_SAMPLES", default_value_t = 3, global = true)]
    pub min_health_samples: usize,

    #[arg(long, env = "NODEWEAVE_INTER_NODE_DELAY_MS", default_value_t = 50, global = true)]
    pub inter_node_delay_ms: u64,

    #[arg(long, env = "NODEWEAVE_CACHE_CAPACITY", default_value_t = 10_000, global = true)]
    pub cache_capacity: usize,

    /// Background probing period, 0 disables
    #[arg(long, env = "NODEWEAVE_PROBE_INTERVAL_SECS", default_value_t = 60, global = true)]
    pub probe_interval_secs: u64,

    /// Log debug details of the read path
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Opts {
    pub fn weave_config(&self) -> WeaveConfig {
        let nodes = if self.nodes.is_empty() {
            default_nodes()
        } else {
            self.nodes.clone()
        };

        WeaveConfig::builder()
            .nodes(nodes)
            .health(
                HealthConfig::builder()
                    .min_samples(self.min_health_samples)
                    .build(),
            )
            .failover(
                FailoverConfig::builder()
                    .attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
                    .inter_node_delay(Duration::from_millis(self.inter_node_delay_ms))
                    .build(),
            )
            .cache(
                CacheConfig::builder()
                    .capacity(self.cache_capacity)
                    .default_ttl(Duration::from_millis(self.cache_ttl_ms))
                    .default_max_stale_age(Duration::from_millis(self.max_stale_ms))
                    .build(),
            )
            .rc_attempt_timeout(Duration::from_millis(self.rc_attempt_timeout_ms))
            .probe_interval(Duration::from_secs(self.probe_interval_secs))
            .build()
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Call any method, e.g. `call condenser_api get_accounts '[["alice"]]'`
    Call {
        namespace: ApiNamespace,
        method: String,
        /// JSON params, `[]` if omitted
        params: Option<String>,
    },
    /// Resource credit percentage of an account
    Rc { account: String },
    /// Account details
    Account { name: String },
    /// Probe all nodes and print their health
    Health,
}

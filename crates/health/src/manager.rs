use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use nodeweave_core::node_url::NodeUrl;
use snafu::{Snafu, ensure};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::report::{HealthReport, NodeHealth};
use crate::{HealthConfig, LOG_TARGET, NodeOutcome};

/// Score of nodes we don't know enough about yet
const NEUTRAL_SCORE: f64 = 0.5;
/// Share of the score that a maxed-out latency penalty takes away
const MAX_LATENCY_PENALTY: f64 = 0.5;

#[derive(Debug, Snafu)]
pub enum HealthInitError {
    #[snafu(display("At least one node must be configured"))]
    NoNodes,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    success: bool,
    latency: Duration,
}

#[derive(Debug)]
struct NodeRecord {
    url: NodeUrl,
    success_count: u64,
    failure_count: u64,
    samples: VecDeque<Sample>,
    last_probed_at: Option<Instant>,
    consecutive_failures: u32,
    circuit_open_until: Option<Instant>,
}

impl NodeRecord {
    fn new(url: NodeUrl) -> Self {
        Self {
            url,
            success_count: 0,
            failure_count: 0,
            samples: VecDeque::new(),
            last_probed_at: None,
            consecutive_failures: 0,
            circuit_open_until: None,
        }
    }

    /// Recency-weighted success ratio times the latency penalty
    ///
    /// The newest sample weighs `n`, the oldest `1`.
    fn score(&self, config: &HealthConfig) -> f64 {
        if self.samples.len() < config.min_samples.max(1) {
            return NEUTRAL_SCORE;
        }

        let mut weighted_success = 0.0;
        let mut total_weight = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let weight = (i + 1) as f64;
            total_weight += weight;
            if sample.success {
                weighted_success += weight;
            }
        }
        let success_ratio = weighted_success / total_weight;

        let penalty = match self.avg_latency() {
            Some(avg) if !config.latency_ceiling.is_zero() => {
                (avg.as_secs_f64() / config.latency_ceiling.as_secs_f64()).min(1.0)
            }
            _ => 0.0,
        };

        (success_ratio * (1.0 - MAX_LATENCY_PENALTY * penalty)).clamp(0.0, 1.0)
    }

    fn avg_latency(&self) -> Option<Duration> {
        let n: u32 = self.samples.len().try_into().ok()?;
        if n == 0 {
            return None;
        }
        Some(self.samples.iter().map(|s| s.latency).sum::<Duration>() / n)
    }

    fn is_circuit_open(&self, now: Instant) -> bool {
        self.circuit_open_until.is_some_and(|until| now < until)
    }
}

/// Tracks health of every node and decides the order to try them in
///
/// Constructed once per process (or per test) and shared behind an `Arc`.
pub struct NodeHealthManager {
    /// Configured nodes, in configured order; the first one is the default
    static_nodes: Vec<NodeUrl>,
    config: HealthConfig,
    records: Mutex<Vec<NodeRecord>>,
}

impl NodeHealthManager {
    pub fn new(
        static_nodes: impl IntoIterator<Item = NodeUrl>,
        config: HealthConfig,
    ) -> Result<Self, HealthInitError> {
        let mut seen = HashSet::new();
        let static_nodes: Vec<NodeUrl> = static_nodes
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        ensure!(!static_nodes.is_empty(), NoNodesSnafu);

        let records = static_nodes.iter().cloned().map(NodeRecord::new).collect();

        Ok(Self {
            static_nodes,
            config,
            records: Mutex::new(records),
        })
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn static_nodes(&self) -> &[NodeUrl] {
        &self.static_nodes
    }

    /// Nodes to try, healthiest first
    ///
    /// The static node list is always appended, so the result is never empty
    /// and every configured node is reachable even without health data.
    /// Duplicates are removed, keeping the first occurrence.
    pub fn ordered_nodes(&self) -> Vec<NodeUrl> {
        let mut scored: Vec<(NodeUrl, f64)> = {
            let records = self.records.lock().expect("Locking failed");
            records
                .iter()
                .map(|r| (r.url.clone(), r.score(&self.config)))
                .collect()
        };
        // Stable, so equally scored nodes keep configured order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .map(|(url, _)| url)
            .chain(self.static_nodes.iter().cloned())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Record the outcome of a regular call to `url`
    pub fn record_outcome(&self, url: &NodeUrl, outcome: NodeOutcome) {
        self.record(url, outcome, false);
    }

    /// Record the outcome of a background probe of `url`
    pub fn record_probe(&self, url: &NodeUrl, outcome: NodeOutcome) {
        self.record(url, outcome, true);
    }

    fn record(&self, url: &NodeUrl, outcome: NodeOutcome, probe: bool) {
        let now = Instant::now();
        let mut records = self.records.lock().expect("Locking failed");

        let idx = match records.iter().position(|r| &r.url == url) {
            Some(idx) => idx,
            None => {
                debug!(target: LOG_TARGET, %url, "Tracking previously unknown node");
                records.push(NodeRecord::new(url.clone()));
                records.len() - 1
            }
        };
        let record = &mut records[idx];

        record.samples.push_back(Sample {
            success: outcome.success,
            latency: outcome.latency,
        });
        while self.config.sample_window < record.samples.len() {
            record.samples.pop_front();
        }
        if probe {
            record.last_probed_at = Some(now);
        }

        if outcome.success {
            record.success_count += 1;
            record.consecutive_failures = 0;
            if record.circuit_open_until.take().is_some() {
                debug!(target: LOG_TARGET, %url, "Node circuit closed");
            }
        } else {
            record.failure_count += 1;
            record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            if self.config.circuit_failure_threshold <= record.consecutive_failures
                && !record.is_circuit_open(now)
            {
                record.circuit_open_until = Some(now + self.config.circuit_cooldown);
                warn!(
                    target: LOG_TARGET,
                    %url,
                    consecutive_failures = record.consecutive_failures,
                    cooldown_secs = self.config.circuit_cooldown.as_secs(),
                    "Node circuit opened after repeated failures"
                );
            }
        }

        trace!(
            target: LOG_TARGET,
            %url,
            success = outcome.success,
            latency_ms = outcome.latency.as_millis(),
            probe,
            "Recorded node outcome"
        );
    }

    /// Is `url` temporarily taken out of rotation
    pub fn is_circuit_open(&self, url: &NodeUrl) -> bool {
        let now = Instant::now();
        self.records
            .lock()
            .expect("Locking failed")
            .iter()
            .find(|r| &r.url == url)
            .is_some_and(|r| r.is_circuit_open(now))
    }

    pub fn health_report(&self) -> HealthReport {
        let now = Instant::now();
        let records = self.records.lock().expect("Locking failed");

        HealthReport {
            nodes: records
                .iter()
                .map(|r| NodeHealth {
                    url: r.url.clone(),
                    success_count: r.success_count,
                    failure_count: r.failure_count,
                    sample_count: r.samples.len(),
                    consecutive_failures: r.consecutive_failures,
                    avg_latency_ms: r
                        .avg_latency()
                        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                    health_score: r.score(&self.config),
                    last_probed_secs_ago: r
                        .last_probed_at
                        .map(|at| now.saturating_duration_since(at).as_secs()),
                    circuit_open: r.is_circuit_open(now),
                })
                .collect(),
        }
    }
}

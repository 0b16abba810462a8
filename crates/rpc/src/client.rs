use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nodeweave_core::namespace::ApiNamespace;
use nodeweave_core::node_url::NodeUrl;
use nodeweave_core::timestamp::{parse_chain_time, unix_now_secs};
use nodeweave_health::{NodeHealthManager, NodeOutcome};
use nodeweave_util_error::fmt::FmtCompact as _;
use serde_json::Value;
use snafu::{IntoError as _, ResultExt as _};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::LOG_TARGET;
use crate::error::{
    AllNodesFailedSnafu, AttemptError, CircuitOpenSnafu, HttpStatusSnafu, InvalidResponseSnafu,
    RpcPayloadSnafu, RpcResult, TimeoutSnafu, TransportSnafu,
};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::methods::{GetDynamicGlobalProperties, RpcRequest};
use crate::transport::RpcTransport;

/// Longest prefix of a non-2xx body kept for diagnostics
const MAX_ERROR_BODY_LEN: usize = 256;

#[derive(Debug, Clone, bon::Builder)]
pub struct FailoverConfig {
    /// Deadline of a single attempt against a single node
    #[builder(default = Duration::from_secs(8))]
    pub attempt_timeout: Duration,
    /// Pause between giving up on one node and trying the next one
    #[builder(default = Duration::from_millis(50))]
    pub inter_node_delay: Duration,
    /// Probes fail nodes whose head block is older than this
    #[builder(default = Duration::from_secs(90))]
    pub max_head_lag: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Sends each call to the healthiest node, moving on to the next one on
/// failure
///
/// Attempts are strictly sequential: a call never has more than one request
/// outstanding, so a struggling node set is not hit harder by retries.
pub struct FailoverClient {
    health: Arc<NodeHealthManager>,
    transport: Arc<dyn RpcTransport>,
    config: FailoverConfig,
    next_id: AtomicU64,
}

impl FailoverClient {
    pub fn new(
        health: Arc<NodeHealthManager>,
        transport: Arc<dyn RpcTransport>,
        config: FailoverConfig,
    ) -> Self {
        Self {
            health,
            transport,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub fn health(&self) -> &Arc<NodeHealthManager> {
        &self.health
    }

    /// Call `namespace.method` and return the raw `result`
    ///
    /// `timeout` limits each attempt, not the whole call; `None` uses the
    /// configured attempt timeout.
    pub async fn call(
        &self,
        namespace: ApiNamespace,
        method: &str,
        params: &Value,
        timeout: Option<Duration>,
    ) -> RpcResult<Value> {
        self.call_with(namespace, method, params, timeout, Ok).await
    }

    /// Call a typed request, decoding its `result`
    ///
    /// A node whose `result` does not decode is treated as failed, and the
    /// next node is tried.
    pub async fn call_typed<R>(&self, request: &R, timeout: Option<Duration>) -> RpcResult<R::Response>
    where
        R: RpcRequest,
    {
        self.call_with(
            R::NAMESPACE,
            R::METHOD,
            &request.params(),
            timeout,
            |value| serde_json::from_value(value).map_err(|err| err.to_string()),
        )
        .await
    }

    async fn call_with<T>(
        &self,
        namespace: ApiNamespace,
        method: &str,
        params: &Value,
        timeout: Option<Duration>,
        decode: impl Fn(Value) -> Result<T, String>,
    ) -> RpcResult<T> {
        let wire_method = namespace.wire_method(method);
        let timeout = timeout.unwrap_or(self.config.attempt_timeout);
        let nodes = self.health.ordered_nodes();

        let mut attempted_nodes: usize = 0;
        let mut skipped_nodes: usize = 0;
        let mut last_error = None;

        for url in &nodes {
            if self.health.is_circuit_open(url) {
                trace!(target: LOG_TARGET, %url, method = %wire_method, "Skipping node with open circuit");
                skipped_nodes += 1;
                continue;
            }

            if attempted_nodes != 0 {
                tokio::time::sleep(self.config.inter_node_delay).await;
            }
            attempted_nodes += 1;

            let start = Instant::now();
            let res = self
                .attempt(url, &wire_method, params, timeout)
                .await
                .and_then(|value| {
                    decode(value).map_err(|reason| InvalidResponseSnafu { reason }.build())
                });
            let latency = start.elapsed();

            match res {
                Ok(value) => {
                    self.health
                        .record_outcome(url, NodeOutcome::success(latency));
                    trace!(
                        target: LOG_TARGET,
                        %url,
                        method = %wire_method,
                        latency_ms = latency.as_millis(),
                        "Call succeeded"
                    );
                    return Ok(value);
                }
                Err(err) => {
                    self.health
                        .record_outcome(url, NodeOutcome::failure(latency));
                    trace!(
                        target: LOG_TARGET,
                        %url,
                        method = %wire_method,
                        err = %err.fmt_compact(),
                        "Node attempt failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let Some(last_error) = last_error else {
            debug!(target: LOG_TARGET, method = %wire_method, skipped_nodes, "All node circuits open");
            return CircuitOpenSnafu { skipped_nodes }.fail();
        };

        debug!(
            target: LOG_TARGET,
            method = %wire_method,
            attempted_nodes,
            skipped_nodes,
            err = %last_error.fmt_compact(),
            "All nodes failed"
        );
        Err(AllNodesFailedSnafu {
            attempted_nodes,
            skipped_nodes,
        }
        .into_error(last_error))
    }

    /// One request to one node, under a deadline
    ///
    /// On timeout the request future is dropped, so a late response is never
    /// looked at.
    async fn attempt(
        &self,
        url: &NodeUrl,
        wire_method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Value, AttemptError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&JsonRpcRequest::new(wire_method, params, id))
            .expect("Can't fail");

        let resp = match tokio::time::timeout(timeout, self.transport.post_json(url, body)).await {
            Ok(resp) => resp.map_err(Arc::new).context(TransportSnafu)?,
            Err(_elapsed) => {
                return TimeoutSnafu {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
                .fail();
            }
        };

        if !(200..300).contains(&resp.status) {
            let body = String::from_utf8_lossy(&resp.body);
            return HttpStatusSnafu {
                status: resp.status,
                body: body.chars().take(MAX_ERROR_BODY_LEN).collect::<String>(),
            }
            .fail();
        }

        match JsonRpcResponse::from_slice(&resp.body)
            .map_err(|reason| InvalidResponseSnafu { reason }.build())?
        {
            JsonRpcResponse::Result(value) => Ok(value),
            JsonRpcResponse::Error(err) => RpcPayloadSnafu {
                code: err.code,
                message: err.message,
            }
            .fail(),
        }
    }

    /// Probe every configured node once and record the outcomes
    ///
    /// A node counts as healthy if it answers
    /// `get_dynamic_global_properties` in time with a head block no older
    /// than the configured lag. Nodes are probed one after another. Returns
    /// the number of healthy nodes.
    pub async fn probe_nodes(&self) -> usize {
        let params = GetDynamicGlobalProperties.params();
        let wire_method = GetDynamicGlobalProperties::NAMESPACE
            .wire_method(GetDynamicGlobalProperties::METHOD);
        let mut healthy = 0;

        for url in self.health.static_nodes() {
            let start = Instant::now();
            let res = self
                .attempt(url, &wire_method, &params, self.config.attempt_timeout)
                .await
                .and_then(|value| self.check_head_lag(value));
            let latency = start.elapsed();

            match res {
                Ok(()) => {
                    healthy += 1;
                    self.health.record_probe(url, NodeOutcome::success(latency));
                }
                Err(err) => {
                    debug!(target: LOG_TARGET, %url, err = %err.fmt_compact(), "Node probe failed");
                    self.health.record_probe(url, NodeOutcome::failure(latency));
                }
            }
        }

        healthy
    }

    fn check_head_lag(&self, value: Value) -> Result<(), AttemptError> {
        let props: <GetDynamicGlobalProperties as RpcRequest>::Response =
            serde_json::from_value(value).map_err(|err| {
                InvalidResponseSnafu {
                    reason: err.to_string(),
                }
                .build()
            })?;
        let head_time = parse_chain_time(&props.time).ok_or_else(|| {
            InvalidResponseSnafu {
                reason: format!("unparseable head block time {:?}", props.time),
            }
            .build()
        })?;

        let lag = unix_now_secs().saturating_sub(head_time);
        let max_lag = i64::try_from(self.config.max_head_lag.as_secs()).unwrap_or(i64::MAX);
        if max_lag < lag {
            return InvalidResponseSnafu {
                reason: format!(
                    "head block {} is {lag}s behind",
                    props.head_block_number
                ),
            }
            .fail();
        }

        Ok(())
    }
}

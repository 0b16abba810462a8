//! The composed read path
//!
//! A read goes through the cache, falls through to a deduplicated fetch, and
//! the fetch goes through the failover client. Failed fetches are answered
//! with stale data where allowed.
use std::sync::Arc;
use std::time::Duration;

use n0_future::task::AbortOnDropHandle;
use nodeweave_cache::{
    CacheTier, DegradationError, DegradationManager, DegradationStatus, FetchOptions, Fetched,
};
use nodeweave_core::key::RequestKey;
use nodeweave_core::namespace::ApiNamespace;
use nodeweave_core::rc::{RcPercent, current_percentage};
use nodeweave_core::timestamp::unix_now_secs;
use nodeweave_dedup::Deduplicator;
use nodeweave_health::{HealthReport, NodeHealthManager};
use nodeweave_rpc::methods::FindRcAccounts;
use nodeweave_rpc::{FailoverClient, HttpTransport, RpcRequest, RpcTransport};
use serde::Serialize;
use serde_json::Value;
use snafu::OptionExt as _;
use tracing::{debug, info};

use crate::config::WeaveConfig;
use crate::error::{AccountNotFoundSnafu, RcError, WeaveInitError};

const LOG_TARGET: &str = "nodeweave::weave";

/// Resource credits of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RcReading {
    pub account: String,
    /// `None` if the account has no mana capacity
    pub percentage: Option<f64>,
    pub stale: bool,
    pub stale_age_ms: Option<u64>,
}

pub struct Weave {
    client: Arc<FailoverClient>,
    dedup: Deduplicator,
    degradation: DegradationManager,
    config: WeaveConfig,
}

impl Weave {
    /// Build the read layer over plain HTTP
    pub fn new(config: WeaveConfig) -> Result<Self, WeaveInitError> {
        let transport = HttpTransport::new(config.connect_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: WeaveConfig,
        transport: Arc<dyn RpcTransport>,
    ) -> Result<Self, WeaveInitError> {
        let health = Arc::new(NodeHealthManager::new(
            config.nodes.iter().cloned(),
            config.health.clone(),
        )?);
        let client = Arc::new(FailoverClient::new(
            health,
            transport,
            config.failover.clone(),
        ));

        Ok(Self {
            client,
            dedup: Deduplicator::new(),
            degradation: DegradationManager::new(config.cache.clone()),
            config,
        })
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<FailoverClient> {
        &self.client
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn degradation(&self) -> &DegradationManager {
        &self.degradation
    }

    /// Read a typed request through the cache
    pub async fn read<R>(
        &self,
        request: &R,
        options: impl Into<FetchOptions>,
    ) -> Result<Fetched<R::Response>, DegradationError>
    where
        R: RpcRequest + Clone + Send + Sync + 'static,
    {
        self.read_with_timeout(request, options.into(), None).await
    }

    async fn read_with_timeout<R>(
        &self,
        request: &R,
        options: FetchOptions,
        timeout: Option<Duration>,
    ) -> Result<Fetched<R::Response>, DegradationError>
    where
        R: RpcRequest + Clone + Send + Sync + 'static,
    {
        let key = request.key();
        let client = self.client.clone();
        let request = request.clone();

        self.degradation
            .get_or_fetch(
                key.clone(),
                || {
                    self.dedup.run(key, move || async move {
                        client.call_typed(&request, timeout).await
                    })
                },
                &options,
            )
            .await
    }

    /// Read an arbitrary method, returning the raw `result`
    pub async fn call_raw(
        &self,
        namespace: ApiNamespace,
        method: &str,
        params: Value,
        options: impl Into<FetchOptions>,
    ) -> Result<Fetched<Value>, DegradationError> {
        let key = RequestKey::for_call(namespace, method, &params);
        let client = self.client.clone();
        let method = method.to_owned();

        self.degradation
            .get_or_fetch(
                key.clone(),
                || {
                    self.dedup.run(key, move || async move {
                        client.call(namespace, &method, &params, None).await
                    })
                },
                &options.into(),
            )
            .await
    }

    /// Current resource credit percentage of `account`
    ///
    /// Uses the short resource credit attempt timeout, so a slow node set
    /// does not hold up whatever is waiting on it.
    pub async fn rc_percentage(&self, account: &str) -> Result<RcReading, RcError> {
        let request = FindRcAccounts {
            accounts: vec![account.to_owned()],
        };
        let fetched = self
            .read_with_timeout(
                &request,
                FetchOptions::from(CacheTier::Realtime),
                Some(self.config.rc_attempt_timeout),
            )
            .await?;

        let rc_account = fetched
            .value
            .find(account)
            .context(AccountNotFoundSnafu { account })?;

        let percentage = current_percentage(&rc_account.into(), unix_now_secs());
        debug!(
            target: LOG_TARGET,
            %account,
            percentage = ?percentage.map(RcPercent::as_f64),
            stale = fetched.stale,
            "Resource credits read"
        );

        Ok(RcReading {
            account: account.to_owned(),
            percentage: percentage.map(RcPercent::as_f64),
            stale: fetched.stale,
            stale_age_ms: fetched
                .stale_age
                .map(|age| u64::try_from(age.as_millis()).unwrap_or(u64::MAX)),
        })
    }

    pub fn health_report(&self) -> HealthReport {
        self.client.health().health_report()
    }

    pub fn degradation_status(&self) -> DegradationStatus {
        self.degradation.degradation_status()
    }

    /// Drop every cached read tagged `tag`
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        self.degradation.cache().invalidate_tag(tag)
    }

    /// Probe all nodes once
    pub async fn probe_nodes(&self) -> usize {
        self.client.probe_nodes().await
    }

    /// Keep probing nodes in the background until the handle is dropped
    ///
    /// Returns `None` if probing is disabled.
    pub fn spawn_health_probe(&self) -> Option<AbortOnDropHandle<()>> {
        let interval = self.config.probe_interval;
        if interval.is_zero() {
            return None;
        }
        let client = self.client.clone();

        info!(target: LOG_TARGET, interval_secs = interval.as_secs(), "Starting node health probing");
        Some(AbortOnDropHandle::new(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let healthy = client.probe_nodes().await;
                debug!(
                    target: LOG_TARGET,
                    healthy,
                    total = client.health().static_nodes().len(),
                    "Probed nodes"
                );
            }
        })))
    }
}

// SPDX-License-Identifier: MIT

//! Resilient reads from a set of unreliable blockchain JSON-RPC nodes
//!
//! [`Weave`] composes node health tracking, failover, request deduplication
//! and stale-tolerant caching into a single read path.
pub mod config;
mod error;
mod logging;
mod opts;
mod weave;

use clap::Parser as _;
use nodeweave_cache::{CacheTier, FetchOptions, Fetched};
use nodeweave_rpc::methods::GetAccounts;
use nodeweave_util_error::WhateverResult;
use opts::{Commands, Opts};
use serde::Serialize;
use serde_json::Value;
use snafu::{OptionExt as _, ResultExt as _};

pub use crate::config::WeaveConfig;
pub use crate::error::{RcError, WeaveInitError};
pub use crate::weave::{RcReading, Weave};

/// [`Fetched`] as printed by the CLI
#[derive(Serialize)]
struct Output<V> {
    value: V,
    cached: bool,
    stale: bool,
    stale_age_ms: Option<u64>,
}

impl<V> From<Fetched<V>> for Output<V> {
    fn from(fetched: Fetched<V>) -> Self {
        Self {
            value: fetched.value,
            cached: fetched.cached,
            stale: fetched.stale,
            stale_age_ms: fetched
                .stale_age
                .map(|age| u64::try_from(age.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

fn print_json(value: &impl Serialize) -> WhateverResult<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).whatever_context("Failed to serialize output")?
    );
    Ok(())
}

/// Entry point of the `nodeweave` binary
pub async fn run_cli() -> WhateverResult<()> {
    let opts = Opts::parse();
    logging::init_logging(opts.verbose)?;

    let weave = Weave::new(opts.weave_config()).whatever_context("Failed to set up nodes")?;

    match opts.command {
        Commands::Call {
            namespace,
            method,
            params,
        } => {
            let params: Value = match params {
                Some(params) => {
                    serde_json::from_str(&params).whatever_context("Invalid params JSON")?
                }
                None => Value::Array(vec![]),
            };
            let fetched = weave
                .call_raw(namespace, &method, params, FetchOptions::default())
                .await
                .whatever_context("Call failed")?;
            print_json(&Output::from(fetched))?;
        }
        Commands::Rc { account } => {
            let reading = weave
                .rc_percentage(&account)
                .await
                .whatever_context("Failed to read resource credits")?;
            print_json(&reading)?;
        }
        Commands::Account { name } => {
            let fetched = weave
                .read(
                    &GetAccounts {
                        names: vec![name.clone()],
                    },
                    CacheTier::Standard,
                )
                .await
                .whatever_context("Failed to read account")?;
            let Fetched {
                value,
                cached,
                stale,
                stale_age,
            } = fetched;
            let account = value
                .into_iter()
                .find(|account| account.name == name)
                .with_whatever_context(|| format!("Account {name} not found"))?;
            print_json(&Output::from(Fetched {
                value: account,
                cached,
                stale,
                stale_age,
            }))?;
        }
        Commands::Health => {
            let healthy = weave.probe_nodes().await;
            tracing::info!(
                target: "nodeweave::cli",
                healthy,
                total = weave.config().nodes.len(),
                "Probed nodes"
            );
            print_json(&weave.health_report())?;
        }
    }

    Ok(())
}

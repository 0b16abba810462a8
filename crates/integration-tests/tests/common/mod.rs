//! In-process JSON-RPC nodes on ephemeral ports
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use n0_future::task::AbortOnDropHandle;
use nodeweave::{Weave, WeaveConfig};
use nodeweave_core::node_url::NodeUrl;
use nodeweave_rpc::FailoverConfig;
use nodeweave_util_error::WhateverResult;
use serde_json::{Value, json};
use snafu::ResultExt as _;
use time::UtcDateTime;
use time::macros::format_description;
use tokio::net::TcpListener;
use tracing::debug;

const LOG_TARGET: &str = "nodeweave::mock-node";

#[derive(Debug, Clone)]
pub enum Mode {
    Healthy,
    Status(u16),
    RpcError(&'static str),
    Delay(Duration),
}

struct NodeState {
    name: &'static str,
    hits: AtomicUsize,
    mode: Mutex<Mode>,
    results: Mutex<HashMap<String, Value>>,
}

/// A mock node; shut down on drop
pub struct MockNode {
    pub url: NodeUrl,
    state: Arc<NodeState>,
    _server: AbortOnDropHandle<()>,
}

impl MockNode {
    pub async fn spawn(name: &'static str) -> WhateverResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .whatever_context("Failed to bind mock node")?;
        let addr = listener
            .local_addr()
            .whatever_context("Failed to get local addr")?;
        let url: NodeUrl = format!("http://{addr}")
            .parse()
            .whatever_context("Invalid mock node url")?;

        let state = Arc::new(NodeState {
            name,
            hits: AtomicUsize::new(0),
            mode: Mutex::new(Mode::Healthy),
            results: Mutex::new(default_results()),
        });
        let router = Router::new()
            .route("/", post(handle_rpc))
            .with_state(state.clone());

        let server = AbortOnDropHandle::new(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                debug!(target: LOG_TARGET, %err, "Mock node stopped");
            }
        }));

        Ok(Self {
            url,
            state,
            _server: server,
        })
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.state.mode.lock().expect("Locking failed") = mode;
    }

    pub fn set_result(&self, wire_method: &str, result: Value) {
        self.state
            .results
            .lock()
            .expect("Locking failed")
            .insert(wire_method.to_owned(), result);
    }
}

async fn handle_rpc(State(state): State<Arc<NodeState>>, Json(req): Json<Value>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let mode = state.mode.lock().expect("Locking failed").clone();
    debug!(target: LOG_TARGET, node = state.name, %method, ?mode, "Request");

    match mode {
        Mode::Status(status) => {
            return (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "unavailable",
            )
                .into_response();
        }
        Mode::RpcError(message) => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32000, "message": message},
            }))
            .into_response();
        }
        Mode::Delay(delay) => tokio::time::sleep(delay).await,
        Mode::Healthy => {}
    }

    let result = state
        .results
        .lock()
        .expect("Locking failed")
        .get(&method)
        .cloned();
    match result {
        Some(result) => Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response(),
        None => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("Could not find method {method}")},
        }))
        .into_response(),
    }
}

pub fn chain_time(unix_secs: i64) -> String {
    UtcDateTime::from_unix_timestamp(unix_secs)
        .expect("valid timestamp")
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .expect("Can't fail")
}

pub fn now_secs() -> i64 {
    UtcDateTime::now().unix_timestamp()
}

fn default_results() -> HashMap<String, Value> {
    HashMap::from([
        (
            "condenser_api.get_dynamic_global_properties".to_owned(),
            json!({
                "head_block_number": 90_000_000,
                "time": chain_time(now_secs()),
                "current_witness": "blocktrades",
            }),
        ),
        (
            "condenser_api.get_accounts".to_owned(),
            json!([{
                "name": "alice",
                "balance": "12.345 HIVE",
                "hbd_balance": "1.000 HBD",
                "vesting_shares": "1000.000000 VESTS",
                "post_count": 42,
                "created": "2018-03-01T10:00:00",
            }]),
        ),
        (
            "rc_api.find_rc_accounts".to_owned(),
            json!({
                "rc_accounts": [{
                    "account": "alice",
                    "rc_manabar": {
                        "current_mana": "250000000000",
                        "last_update_time": now_secs(),
                    },
                    "max_rc": "1000000000000",
                }]
            }),
        ),
    ])
}

/// A [`Weave`] over `nodes`, without background probing
pub fn weave(nodes: &[&MockNode], failover: FailoverConfig) -> WhateverResult<Weave> {
    Weave::new(
        WeaveConfig::builder()
            .nodes(nodes.iter().map(|node| node.url.clone()).collect())
            .failover(failover)
            .probe_interval(Duration::ZERO)
            .build(),
    )
    .whatever_context("Failed to build weave")
}

pub fn fast_failover() -> FailoverConfig {
    FailoverConfig::builder()
        .attempt_timeout(Duration::from_millis(500))
        .inter_node_delay(Duration::from_millis(10))
        .build()
}

// SPDX-License-Identifier: MIT

//! JSON-RPC access to a set of unreliable nodes
//!
//! [`FailoverClient`] is the single place that knows how to "try a node,
//! and if it fails, try the next one". Everything above it only sees either
//! a result, or one aggregated [`RpcError`].
mod client;
pub mod error;
pub mod jsonrpc;
pub mod methods;
pub mod transport;

pub use client::{FailoverClient, FailoverConfig};
pub use error::{AttemptError, RpcError, RpcResult};
pub use methods::RpcRequest;
pub use transport::{HttpTransport, RpcTransport, TransportError, TransportResponse};

const LOG_TARGET: &str = "nodeweave::rpc";

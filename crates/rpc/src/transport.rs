//! The wire underneath [`crate::FailoverClient`]
//!
//! Kept behind a trait so tests can script node behavior without sockets.
use std::time::Duration;

use async_trait::async_trait;
use nodeweave_core::node_url::NodeUrl;
use nodeweave_util_error::fmt::FmtCompact as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use snafu::{ResultExt as _, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    #[snafu(display("Failed to send request to {url}"))]
    Send { url: NodeUrl, source: reqwest::Error },
    #[snafu(display("Failed to read response body from {url}"))]
    ReadBody { url: NodeUrl, source: reqwest::Error },
    #[snafu(display("Connection to {url} failed: {message}"))]
    Connect { url: NodeUrl, message: String },
}

#[derive(Debug, Snafu)]
#[snafu(display("Failed to build http client"))]
pub struct TransportInitError {
    source: reqwest::Error,
}

/// Raw HTTP response of a node
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// POST a JSON body to `url`
    ///
    /// Deadlines are enforced by the caller, an implementation does not need
    /// to time out on its own.
    async fn post_json(&self, url: &NodeUrl, body: Vec<u8>)
    -> Result<TransportResponse, TransportError>;
}

/// [`RpcTransport`] over plain HTTP(S) using a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportInitError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("nodeweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(TransportInitSnafu)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &NodeUrl,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let resp = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| {
                if source.is_connect() {
                    TransportError::Connect {
                        url: url.clone(),
                        message: source.fmt_compact().to_string(),
                    }
                } else {
                    TransportError::Send {
                        url: url.clone(),
                        source,
                    }
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .context(ReadBodySnafu { url: url.clone() })?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

//! Typed requests for the methods the application reads
//!
//! Each request knows its namespace, method name and param shape, and the
//! type its `result` must decode into. A node answering with a `result` that
//! does not decode counts as a failed node.
use nodeweave_core::key::RequestKey;
use nodeweave_core::namespace::ApiNamespace;
use nodeweave_core::rc::{RcAccountState, deserialize_mana};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub trait RpcRequest {
    const NAMESPACE: ApiNamespace;
    const METHOD: &'static str;

    type Response: DeserializeOwned + Clone + Send + Sync + 'static;

    fn params(&self) -> Value;

    /// Fingerprint used for deduplication and caching
    fn key(&self) -> RequestKey {
        RequestKey::for_call(Self::NAMESPACE, Self::METHOD, &self.params())
    }
}

/// `condenser_api.get_dynamic_global_properties`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDynamicGlobalProperties;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
    /// Head block time, `YYYY-MM-DDTHH:MM:SS` UTC
    pub time: String,
    #[serde(default)]
    pub current_witness: String,
}

impl RpcRequest for GetDynamicGlobalProperties {
    const NAMESPACE: ApiNamespace = ApiNamespace::Condenser;
    const METHOD: &'static str = "get_dynamic_global_properties";

    type Response = DynamicGlobalProperties;

    fn params(&self) -> Value {
        json!([])
    }
}

/// `condenser_api.get_accounts`
#[derive(Debug, Clone)]
pub struct GetAccounts {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub hbd_balance: String,
    #[serde(default)]
    pub vesting_shares: String,
    #[serde(default)]
    pub post_count: u64,
    #[serde(default)]
    pub created: String,
}

impl RpcRequest for GetAccounts {
    const NAMESPACE: ApiNamespace = ApiNamespace::Condenser;
    const METHOD: &'static str = "get_accounts";

    type Response = Vec<Account>;

    fn params(&self) -> Value {
        json!([self.names])
    }
}

/// `condenser_api.get_content`
#[derive(Debug, Clone)]
pub struct GetContent {
    pub author: String,
    pub permlink: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Content {
    pub author: String,
    pub permlink: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub children: u64,
    #[serde(default)]
    pub created: String,
}

impl RpcRequest for GetContent {
    const NAMESPACE: ApiNamespace = ApiNamespace::Condenser;
    const METHOD: &'static str = "get_content";

    type Response = Content;

    fn params(&self) -> Value {
        json!([self.author, self.permlink])
    }
}

/// `rc_api.find_rc_accounts`, the one method with object-style params
#[derive(Debug, Clone)]
pub struct FindRcAccounts {
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FindRcAccountsResponse {
    pub rc_accounts: Vec<RcAccount>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RcManabar {
    #[serde(deserialize_with = "deserialize_mana")]
    pub current_mana: BigUint,
    pub last_update_time: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RcAccount {
    pub account: String,
    pub rc_manabar: RcManabar,
    #[serde(deserialize_with = "deserialize_mana")]
    pub max_rc: BigUint,
}

impl From<&RcAccount> for RcAccountState {
    fn from(value: &RcAccount) -> Self {
        RcAccountState {
            current_mana: value.rc_manabar.current_mana.clone(),
            max_mana: value.max_rc.clone(),
            last_update_time_seconds: value.rc_manabar.last_update_time,
        }
    }
}

impl FindRcAccountsResponse {
    pub fn find(&self, account: &str) -> Option<&RcAccount> {
        self.rc_accounts.iter().find(|a| a.account == account)
    }
}

impl RpcRequest for FindRcAccounts {
    const NAMESPACE: ApiNamespace = ApiNamespace::Rc;
    const METHOD: &'static str = "find_rc_accounts";

    type Response = FindRcAccountsResponse;

    fn params(&self) -> Value {
        json!({ "accounts": self.accounts })
    }
}

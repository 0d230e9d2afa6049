//! The remote blockchain node's outbound contract: the daemon pushes
//! transactions and reads chain state through this trait, never touching
//! mempool/consensus/storage itself.
//!
//! `HttpNodeClient` is a `reqwest`-backed implementation with a per-call
//! timeout; `MockNodeClient` gives the relay pipeline's tests canned
//! responses without a running node.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Result, WalletError};
use crate::transaction::Transaction;

/// Default outbound deadline for node calls.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of submitting a transaction. `Unknown` covers every
/// non-success status the node can report (double spend, bad nonce,
/// unknown token, ...); the daemon does not attempt to interpret the
/// reason beyond surfacing it as `NodeRejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    Submitted,
    Unknown(String),
}

/// `GetAddressState` response: balance, token holdings, and enough OTS
/// bookkeeping for a caller to reconcile against the wallet's own cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressState {
    pub balance: u64,
    #[serde(default)]
    pub tokens: HashMap<String, u64>,
    #[serde(default)]
    pub ots_bitfield: Vec<u8>,
    #[serde(default)]
    pub next_unused_ots_index: u32,
}

/// `GetNodeState` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeState {
    pub version: String,
    pub num_connections: u32,
    pub num_known_peers: u32,
    pub uptime: u64,
    pub block_height: u64,
    pub block_last_hash: String,
    pub network_id: String,
}

pub type NodeObject = serde_json::Value;
pub type Block = serde_json::Value;

/// Serialize a transaction into the wire JSON the node's RPC expects.
/// A dedicated function rather than `#[derive(Serialize)]` on
/// `Transaction`, because the canonical *hashed* bytes and the
/// wallet-facing JSON representation are deliberately different
/// encodings of the same data.
pub(crate) fn transaction_to_json(tx: &Transaction) -> serde_json::Value {
    serde_json::json!({
        "master_addr": tx.master_addr.map(|a| a.to_qaddress()),
        "fee": tx.fee,
        "public_key": hex::encode(tx.public_key),
        "nonce": tx.nonce,
        "transaction_hash": hex::encode(tx.transaction_hash),
        "signature": tx.signature.as_ref().map(signature_to_json),
    })
}

fn signature_to_json(sig: &crate::xmss::XmssSignature) -> serde_json::Value {
    serde_json::json!({
        "index": sig.index,
        "r": hex::encode(sig.r),
        "wots_sig": sig.wots_sig.iter().map(hex::encode).collect::<Vec<_>>(),
        "auth_path": sig.auth_path.iter().map(hex::encode).collect::<Vec<_>>(),
    })
}

#[derive(Debug, Deserialize)]
struct PushTransactionResponse {
    status: u32,
    #[serde(default)]
    error_message: String,
}

/// The remote node, as seen by the daemon core.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn push_transaction(&self, tx: &Transaction) -> Result<PushResult>;
    async fn get_address_state(&self, address: &Address) -> Result<AddressState>;
    async fn get_object(&self, hash: &[u8]) -> Result<NodeObject>;
    async fn get_node_state(&self) -> Result<NodeState>;
    async fn get_block_by_number(&self, n: u64) -> Result<Block>;
}

/// `reqwest`-backed node client, used by the daemon binary.
pub struct HttpNodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNodeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_NODE_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn push_transaction(&self, tx: &Transaction) -> Result<PushResult> {
        let url = format!("{}/PushTransaction", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&transaction_to_json(tx))
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?;

        let body: PushTransactionResponse = response
            .json()
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("malformed node response: {e}")))?;

        if body.status == 0 {
            Ok(PushResult::Submitted)
        } else {
            Ok(PushResult::Unknown(body.error_message))
        }
    }

    async fn get_address_state(&self, address: &Address) -> Result<AddressState> {
        let url = format!("{}/GetAddressState/{}", self.base_url, address.to_qaddress());
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("malformed node response: {e}")))
    }

    async fn get_object(&self, hash: &[u8]) -> Result<NodeObject> {
        let url = format!("{}/GetObject/{}", self.base_url, hex::encode(hash));
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("malformed node response: {e}")))
    }

    async fn get_node_state(&self) -> Result<NodeState> {
        let url = format!("{}/GetNodeState", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("malformed node response: {e}")))
    }

    async fn get_block_by_number(&self, n: u64) -> Result<Block> {
        let url = format!("{}/GetBlockByNumber/{n}", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("malformed node response: {e}")))
    }
}

/// Canned-response node client for the relay pipeline's tests. Not
/// feature-gated: a thin mock like this carries no runtime cost worth
/// hiding behind a cfg, and the `tests/` integration suite needs it from
/// outside the crate's own `#[cfg(test)]` boundary.
pub struct MockNodeClient {
    push_response: Box<dyn Fn() -> Result<PushResult> + Send + Sync>,
}

impl MockNodeClient {
    pub fn new(push_response: impl Fn() -> Result<PushResult> + Send + Sync + 'static) -> Self {
        Self {
            push_response: Box::new(push_response),
        }
    }

    pub fn always_submitted() -> Self {
        Self::new(|| Ok(PushResult::Submitted))
    }

    pub fn always_rejected(reason: &'static str) -> Self {
        Self::new(move || Ok(PushResult::Unknown(reason.to_string())))
    }

    pub fn always_unavailable(reason: &'static str) -> Self {
        Self::new(move || Err(WalletError::NodeUnavailable(reason.to_string())))
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn push_transaction(&self, _tx: &Transaction) -> Result<PushResult> {
        (self.push_response)()
    }

    async fn get_address_state(&self, _address: &Address) -> Result<AddressState> {
        Ok(AddressState::default())
    }

    async fn get_object(&self, _hash: &[u8]) -> Result<NodeObject> {
        Ok(serde_json::Value::Null)
    }

    async fn get_node_state(&self) -> Result<NodeState> {
        Ok(NodeState::default())
    }

    async fn get_block_by_number(&self, _n: u64) -> Result<Block> {
        Ok(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_always_submitted_reports_success() {
        let client = MockNodeClient::always_submitted();
        let pk = [0u8; crate::transaction::PUBLIC_KEY_LEN];
        let variant = crate::transaction::TxVariant::Message { data: vec![1u8; 4] };
        let tx = crate::transaction::Transaction::build(None, 0, pk, variant).unwrap();
        assert_eq!(client.push_transaction(&tx).await.unwrap(), PushResult::Submitted);
    }

    #[tokio::test]
    async fn mock_always_rejected_reports_unknown() {
        let client = MockNodeClient::always_rejected("double spend");
        let pk = [0u8; crate::transaction::PUBLIC_KEY_LEN];
        let variant = crate::transaction::TxVariant::Message { data: vec![1u8; 4] };
        let tx = crate::transaction::Transaction::build(None, 0, pk, variant).unwrap();
        let result = client.push_transaction(&tx).await.unwrap();
        assert_eq!(result, PushResult::Unknown("double spend".to_string()));
    }

    #[tokio::test]
    async fn mock_always_unavailable_reports_error() {
        let client = MockNodeClient::always_unavailable("connection refused");
        let pk = [0u8; crate::transaction::PUBLIC_KEY_LEN];
        let variant = crate::transaction::TxVariant::Message { data: vec![1u8; 4] };
        let tx = crate::transaction::Transaction::build(None, 0, pk, variant).unwrap();
        assert!(client.push_transaction(&tx).await.is_err());
    }
}

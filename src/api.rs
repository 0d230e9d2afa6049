//! HTTP/JSON front end exposing the wallet daemon's RPC method surface.
//! One route per method name, each taking and returning a JSON envelope
//! with `status` (0 = ok) and `error_message`, the same shape the node's
//! own RPC uses.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::address::Address;
use crate::daemon::WalletD;
use crate::error::{Result, WalletError};
use crate::hash::HashFunction;
use crate::node_client::transaction_to_json;
use crate::transaction::Destination;

/// Application state shared with all routes: just the daemon core. The
/// core and its front ends share no process state beyond the wallet file.
#[derive(Clone)]
pub struct AppState {
    pub daemon: Arc<WalletD>,
}

/// Every response, success or failure, is this envelope. `WalletError`
/// already implements `IntoResponse` the same way (status != 0), so
/// handlers only build this for the success path.
#[derive(Serialize)]
struct Envelope<T> {
    status: u32,
    error_message: String,
    result: T,
}

impl<T: Serialize> Envelope<T> {
    fn ok(result: T) -> Json<Self> {
        Json(Self {
            status: 0,
            error_message: String::new(),
            result,
        })
    }
}

fn parse_hash_function(name: &str) -> Result<HashFunction> {
    match name {
        "shake128" => Ok(HashFunction::Shake128),
        "shake256" => Ok(HashFunction::Shake256),
        "sha2_256" => Ok(HashFunction::Sha2_256),
        other => Err(WalletError::UnsupportedDescriptor(format!("unknown hash function {other}"))),
    }
}

fn parse_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| WalletError::Validation(format!("{field} is not valid hex: {e}")))
}

/// The API server. Binds a single axum router over the daemon core.
pub struct ApiServer {
    app_state: AppState,
    bind_addr: String,
}

impl ApiServer {
    pub fn new(daemon: Arc<WalletD>, bind_addr: String) -> Self {
        Self {
            app_state: AppState { daemon },
            bind_addr,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let app = self.create_router().layer(TraceLayer::new_for_http());
        let addr = self
            .bind_addr
            .parse()
            .map_err(|e| WalletError::Validation(format!("invalid bind address: {e}")))?;

        info!("starting wallet daemon API on {}", self.bind_addr);
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|e| WalletError::NodeUnavailable(format!("server error: {e}")))?;
        Ok(())
    }

    fn create_router(&self) -> Router {
        Router::new()
            .route("/AddNewAddress", post(add_new_address))
            .route("/AddAddressFromSeed", post(add_address_from_seed))
            .route("/ListAddresses", get(list_addresses))
            .route("/RemoveAddress", post(remove_address))
            .route("/GetRecoverySeeds", post(get_recovery_seeds))
            .route("/GetWalletInfo", get(get_wallet_info))
            .route("/EncryptWallet", post(encrypt_wallet))
            .route("/LockWallet", post(lock_wallet))
            .route("/UnlockWallet", post(unlock_wallet))
            .route("/ChangePassphrase", post(change_passphrase))
            .route("/RelayTransferTxn", post(relay_transfer_txn))
            .route("/RelayMessageTxn", post(relay_message_txn))
            .route("/RelayTokenTxn", post(relay_token_txn))
            .route("/RelayTransferTokenTxn", post(relay_transfer_token_txn))
            .route("/RelaySlaveTxn", post(relay_slave_txn))
            .route("/GetTransaction", post(get_transaction))
            .route("/GetBalance", post(get_balance))
            .route("/GetOTS", post(get_ots))
            .route("/GetHeight", get(get_height))
            .route("/GetBlock", post(get_block))
            .route("/GetBlockByNumber", post(get_block_by_number))
            .route("/GetNodeState", get(get_node_state))
            .with_state(self.app_state.clone())
    }
}

type ApiResult<T> = std::result::Result<Json<Envelope<T>>, WalletError>;

#[derive(Deserialize)]
struct AddNewAddressRequest {
    height: u8,
    hash_function: String,
}

#[derive(Serialize)]
struct QaddressResponse {
    qaddress: String,
}

async fn add_new_address(
    State(state): State<AppState>,
    Json(req): Json<AddNewAddressRequest>,
) -> ApiResult<QaddressResponse> {
    let hash_function = parse_hash_function(&req.hash_function)?;
    let qaddress = state.daemon.add_new_address(req.height, hash_function).await?;
    Ok(Envelope::ok(QaddressResponse { qaddress }))
}

#[derive(Deserialize)]
struct AddAddressFromSeedRequest {
    seed: String,
}

async fn add_address_from_seed(
    State(state): State<AppState>,
    Json(req): Json<AddAddressFromSeedRequest>,
) -> ApiResult<QaddressResponse> {
    let qaddress = state.daemon.add_address_from_seed(&req.seed).await?;
    Ok(Envelope::ok(QaddressResponse { qaddress }))
}

#[derive(Serialize)]
struct AddressListResponse {
    addresses: Vec<String>,
}

async fn list_addresses(State(state): State<AppState>) -> ApiResult<AddressListResponse> {
    let addresses = state.daemon.list_addresses().await;
    Ok(Envelope::ok(AddressListResponse { addresses }))
}

#[derive(Deserialize)]
struct QaddressRequest {
    qaddress: String,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: bool,
}

async fn remove_address(State(state): State<AppState>, Json(req): Json<QaddressRequest>) -> ApiResult<RemovedResponse> {
    let removed = state.daemon.remove_address(&req.qaddress).await?;
    Ok(Envelope::ok(RemovedResponse { removed }))
}

#[derive(Serialize)]
struct RecoverySeedsResponse {
    hex_seed: String,
    mnemonic: String,
}

async fn get_recovery_seeds(
    State(state): State<AppState>,
    Json(req): Json<QaddressRequest>,
) -> ApiResult<RecoverySeedsResponse> {
    let (hex_seed, mnemonic) = state.daemon.get_recovery_seeds(&req.qaddress).await?;
    Ok(Envelope::ok(RecoverySeedsResponse { hex_seed, mnemonic }))
}

#[derive(Serialize)]
struct WalletInfoResponse {
    version: u32,
    address_count: usize,
    encrypted: bool,
}

async fn get_wallet_info(State(state): State<AppState>) -> ApiResult<WalletInfoResponse> {
    let (version, address_count, encrypted) = state.daemon.get_wallet_info().await;
    Ok(Envelope::ok(WalletInfoResponse { version, address_count, encrypted }))
}

#[derive(Deserialize)]
struct PassphraseRequest {
    passphrase: String,
}

async fn encrypt_wallet(State(state): State<AppState>, Json(req): Json<PassphraseRequest>) -> ApiResult<()> {
    state.daemon.encrypt_wallet(&req.passphrase).await?;
    Ok(Envelope::ok(()))
}

async fn lock_wallet(State(state): State<AppState>) -> ApiResult<()> {
    state.daemon.lock_wallet().await?;
    Ok(Envelope::ok(()))
}

async fn unlock_wallet(State(state): State<AppState>, Json(req): Json<PassphraseRequest>) -> ApiResult<()> {
    state.daemon.unlock_wallet(&req.passphrase).await?;
    Ok(Envelope::ok(()))
}

#[derive(Deserialize)]
struct ChangePassphraseRequest {
    old: String,
    new: String,
}

async fn change_passphrase(State(state): State<AppState>, Json(req): Json<ChangePassphraseRequest>) -> ApiResult<()> {
    state.daemon.change_passphrase(&req.old, &req.new).await?;
    Ok(Envelope::ok(()))
}

#[derive(Deserialize)]
struct DestinationRequest {
    qaddress: String,
    amount: u64,
}

fn parse_destinations(items: &[DestinationRequest]) -> Result<Vec<Destination>> {
    items
        .iter()
        .map(|d| Ok(Destination { address: Address::from_qaddress(&d.qaddress)?, amount: d.amount }))
        .collect()
}

#[derive(Serialize)]
struct TransactionResponse {
    #[serde(flatten)]
    transaction: serde_json::Value,
}

fn transaction_response(tx: &crate::transaction::Transaction) -> TransactionResponse {
    TransactionResponse { transaction: transaction_to_json(tx) }
}

#[derive(Deserialize)]
struct RelayTransferTxnRequest {
    signer_qaddress: String,
    master_qaddress: Option<String>,
    fee: u64,
    ots_index: u32,
    destinations: Vec<DestinationRequest>,
}

async fn relay_transfer_txn(
    State(state): State<AppState>,
    Json(req): Json<RelayTransferTxnRequest>,
) -> ApiResult<TransactionResponse> {
    let destinations = parse_destinations(&req.destinations)?;
    let tx = state
        .daemon
        .relay_transfer_txn(&req.signer_qaddress, req.master_qaddress.as_deref(), req.fee, req.ots_index, destinations)
        .await?;
    Ok(Envelope::ok(transaction_response(&tx)))
}

#[derive(Deserialize)]
struct RelayMessageTxnRequest {
    signer_qaddress: String,
    master_qaddress: Option<String>,
    fee: u64,
    ots_index: u32,
    /// Hex-encoded message payload.
    data: String,
}

async fn relay_message_txn(
    State(state): State<AppState>,
    Json(req): Json<RelayMessageTxnRequest>,
) -> ApiResult<TransactionResponse> {
    let data = parse_hex("data", &req.data)?;
    let tx = state
        .daemon
        .relay_message_txn(&req.signer_qaddress, req.master_qaddress.as_deref(), req.fee, req.ots_index, data)
        .await?;
    Ok(Envelope::ok(transaction_response(&tx)))
}

#[derive(Deserialize)]
struct RelayTokenTxnRequest {
    signer_qaddress: String,
    master_qaddress: Option<String>,
    fee: u64,
    ots_index: u32,
    symbol: String,
    name: String,
    owner_qaddress: String,
    decimals: u8,
    initial_balances: Vec<DestinationRequest>,
}

async fn relay_token_txn(
    State(state): State<AppState>,
    Json(req): Json<RelayTokenTxnRequest>,
) -> ApiResult<TransactionResponse> {
    let owner = Address::from_qaddress(&req.owner_qaddress)?;
    let initial_balances = parse_destinations(&req.initial_balances)?;
    let tx = state
        .daemon
        .relay_token_txn(
            &req.signer_qaddress,
            req.master_qaddress.as_deref(),
            req.fee,
            req.ots_index,
            req.symbol.into_bytes(),
            req.name.into_bytes(),
            owner,
            req.decimals,
            initial_balances,
        )
        .await?;
    Ok(Envelope::ok(transaction_response(&tx)))
}

#[derive(Deserialize)]
struct RelayTransferTokenTxnRequest {
    signer_qaddress: String,
    master_qaddress: Option<String>,
    fee: u64,
    ots_index: u32,
    token_hash: String,
    destinations: Vec<DestinationRequest>,
}

async fn relay_transfer_token_txn(
    State(state): State<AppState>,
    Json(req): Json<RelayTransferTokenTxnRequest>,
) -> ApiResult<TransactionResponse> {
    let token_hash_bytes = parse_hex("token_hash", &req.token_hash)?;
    let token_hash: [u8; 32] = token_hash_bytes
        .try_into()
        .map_err(|_| WalletError::Validation("token_hash must be 32 bytes".to_string()))?;
    let destinations = parse_destinations(&req.destinations)?;
    let tx = state
        .daemon
        .relay_transfer_token_txn(
            &req.signer_qaddress,
            req.master_qaddress.as_deref(),
            req.fee,
            req.ots_index,
            token_hash,
            destinations,
        )
        .await?;
    Ok(Envelope::ok(transaction_response(&tx)))
}

#[derive(Deserialize)]
struct RelaySlaveTxnRequest {
    signer_qaddress: String,
    master_qaddress: Option<String>,
    fee: u64,
    ots_index: u32,
    slave_public_keys: Vec<String>,
    access_types: Vec<u8>,
}

async fn relay_slave_txn(
    State(state): State<AppState>,
    Json(req): Json<RelaySlaveTxnRequest>,
) -> ApiResult<TransactionResponse> {
    let slave_public_keys: Result<Vec<Vec<u8>>> =
        req.slave_public_keys.iter().map(|pk| parse_hex("slave_public_keys", pk)).collect();
    let tx = state
        .daemon
        .relay_slave_txn(
            &req.signer_qaddress,
            req.master_qaddress.as_deref(),
            req.fee,
            req.ots_index,
            slave_public_keys?,
            req.access_types,
        )
        .await?;
    Ok(Envelope::ok(transaction_response(&tx)))
}

#[derive(Deserialize)]
struct HashRequest {
    hash: String,
}

async fn get_transaction(State(state): State<AppState>, Json(req): Json<HashRequest>) -> ApiResult<serde_json::Value> {
    let hash = parse_hex("hash", &req.hash)?;
    let object = state.daemon.get_transaction(&hash).await?;
    Ok(Envelope::ok(object))
}

#[derive(Serialize)]
struct BalanceResponse {
    balance: u64,
}

async fn get_balance(State(state): State<AppState>, Json(req): Json<QaddressRequest>) -> ApiResult<BalanceResponse> {
    let balance = state.daemon.get_balance(&req.qaddress).await?;
    Ok(Envelope::ok(BalanceResponse { balance }))
}

async fn get_ots(
    State(state): State<AppState>,
    Json(req): Json<QaddressRequest>,
) -> ApiResult<crate::node_client::AddressState> {
    let ots = state.daemon.get_ots(&req.qaddress).await?;
    Ok(Envelope::ok(ots))
}

#[derive(Serialize)]
struct HeightResponse {
    height: u64,
}

async fn get_height(State(state): State<AppState>) -> ApiResult<HeightResponse> {
    let height = state.daemon.get_height().await?;
    Ok(Envelope::ok(HeightResponse { height }))
}

async fn get_block(State(state): State<AppState>, Json(req): Json<HashRequest>) -> ApiResult<serde_json::Value> {
    let hash = parse_hex("hash", &req.hash)?;
    let block = state.daemon.get_block(&hash).await?;
    Ok(Envelope::ok(block))
}

#[derive(Deserialize)]
struct BlockNumberRequest {
    number: u64,
}

async fn get_block_by_number(
    State(state): State<AppState>,
    Json(req): Json<BlockNumberRequest>,
) -> ApiResult<serde_json::Value> {
    let block = state.daemon.get_block_by_number(req.number).await?;
    Ok(Envelope::ok(block))
}

async fn get_node_state(
    State(state): State<AppState>,
) -> ApiResult<crate::node_client::NodeState> {
    let node_state = state.daemon.get_node_state().await?;
    Ok(Envelope::ok(node_state))
}

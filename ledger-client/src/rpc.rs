//! A JSON-RPC implementation of the ledger client

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use base64::engine::{Engine, general_purpose as b64_general_purpose};
use reqwest::Client;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{DeserializeOwned, Error as DeError},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    client::LedgerClient,
    encoding::{GasConfig, ObjectRef, ResolvedObject, encode_transaction},
    error::LedgerClientError,
    keypair::Keypair,
    transaction::PendingTransaction,
    types::{
        Address, Balance, ExecutionStatus, ObjectChange, ObjectId, OwnedObject, OwnedObjectsPage,
        SubmissionOutcome,
    },
};

// -------------
// | Constants |
// -------------

/// The JSON-RPC protocol version
const JSON_RPC_VERSION: &str = "2.0";
/// Default timeout for requests to the node
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The method listing an address's owned objects
const GET_OWNED_OBJECTS_METHOD: &str = "suix_getOwnedObjects";
/// The method fetching a coin balance
const GET_BALANCE_METHOD: &str = "suix_getBalance";
/// The method fetching several objects by id
const MULTI_GET_OBJECTS_METHOD: &str = "sui_multiGetObjects";
/// The method listing an address's coins of one type
const GET_COINS_METHOD: &str = "suix_getCoins";
/// The method fetching the network's reference gas price
const GET_REFERENCE_GAS_PRICE_METHOD: &str = "suix_getReferenceGasPrice";
/// The method executing a signed transaction
const EXECUTE_TRANSACTION_METHOD: &str = "sui_executeTransactionBlock";
/// The request type asking the node to wait for local execution before
/// responding
const WAIT_FOR_LOCAL_EXECUTION: &str = "WaitForLocalExecution";

/// The status string reported for a successful execution
const STATUS_SUCCESS: &str = "success";

/// The coin type paying for gas
const GAS_COIN_TYPE: &str = "0x2::sui::SUI";
/// The gas budget used when a transaction sets none
pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;
/// The most coins a transaction may pay for gas with
const MAX_GAS_COINS: usize = 256;
/// The most objects fetched in one request
const MAX_OBJECTS_PER_QUERY: usize = 50;

// ---------
// | Types |
// ---------

/// The configuration options for the JSON-RPC ledger client
#[derive(Debug, Clone)]
pub struct RpcLedgerClientConfig {
    /// The URL of the node's JSON-RPC endpoint
    pub url: String,
    /// The request timeout
    pub timeout: Duration,
    /// The page size requested when listing owned objects; the node's
    /// default when `None`
    pub page_limit: Option<u32>,
}

impl RpcLedgerClientConfig {
    /// A configuration for the given URL with default options
    pub fn new(url: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self { url: url.into(), timeout, page_limit: None }
    }
}

/// A JSON-RPC request envelope
#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    /// The protocol version
    jsonrpc: &'static str,
    /// The request id
    id: u64,
    /// The method to invoke
    method: &'a str,
    /// The positional parameters
    params: Value,
}

/// A JSON-RPC response envelope
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    /// The result, on success
    result: Option<T>,
    /// The error object, on failure
    error: Option<JsonRpcErrorObject>,
}

/// A JSON-RPC error object
#[derive(Deserialize)]
struct JsonRpcErrorObject {
    /// The error code
    code: i64,
    /// The error message
    message: String,
}

/// A page of owned objects as returned by the node
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOwnedObjectsPage {
    /// The object responses on this page
    data: Vec<RawObjectResponse>,
    /// The cursor for the next page
    next_cursor: Option<String>,
    /// Whether there are further pages
    has_next_page: bool,
}

/// A single object response, which may carry an error in place of data
#[derive(Deserialize)]
struct RawObjectResponse<D = RawObjectData> {
    /// The object data, if the node could read the object
    data: Option<D>,
    /// The error reported in place of data
    error: Option<Value>,
}

/// The fields of an object response that the client reads
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObjectData {
    /// The object id
    object_id: ObjectId,
    /// The object's type, present when requested with `showType`
    #[serde(rename = "type")]
    object_type: Option<String>,
}

/// The fields of an object needed to pass it as a transaction input
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObjectRef {
    /// The object id
    object_id: ObjectId,
    /// The current version
    #[serde(deserialize_with = "deserialize_u64")]
    version: u64,
    /// The base58 digest of the current version
    digest: String,
    /// The owner, present when requested with `showOwner`
    owner: RawOwner,
}

/// The owner of an object as reported by the node
#[derive(Deserialize)]
enum RawOwner {
    /// Owned by an address
    AddressOwner(Address),
    /// Owned by another object
    ObjectOwner(Address),
    /// Shared between all addresses
    Shared {
        /// The version at which the object became shared
        #[serde(deserialize_with = "deserialize_u64")]
        initial_shared_version: u64,
    },
    /// Frozen
    Immutable,
}

/// A page of coins as returned by the node
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoinPage {
    /// The coins on this page
    data: Vec<RawCoin>,
    /// The cursor for the next page
    next_cursor: Option<String>,
    /// Whether there are further pages
    has_next_page: bool,
}

/// A single coin as returned by the node
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoin {
    /// The coin's object id
    coin_object_id: ObjectId,
    /// The coin's version
    #[serde(deserialize_with = "deserialize_u64")]
    version: u64,
    /// The base58 digest of the coin
    digest: String,
    /// The coin's balance
    #[serde(deserialize_with = "deserialize_u64")]
    balance: u64,
}

/// The network's reference gas price
#[derive(Deserialize)]
struct RawGasPrice(#[serde(deserialize_with = "deserialize_u64")] u64);

/// A `u64` the node renders either as a number or as a decimal string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawU64 {
    /// A JSON number
    Number(u64),
    /// A decimal string
    Text(String),
}

/// A coin balance as returned by the node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBalance {
    /// The coin type
    coin_type: String,
    /// The number of coin objects
    coin_object_count: u64,
    /// The total balance, as a decimal string
    total_balance: String,
}

/// A transaction execution response as returned by the node
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutionResponse {
    /// The transaction digest
    digest: String,
    /// The transaction effects
    effects: Option<RawEffects>,
    /// The object changes
    #[serde(default)]
    object_changes: Option<Vec<ObjectChange>>,
}

/// The fields of the transaction effects that the client reads
#[derive(Deserialize)]
struct RawEffects {
    /// The execution status
    status: RawStatus,
}

/// An execution status as returned by the node
#[derive(Deserialize)]
struct RawStatus {
    /// Either `success` or `failure`
    status: String,
    /// The failure reason
    error: Option<String>,
}

// ---------------------
// | Client Definition |
// ---------------------

/// A ledger client speaking JSON-RPC to a full node
#[derive(Debug)]
pub struct RpcLedgerClient {
    /// The node's JSON-RPC URL
    url: String,
    /// The shared HTTP client used for issuing requests
    http_client: Client,
    /// The page size requested when listing owned objects
    page_limit: Option<u32>,
    /// The id assigned to the next request
    next_request_id: AtomicU64,
}

impl RpcLedgerClient {
    /// Create a new client from the given configuration
    pub fn new(config: RpcLedgerClientConfig) -> Result<Self, LedgerClientError> {
        let RpcLedgerClientConfig { url, timeout, page_limit } = config;
        let http_client =
            Client::builder().timeout(timeout).build().map_err(LedgerClientError::http)?;

        Ok(Self { url, http_client, page_limit, next_request_id: AtomicU64::new(1) })
    }

    /// Fetch the current reference of every object input, keyed by id
    async fn resolve_objects(
        &self,
        transaction: &PendingTransaction,
    ) -> Result<HashMap<ObjectId, ResolvedObject>, LedgerClientError> {
        let ids: Vec<ObjectId> = transaction.object_inputs().collect();

        let mut resolved = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_OBJECTS_PER_QUERY) {
            let params = json!([chunk, { "showOwner": true }]);
            let raw: Vec<RawObjectResponse<RawObjectRef>> =
                self.call(MULTI_GET_OBJECTS_METHOD, params).await?;

            for response in raw {
                let object = convert_object_ref(response)?;
                resolved.insert(object.object_id(), object);
            }
        }

        Ok(resolved)
    }

    /// Choose the sender's coins and the price paying for a transaction
    async fn select_gas(
        &self,
        sender: Address,
        transaction: &PendingTransaction,
    ) -> Result<GasConfig, LedgerClientError> {
        let budget = transaction.gas_budget().unwrap_or(DEFAULT_GAS_BUDGET);
        let RawGasPrice(price) = self.call(GET_REFERENCE_GAS_PRICE_METHOD, json!([])).await?;

        // Coins passed as inputs cannot also pay for gas
        let excluded: HashSet<ObjectId> = transaction.object_inputs().collect();

        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = json!([sender, GAS_COIN_TYPE, cursor, Value::Null]);
            let page: RawCoinPage = self.call(GET_COINS_METHOD, params).await?;
            coins.extend(page.data.into_iter().filter(|c| !excluded.contains(&c.coin_object_id)));

            cursor = page.next_cursor;
            if !page.has_next_page || cursor.is_none() || coins.len() >= MAX_GAS_COINS {
                break;
            }
        }

        let payment = select_gas_coins(&coins, budget)?;
        debug!("paying gas with {} coins at price {price}", payment.len());
        Ok(GasConfig { payment, price, budget })
    }

    /// Invoke a JSON-RPC method, deserializing its result
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerClientError> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest { jsonrpc: JSON_RPC_VERSION, id, method, params };
        debug!("sending {method} request {id}");

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(LedgerClientError::http)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.map_err(LedgerClientError::parsing)?;
            return Err(LedgerClientError::http(format!("Status {status}: {message}")));
        }

        let body: Value = response.json().await.map_err(LedgerClientError::parsing)?;
        unwrap_response(body)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn list_owned_objects(
        &self,
        owner: Address,
        cursor: Option<String>,
        type_filter: Option<&str>,
    ) -> Result<OwnedObjectsPage, LedgerClientError> {
        let mut query = json!({ "options": { "showType": true } });
        if let Some(tag) = type_filter {
            query["filter"] = json!({ "StructType": tag });
        }

        let params = json!([owner, query, cursor, self.page_limit]);
        let raw: RawOwnedObjectsPage = self.call(GET_OWNED_OBJECTS_METHOD, params).await?;
        Ok(convert_owned_objects_page(raw))
    }

    async fn submit(
        &self,
        transaction: PendingTransaction,
        signer: &Keypair,
    ) -> Result<SubmissionOutcome, LedgerClientError> {
        for (idx, instruction) in transaction.instructions().iter().enumerate() {
            debug!("instruction {idx}: {instruction}");
        }

        debug!("submitting transaction: {}", transaction.to_json()?);

        let sender = signer.address();
        let objects = self.resolve_objects(&transaction).await?;
        let gas = self.select_gas(sender, &transaction).await?;
        let tx_bytes = encode_transaction(&transaction, sender, &objects, &gas)?;
        let signature = signer.sign_transaction(&tx_bytes);
        let options = json!({ "showEffects": true, "showObjectChanges": true });
        let params = json!([
            b64_general_purpose::STANDARD.encode(&tx_bytes),
            [signature],
            options,
            WAIT_FOR_LOCAL_EXECUTION,
        ]);

        let raw: RawExecutionResponse = self.call(EXECUTE_TRANSACTION_METHOD, params).await?;
        let outcome = convert_execution_response(raw)?;
        info!("transaction {} executed, success: {}", outcome.digest, outcome.is_success());

        Ok(outcome)
    }

    async fn get_balance(
        &self,
        owner: Address,
        coin_type: &str,
    ) -> Result<Balance, LedgerClientError> {
        let raw: RawBalance = self.call(GET_BALANCE_METHOD, json!([owner, coin_type])).await?;
        let total_balance = raw.total_balance.parse().map_err(LedgerClientError::parsing)?;

        Ok(Balance {
            coin_type: raw.coin_type,
            coin_object_count: raw.coin_object_count,
            total_balance,
        })
    }
}

// ----------------------
// | Non-Member Helpers |
// ----------------------

/// Extract the result from a JSON-RPC response body
fn unwrap_response<T: DeserializeOwned>(body: Value) -> Result<T, LedgerClientError> {
    let response: JsonRpcResponse<T> =
        serde_json::from_value(body).map_err(LedgerClientError::parsing)?;

    if let Some(JsonRpcErrorObject { code, message }) = response.error {
        return Err(LedgerClientError::rpc(code, message));
    }

    response.result.ok_or_else(|| LedgerClientError::parsing("response carries no result"))
}

/// Convert a raw owned-objects page, preserving the node's ordering
fn convert_owned_objects_page(raw: RawOwnedObjectsPage) -> OwnedObjectsPage {
    let data = raw
        .data
        .into_iter()
        .filter_map(|response| match response.data {
            Some(RawObjectData { object_id, object_type }) => {
                Some(OwnedObject { object_id, type_tag: object_type })
            },
            None => {
                warn!("skipping unreadable owned object: {:?}", response.error);
                None
            },
        })
        .collect();

    OwnedObjectsPage { data, next_cursor: raw.next_cursor, has_next_page: raw.has_next_page }
}

/// Deserialize a `u64` rendered either as a number or as a decimal string
fn deserialize_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match RawU64::deserialize(deserializer)? {
        RawU64::Number(n) => Ok(n),
        RawU64::Text(s) => s.parse().map_err(D::Error::custom),
    }
}

/// Convert a fetched object into the form it is passed to a transaction in
fn convert_object_ref(
    response: RawObjectResponse<RawObjectRef>,
) -> Result<ResolvedObject, LedgerClientError> {
    let RawObjectRef { object_id, version, digest, owner } = response.data.ok_or_else(|| {
        LedgerClientError::parsing(format!("object unavailable: {:?}", response.error))
    })?;

    match owner {
        RawOwner::Shared { initial_shared_version } => {
            Ok(ResolvedObject::Shared { object_id, initial_shared_version })
        },
        RawOwner::AddressOwner(owner) | RawOwner::ObjectOwner(owner) => {
            debug!("object {object_id} is owned by {owner}");
            Ok(ResolvedObject::Owned(ObjectRef::from_base58(object_id, version, &digest)?))
        },
        RawOwner::Immutable => {
            Ok(ResolvedObject::Owned(ObjectRef::from_base58(object_id, version, &digest)?))
        },
    }
}

/// Take coins in the order given until there are `MAX_GAS_COINS` of them,
/// failing if they cannot cover the budget
fn select_gas_coins(
    coins: &[RawCoin],
    budget: u64,
) -> Result<Vec<ObjectRef>, LedgerClientError> {
    let selected = &coins[..coins.len().min(MAX_GAS_COINS)];
    let total: u128 = selected.iter().map(|coin| u128::from(coin.balance)).sum();
    if total < u128::from(budget) {
        return Err(LedgerClientError::gas(format!(
            "coins hold {total}, short of the gas budget of {budget}"
        )));
    }

    selected
        .iter()
        .map(|coin| ObjectRef::from_base58(coin.coin_object_id, coin.version, &coin.digest))
        .collect()
}

/// Convert a raw execution response
fn convert_execution_response(
    raw: RawExecutionResponse,
) -> Result<SubmissionOutcome, LedgerClientError> {
    let effects = raw
        .effects
        .ok_or_else(|| LedgerClientError::parsing(format!("no effects for {}", raw.digest)))?;

    let status = if effects.status.status == STATUS_SUCCESS {
        ExecutionStatus::Success
    } else {
        let error = effects.status.error.unwrap_or(effects.status.status);
        ExecutionStatus::Failure { error }
    };

    Ok(SubmissionOutcome {
        digest: raw.digest,
        status,
        object_changes: raw.object_changes.unwrap_or_default(),
    })
}

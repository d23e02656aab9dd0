//! A client for the network faucet

use std::time::Duration;

use ledger_client::Address;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScriptError;

// -------------
// | Constants |
// -------------

/// The route requesting gas from the faucet
const GAS_ROUTE: &str = "/gas";
/// The timeout for faucet requests; the faucet waits for its transfer to land
const FAUCET_TIMEOUT: Duration = Duration::from_secs(60);

// -------------
// | API Types |
// -------------

/// A request for the faucet's fixed gas amount
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GasRequest {
    /// The request body
    fixed_amount_request: FixedAmountRequest,
}

/// The body of a fixed-amount request
#[derive(Debug, Serialize)]
struct FixedAmountRequest {
    /// The address receiving the gas
    recipient: Address,
}

/// The faucet's response to a gas request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasResponse {
    /// The gas coins transferred
    #[serde(default)]
    transferred_gas_objects: Vec<GasTransfer>,
    /// The faucet's error, if the request was refused
    error: Option<String>,
}

/// A gas coin sent by the faucet
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasTransfer {
    /// The amount of the coin
    pub amount: u64,
    /// The id of the coin
    pub id: String,
    /// The digest of the transaction sending it
    pub transfer_tx_digest: String,
}

// ----------
// | Client |
// ----------

/// Requests gas from a faucet
#[derive(Debug, Clone)]
pub struct FaucetClient {
    /// The base URL of the faucet
    base_url: String,
    /// The HTTP client used for requests
    http_client: Client,
}

impl FaucetClient {
    /// Create a client for the faucet at the given URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ScriptError> {
        let http_client =
            Client::builder().timeout(FAUCET_TIMEOUT).build().map_err(ScriptError::faucet)?;
        Ok(Self { base_url: base_url.into(), http_client })
    }

    /// Request gas for `recipient`, returning the coins sent
    pub async fn request_gas(&self, recipient: Address) -> Result<Vec<GasTransfer>, ScriptError> {
        let url = format!("{}{GAS_ROUTE}", self.base_url.trim_end_matches('/'));
        let body = GasRequest { fixed_amount_request: FixedAmountRequest { recipient } };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ScriptError::faucet)?;

        let status = response.status();
        let text = response.text().await.map_err(ScriptError::faucet)?;
        if !status.is_success() {
            return Err(ScriptError::faucet(format!("{status}: {text}")));
        }

        let transfers = parse_gas_response(&text)?;
        info!("faucet sent {} coins to {recipient}", transfers.len());
        Ok(transfers)
    }
}

/// Parse a faucet response, failing if the faucet reported an error or sent
/// nothing
fn parse_gas_response(body: &str) -> Result<Vec<GasTransfer>, ScriptError> {
    let response: GasResponse = serde_json::from_str(body).map_err(ScriptError::faucet)?;
    if let Some(err) = response.error {
        return Err(ScriptError::faucet(err));
    }

    if response.transferred_gas_objects.is_empty() {
        return Err(ScriptError::faucet("no gas transferred"));
    }

    Ok(response.transferred_gas_objects)
}

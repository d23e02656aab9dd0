//! CLI argument definition & parsing for the course scripts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledger_client::{
    Address, DynLedgerClient, Keypair, ObjectId, RpcLedgerClient, RpcLedgerClientConfig,
};

use crate::{config::Network, enrollment::EnrollmentAction, error::ScriptError};

// -------------
// | Constants |
// -------------

/// The price feed the oracle reads from by default
const DEFAULT_PRICE_FEED: &str =
    "0x84d2b7e435d6e6a5b137bf6f78f34b2c5515ae61cd8591d5ff6cd121a21aa6b7";

// -------
// | Cli |
// -------

/// The cli for the course scripts
#[rustfmt::skip]
#[derive(Debug, Parser)]
#[clap(about = "Scripts for the lending bank and enrollment packages")]
pub struct Cli {
    /// The script to run
    #[command(subcommand)]
    pub command: Command,

    // --- Network --- //

    /// The network to run against
    #[clap(long, env = "NETWORK", value_enum, default_value = "testnet", global = true)]
    pub network: Network,
    /// The full node JSON-RPC URL, overriding the network's default
    #[clap(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,
    /// The faucet URL, overriding the network's default
    #[clap(long, env = "FAUCET_URL", global = true)]
    pub faucet_url: Option<String>,

    // --- Credentials --- //

    /// A base64 keystore entry; takes precedence over the wallet file
    #[clap(long, env = "KEY", hide_env_values = true, global = true)]
    pub key: Option<String>,
    /// A wallet file holding the secret key as a JSON byte array
    #[clap(long, env = "WALLET_PATH", default_value = "dev-wallet.json", global = true)]
    pub wallet: PathBuf,

    // --- Deployment --- //

    /// The file recording the ids of published packages and their objects
    #[clap(long, env = "DEPLOYMENT_PATH", default_value = "deployment.json", global = true)]
    pub deployment: PathBuf,

    // --- Telemetry --- //

    /// Whether to emit JSON formatted logs
    #[clap(long, default_value = "false", global = true)]
    pub json_logs: bool,
}

/// The scripts available
#[rustfmt::skip]
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new wallet
    Keygen {
        /// Where to write the wallet file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Request gas from the network's faucet
    Airdrop,
    /// Send part of the gas coin to another address
    Transfer {
        /// The address receiving the coin
        #[arg(long)]
        recipient: Address,
        /// The amount to send
        #[arg(long, default_value = "1000")]
        amount: u64,
    },
    /// Build and publish a move package, recording its ids
    Publish {
        /// The directory of the package
        #[arg(long, env = "PACKAGE_PATH")]
        package_path: PathBuf,
        /// The CLI binary used to build the package
        #[arg(long, env = "CLI_PATH", default_value = "sui")]
        sui_cli: String,
    },
    /// Create a bank account and transfer it to the signer
    NewAccount {
        /// The bank package, overriding the deployment file
        #[arg(long)]
        package: Option<ObjectId>,
    },
    /// Deposit into the signer's bank account and borrow against it
    DepositAndBorrow {
        /// The amount to deposit
        #[arg(long, default_value = "1000")]
        deposit: u64,
        /// The amount of stablecoin to borrow
        #[arg(long, default_value = "500")]
        borrow: u64,
        /// The price feed the oracle reads from
        #[arg(long, default_value = DEFAULT_PRICE_FEED)]
        price_feed: ObjectId,
        /// The bank package, overriding the deployment file
        #[arg(long)]
        package: Option<ObjectId>,
        /// The bank object, overriding the deployment file
        #[arg(long)]
        bank: Option<ObjectId>,
        /// The stablecoin capability wrapper, overriding the deployment file
        #[arg(long)]
        cap_wrapper: Option<ObjectId>,
    },
    /// Print the signer's balance of a coin type
    Balance {
        /// The coin type
        #[arg(long, default_value = "0x2::sui::SUI")]
        coin_type: String,
    },
    /// Run enrollment calls in a single transaction
    Enrollment {
        /// The enrollment package
        #[arg(long, env = "ENROLLMENT_PACKAGE")]
        package: ObjectId,
        /// The instructor capability
        #[arg(long)]
        instructor_cap: Option<ObjectId>,
        /// The cohort
        #[arg(long)]
        cohort: Option<ObjectId>,
        /// The calls to make, in order; repeat to batch several
        #[arg(long = "action", value_enum, required = true)]
        actions: Vec<EnrollmentAction>,
        /// The GitHub handle passed to `enroll` and `update`
        #[arg(long)]
        github: Option<String>,
    },
}

impl Cli {
    /// Load the signing keypair, preferring the keystore entry over the
    /// wallet file
    pub fn load_signer(&self) -> Result<Keypair, ScriptError> {
        match &self.key {
            Some(entry) => Keypair::from_keystore_entry(entry).map_err(ScriptError::keystore),
            None => Keypair::from_wallet_file(&self.wallet).map_err(ScriptError::keystore),
        }
    }

    /// The full node URL to use
    pub fn rpc_url(&self) -> String {
        self.rpc_url.clone().unwrap_or_else(|| self.network.fullnode_url().to_string())
    }

    /// The faucet URL to use
    pub fn faucet_url(&self) -> Result<String, ScriptError> {
        self.faucet_url
            .clone()
            .or_else(|| self.network.faucet_url().map(str::to_string))
            .ok_or_else(|| ScriptError::config(format!("{} has no faucet", self.network)))
    }

    /// Build a client for the full node
    pub fn ledger_client(&self) -> Result<DynLedgerClient, ScriptError> {
        let config = RpcLedgerClientConfig::new(self.rpc_url());
        let client = RpcLedgerClient::new(config).map_err(ScriptError::config)?;
        Ok(DynLedgerClient::new(client))
    }
}

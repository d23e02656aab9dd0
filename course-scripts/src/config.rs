//! Network selection and the record of deployed object ids

use std::{collections::BTreeMap, fmt, path::Path};

use clap::ValueEnum;
use ledger_client::{ObjectChange, ObjectId, SubmissionOutcome};
use tracing::info;

use crate::error::ScriptError;

// -------------
// | Constants |
// -------------

/// The deployment key under which a published package id is recorded
pub const PACKAGE_KEY: &str = "package";
/// The deployment key of the shared bank object
pub const BANK_KEY: &str = "bank::Bank";
/// The deployment key of the stablecoin capability wrapper
pub const CAP_WRAPPER_KEY: &str = "sui_dollar::CapWrapper";

/// The base of the block explorer's transaction pages
const EXPLORER_TX_URL: &str = "https://suiexplorer.com/txblock";

// -----------
// | Network |
// -----------

/// The network a script runs against
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Network {
    /// The development network
    Devnet,
    /// The test network
    Testnet,
    /// The main network
    Mainnet,
    /// A node running on this machine
    Localnet,
}

impl Network {
    /// The default full node JSON-RPC URL
    pub fn fullnode_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Localnet => "http://127.0.0.1:9000",
        }
    }

    /// The default faucet URL, if the network has a faucet
    pub fn faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Devnet => Some("https://faucet.devnet.sui.io"),
            Network::Testnet => Some("https://faucet.testnet.sui.io"),
            Network::Mainnet => None,
            Network::Localnet => Some("http://127.0.0.1:9123"),
        }
    }

    /// The explorer link for a transaction on this network
    pub fn explorer_url(&self, digest: &str) -> String {
        format!("{EXPLORER_TX_URL}/{digest}?network={self}")
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

// --------------
// | Deployment |
// --------------

/// Named object ids of a deployed package, e.g. `package` or `bank::Bank`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deployment {
    /// The ids by name
    ids: BTreeMap<String, ObjectId>,
}

impl Deployment {
    /// Load a deployment file, a JSON map from names to object ids
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ScriptError::config(format!("{}: {e}", path.display())))?;
        let ids = serde_json::from_str(&contents).map_err(ScriptError::config)?;
        Ok(Self { ids })
    }

    /// Load a deployment file, starting empty if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ScriptError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Write the deployment file
    pub fn save(&self, path: &Path) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(&self.ids).map_err(ScriptError::io)?;
        std::fs::write(path, contents).map_err(ScriptError::io)
    }

    /// The id recorded under a name
    pub fn get(&self, name: &str) -> Result<ObjectId, ScriptError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::config(format!("no deployment id for {name:?}")))
    }

    /// Record an id under a name
    pub fn insert(&mut self, name: impl Into<String>, id: ObjectId) {
        self.ids.insert(name.into(), id);
    }

    /// Record the package and objects created by a publish transaction
    ///
    /// Created objects are keyed by `module::Type`, with the package address
    /// and any type parameters stripped
    pub fn record_publish(&mut self, outcome: &SubmissionOutcome) {
        for change in &outcome.object_changes {
            match change {
                ObjectChange::Published { package_id, .. } => {
                    self.insert(PACKAGE_KEY, *package_id);
                },
                ObjectChange::Created { object_id, object_type } => {
                    let Some(name) = short_type_name(object_type) else { continue };
                    info!("recorded {name}: {object_id}");
                    self.insert(name, *object_id);
                },
                _ => {},
            }
        }
    }
}

/// Reduce a fully qualified type to `module::Type`
fn short_type_name(object_type: &str) -> Option<String> {
    let base = object_type.split('<').next()?;
    let mut parts = base.rsplitn(3, "::");
    let name = parts.next()?;
    let module = parts.next()?;
    Some(format!("{module}::{name}"))
}

#[cfg(test)]
mod tests {
    use ledger_client::ExecutionStatus;

    use super::*;

    /// Tests explorer link formatting
    #[test]
    fn test_explorer_url() {
        let url = Network::Devnet.explorer_url("AbC123");
        assert_eq!(url, "https://suiexplorer.com/txblock/AbC123?network=devnet");
    }

    /// Tests reducing fully qualified types to their short names
    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("0x5::bank::Bank").as_deref(), Some("bank::Bank"));
        assert_eq!(
            short_type_name("0x2::package::UpgradeCap").as_deref(),
            Some("package::UpgradeCap")
        );
        assert_eq!(
            short_type_name("0x2::coin::TreasuryCap<0x5::sui_dollar::SUI_DOLLAR>").as_deref(),
            Some("coin::TreasuryCap")
        );
        assert_eq!(short_type_name("Bank"), None);
    }

    /// Tests recording the results of a publish transaction
    #[test]
    fn test_record_publish() {
        let package: ObjectId = "0x5".parse().unwrap();
        let bank: ObjectId = "0xb".parse().unwrap();
        let outcome = SubmissionOutcome {
            digest: "digest".to_string(),
            status: ExecutionStatus::Success,
            object_changes: vec![
                ObjectChange::Published { package_id: package, modules: vec![] },
                ObjectChange::Created {
                    object_id: bank,
                    object_type: format!("{package}::bank::Bank"),
                },
                ObjectChange::Other,
            ],
        };

        let mut deployment = Deployment::default();
        deployment.record_publish(&outcome);

        assert_eq!(deployment.get(PACKAGE_KEY).unwrap(), package);
        assert_eq!(deployment.get("bank::Bank").unwrap(), bank);
        assert_eq!(deployment.get(BANK_KEY).unwrap(), bank);
        assert!(deployment.get(CAP_WRAPPER_KEY).is_err());
    }
}

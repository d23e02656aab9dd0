//! Builds a move package with the CLI and publishes it

use std::path::Path;

use ledger_client::{Keypair, LedgerClient, ObjectId, SubmissionOutcome, TransactionBuilder};
use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

use crate::{
    config::Network,
    error::{ScriptError, ensure_success},
};

/// The largest gas budget devnet accepts
pub const DEVNET_MAX_GAS_BUDGET: u64 = 10_000_000_000;

/// The CLI arguments dumping a package's bytecode, followed by its path
const BUILD_ARGS: [&str; 5] =
    ["move", "build", "--skip-fetch-latest-git-deps", "--dump-bytecode-as-base64", "--path"];

/// The compiled modules of a package and the packages it depends on
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CompiledPackage {
    /// The base64-encoded module bytecode
    pub modules: Vec<String>,
    /// The ids of the package's dependencies
    pub dependencies: Vec<ObjectId>,
}

/// The gas budget to publish with on a network, if it needs an explicit one
pub fn publish_gas_budget(network: Network) -> Option<u64> {
    match network {
        Network::Devnet => Some(DEVNET_MAX_GAS_BUDGET),
        _ => None,
    }
}

/// Compile the package at `package_path` with the given CLI binary
pub async fn build_package(
    sui_cli: &str,
    package_path: &Path,
) -> Result<CompiledPackage, ScriptError> {
    if !package_path.exists() {
        return Err(ScriptError::build(format!("package not found at {}", package_path.display())));
    }

    info!("building package at {}", package_path.display());
    let output = Command::new(sui_cli)
        .args(BUILD_ARGS)
        .arg(package_path)
        .output()
        .await
        .map_err(|e| ScriptError::build(format!("failed to run {sui_cli}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let msg = format!("{sui_cli} exited with {}: {stderr}", output.status);
        return Err(ScriptError::build(msg));
    }

    parse_build_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the bytecode dump, skipping any log lines the CLI prints before it
fn parse_build_output(stdout: &str) -> Result<CompiledPackage, ScriptError> {
    let start =
        stdout.find('{').ok_or_else(|| ScriptError::build("no bytecode in build output"))?;
    let package: CompiledPackage =
        serde_json::from_str(stdout[start..].trim_end()).map_err(ScriptError::build)?;

    if package.modules.is_empty() {
        return Err(ScriptError::build("package has no modules"));
    }

    Ok(package)
}

/// Publish a compiled package and transfer its upgrade capability to the
/// signer
pub async fn publish_package<C: LedgerClient + ?Sized>(
    client: &C,
    signer: &Keypair,
    package: CompiledPackage,
    gas_budget: Option<u64>,
) -> Result<SubmissionOutcome, ScriptError> {
    let mut tx = TransactionBuilder::new();
    let upgrade_cap = tx.publish(package.modules, package.dependencies)?;
    let sender = tx.pure_address(signer.address())?;
    tx.transfer_objects(vec![upgrade_cap], sender)?;
    if let Some(budget) = gas_budget {
        tx.set_gas_budget(budget);
    }

    let outcome = client.submit(tx.finish(), signer).await.map_err(ScriptError::submission)?;
    let outcome = ensure_success(outcome)?;
    match outcome.published_package() {
        Some(id) => info!("published package {id}"),
        None => info!("publish transaction {} reports no package", outcome.digest),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use ledger_client::{Instruction, ObjectChange, mock::MockLedger};

    use super::*;

    /// A bytecode dump as printed by the CLI
    const BUILD_OUTPUT: &str = r#"INCLUDING DEPENDENCY Sui
INCLUDING DEPENDENCY MoveStdlib
BUILDING bank
{"modules":["oRzrCwYAAAAK"],"dependencies":["0x1","0x2"],"digest":[1,2,3]}
"#;

    /// Tests parsing a bytecode dump preceded by log lines
    #[test]
    fn test_parse_build_output() {
        let package = parse_build_output(BUILD_OUTPUT).unwrap();
        assert_eq!(package.modules, vec!["oRzrCwYAAAAK".to_string()]);
        assert_eq!(package.dependencies, vec!["0x1".parse().unwrap(), "0x2".parse().unwrap()]);
    }

    /// Tests rejecting output with no bytecode
    #[test]
    fn test_parse_build_output_failure() {
        assert!(matches!(parse_build_output("error[E01002]"), Err(ScriptError::Build(_))));
        let empty = r#"{"modules":[],"dependencies":[]}"#;
        assert!(matches!(parse_build_output(empty), Err(ScriptError::Build(_))));
    }

    /// Tests that a missing package directory fails before the CLI runs
    #[tokio::test]
    async fn test_build_missing_package() {
        let path = std::env::temp_dir().join(format!("no-such-package-{}", std::process::id()));
        let err = build_package("/nonexistent/sui", &path).await.unwrap_err();
        match err {
            ScriptError::Build(msg) => assert!(msg.contains("package not found")),
            other => panic!("expected build error, got {other}"),
        }
    }

    /// Tests the gas budget chosen per network
    #[test]
    fn test_publish_gas_budget() {
        assert_eq!(publish_gas_budget(Network::Devnet), Some(DEVNET_MAX_GAS_BUDGET));
        assert_eq!(publish_gas_budget(Network::Testnet), None);
    }

    /// Tests the transaction sent to publish a package
    #[tokio::test]
    async fn test_publish_package() {
        let package_id: ObjectId = "0x5".parse().unwrap();
        let ledger = MockLedger::default().with_object_changes(vec![ObjectChange::Published {
            package_id,
            modules: vec!["bank".to_string()],
        }]);
        let signer = Keypair::generate();

        let package = parse_build_output(BUILD_OUTPUT).unwrap();
        let outcome =
            publish_package(&ledger, &signer, package, Some(DEVNET_MAX_GAS_BUDGET)).await.unwrap();
        assert_eq!(outcome.published_package(), Some(package_id));

        let submitted = ledger.submitted().await;
        let tx = &submitted[0];
        assert_eq!(tx.gas_budget(), Some(DEVNET_MAX_GAS_BUDGET));
        assert!(matches!(tx.instructions()[0], Instruction::Publish { .. }));
        assert!(matches!(tx.instructions()[1], Instruction::TransferObjects { .. }));
    }
}

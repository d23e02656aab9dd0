//! Generates a fresh keypair and its wallet file

use std::path::Path;

use ledger_client::Keypair;
use tracing::info;

use crate::error::ScriptError;

/// Render a keypair as a wallet file: a JSON array of its secret bytes
pub fn wallet_json(keypair: &Keypair) -> Result<String, ScriptError> {
    serde_json::to_string(&keypair.secret_bytes().to_vec()).map_err(ScriptError::keystore)
}

/// Render a keypair's secret as hex, the form web wallets import
pub fn wallet_hex(keypair: &Keypair) -> String {
    hex::encode(keypair.secret_bytes())
}

/// Generate a keypair, writing its wallet file to `out` if given
///
/// An existing file is never overwritten
pub fn generate_wallet(out: Option<&Path>) -> Result<Keypair, ScriptError> {
    let keypair = Keypair::generate();
    info!("generated wallet for {}", keypair.address());

    if let Some(path) = out {
        if path.exists() {
            return Err(ScriptError::io(format!("{} already exists", path.display())));
        }

        std::fs::write(path, wallet_json(&keypair)?).map_err(ScriptError::io)?;
        info!("wrote wallet to {}", path.display());
    }

    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that a written wallet loads back into the same keypair
    #[test]
    fn test_wallet_file_reloads() {
        let path = std::env::temp_dir().join(format!("wallet-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let keypair = generate_wallet(Some(&path)).unwrap();
        let loaded = Keypair::from_wallet_file(&path).unwrap();
        assert_eq!(loaded.address(), keypair.address());

        // A second run refuses to clobber the wallet
        assert!(matches!(generate_wallet(Some(&path)), Err(ScriptError::Io(_))));
        std::fs::remove_file(&path).unwrap();
    }

    /// Tests that the hex secret restores the same keypair
    #[test]
    fn test_wallet_hex() {
        let keypair = Keypair::generate();
        let encoded = wallet_hex(&keypair);
        assert_eq!(encoded.len(), 64);

        let secret: [u8; 32] = hex::decode(&encoded).unwrap().try_into().unwrap();
        assert_eq!(Keypair::from_secret(&secret).address(), keypair.address());
    }
}

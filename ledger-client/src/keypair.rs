//! The Ed25519 keypair used to sign transactions

use std::{fmt, path::Path};

use base64::engine::{Engine, general_purpose as b64_general_purpose};
use blake2::{Blake2b, Digest, digest::consts::U32};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, Signer, SigningKey};
use rand::rngs::OsRng;

use crate::{
    error::LedgerClientError,
    types::{Address, IDENTIFIER_LENGTH},
};

// -------------
// | Constants |
// -------------

/// The signature scheme flag for Ed25519
const ED25519_FLAG: u8 = 0x00;
/// The intent prefix of a transaction signing message: transaction scope,
/// version zero, application id zero
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];
/// The length of a wallet file holding the secret followed by the public key
const EXPANDED_SECRET_LENGTH: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;

/// The Blake2b variant with a 32-byte digest
type Blake2b256 = Blake2b<U32>;

// -----------
// | Keypair |
// -----------

/// An Ed25519 signing keypair and the address it controls
#[derive(Clone)]
pub struct Keypair {
    /// The signing key
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Construct a keypair from a 32-byte secret
    pub fn from_secret(secret: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self { signing_key: SigningKey::from_bytes(secret) }
    }

    /// Construct a keypair from raw wallet bytes
    ///
    /// Accepts either the 32-byte secret, or the secret followed by its
    /// 32-byte public key, in which case the public half must match
    pub fn from_wallet_bytes(bytes: &[u8]) -> Result<Self, LedgerClientError> {
        match bytes.len() {
            SECRET_KEY_LENGTH => Ok(Self::from_secret(&to_secret(bytes)?)),
            EXPANDED_SECRET_LENGTH => {
                let (secret, public) = bytes.split_at(SECRET_KEY_LENGTH);
                let keypair = Self::from_secret(&to_secret(secret)?);
                if keypair.public_key() != public {
                    return Err(LedgerClientError::key("public key does not match secret"));
                }

                Ok(keypair)
            },
            n => Err(LedgerClientError::key(format!("invalid wallet length {n}"))),
        }
    }

    /// Load a keypair from a JSON wallet file holding a byte array
    pub fn from_wallet_file(path: &Path) -> Result<Self, LedgerClientError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LedgerClientError::key(format!("{}: {e}", path.display())))?;
        let bytes: Vec<u8> = serde_json::from_str(&contents).map_err(LedgerClientError::parsing)?;
        Self::from_wallet_bytes(&bytes)
    }

    /// Decode a base64 keystore entry: a scheme flag byte followed by the
    /// 32-byte secret
    pub fn from_keystore_entry(entry: &str) -> Result<Self, LedgerClientError> {
        let bytes = b64_general_purpose::STANDARD
            .decode(entry.trim())
            .map_err(LedgerClientError::parsing)?;

        let Some((flag, secret)) = bytes.split_first() else {
            return Err(LedgerClientError::key("empty keystore entry"));
        };
        if *flag != ED25519_FLAG {
            return Err(LedgerClientError::key(format!("unsupported signature scheme {flag:#04x}")));
        }

        Ok(Self::from_secret(&to_secret(secret)?))
    }

    /// The public key bytes
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The secret key bytes, in the form written to wallet files
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// The keypair encoded as a base64 keystore entry
    pub fn to_keystore_entry(&self) -> String {
        let mut bytes = vec![ED25519_FLAG];
        bytes.extend_from_slice(&self.secret_bytes());
        b64_general_purpose::STANDARD.encode(bytes)
    }

    /// The address controlled by this keypair
    pub fn address(&self) -> Address {
        let digest = Blake2b256::new()
            .chain_update([ED25519_FLAG])
            .chain_update(self.public_key())
            .finalize();

        let mut bytes = [0u8; IDENTIFIER_LENGTH];
        bytes.copy_from_slice(&digest);
        Address::new(bytes)
    }

    /// Sign transaction bytes, returning the base64 serialized signature
    /// (`flag || signature || public key`)
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let digest = Blake2b256::new()
            .chain_update(TRANSACTION_INTENT)
            .chain_update(tx_bytes)
            .finalize();
        let signature = self.signing_key.sign(&digest);

        let mut serialized = vec![ED25519_FLAG];
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());
        b64_general_purpose::STANDARD.encode(serialized)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("address", &self.address()).finish_non_exhaustive()
    }
}

/// Convert a byte slice into a secret key array
fn to_secret(bytes: &[u8]) -> Result<[u8; SECRET_KEY_LENGTH], LedgerClientError> {
    bytes
        .try_into()
        .map_err(|_| LedgerClientError::key(format!("invalid secret length {}", bytes.len())))
}

//! Error types for the ledger client

use thiserror::Error;

/// Error type for ledger client operations
#[derive(Debug, Error, Clone)]
pub enum LedgerClientError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error object returned by the node's JSON-RPC interface
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// The JSON-RPC error code
        code: i64,
        /// The error message reported by the node
        message: String,
    },

    /// Parsing error
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// An error encoding a transaction for submission
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// An error selecting coins to pay for gas
    #[error("Gas error: {0}")]
    Gas(String),

    /// An error loading or decoding key material
    #[error("Key error: {0}")]
    Key(String),

    /// An error producing a transaction signature
    #[error("Signing error: {0}")]
    Signing(String),

    /// An error injected by the mock ledger
    #[error("Mock ledger error: {0}")]
    Mock(String),
}

#[allow(clippy::needless_pass_by_value)]
impl LedgerClientError {
    /// Create a new HTTP error
    pub fn http<T: ToString>(msg: T) -> Self {
        Self::Http(msg.to_string())
    }

    /// Create a new RPC error
    pub fn rpc<T: ToString>(code: i64, msg: T) -> Self {
        Self::Rpc { code, message: msg.to_string() }
    }

    /// Create a new parsing error
    pub fn parsing<T: ToString>(msg: T) -> Self {
        Self::Parsing(msg.to_string())
    }

    /// Create a new encoding error
    pub fn encoding<T: ToString>(msg: T) -> Self {
        Self::Encoding(msg.to_string())
    }

    /// Create a new gas error
    pub fn gas<T: ToString>(msg: T) -> Self {
        Self::Gas(msg.to_string())
    }

    /// Create a new key error
    pub fn key<T: ToString>(msg: T) -> Self {
        Self::Key(msg.to_string())
    }

    /// Create a new signing error
    pub fn signing<T: ToString>(msg: T) -> Self {
        Self::Signing(msg.to_string())
    }

    /// Create a new mock ledger error
    pub fn mock<T: ToString>(msg: T) -> Self {
        Self::Mock(msg.to_string())
    }
}

/// Errors raised while assembling a pending transaction
///
/// These are raised eagerly by the builder so that a malformed instruction
/// list never reaches the submission path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// An argument refers to an input that has not been added
    #[error("unknown input index {0}")]
    UnknownInput(u16),
    /// An argument refers to the result of an instruction that does not
    /// precede it
    #[error("unknown instruction result {0}")]
    UnknownResult(u16),
    /// A move call names an invalid module or function identifier
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    /// An instruction was given an empty argument list where at least one
    /// argument is required
    #[error("{0} requires at least one argument")]
    EmptyArguments(&'static str),
    /// An object or address string could not be parsed
    #[error("malformed reference: {0}")]
    MalformedReference(String),
    /// The transaction has hit the maximum number of inputs or instructions
    #[error("transaction is full: {0}")]
    Full(&'static str),
}

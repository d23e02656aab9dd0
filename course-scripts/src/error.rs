//! Error types for the course scripts

use ledger_client::{ExecutionStatus, LedgerClientError, SubmissionOutcome, TransactionError};
use thiserror::Error;

/// The error type emitted by the course scripts
///
/// Every variant is terminal for a run; nothing is retried internally
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A query against the ledger could not complete
    #[error("query failed: {0}")]
    Query(LedgerClientError),
    /// An instruction could not be added to the pending transaction
    #[error("assembly failed: {0}")]
    Assembly(#[from] TransactionError),
    /// The ledger could not be reached or rejected the transaction
    #[error("submission failed: {0}")]
    Submission(String),
    /// A required configuration value is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),
    /// Key material could not be loaded
    #[error("keystore error: {0}")]
    Keystore(String),
    /// An enrollment operation needs a cohort that has not been set
    #[error("no cohort object provided")]
    MissingCohort,
    /// An enrollment operation needs an instructor capability that has not
    /// been set
    #[error("no instructor capability provided")]
    MissingInstructorCap,
    /// Building a move package failed
    #[error("package build failed: {0}")]
    Build(String),
    /// A faucet request failed
    #[error("faucet request failed: {0}")]
    Faucet(String),
    /// A filesystem operation failed
    #[error("io error: {0}")]
    Io(String),
}

#[allow(clippy::needless_pass_by_value)]
impl ScriptError {
    /// Create a query error
    pub fn query(err: LedgerClientError) -> Self {
        Self::Query(err)
    }

    /// Create a submission error
    pub fn submission<T: ToString>(msg: T) -> Self {
        Self::Submission(msg.to_string())
    }

    /// Create a configuration error
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a keystore error
    pub fn keystore<T: ToString>(msg: T) -> Self {
        Self::Keystore(msg.to_string())
    }

    /// Create a build error
    pub fn build<T: ToString>(msg: T) -> Self {
        Self::Build(msg.to_string())
    }

    /// Create a faucet error
    pub fn faucet<T: ToString>(msg: T) -> Self {
        Self::Faucet(msg.to_string())
    }

    /// Create an io error
    pub fn io<T: ToString>(msg: T) -> Self {
        Self::Io(msg.to_string())
    }
}

/// Convert an execution outcome into an error unless every instruction
/// landed
pub fn ensure_success(outcome: SubmissionOutcome) -> Result<SubmissionOutcome, ScriptError> {
    match &outcome.status {
        ExecutionStatus::Success => Ok(outcome),
        ExecutionStatus::Failure { error } => {
            Err(ScriptError::submission(format!("transaction {} failed: {error}", outcome.digest)))
        },
    }
}

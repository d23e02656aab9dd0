//! A client for the ledger node used by the course scripts
//!
//! Defines the identifiers and page types reported by the node, the pending
//! transaction with its builder and binary encoding, the signing keypair, and
//! the [`LedgerClient`] trait along with a JSON-RPC implementation of it

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::unused_async)]

pub mod client;
pub mod encoding;
pub mod error;
pub mod keypair;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;
pub mod rpc;
pub mod transaction;
pub mod types;

pub use client::{DynLedgerClient, LedgerClient};
pub use encoding::{GasConfig, ObjectRef, ResolvedObject, encode_transaction};
pub use error::{LedgerClientError, TransactionError};
pub use keypair::Keypair;
pub use rpc::{RpcLedgerClient, RpcLedgerClientConfig};
pub use transaction::{Argument, Instruction, MoveTarget, PendingTransaction, TransactionBuilder};
pub use types::{
    Address, Balance, ExecutionStatus, ObjectChange, ObjectId, OwnedObject, OwnedObjectsPage,
    SubmissionOutcome,
};

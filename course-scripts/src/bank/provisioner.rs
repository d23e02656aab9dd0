//! Decides whether a transaction must create the user's account

use ledger_client::ObjectId;

use super::scanner::ObjectLookup;

/// How the account used by a transaction is provided
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountProvision {
    /// The user already owns this account; it is passed by reference and
    /// needs no transfer
    Existing(ObjectId),
    /// The transaction creates the account and transfers it to the signer
    /// once every other instruction has used it
    Create,
}

impl AccountProvision {
    /// Whether the transaction must create the account
    pub fn needs_creation(&self) -> bool {
        matches!(self, AccountProvision::Create)
    }
}

impl From<ObjectLookup> for AccountProvision {
    fn from(lookup: ObjectLookup) -> Self {
        match lookup {
            ObjectLookup::Found(id) => AccountProvision::Existing(id),
            ObjectLookup::NotFound => AccountProvision::Create,
        }
    }
}

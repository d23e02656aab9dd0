//! Defines the abstract interface to the ledger

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::LedgerClientError,
    keypair::Keypair,
    transaction::PendingTransaction,
    types::{Address, Balance, OwnedObjectsPage, SubmissionOutcome},
};

// --------------------
// | Trait Definition |
// --------------------

/// The operations the course scripts consume from a ledger node
///
/// Every method is a single round trip; implementations do not retry, and
/// transport failures are surfaced to the caller unchanged
#[async_trait]
pub trait LedgerClient: Sync + Send {
    /// Fetch one page of the objects owned by `owner`
    ///
    /// `cursor` is `None` for the first page and otherwise the
    /// `next_cursor` of the previous page. `type_filter` is forwarded to the
    /// node as a hint; callers must still compare the returned types
    async fn list_owned_objects(
        &self,
        owner: Address,
        cursor: Option<String>,
        type_filter: Option<&str>,
    ) -> Result<OwnedObjectsPage, LedgerClientError>;

    /// Sign and execute a transaction as a single atomic unit
    ///
    /// A ledger-level rejection is reported through the outcome's status, not
    /// as an error
    async fn submit(
        &self,
        transaction: PendingTransaction,
        signer: &Keypair,
    ) -> Result<SubmissionOutcome, LedgerClientError>;

    /// Fetch the balance of one coin type held by `owner`
    async fn get_balance(
        &self,
        owner: Address,
        coin_type: &str,
    ) -> Result<Balance, LedgerClientError>;
}

// --------------------------
// | Erased Type Definition |
// --------------------------

/// A type-erased wrapper around a ledger client
#[derive(Clone)]
pub struct DynLedgerClient(Arc<dyn LedgerClient>);

impl DynLedgerClient {
    /// Create a new type-erased ledger client
    pub fn new<C: LedgerClient + 'static>(client: C) -> Self {
        Self(Arc::new(client))
    }
}

#[async_trait]
impl LedgerClient for DynLedgerClient {
    async fn list_owned_objects(
        &self,
        owner: Address,
        cursor: Option<String>,
        type_filter: Option<&str>,
    ) -> Result<OwnedObjectsPage, LedgerClientError> {
        self.0.list_owned_objects(owner, cursor, type_filter).await
    }

    async fn submit(
        &self,
        transaction: PendingTransaction,
        signer: &Keypair,
    ) -> Result<SubmissionOutcome, LedgerClientError> {
        self.0.submit(transaction, signer).await
    }

    async fn get_balance(
        &self,
        owner: Address,
        coin_type: &str,
    ) -> Result<Balance, LedgerClientError> {
        self.0.get_balance(owner, coin_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mock::MockLedger,
        types::{ObjectId, OwnedObject},
    };

    /// Tests that the erased client forwards to the wrapped client
    #[tokio::test]
    async fn test_dyn_client_forwards() {
        let object = OwnedObject::new(ObjectId::new([7; 32]), "0x2::sui::SUI");
        let client = DynLedgerClient::new(MockLedger::default().with_pages(vec![vec![object]]));

        let owner = Address::new([1; 32]);
        let page = client.list_owned_objects(owner, None, None).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(!page.has_next_page);

        let balance = client.get_balance(owner, "0x2::sui::SUI").await.unwrap();
        assert_eq!(balance.total_balance, 0);
    }
}

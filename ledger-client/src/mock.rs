//! A scripted in-memory ledger for testing
//!
//! Owned objects are served from a fixed list of pages, addressed by the
//! cursors the mock hands out. Every page request and every submitted
//! transaction is recorded so tests can assert on exactly what a flow sent.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    client::LedgerClient,
    error::LedgerClientError,
    keypair::Keypair,
    transaction::PendingTransaction,
    types::{
        Address, Balance, ExecutionStatus, ObjectChange, OwnedObject, OwnedObjectsPage,
        SubmissionOutcome,
    },
};

/// The prefix of the cursors handed out by the mock ledger
const CURSOR_PREFIX: &str = "cursor-";

// ---------
// | Types |
// ---------

/// The mutable state behind the mock ledger
#[derive(Default)]
struct MockLedgerState {
    /// The scripted owned-object pages, in order
    pages: Vec<Vec<OwnedObject>>,
    /// The index of a page whose request fails, if any
    failing_page: Option<usize>,
    /// The cursor of every owned-object request received, in order
    page_requests: Vec<Option<String>>,
    /// The status every submission executes with
    submission_status: Option<ExecutionStatus>,
    /// The object changes every successful submission reports
    object_changes: Vec<ObjectChange>,
    /// A transport error returned by every submission, if set
    submit_error: Option<String>,
    /// Every transaction received for submission, in order
    submitted: Vec<PendingTransaction>,
    /// Coin balances by coin type
    balances: HashMap<String, u128>,
}

// ---------------
// | Mock Ledger |
// ---------------

/// A mock ledger used for testing
#[derive(Default)]
pub struct MockLedger {
    /// The ledger state, wrapped in a mutex for simple shared mutable access
    state: Mutex<MockLedgerState>,
}

impl MockLedger {
    /// Serve the given pages of owned objects
    pub fn with_pages(mut self, pages: Vec<Vec<OwnedObject>>) -> Self {
        self.state.get_mut().pages = pages;
        self
    }

    /// Fail the request for the page at the given index
    pub fn with_failing_page(mut self, idx: usize) -> Self {
        self.state.get_mut().failing_page = Some(idx);
        self
    }

    /// Execute every submission with the given status
    pub fn with_submission_status(mut self, status: ExecutionStatus) -> Self {
        self.state.get_mut().submission_status = Some(status);
        self
    }

    /// Report the given object changes for every successful submission
    pub fn with_object_changes(mut self, changes: Vec<ObjectChange>) -> Self {
        self.state.get_mut().object_changes = changes;
        self
    }

    /// Fail every submission with a transport error
    pub fn with_submit_error(mut self, msg: &str) -> Self {
        self.state.get_mut().submit_error = Some(msg.to_string());
        self
    }

    /// Hold the given balance of a coin type
    pub fn with_balance(mut self, coin_type: &str, amount: u128) -> Self {
        self.state.get_mut().balances.insert(coin_type.to_string(), amount);
        self
    }

    /// The cursor of every owned-object request received, in order
    pub async fn page_requests(&self) -> Vec<Option<String>> {
        self.state.lock().await.page_requests.clone()
    }

    /// Every transaction received for submission, in order
    pub async fn submitted(&self) -> Vec<PendingTransaction> {
        self.state.lock().await.submitted.clone()
    }
}

// --------------------------------------
// | Ledger Client Trait Implementation |
// --------------------------------------

#[async_trait]
impl LedgerClient for MockLedger {
    async fn list_owned_objects(
        &self,
        _owner: Address,
        cursor: Option<String>,
        _type_filter: Option<&str>,
    ) -> Result<OwnedObjectsPage, LedgerClientError> {
        let mut state = self.state.lock().await;
        state.page_requests.push(cursor.clone());

        let idx = match cursor {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|idx| idx.parse::<usize>().ok())
                .filter(|idx| *idx < state.pages.len())
                .ok_or_else(|| LedgerClientError::mock(format!("unknown cursor {cursor}")))?,
        };

        if state.failing_page == Some(idx) {
            return Err(LedgerClientError::mock(format!("page {idx} unavailable")));
        }

        let Some(data) = state.pages.get(idx).cloned() else {
            return Ok(OwnedObjectsPage::default());
        };

        let has_next_page = idx + 1 < state.pages.len();
        let next_cursor = has_next_page.then(|| format!("{CURSOR_PREFIX}{}", idx + 1));
        Ok(OwnedObjectsPage { data, next_cursor, has_next_page })
    }

    async fn submit(
        &self,
        transaction: PendingTransaction,
        _signer: &Keypair,
    ) -> Result<SubmissionOutcome, LedgerClientError> {
        let mut state = self.state.lock().await;
        if let Some(msg) = &state.submit_error {
            return Err(LedgerClientError::mock(msg));
        }

        state.submitted.push(transaction);
        let digest = format!("mock-digest-{}", state.submitted.len());
        let status = state.submission_status.clone().unwrap_or(ExecutionStatus::Success);
        let object_changes = match status {
            ExecutionStatus::Success => state.object_changes.clone(),
            ExecutionStatus::Failure { .. } => vec![],
        };

        Ok(SubmissionOutcome { digest, status, object_changes })
    }

    async fn get_balance(
        &self,
        _owner: Address,
        coin_type: &str,
    ) -> Result<Balance, LedgerClientError> {
        let state = self.state.lock().await;
        let total_balance = state.balances.get(coin_type).copied().unwrap_or_default();

        Ok(Balance {
            coin_type: coin_type.to_string(),
            coin_object_count: u64::from(total_balance > 0),
            total_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{transaction::TransactionBuilder, types::ObjectId};

    use super::*;

    /// Build an owned object with the given id
    fn object(id: &str) -> OwnedObject {
        OwnedObject::new(id.parse::<ObjectId>().unwrap(), "0x2::coin::Coin<0x2::sui::SUI>")
    }

    /// Tests that pages are chained through the cursors the mock hands out
    #[tokio::test]
    async fn test_paging() {
        let ledger = MockLedger::default()
            .with_pages(vec![vec![object("0x1")], vec![object("0x2"), object("0x3")]]);
        let owner = Address::new([0; 32]);

        let first = ledger.list_owned_objects(owner, None, None).await.unwrap();
        assert!(first.has_next_page);

        let second = ledger.list_owned_objects(owner, first.next_cursor, None).await.unwrap();
        assert_eq!(second.data.len(), 2);
        assert!(!second.has_next_page);
        assert_eq!(second.next_cursor, None);

        let requests = ledger.page_requests().await;
        assert_eq!(requests, vec![None, Some("cursor-1".to_string())]);

        // An unknown cursor is rejected
        let res = ledger.list_owned_objects(owner, Some("cursor-9".to_string()), None).await;
        assert!(res.is_err());
    }

    /// Tests that submissions are recorded and report the scripted status
    #[tokio::test]
    async fn test_submission() {
        let status = ExecutionStatus::Failure { error: "MoveAbort".to_string() };
        let ledger = MockLedger::default().with_submission_status(status.clone());

        let outcome =
            ledger.submit(TransactionBuilder::new().finish(), &Keypair::generate()).await.unwrap();
        assert_eq!(outcome.status, status);
        assert_eq!(ledger.submitted().await.len(), 1);
    }
}

//! Flows against the lending bank package: finding or creating the user's
//! account, depositing, and borrowing the stablecoin

pub mod assembler;
pub mod provisioner;
pub mod scanner;

use ledger_client::{Keypair, LedgerClient, MoveTarget, ObjectId, TransactionBuilder};
use tracing::{info, warn};

pub use assembler::{DepositBorrowParams, account_type, assemble_deposit_and_borrow};
pub use provisioner::AccountProvision;
pub use scanner::{ObjectLookup, find_owned_object};

use crate::error::{ScriptError, ensure_success};

/// The result of a deposit-and-borrow run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositBorrowOutcome {
    /// The transaction digest
    pub digest: String,
    /// The account the deposit went into, if it could be resolved
    pub account: Option<ObjectId>,
    /// Whether the transaction created the account
    pub created_account: bool,
}

/// Deposit into the signer's bank account and borrow the stablecoin against
/// it, creating the account within the same transaction if the signer owns
/// none
pub async fn deposit_and_borrow<C: LedgerClient + ?Sized>(
    client: &C,
    signer: &Keypair,
    params: &DepositBorrowParams,
) -> Result<DepositBorrowOutcome, ScriptError> {
    let owner = signer.address();
    let account_type = params.account_type();

    let lookup = find_owned_object(client, owner, &account_type).await?;
    let provision = AccountProvision::from(lookup);
    if provision.needs_creation() {
        info!("no account found for {owner}, creating one");
    }

    let tx = assemble_deposit_and_borrow(params, provision, owner)?;
    let outcome = client.submit(tx, signer).await.map_err(ScriptError::submission)?;
    let outcome = ensure_success(outcome)?;
    info!("deposit and borrow executed: {}", outcome.digest);

    let account = match provision {
        AccountProvision::Existing(id) => Some(id),
        AccountProvision::Create => {
            let created = outcome.created_objects_of_type(&account_type).next();
            if created.is_none() {
                warn!("transaction {} reports no created account", outcome.digest);
            }
            created
        },
    };

    Ok(DepositBorrowOutcome {
        digest: outcome.digest,
        account,
        created_account: provision.needs_creation(),
    })
}

/// Create a bank account and transfer it to the signer, returning its id
pub async fn new_account<C: LedgerClient + ?Sized>(
    client: &C,
    signer: &Keypair,
    package: ObjectId,
) -> Result<ObjectId, ScriptError> {
    let mut tx = TransactionBuilder::new();
    let target =
        MoveTarget::new(package, assembler::BANK_MODULE, assembler::NEW_ACCOUNT_FUNCTION)?;
    let account = tx.move_call(target, vec![], vec![])?;
    let recipient = tx.pure_address(signer.address())?;
    tx.transfer_objects(vec![account], recipient)?;

    let outcome = client.submit(tx.finish(), signer).await.map_err(ScriptError::submission)?;
    let outcome = ensure_success(outcome)?;

    let account_type = account_type(package);
    outcome.created_objects_of_type(&account_type).next().ok_or_else(|| {
        ScriptError::submission(format!("transaction {} created no account", outcome.digest))
    })
}

#[cfg(test)]
mod tests {
    use ledger_client::{
        Argument, ExecutionStatus, Instruction, ObjectChange, OwnedObject, mock::MockLedger,
        transaction::PureValue,
    };

    use super::*;

    /// The package used in tests
    const PACKAGE: &str = "0x5";

    /// Parameters used across tests
    fn test_params() -> DepositBorrowParams {
        DepositBorrowParams {
            package: PACKAGE.parse().unwrap(),
            bank: "0xb".parse().unwrap(),
            cap_wrapper: "0xc".parse().unwrap(),
            price_feed: "0xd".parse().unwrap(),
            deposit_amount: 1000,
            borrow_amount: 500,
        }
    }

    /// The object change reporting a newly created account
    fn created_account(id: ObjectId) -> ObjectChange {
        let package: ObjectId = PACKAGE.parse().unwrap();
        ObjectChange::Created { object_id: id, object_type: account_type(package) }
    }

    /// Tests a first run, where the account is created and reported
    #[tokio::test]
    async fn test_creates_missing_account() {
        let account: ObjectId = "0xacc1".parse().unwrap();
        let ledger = MockLedger::default().with_object_changes(vec![created_account(account)]);
        let signer = Keypair::generate();

        let outcome = deposit_and_borrow(&ledger, &signer, &test_params()).await.unwrap();
        assert!(outcome.created_account);
        assert_eq!(outcome.account, Some(account));
        assert_eq!(outcome.digest, "mock-digest-1");

        let submitted = ledger.submitted().await;
        assert_eq!(submitted.len(), 1);
        let tx = &submitted[0];
        assert_eq!(tx.instructions().len(), 7);

        // The borrowed coin and the new account both go to the signer
        let expected = PureValue::Address(signer.address());
        for (idx, objects) in [(5, Argument::Result(4)), (6, Argument::Result(1))] {
            let Instruction::TransferObjects { objects: sent, recipient } = &tx.instructions()[idx]
            else {
                panic!("expected transfer at {idx}");
            };
            assert_eq!(sent, &vec![objects]);
            assert_eq!(tx.pure_value(*recipient), Some(&expected));
        }
    }

    /// Tests a later run, where the existing account is reused
    #[tokio::test]
    async fn test_reuses_existing_account() {
        let params = test_params();
        let account: ObjectId = "0xacc1".parse().unwrap();
        let ledger = MockLedger::default().with_pages(vec![
            vec![OwnedObject::new("0xa1".parse().unwrap(), "0x2::coin::Coin<0x2::sui::SUI>")],
            vec![OwnedObject::new(account, params.account_type())],
        ]);
        let signer = Keypair::generate();

        let outcome = deposit_and_borrow(&ledger, &signer, &params).await.unwrap();
        assert!(!outcome.created_account);
        assert_eq!(outcome.account, Some(account));

        let submitted = ledger.submitted().await;
        let tx = &submitted[0];
        assert_eq!(tx.instructions().len(), 5);
        assert!(!tx.instructions().iter().any(|instruction| matches!(
            instruction.move_target(),
            Some(target) if target.function == assembler::NEW_ACCOUNT_FUNCTION
        )));
    }

    /// Tests that a transaction failing on chain is reported as an error
    #[tokio::test]
    async fn test_execution_failure() {
        let ledger = MockLedger::default().with_submission_status(ExecutionStatus::Failure {
            error: "InsufficientCoinBalance".to_string(),
        });
        let signer = Keypair::generate();

        let err = deposit_and_borrow(&ledger, &signer, &test_params()).await.unwrap_err();
        match err {
            ScriptError::Submission(msg) => assert!(msg.contains("InsufficientCoinBalance")),
            other => panic!("expected submission error, got {other}"),
        }
    }

    /// Tests that a failing scan prevents any submission
    #[tokio::test]
    async fn test_scan_failure_submits_nothing() {
        let ledger = MockLedger::default().with_pages(vec![vec![], vec![]]).with_failing_page(0);
        let signer = Keypair::generate();

        let err = deposit_and_borrow(&ledger, &signer, &test_params()).await.unwrap_err();
        assert!(matches!(err, ScriptError::Query(_)));
        assert!(ledger.submitted().await.is_empty());
    }

    /// Tests that an unreachable ledger is reported as a submission error
    #[tokio::test]
    async fn test_transport_failure() {
        let ledger = MockLedger::default().with_submit_error("connection refused");
        let signer = Keypair::generate();

        let err = deposit_and_borrow(&ledger, &signer, &test_params()).await.unwrap_err();
        assert!(matches!(err, ScriptError::Submission(_)));
    }

    /// Tests creating a standalone account
    #[tokio::test]
    async fn test_new_account() {
        let account: ObjectId = "0xacc2".parse().unwrap();
        let ledger = MockLedger::default().with_object_changes(vec![created_account(account)]);
        let signer = Keypair::generate();

        let created = new_account(&ledger, &signer, PACKAGE.parse().unwrap()).await.unwrap();
        assert_eq!(created, account);

        let submitted = ledger.submitted().await;
        let instructions = submitted[0].instructions();
        assert_eq!(instructions.len(), 2);
        assert!(matches!(instructions[1], Instruction::TransferObjects { .. }));
    }

    /// Tests that a successful transaction creating no account is an error
    #[tokio::test]
    async fn test_new_account_not_reported() {
        let ledger = MockLedger::default();
        let signer = Keypair::generate();

        let result = new_account(&ledger, &signer, PACKAGE.parse().unwrap()).await;
        assert!(matches!(result, Err(ScriptError::Submission(_))));
    }
}

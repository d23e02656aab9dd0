//! Sends part of the gas coin to another address

use ledger_client::{Address, Keypair, LedgerClient, SubmissionOutcome, TransactionBuilder};
use tracing::info;

use crate::error::{ScriptError, ensure_success};

/// Split `amount` off of the signer's gas coin and transfer it to `recipient`
pub async fn transfer_amount<C: LedgerClient + ?Sized>(
    client: &C,
    signer: &Keypair,
    recipient: Address,
    amount: u64,
) -> Result<SubmissionOutcome, ScriptError> {
    let mut tx = TransactionBuilder::new();
    let amount_arg = tx.pure_u64(amount)?;
    let coins = tx.split_coins(tx.gas(), vec![amount_arg])?;
    let recipient_arg = tx.pure_address(recipient)?;
    tx.transfer_objects(coins, recipient_arg)?;

    let outcome = client.submit(tx.finish(), signer).await.map_err(ScriptError::submission)?;
    let outcome = ensure_success(outcome)?;
    info!("transferred {amount} to {recipient}: {}", outcome.digest);
    Ok(outcome)
}

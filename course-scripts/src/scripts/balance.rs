//! Reports a coin balance

use ledger_client::{Address, Balance, LedgerClient};
use tracing::info;

use crate::error::ScriptError;

/// The coin type of the native gas coin
pub const GAS_COIN_TYPE: &str = "0x2::sui::SUI";

/// Fetch the balance `owner` holds of `coin_type`
pub async fn fetch_balance<C: LedgerClient + ?Sized>(
    client: &C,
    owner: Address,
    coin_type: &str,
) -> Result<Balance, ScriptError> {
    let balance = client.get_balance(owner, coin_type).await.map_err(ScriptError::query)?;
    info!(
        "{owner} holds {} of {coin_type} across {} coins",
        balance.total_balance, balance.coin_object_count
    );
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use ledger_client::mock::MockLedger;

    use super::*;

    /// Tests fetching a held and an unheld coin type
    #[tokio::test]
    async fn test_fetch_balance() {
        let ledger = MockLedger::default().with_balance(GAS_COIN_TYPE, 42);
        let owner = Address::new([1; 32]);

        let held = fetch_balance(&ledger, owner, GAS_COIN_TYPE).await.unwrap();
        assert_eq!(held.total_balance, 42);

        let unheld = fetch_balance(&ledger, owner, "0x5::sui_dollar::SUI_DOLLAR").await.unwrap();
        assert_eq!(unheld.total_balance, 0);
        assert_eq!(unheld.coin_object_count, 0);
    }
}

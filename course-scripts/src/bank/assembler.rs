//! Assembles the deposit-and-borrow transaction

use ledger_client::{Address, MoveTarget, ObjectId, PendingTransaction, TransactionBuilder};

use super::provisioner::AccountProvision;
use crate::error::ScriptError;

// -------------
// | Constants |
// -------------

/// The module holding the bank and its accounts
pub const BANK_MODULE: &str = "bank";
/// The module producing price quotes
pub const ORACLE_MODULE: &str = "oracle";
/// The module lending against bank deposits
pub const LENDING_MODULE: &str = "lending";
/// The module defining the stablecoin
pub const STABLECOIN_MODULE: &str = "sui_dollar";

/// The function creating a new bank account
pub const NEW_ACCOUNT_FUNCTION: &str = "new_account";
/// The function depositing a coin into the bank
pub const DEPOSIT_FUNCTION: &str = "deposit";
/// The function fetching a price quote
pub const PRICE_FUNCTION: &str = "new";
/// The function borrowing against an account
pub const BORROW_FUNCTION: &str = "borrow";

// ---------
// | Types |
// ---------

/// The objects and amounts a deposit-and-borrow run works with
#[derive(Clone, Debug)]
pub struct DepositBorrowParams {
    /// The package defining the bank, oracle, lending and stablecoin modules
    pub package: ObjectId,
    /// The shared bank object
    pub bank: ObjectId,
    /// The shared object wrapping the stablecoin's treasury capability
    pub cap_wrapper: ObjectId,
    /// The price feed the oracle reads from
    pub price_feed: ObjectId,
    /// The amount split from gas and deposited
    pub deposit_amount: u64,
    /// The amount of stablecoin borrowed
    pub borrow_amount: u64,
}

impl DepositBorrowParams {
    /// The type tag of a bank account
    pub fn account_type(&self) -> String {
        account_type(self.package)
    }

    /// The coin type of the stablecoin
    pub fn stablecoin_type(&self) -> String {
        format!("{}::{STABLECOIN_MODULE}::SUI_DOLLAR", self.package)
    }

    /// A move call target within the package
    fn target(&self, module: &str, function: &str) -> Result<MoveTarget, ScriptError> {
        Ok(MoveTarget::new(self.package, module, function)?)
    }
}

/// The type tag of a bank account in the given package
pub fn account_type(package: ObjectId) -> String {
    format!("{package}::{BANK_MODULE}::Account")
}

// -------------
// | Assembler |
// -------------

/// Assemble the deposit-and-borrow transaction
///
/// Instructions, in order: split the deposit from gas, create the account
/// (only for [`AccountProvision::Create`]), deposit, fetch a price quote,
/// borrow, transfer the borrowed coin to `recipient`, and transfer the new
/// account to `recipient` (only for [`AccountProvision::Create`])
pub fn assemble_deposit_and_borrow(
    params: &DepositBorrowParams,
    provision: AccountProvision,
    recipient: Address,
) -> Result<PendingTransaction, ScriptError> {
    let mut tx = TransactionBuilder::new();

    // Get the coin to deposit
    let deposit_amount = tx.pure_u64(params.deposit_amount)?;
    let coins = tx.split_coins(tx.gas(), vec![deposit_amount])?;
    let coin = coins[0];

    let account = match provision {
        AccountProvision::Existing(id) => tx.object(id)?,
        AccountProvision::Create => {
            tx.move_call(params.target(BANK_MODULE, NEW_ACCOUNT_FUNCTION)?, vec![], vec![])?
        },
    };

    let bank = tx.object(params.bank)?;
    tx.move_call(params.target(BANK_MODULE, DEPOSIT_FUNCTION)?, vec![], vec![bank, account, coin])?;

    // The price quote must be consumed within this transaction
    let price_feed = tx.object(params.price_feed)?;
    let price =
        tx.move_call(params.target(ORACLE_MODULE, PRICE_FUNCTION)?, vec![], vec![price_feed])?;

    let cap_wrapper = tx.object(params.cap_wrapper)?;
    let borrow_amount = tx.pure_u64(params.borrow_amount)?;
    let borrowed = tx.move_call(
        params.target(LENDING_MODULE, BORROW_FUNCTION)?,
        vec![],
        vec![account, cap_wrapper, price, borrow_amount],
    )?;

    let recipient = tx.pure_address(recipient)?;
    tx.transfer_objects(vec![borrowed], recipient)?;

    if provision.needs_creation() {
        tx.transfer_objects(vec![account], recipient)?;
    }

    Ok(tx.finish())
}

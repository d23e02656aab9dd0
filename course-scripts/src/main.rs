//! Runs one course script against the configured network

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]

use clap::Parser;
use course_scripts::{
    bank::{self, DepositBorrowParams},
    cli::{Cli, Command},
    config::{BANK_KEY, CAP_WRAPPER_KEY, Deployment, PACKAGE_KEY},
    enrollment::Enrollment,
    error::ScriptError,
    scripts::{balance, faucet::FaucetClient, keygen, publish, transfer},
    telemetry::setup_logging,
};
use ledger_client::ObjectId;
use tracing::{error, warn};

// --------------
// | Entrypoint |
// --------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.json_logs);

    if let Err(e) = run(&cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Dispatch the selected script
async fn run(cli: &Cli) -> Result<(), ScriptError> {
    match &cli.command {
        Command::Keygen { out } => {
            let keypair = keygen::generate_wallet(out.as_deref())?;
            println!("You've generated a new wallet: {}", keypair.address());
            println!("To save your wallet, copy the following into a JSON file:");
            println!("{}", keygen::wallet_json(&keypair)?);
            println!("To import it into a web wallet, use the hex secret:");
            println!("{}", keygen::wallet_hex(&keypair));
        },
        Command::Airdrop => {
            let signer = cli.load_signer()?;
            let faucet = FaucetClient::new(cli.faucet_url()?)?;
            for gas in faucet.request_gas(signer.address()).await? {
                print_explorer_link(cli, &gas.transfer_tx_digest);
            }
        },
        Command::Transfer { recipient, amount } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;
            let outcome = transfer::transfer_amount(&client, &signer, *recipient, *amount).await?;
            print_explorer_link(cli, &outcome.digest);
        },
        Command::Publish { package_path, sui_cli } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;
            let package = publish::build_package(sui_cli, package_path).await?;
            let gas_budget = publish::publish_gas_budget(cli.network);
            let outcome = publish::publish_package(&client, &signer, package, gas_budget).await?;

            let mut deployment = Deployment::load_or_default(&cli.deployment)?;
            deployment.record_publish(&outcome);
            deployment.save(&cli.deployment)?;
            print_explorer_link(cli, &outcome.digest);
        },
        Command::NewAccount { package } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;
            let package = resolve_id(cli, *package, PACKAGE_KEY)?;
            let account = bank::new_account(&client, &signer, package).await?;
            println!("Created account {account}");
        },
        Command::DepositAndBorrow {
            deposit,
            borrow,
            price_feed,
            package,
            bank: bank_id,
            cap_wrapper,
        } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;
            let params = DepositBorrowParams {
                package: resolve_id(cli, *package, PACKAGE_KEY)?,
                bank: resolve_id(cli, *bank_id, BANK_KEY)?,
                cap_wrapper: resolve_id(cli, *cap_wrapper, CAP_WRAPPER_KEY)?,
                price_feed: *price_feed,
                deposit_amount: *deposit,
                borrow_amount: *borrow,
            };

            let result = bank::deposit_and_borrow(&client, &signer, &params).await;

            // Report the stablecoin balance whether or not the flow landed
            let coin_type = params.stablecoin_type();
            match balance::fetch_balance(&client, signer.address(), &coin_type).await {
                Ok(balance) => println!("Stablecoin balance: {}", balance.total_balance),
                Err(e) => warn!("could not fetch stablecoin balance: {e}"),
            }

            let outcome = result?;
            if let Some(account) = outcome.account {
                println!("Account: {account}");
            }
            print_explorer_link(cli, &outcome.digest);
        },
        Command::Balance { coin_type } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;
            let balance = balance::fetch_balance(&client, signer.address(), coin_type).await?;
            println!("{}: {}", balance.coin_type, balance.total_balance);
        },
        Command::Enrollment { package, instructor_cap, cohort, actions, github } => {
            let signer = cli.load_signer()?;
            let client = cli.ledger_client()?;

            let mut enrollment = Enrollment::new(*package);
            if let Some(cap) = instructor_cap {
                enrollment.with_instructor_cap(*cap);
            }
            if let Some(cohort) = cohort {
                enrollment.with_cohort(*cohort);
            }
            for action in actions {
                enrollment.apply(*action, github.as_deref())?;
            }

            let outcome = enrollment.submit(&client, &signer).await?;
            print_explorer_link(cli, &outcome.digest);
        },
    }

    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Use an id given on the command line, falling back to the deployment file
fn resolve_id(cli: &Cli, given: Option<ObjectId>, key: &str) -> Result<ObjectId, ScriptError> {
    match given {
        Some(id) => Ok(id),
        None => Deployment::load(&cli.deployment)?.get(key),
    }
}

/// Print the explorer link for a transaction
fn print_explorer_link(cli: &Cli, digest: &str) {
    println!("Success! Check out your TX here:\n{}", cli.network.explorer_url(digest));
}

//! Scripts driving the lending bank and enrollment packages on the ledger
//!
//! The central flow is [`bank::deposit_and_borrow`], which finds the signer's
//! bank account by paging through their owned objects, creates one within the
//! same transaction if none exists, and deposits and borrows against it

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::unused_async)]

pub mod bank;
pub mod cli;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod scripts;
pub mod telemetry;

//! Standalone scripts: key generation, faucet requests, transfers, package
//! publication and balance reports

pub mod balance;
pub mod faucet;
pub mod keygen;
pub mod publish;
pub mod transfer;

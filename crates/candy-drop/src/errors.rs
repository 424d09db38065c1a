use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Failures surfaced by the chain boundary, already classified.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("account {0} does not exist")]
    AccountNotFound(Pubkey),

    #[error("RPC host {0} is unreachable")]
    Unreachable(String),

    #[error("program returned custom error {code:#x}")]
    Program { code: u32 },

    #[error("insufficient funds for fee")]
    InsufficientFundsForFee,

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("transaction was not confirmed within {0:?}")]
    Timeout(Duration),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("failed to decode account {0}")]
    Decode(Pubkey),

    #[error("RPC request failed: {0}")]
    Rpc(String),
}

/// Errors that abort a mint attempt before any outcome can be produced.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("a mint attempt is already in flight")]
    AttemptInFlight,

    #[error("unknown gatekeeper network: {0}")]
    UnknownGatekeeper(Pubkey),

    #[error("failed to build instruction: {0}")]
    Build(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to read keypair from {path}: {reason}")]
    Keypair { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to fetch {uri}: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("failed to parse metadata from {uri}: {reason}")]
    Parse { uri: String, reason: String },
}

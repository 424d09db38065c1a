use anchor_lang::prelude::*;

pub mod chain;
pub mod config;
pub mod constants;
pub mod eligibility;
pub mod errors;
pub mod gateway;
pub mod instructions;
pub mod metadata;
pub mod mint;
pub mod pda;
pub mod refresh;
pub mod schedule;
pub mod state;
pub mod wallet;

// Candy Machine v2. Account discriminators and owner checks resolve against this id.
declare_id!("cndy3Z4yapfJBmL3ShUp5exZKqR3z33thTzeNMm2gRZ");

pub use chain::{ChainReader, ChainWriter, Commitment, RpcChain};
pub use config::DropSettings;
pub use eligibility::{DropConfig, DropSnapshot, DropState};
pub use errors::{ChainError, MintError};
pub use mint::{FollowUp, MintAttempt, MintHooks, MintOrchestrator, MintOutcome};
pub use refresh::{RefreshOutcome, StateRefresher};
pub use schedule::RefreshTimer;
pub use wallet::WalletContext;

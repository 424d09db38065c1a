use anchor_lang::AccountDeserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::chain::{ChainReader, Commitment};
use crate::config::DropSettings;
use crate::eligibility::{CollectionLink, DropConfig, DropSnapshot, DropState, WalletChecks};
use crate::errors::ChainError;
use crate::pda::{collection_pda, get_ata};
use crate::state::CollectionPDA;
use crate::wallet::WalletContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No address or no signing capability.
    WalletNotReady,
    ConfigError(String),
    MissingDropId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RefreshOutcome {
    Updated(DropSnapshot),
    Skipped(SkipReason),
    /// The drop account could not be read. Callers keep their previous snapshot.
    Failed(String),
}

impl RefreshOutcome {
    pub fn into_snapshot(self) -> Option<DropSnapshot> {
        match self {
            RefreshOutcome::Updated(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Reads drop and wallet state from the chain and derives a `DropState`.
/// Never writes and never returns an error.
pub struct StateRefresher<'a, C> {
    chain: &'a C,
    settings: &'a DropSettings,
}

impl<'a, C: ChainReader> StateRefresher<'a, C> {
    pub fn new(chain: &'a C, settings: &'a DropSettings) -> Self {
        Self { chain, settings }
    }

    pub fn refresh(&self, wallet: &WalletContext, commitment: Commitment, now: i64) -> RefreshOutcome {
        let owner = match wallet.public_key() {
            Some(owner) if wallet.is_capable() => owner,
            _ => return RefreshOutcome::Skipped(SkipReason::WalletNotReady),
        };
        if let Some(err) = &self.settings.config_error {
            return RefreshOutcome::Skipped(SkipReason::ConfigError(err.clone()));
        }
        let Some(id) = self.settings.candy_machine_id else {
            warn!("no candy machine id configured, skipping refresh");
            return RefreshOutcome::Skipped(SkipReason::MissingDropId);
        };

        let candy_machine = match self.chain.fetch_candy_machine(&id, commitment) {
            Ok(cm) => cm,
            Err(e) => {
                let message = describe_fetch_failure(&e, &id, &self.settings.rpc_url);
                warn!(candy_machine = %id, "{message}");
                return RefreshOutcome::Failed(message);
            }
        };

        let collection = self.lookup_collection(&id, commitment);
        let config = DropConfig::from_candy_machine(id, &candy_machine, collection);
        let checks = self.wallet_checks(&config, &owner, commitment);
        let state = DropState::evaluate(&config, &checks, now);

        info!(
            candy_machine = %id,
            remaining = state.items_remaining,
            available = config.items_available,
            active = state.is_active,
            "drop state refreshed"
        );
        RefreshOutcome::Updated(DropSnapshot {
            config,
            state,
            fetched_at: now,
        })
    }

    fn wallet_checks(&self, config: &DropConfig, owner: &Pubkey, commitment: Commitment) -> WalletChecks {
        let whitelist_tokens = config.whitelist.and_then(|wl| {
            let token_account = get_ata(owner, &wl.mint);
            match self.chain.token_balance(&token_account, commitment) {
                Ok(amount) => Some(amount),
                Err(e) => {
                    debug!(%token_account, "whitelist token lookup failed: {e}");
                    None
                }
            }
        });

        let payment_balance = match config.token_mint {
            Some(mint) => {
                let token_account = get_ata(owner, &mint);
                self.chain
                    .token_balance(&token_account, commitment)
                    .map_err(|e| debug!(%token_account, "payment token lookup failed: {e}"))
                    .ok()
            }
            None => self
                .chain
                .native_balance(owner, commitment)
                .map_err(|e| debug!(%owner, "balance lookup failed: {e}"))
                .ok(),
        };

        WalletChecks {
            whitelist_tokens,
            payment_balance,
        }
    }

    fn lookup_collection(&self, id: &Pubkey, commitment: Commitment) -> Option<CollectionLink> {
        let pda = collection_pda(id);
        let account = match self.chain.fetch_account(&pda, commitment) {
            Ok(account) => account?,
            Err(e) => {
                debug!(collection = %pda, "collection lookup failed: {e}");
                return None;
            }
        };
        let collection = CollectionPDA::try_deserialize(&mut account.data.as_slice()).ok()?;
        Some(CollectionLink {
            pda,
            mint: collection.mint,
        })
    }
}

fn describe_fetch_failure(err: &ChainError, id: &Pubkey, rpc_url: &str) -> String {
    match err {
        ChainError::AccountNotFound(_) => format!(
            "Couldn't fetch candy machine state from candy machine with address: {id}, using rpc: {rpc_url}! \
             You probably typed the id wrong, or the id belongs to another network."
        ),
        ChainError::Unreachable(_) => format!(
            "Couldn't fetch candy machine state with rpc: {rpc_url}! \
             This probably means you have an issue with the rpc host."
        ),
        other => format!("Failed to refresh candy machine state: {other}"),
    }
}
